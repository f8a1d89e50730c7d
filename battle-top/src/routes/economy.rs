//! Wallet, level, shop and VIP endpoints

use axum::{extract::State, response::Response};
use battle_core::economy::{validate_recharge_amount, VipPlan, VipPlanInfo};
use battle_core::level::{level_unlocks, LevelUnlocks};
use battle_core::{config_for_level, experience_progress_percent, next_level_threshold, Feature, LevelConfig};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::extract::Body;
use crate::auth::{AuthUser, MaybeUser};
use crate::db::economy::{
    ensure_wallet, list_items, list_transactions, list_user_items, purchase_item, purchase_vip, recharge, vip_status,
    ItemRow, OwnedItem, VipStatus, WalletRow,
};
use crate::db::users::require_user;
use crate::error::ApiError;
use crate::events::BattleEvent;
use crate::response::{ok, ok_with_message};
use crate::state::AppState;

/// Transactions shown in the wallet history
pub const TRANSACTION_HISTORY: i64 = 50;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletOverview {
    pub wallet: WalletRow,
    pub level: u32,
    pub exp: i64,
    pub total_recharged: f64,
    pub chat_frame: String,
    pub name_style: String,
}

/// GET /api/wallet
pub async fn wallet(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    state.require(Feature::Wallet)?;
    let overview = state.db.with_conn(|conn| {
        let row = require_user(conn, &user.id)?;
        Ok(WalletOverview {
            wallet: ensure_wallet(conn, &user.id)?,
            level: row.level,
            exp: row.exp,
            total_recharged: row.total_recharged,
            chat_frame: row.chat_frame,
            name_style: row.name_style,
        })
    })?;
    Ok(ok(overview))
}

#[derive(Debug, Deserialize)]
pub struct RechargeRequest {
    pub amount: f64,
}

/// POST /api/wallet
pub async fn recharge_wallet(
    State(state): State<AppState>,
    user: AuthUser,
    Body(req): Body<RechargeRequest>,
) -> Result<Response, ApiError> {
    state.require(Feature::Wallet)?;
    let amount = validate_recharge_amount(req.amount)?;
    let outcome = state.db.with_conn_mut(|conn| recharge(conn, &user.id, amount))?;

    info!(
        user = %user.id,
        coins = outcome.battle_coins,
        level = outcome.new_level,
        "Wallet recharged"
    );
    state.events.emit(BattleEvent::Recharged {
        user_id: user.id,
        coins: outcome.battle_coins,
        exp_gained: outcome.exp_gained,
        new_level: outcome.new_level,
        level_up: outcome.level_up,
    });

    let message = if outcome.level_up {
        format!("Recharged! You reached level {} ({})", outcome.new_level, outcome.level_name)
    } else {
        "Recharged".to_string()
    };
    Ok(ok_with_message(outcome, message))
}

/// GET /api/wallet/transactions
pub async fn transactions(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    state.require(Feature::Wallet)?;
    let rows = state
        .db
        .with_conn(|conn| list_transactions(conn, &user.id, TRANSACTION_HISTORY))?;
    Ok(ok(rows))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelOverview {
    pub level: u32,
    pub exp: i64,
    pub config: LevelConfig,
    pub next_level_exp: u64,
    pub progress_percent: u8,
    pub unlocks: LevelUnlocks,
}

/// GET /api/level
pub async fn level(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    state.require(Feature::LevelSystem)?;
    let row = state.db.with_conn(|conn| require_user(conn, &user.id))?;
    let exp = row.exp.max(0) as u64;

    Ok(ok(LevelOverview {
        level: row.level,
        exp: row.exp,
        config: config_for_level(row.level),
        next_level_exp: next_level_threshold(row.level),
        progress_percent: experience_progress_percent(exp, row.level),
        unlocks: level_unlocks(row.level),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopOverview {
    pub items: Vec<ItemRow>,
    /// Empty for anonymous callers
    pub user_items: Vec<OwnedItem>,
}

/// GET /api/shop
pub async fn shop(State(state): State<AppState>, viewer: MaybeUser) -> Result<Response, ApiError> {
    state.require(Feature::Shop)?;
    let overview = state.db.with_conn(|conn| {
        let user_items = match viewer.id() {
            Some(id) => list_user_items(conn, id)?,
            None => vec![],
        };
        Ok(ShopOverview {
            items: list_items(conn)?,
            user_items,
        })
    })?;
    Ok(ok(overview))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub item_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// POST /api/shop
pub async fn purchase(
    State(state): State<AppState>,
    user: AuthUser,
    Body(req): Body<PurchaseRequest>,
) -> Result<Response, ApiError> {
    state.require(Feature::Shop)?;
    let outcome = state
        .db
        .with_conn_mut(|conn| purchase_item(conn, &user.id, &req.item_id, req.quantity))?;

    state.events.emit(BattleEvent::ItemPurchased {
        user_id: user.id,
        item_id: req.item_id,
        quantity: outcome.quantity,
        cost: outcome.cost,
    });
    Ok(ok_with_message(outcome, "Purchase complete"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VipOverview {
    #[serde(flatten)]
    pub status: VipStatus,
    pub plans: Vec<VipPlanInfo>,
}

/// GET /api/vip
pub async fn vip(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    state.require(Feature::Vip)?;
    let status = state.db.with_conn(|conn| vip_status(conn, &user.id, Utc::now()))?;
    Ok(ok(VipOverview {
        status,
        plans: VipPlan::ALL.iter().map(VipPlan::info).collect(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VipRequest {
    pub plan_type: VipPlan,
    #[serde(default)]
    pub auto_renew: bool,
}

/// POST /api/vip
pub async fn buy_vip(
    State(state): State<AppState>,
    user: AuthUser,
    Body(req): Body<VipRequest>,
) -> Result<Response, ApiError> {
    state.require(Feature::Vip)?;
    let membership = state
        .db
        .with_conn_mut(|conn| purchase_vip(conn, &user.id, req.plan_type, req.auto_renew))?;

    info!(user = %user.id, plan = %req.plan_type.as_str(), "VIP purchased");
    state.events.emit(BattleEvent::VipPurchased {
        user_id: user.id,
        plan: req.plan_type.as_str().to_string(),
    });
    Ok(ok_with_message(membership, format!("{} VIP activated", req.plan_type.name())))
}
