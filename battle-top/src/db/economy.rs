//! Wallets, the transaction log, recharges, the shop and VIP memberships
//!
//! Coins only leave a wallet through [`debit`], a single conditional update
//! that refuses to take the balance below zero. Callers run it inside the
//! same transaction as whatever the coins pay for.

use battle_core::economy::{
    coins_from_recharge, purchase_cost, remaining_days, validate_recharge_amount, VipPlan,
};
use battle_core::{config_for_level, experience_from_recharge, level_for_experience};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::fmt;

use super::new_id;
use crate::error::ApiError;

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Recharge,
    ItemPurchase,
    VipPurchase,
    DebateCreate,
    DebateWin,
    DailyTask,
    Achievement,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Recharge => "RECHARGE",
            TransactionKind::ItemPurchase => "ITEM_PURCHASE",
            TransactionKind::VipPurchase => "VIP_PURCHASE",
            TransactionKind::DebateCreate => "DEBATE_CREATE",
            TransactionKind::DebateWin => "DEBATE_WIN",
            TransactionKind::DailyTask => "DAILY_TASK",
            TransactionKind::Achievement => "ACHIEVEMENT",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRow {
    pub user_id: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRow {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Wallet for `user_id`, created empty on first access
pub fn ensure_wallet(conn: &Connection, user_id: &str) -> Result<WalletRow, ApiError> {
    let now = Utc::now();
    conn.execute(
        "INSERT OR IGNORE INTO wallets (user_id, balance, created_at, updated_at) VALUES (?1, 0, ?2, ?2)",
        params![user_id, now],
    )?;
    Ok(conn.query_row(
        "SELECT user_id, balance, created_at, updated_at FROM wallets WHERE user_id = ?",
        [user_id],
        |row| {
            Ok(WalletRow {
                user_id: row.get(0)?,
                balance: row.get(1)?,
                created_at: row.get(2)?,
                updated_at: row.get(3)?,
            })
        },
    )?)
}

pub fn credit(conn: &Connection, user_id: &str, amount: i64) -> Result<(), ApiError> {
    ensure_wallet(conn, user_id)?;
    conn.execute(
        "UPDATE wallets SET balance = balance + ?2, updated_at = ?3 WHERE user_id = ?1",
        params![user_id, amount, Utc::now()],
    )?;
    Ok(())
}

/// Take `amount` coins, or fail with 400 if the balance does not cover it
pub fn debit(conn: &Connection, user_id: &str, amount: i64) -> Result<(), ApiError> {
    ensure_wallet(conn, user_id)?;
    let changed = conn.execute(
        "UPDATE wallets SET balance = balance - ?2, updated_at = ?3 WHERE user_id = ?1 AND balance >= ?2",
        params![user_id, amount, Utc::now()],
    )?;
    if changed == 0 {
        return Err(ApiError::bad_request("Insufficient battle coins"));
    }
    Ok(())
}

pub fn log_transaction(
    conn: &Connection,
    user_id: &str,
    kind: TransactionKind,
    amount: i64,
    description: &str,
) -> Result<(), ApiError> {
    conn.execute(
        "INSERT INTO transactions (id, user_id, kind, amount, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![new_id(), user_id, kind.as_str(), amount, description, Utc::now()],
    )?;
    Ok(())
}

pub fn list_transactions(conn: &Connection, user_id: &str, limit: i64) -> Result<Vec<TransactionRow>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, amount, description, created_at FROM transactions
         WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
    )?;
    let rows = stmt
        .query_map(params![user_id, limit], |row| {
            Ok(TransactionRow {
                id: row.get(0)?,
                kind: row.get(1)?,
                amount: row.get(2)?,
                description: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// What a recharge changed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeOutcome {
    pub wallet: WalletRow,
    pub battle_coins: i64,
    pub exp_gained: u64,
    pub total_exp: u64,
    pub new_level: u32,
    pub level_up: bool,
    pub level_name: &'static str,
    pub chat_frame: &'static str,
    pub name_style: &'static str,
}

/// Convert `amount` currency units into coins and experience
///
/// The level is recomputed from the new experience total and never goes
/// down; the level's chat frame and name style are applied with it.
pub fn recharge(conn: &mut Connection, user_id: &str, amount: f64) -> Result<RechargeOutcome, ApiError> {
    let amount = validate_recharge_amount(amount)?;
    let coins = coins_from_recharge(amount);
    let exp_gained = experience_from_recharge(amount);

    let tx = conn.transaction()?;
    let (old_exp, old_level): (i64, u32) = tx
        .query_row("SELECT exp, level FROM users WHERE id = ?", [user_id], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .optional()?
        .ok_or_else(|| ApiError::not_found("User"))?;

    let stored_exp = i64::try_from(exp_gained)
        .ok()
        .and_then(|gained| old_exp.checked_add(gained))
        .filter(|exp| *exp >= 0)
        .ok_or_else(|| ApiError::bad_request("Experience would overflow"))?;
    let total_exp = stored_exp as u64;
    let new_level = level_for_experience(total_exp).max(old_level);
    let config = config_for_level(new_level);

    tx.execute(
        "UPDATE users SET exp = ?2, level = ?3, total_recharged = total_recharged + ?4,
                chat_frame = ?5, name_style = ?6, updated_at = ?7
         WHERE id = ?1",
        params![
            user_id,
            stored_exp,
            new_level,
            amount,
            config.chat_frame.as_str(),
            config.name_style.as_str(),
            Utc::now(),
        ],
    )?;
    credit(&tx, user_id, coins)?;
    log_transaction(
        &tx,
        user_id,
        TransactionKind::Recharge,
        coins,
        &format!("Recharged {:.2} for {} battle coins", amount, coins),
    )?;
    let wallet = ensure_wallet(&tx, user_id)?;
    tx.commit()?;

    Ok(RechargeOutcome {
        wallet,
        battle_coins: coins,
        exp_gained,
        total_exp,
        new_level,
        level_up: new_level > old_level,
        level_name: config.name,
        chat_frame: config.chat_frame.as_str(),
        name_style: config.name_style.as_str(),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub item_type: String,
    pub effect: String,
}

impl ItemRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            price: row.get("price")?,
            item_type: row.get("item_type")?,
            effect: row.get("effect")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedItem {
    pub item: ItemRow,
    pub quantity: i64,
}

pub fn list_items(conn: &Connection) -> Result<Vec<ItemRow>, ApiError> {
    let mut stmt = conn.prepare("SELECT * FROM items WHERE is_active = 1 ORDER BY price ASC")?;
    let rows = stmt
        .query_map([], |row| ItemRow::from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_user_items(conn: &Connection, user_id: &str) -> Result<Vec<OwnedItem>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT i.*, ui.quantity FROM user_items ui JOIN items i ON i.id = ui.item_id
         WHERE ui.user_id = ? AND ui.quantity > 0 ORDER BY i.price ASC",
    )?;
    let rows = stmt
        .query_map([user_id], |row| {
            Ok(OwnedItem {
                item: ItemRow::from_row(row)?,
                quantity: row.get("quantity")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOutcome {
    pub item: ItemRow,
    pub quantity: i64,
    pub cost: i64,
    pub owned: i64,
    pub balance: i64,
}

/// Buy `quantity` of an active item: debit, grant and log in one transaction
pub fn purchase_item(
    conn: &mut Connection,
    user_id: &str,
    item_id: &str,
    quantity: i64,
) -> Result<PurchaseOutcome, ApiError> {
    let tx = conn.transaction()?;
    let item = tx
        .query_row("SELECT * FROM items WHERE id = ? AND is_active = 1", [item_id], |row| {
            ItemRow::from_row(row)
        })
        .optional()?
        .ok_or_else(|| ApiError::not_found("Item"))?;

    let cost = purchase_cost(item.price, quantity)?;
    debit(&tx, user_id, cost)?;
    tx.execute(
        "INSERT INTO user_items (user_id, item_id, quantity) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, item_id) DO UPDATE SET quantity = quantity + excluded.quantity",
        params![user_id, item_id, quantity],
    )?;
    log_transaction(
        &tx,
        user_id,
        TransactionKind::ItemPurchase,
        -cost,
        &format!("Bought {} x {}", quantity, item.name),
    )?;

    let owned: i64 = tx.query_row(
        "SELECT quantity FROM user_items WHERE user_id = ? AND item_id = ?",
        params![user_id, item_id],
        |row| row.get(0),
    )?;
    let balance = ensure_wallet(&tx, user_id)?.balance;
    tx.commit()?;

    Ok(PurchaseOutcome {
        item,
        quantity,
        cost,
        owned,
        balance,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VipMembership {
    pub plan: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub auto_renew: bool,
    pub is_active: bool,
}

/// Membership plus its derived state at a point in time
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VipStatus {
    pub membership: Option<VipMembership>,
    pub is_active: bool,
    pub remaining_days: i64,
}

pub fn get_membership(conn: &Connection, user_id: &str) -> Result<Option<VipMembership>, ApiError> {
    Ok(conn
        .query_row(
            "SELECT plan, start_date, end_date, auto_renew, is_active FROM vip_memberships WHERE user_id = ?",
            [user_id],
            |row| {
                Ok(VipMembership {
                    plan: row.get(0)?,
                    start_date: row.get(1)?,
                    end_date: row.get(2)?,
                    auto_renew: row.get(3)?,
                    is_active: row.get(4)?,
                })
            },
        )
        .optional()?)
}

pub fn vip_status(conn: &Connection, user_id: &str, now: DateTime<Utc>) -> Result<VipStatus, ApiError> {
    let membership = get_membership(conn, user_id)?;
    let (is_active, remaining) = match membership {
        Some(ref m) if m.end_date > now => (m.is_active, remaining_days(m.end_date, now)),
        _ => (false, 0),
    };
    Ok(VipStatus {
        membership,
        is_active,
        remaining_days: remaining,
    })
}

/// Buy a VIP plan; an active membership is extended from its current end date
pub fn purchase_vip(
    conn: &mut Connection,
    user_id: &str,
    plan: VipPlan,
    auto_renew: bool,
) -> Result<VipMembership, ApiError> {
    let now = Utc::now();
    let tx = conn.transaction()?;

    let current_end = get_membership(&tx, user_id)?.map(|m| m.end_date);
    let (start, end) = plan.membership_window(now, current_end);

    debit(&tx, user_id, plan.coin_cost())?;
    tx.execute(
        "INSERT INTO vip_memberships (user_id, plan, start_date, end_date, auto_renew, is_active, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
         ON CONFLICT(user_id) DO UPDATE SET plan = excluded.plan, start_date = excluded.start_date,
            end_date = excluded.end_date, auto_renew = excluded.auto_renew, is_active = 1,
            updated_at = excluded.updated_at",
        params![user_id, plan.as_str(), start, end, auto_renew, now],
    )?;
    log_transaction(
        &tx,
        user_id,
        TransactionKind::VipPurchase,
        -plan.coin_cost(),
        &format!("{} VIP membership", plan.name()),
    )?;
    tx.commit()?;

    get_membership(conn, user_id)?.ok_or_else(|| ApiError::Internal("VIP membership missing after purchase".into()))
}
