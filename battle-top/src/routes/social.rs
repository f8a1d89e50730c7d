//! Subscriptions, notifications and donations

use axum::{
    extract::{Path, State},
    response::Response,
};
use battle_core::Feature;
use serde::Deserialize;

use super::extract::{Body, Params};
use crate::auth::{AuthUser, MaybeUser};
use crate::db::social::{
    create_donation, list_donations, list_notifications, list_subscribers, list_subscriptions,
    mark_notification_read, subscription_status, toggle_subscription, DonationDirection,
};
use crate::error::ApiError;
use crate::events::BattleEvent;
use crate::response::{created, message, ok};
use crate::state::AppState;
use crate::validation;

/// POST /api/user/:id/subscribe
pub async fn subscribe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(target_id): Path<String>,
) -> Result<Response, ApiError> {
    state.require(Feature::Subscription)?;
    let toggle = state
        .db
        .with_conn_mut(|conn| toggle_subscription(conn, &user.id, &target_id))?;

    state.events.emit(BattleEvent::SubscriptionToggled {
        subscriber_id: user.id,
        target_id,
        subscribed: toggle.subscribed,
    });
    Ok(ok(toggle))
}

/// GET /api/user/:id/subscribe
pub async fn subscription(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(target_id): Path<String>,
) -> Result<Response, ApiError> {
    state.require(Feature::Subscription)?;
    let status = state
        .db
        .with_conn(|conn| subscription_status(conn, &target_id, viewer.id()))?;
    Ok(ok(status))
}

/// GET /api/user/subscribers
pub async fn subscribers(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    state.require(Feature::Subscription)?;
    let rows = state.db.with_conn(|conn| list_subscribers(conn, &user.id))?;
    Ok(ok(rows))
}

/// GET /api/user/subscriptions
pub async fn subscriptions(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    state.require(Feature::Subscription)?;
    let rows = state.db.with_conn(|conn| list_subscriptions(conn, &user.id))?;
    Ok(ok(rows))
}

/// GET /api/notifications
pub async fn notifications(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    let list = state.db.with_conn(|conn| list_notifications(conn, &user.id))?;
    Ok(ok(list))
}

/// POST /api/notifications/:id/read
pub async fn read_notification(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    state.db.with_conn(|conn| mark_notification_read(conn, &id, &user.id))?;
    Ok(message("Notification marked as read"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonateRequest {
    pub amount: f64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub ranking_id: Option<String>,
}

/// POST /api/user/:id/donate
///
/// Recorded as pending; settlement happens outside this service.
pub async fn donate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(target_id): Path<String>,
    Body(req): Body<DonateRequest>,
) -> Result<Response, ApiError> {
    state.require(Feature::Donation)?;
    validation::max_length("Message", req.message.as_deref(), 200)?;
    let message = validation::non_empty(req.message);
    let ranking_id = validation::non_empty(req.ranking_id);

    let donation = state.db.with_conn(|conn| {
        create_donation(
            conn,
            &user.id,
            &target_id,
            req.amount,
            message.as_deref(),
            ranking_id.as_deref(),
        )
    })?;
    Ok(created(donation))
}

#[derive(Debug, Default, Deserialize)]
pub struct DonationQuery {
    #[serde(default, rename = "type")]
    pub direction: DonationDirection,
}

/// GET /api/user/:id/donate
pub async fn donations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Params(query): Params<DonationQuery>,
) -> Result<Response, ApiError> {
    state.require(Feature::Donation)?;
    let list = state
        .db
        .with_conn(|conn| list_donations(conn, &user_id, query.direction))?;
    Ok(ok(list))
}
