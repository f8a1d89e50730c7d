//! HTTP routes
//!
//! Every endpoint lives under `/api` and answers with the JSON envelope from
//! [`crate::response`]. Optional areas check their feature flag first.

pub mod auth;
pub mod comments;
pub mod debates;
pub mod discovery;
pub mod economy;
pub mod extract;
pub mod progress;
pub mod rankings;
pub mod social;
pub mod users;

use axum::{
    extract::{DefaultBodyLimit, State},
    response::Response,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::DbStats;
use crate::error::ApiError;
use crate::response::ok;
use crate::state::AppState;

/// Run CPU-heavy work (password hashing) off the async workers
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))?
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub database: DbStats,
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Result<Response, ApiError> {
    let database = state.db.stats()?;
    Ok(ok(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        database,
    }))
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let permissive_cors = state.config.server.permissive_cors;

    let router = Router::new()
        // Accounts
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/security-question", post(auth::security_question))
        .route("/api/auth/verify-answer", post(auth::verify_answer))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/init", post(discovery::init))
        // Rankings
        .route("/api/rankings", get(rankings::list).post(rankings::create))
        .route(
            "/api/rankings/:id",
            get(rankings::get).put(rankings::update).delete(rankings::remove),
        )
        .route("/api/rankings/:id/publish", post(rankings::publish))
        .route("/api/rankings/:id/reject", post(rankings::reject))
        .route("/api/rankings/:id/like", post(rankings::like))
        .route(
            "/api/rankings/:id/collaborators",
            get(rankings::collaborators)
                .post(rankings::invite)
                .put(rankings::update_collaborator),
        )
        // Comments
        .route(
            "/api/rankings/:id/comments",
            get(comments::list).post(comments::create),
        )
        .route("/api/comments/:id/like", post(comments::like))
        .route("/api/comments/:id/mvp", post(comments::mvp))
        // Users and social
        .route("/api/users/:id", get(users::profile))
        .route("/api/user/profile", get(users::own_profile).put(users::update))
        .route(
            "/api/user/avatar",
            post(users::avatar).layer(DefaultBodyLimit::max(users::AVATAR_BODY_LIMIT)),
        )
        .route("/api/user/verify", get(users::verification).post(users::verify))
        .route("/api/user/subscribers", get(social::subscribers))
        .route("/api/user/subscriptions", get(social::subscriptions))
        .route(
            "/api/user/:id/subscribe",
            get(social::subscription).post(social::subscribe),
        )
        .route("/api/user/:id/donate", get(social::donations).post(social::donate))
        .route("/api/notifications", get(social::notifications))
        .route("/api/notifications/:id/read", post(social::read_notification))
        // Economy
        .route("/api/wallet", get(economy::wallet).post(economy::recharge_wallet))
        .route("/api/wallet/transactions", get(economy::transactions))
        .route("/api/level", get(economy::level))
        .route("/api/shop", get(economy::shop).post(economy::purchase))
        .route("/api/vip", get(economy::vip).post(economy::buy_vip))
        // Debates
        .route("/api/debates", get(debates::list).post(debates::create))
        .route("/api/debates/:id", get(debates::get).post(debates::act))
        // Tasks and achievements
        .route(
            "/api/tasks/daily",
            get(progress::daily_tasks).post(progress::update_task),
        )
        .route(
            "/api/achievements",
            get(progress::achievements).post(progress::unlock),
        )
        // Discovery
        .route("/api/leaderboard", get(discovery::leaderboard))
        .route("/api/categories", get(discovery::categories))
        .route("/api/tags", get(discovery::tags))
        .route("/api/stats", get(discovery::stats))
        .route("/api/features", get(discovery::features))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if permissive_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
