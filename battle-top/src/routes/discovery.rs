//! Catalog browsing, leaderboards, site stats and bootstrap

use axum::{extract::State, response::Response};
use battle_core::{Feature, FeatureFlags};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::blocking;
use super::extract::{Body, Params};
use crate::auth::{hash_password, Role};
use crate::db::catalog::{ensure_category, leaderboard as load_leaderboard, list_categories, list_tags, CategoryKind, LeaderboardKind};
use crate::db::rankings::count_published;
use crate::db::users::{count_authoritative, count_users, create_user, find_by_email, grant_authority, NewUser};
use crate::error::ApiError;
use crate::events::BattleEvent;
use crate::response::ok;
use crate::state::AppState;
use crate::validation;

/// GET /api/categories
pub async fn categories(State(state): State<AppState>) -> Result<Response, ApiError> {
    let rows = state.db.with_conn(list_categories)?;
    Ok(ok(rows))
}

/// GET /api/tags
pub async fn tags(State(state): State<AppState>) -> Result<Response, ApiError> {
    let rows = state.db.with_conn(list_tags)?;
    Ok(ok(rows))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStats {
    pub ranking_count: i64,
    pub user_count: i64,
    pub authoritative_count: i64,
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> Result<Response, ApiError> {
    let stats = state.db.with_conn(|conn| {
        Ok(SiteStats {
            ranking_count: count_published(conn)?,
            user_count: count_users(conn)?,
            authoritative_count: count_authoritative(conn)?,
        })
    })?;
    Ok(ok(stats))
}

#[derive(Debug, Serialize)]
pub struct FeatureList {
    pub enabled: Vec<Feature>,
    pub disabled: Vec<Feature>,
}

impl From<&FeatureFlags> for FeatureList {
    fn from(flags: &FeatureFlags) -> Self {
        Self {
            enabled: flags.enabled(),
            disabled: flags.disabled(),
        }
    }
}

/// GET /api/features
pub async fn features(State(state): State<AppState>) -> Response {
    ok(FeatureList::from(&state.config.features))
}

pub const DEFAULT_LEADERBOARD_SIZE: i64 = 20;
const MAX_LEADERBOARD_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default, rename = "type")]
    pub kind: LeaderboardKind,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// GET /api/leaderboard
pub async fn leaderboard(
    State(state): State<AppState>,
    Params(query): Params<LeaderboardQuery>,
) -> Result<Response, ApiError> {
    state.require(Feature::Leaderboard)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
        .clamp(1, MAX_LEADERBOARD_SIZE);
    let board = state.db.with_conn(|conn| load_leaderboard(conn, query.kind, limit))?;
    Ok(ok(board))
}

/// Categories created by bootstrap
pub const DEFAULT_CATEGORIES: [(&str, &str, &str, CategoryKind); 3] = [
    ("AI Models", "ai-models", "Rank large language models and other AI systems", CategoryKind::AiModel),
    (
        "Anime Characters",
        "anime-characters",
        "Who is the strongest, smartest or most loved character?",
        CategoryKind::AnimeCharacter,
    ),
    (
        "Educational Institutions",
        "educational-institutions",
        "Universities, schools and online courses",
        CategoryKind::EducationalInstitution,
    ),
];

pub const ADMIN_EMAIL: &str = "admin@battletop.com";
const ADMIN_NAME: &str = "admin";
const ADMIN_CREDIBILITY: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct InitQuery {
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    #[serde(default)]
    pub admin_password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitReport {
    pub categories_created: usize,
    pub admin_created: bool,
    pub admin_email: &'static str,
    /// Only present when the password was generated here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
}

/// POST /api/init
///
/// Idempotent: existing categories and an existing admin are left alone.
pub async fn init(
    State(state): State<AppState>,
    Params(query): Params<InitQuery>,
    body: Option<Body<InitRequest>>,
) -> Result<Response, ApiError> {
    let expected = state
        .config
        .auth
        .init_key
        .as_deref()
        .ok_or_else(|| ApiError::Forbidden("Bootstrap is disabled".into()))?;
    if query.key.as_deref() != Some(expected) {
        warn!("Bootstrap attempted with a bad key");
        return Err(ApiError::Forbidden("Invalid init key".into()));
    }

    let requested = body.and_then(|Body(req)| validation::non_empty(req.admin_password));
    if let Some(ref password) = requested {
        validation::password(password)?;
    }

    let categories_created = state.db.with_conn(|conn| {
        let mut created = 0;
        for (name, slug, description, kind) in DEFAULT_CATEGORIES {
            if ensure_category(conn, name, slug, description, kind)? {
                created += 1;
            }
        }
        Ok(created)
    })?;

    let existing = state.db.with_conn(|conn| find_by_email(conn, ADMIN_EMAIL))?;
    if existing.is_some() {
        info!(categories = categories_created, "Bootstrap ran; admin already exists");
        return Ok(ok(InitReport {
            categories_created,
            admin_created: false,
            admin_email: ADMIN_EMAIL,
            admin_password: None,
        }));
    }

    let generated = requested.is_none();
    let password = requested.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    let hash = {
        let password = password.clone();
        blocking(move || hash_password(&password)).await?
    };

    let admin = state.db.with_conn(|conn| {
        let admin = create_user(
            conn,
            NewUser {
                name: ADMIN_NAME.to_string(),
                email: ADMIN_EMAIL.to_string(),
                password_hash: hash,
                security_question: None,
                security_answer_hash: None,
                role: Role::Admin,
            },
        )?;
        grant_authority(conn, &admin.id, ADMIN_CREDIBILITY)?;
        Ok(admin)
    })?;

    info!(user = %admin.id, categories = categories_created, "Bootstrap created admin account");
    state.events.emit(BattleEvent::UserRegistered { user_id: admin.id });

    Ok(ok(InitReport {
        categories_created,
        admin_created: true,
        admin_email: ADMIN_EMAIL,
        admin_password: generated.then_some(password),
    }))
}
