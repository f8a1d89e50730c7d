//! Public profiles, profile editing, avatars and real-name verification

use axum::{
    extract::{Path, State},
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use battle_core::Feature;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::extract::Body;
use crate::auth::AuthUser;
use crate::db::rankings::{count_likes_given, list_rankings_with_items, RankingQuery, RankingView};
use crate::db::social::subscriber_count;
use crate::db::users::{require_user, set_avatar, set_verification, update_profile, ProfileUpdate, UserRow};
use crate::error::ApiError;
use crate::response::{ok, ok_with_message};
use crate::state::AppState;
use crate::validation;

/// Largest avatar accepted as an inline upload
pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

/// Request body limit for avatar uploads: a full-size image in base64 plus
/// room for the rest of the JSON
pub const AVATAR_BODY_LIMIT: usize = (MAX_AVATAR_BYTES + 2) / 3 * 4 + 64 * 1024;

const PROFILE_RANKINGS: i64 = 10;
const PROFILE_RANKING_ITEMS: i64 = 3;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCounts {
    pub rankings: i64,
    pub likes: i64,
    pub subscribers: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    #[serde(flatten)]
    pub user: UserRow,
    pub id_card_verified: bool,
    pub rankings: Vec<RankingView>,
    #[serde(rename = "_count")]
    pub counts: ProfileCounts,
}

/// GET /api/users/:id
pub async fn profile(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let profile = state.db.with_conn(|conn| {
        let user = require_user(conn, &id)?;
        let query = RankingQuery {
            author_id: Some(id.clone()),
            limit: Some(PROFILE_RANKINGS),
            ..Default::default()
        };
        let rankings = list_rankings_with_items(conn, &query, Some(PROFILE_RANKING_ITEMS))?;
        let counts = ProfileCounts {
            rankings: rankings.total,
            likes: count_likes_given(conn, &id)?,
            subscribers: subscriber_count(conn, &id)?,
        };
        Ok(PublicProfile {
            id_card_verified: user.is_verified(),
            user,
            rankings: rankings.items,
            counts,
        })
    })?;
    Ok(ok(profile))
}

/// GET /api/user/profile
pub async fn own_profile(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    let row = state.db.with_conn(|conn| require_user(conn, &user.id))?;
    Ok(ok(row))
}

/// PUT /api/user/profile
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Body(mut update): Body<ProfileUpdate>,
) -> Result<Response, ApiError> {
    update.name = update.name.map(|n| n.trim().to_string());
    if let Some(ref name) = update.name {
        validation::length("Name", name, 1, 50)?;
    }
    validation::max_length("Bio", update.bio.as_deref(), 200)?;
    validation::url_or_empty("Image", update.image.as_deref())?;
    validation::max_length("Title", update.title.as_deref(), 30)?;
    validation::url_or_empty("Website", update.website.as_deref())?;
    validation::max_length("Weibo", update.weibo.as_deref(), 50)?;
    validation::max_length("Twitter", update.twitter.as_deref(), 50)?;
    validation::max_length("GitHub", update.github.as_deref(), 50)?;

    let row = state.db.with_conn(|conn| update_profile(conn, &user.id, &update))?;
    Ok(ok_with_message(row, "Profile updated"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarRequest {
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub image_source: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarResponse {
    pub id: String,
    pub image: Option<String>,
    pub image_source: Option<String>,
}

/// Turn an inline upload into a `data:` URL after checking it decodes
pub fn avatar_data_url(encoded: &str, mime_type: &str) -> Result<String, ApiError> {
    if !mime_type.starts_with("image/") {
        return Err(ApiError::bad_request("Avatar must be an image"));
    }
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|_| ApiError::bad_request("Avatar is not valid base64"))?;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("Avatar is empty"));
    }
    if bytes.len() > MAX_AVATAR_BYTES {
        return Err(ApiError::bad_request("Avatar must be at most 2 MB"));
    }
    Ok(format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes)))
}

/// POST /api/user/avatar
pub async fn avatar(
    State(state): State<AppState>,
    user: AuthUser,
    Body(req): Body<AvatarRequest>,
) -> Result<Response, ApiError> {
    let image = match (validation::non_empty(req.avatar_url), req.image_base64) {
        (Some(url), _) => {
            if !validation::is_url(&url) {
                return Err(ApiError::bad_request("Avatar URL must be a valid URL"));
            }
            url
        }
        (None, Some(encoded)) => {
            let mime = req.mime_type.unwrap_or_else(|| "image/png".to_string());
            avatar_data_url(&encoded, &mime)?
        }
        (None, None) => return Err(ApiError::bad_request("Provide an avatar URL or image")),
    };
    let source = validation::non_empty(req.image_source).unwrap_or_else(|| "custom".to_string());
    validation::length("Image source", &source, 1, 30)?;

    let row = state.db.with_conn(|conn| set_avatar(conn, &user.id, &image, &source))?;
    Ok(ok(AvatarResponse {
        id: row.id,
        image: row.image,
        image_source: row.image_source,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatus {
    pub verified: bool,
    /// Masked for display
    pub real_name: Option<String>,
    pub id_card: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
}

fn mask(value: &str, keep_start: usize, keep_end: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= keep_start + keep_end {
        return "*".repeat(chars.len());
    }
    let hidden = chars.len() - keep_start - keep_end;
    let mut out: String = chars[..keep_start].iter().collect();
    out.push_str(&"*".repeat(hidden));
    out.extend(&chars[chars.len() - keep_end..]);
    out
}

impl From<&UserRow> for VerificationStatus {
    fn from(user: &UserRow) -> Self {
        Self {
            verified: user.is_verified(),
            real_name: user.real_name.as_deref().map(|n| mask(n, 1, 0)),
            id_card: user.id_card.as_deref().map(|c| mask(c, 3, 4)),
            verified_at: user.verified_at,
        }
    }
}

/// GET /api/user/verify
pub async fn verification(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    state.require(Feature::Verification)?;
    let row = state.db.with_conn(|conn| require_user(conn, &user.id))?;
    Ok(ok(VerificationStatus::from(&row)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub real_name: String,
    pub id_card: String,
}

/// POST /api/user/verify
pub async fn verify(
    State(state): State<AppState>,
    user: AuthUser,
    Body(req): Body<VerifyRequest>,
) -> Result<Response, ApiError> {
    state.require(Feature::Verification)?;
    let real_name = req.real_name.trim();
    validation::length("Real name", real_name, 2, 20)?;
    let id_card = req.id_card.trim();
    if !validation::is_id_card(id_card) {
        return Err(ApiError::bad_request("Invalid ID number"));
    }

    let row = state.db.with_conn(|conn| set_verification(conn, &user.id, real_name, id_card))?;
    info!(user = %user.id, "Real-name verification recorded");
    Ok(ok_with_message(VerificationStatus::from(&row), "Verification complete"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_data_url() {
        let url = avatar_data_url(&STANDARD.encode(b"png-bytes"), "image/png").unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(avatar_data_url("!!!", "image/png").is_err());
        assert!(avatar_data_url(&STANDARD.encode(b"x"), "text/html").is_err());
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("110101199003071234", 3, 4), "110***********1234");
        assert_eq!(mask("Li", 1, 0), "L*");
        assert_eq!(mask("ab", 3, 4), "**");
    }
}
