//! Registration, login and password recovery

use axum::{extract::State, response::Response};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::blocking;
use super::extract::Body;
use crate::auth::{
    hash_password, hash_security_answer, verify_password, verify_security_answer, AuthUser, Role, TokenInput,
};
use crate::db::users::{create_user, find_by_email, require_user, set_password, NewUser, UserRow};
use crate::error::ApiError;
use crate::events::BattleEvent;
use crate::response::{created, message, ok};
use crate::state::AppState;
use crate::validation;

/// Recovery questions offered at sign-up, keyed by the value stored on the account
pub const SECURITY_QUESTIONS: [(&str, &str); 6] = [
    ("pet", "What was the name of your first pet?"),
    ("school", "What was the name of your first school?"),
    ("city", "In which city were you born?"),
    ("movie", "What is your favourite movie?"),
    ("book", "Which book influenced you the most?"),
    ("food", "What is your favourite food?"),
];

fn question_text(key: &str) -> &str {
    SECURITY_QUESTIONS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, text)| *text)
        .unwrap_or(key)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub security_question: String,
    pub security_answer: String,
}

#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// POST /api/auth/register
pub async fn register(State(state): State<AppState>, Body(req): Body<RegisterRequest>) -> Result<Response, ApiError> {
    let name = req.name.trim().to_string();
    validation::length("Name", &name, 1, 20)?;
    validation::email(req.email.trim())?;
    validation::password(&req.password)?;
    validation::length("Security question", req.security_question.trim(), 1, 100)?;
    validation::length("Security answer", req.security_answer.trim(), 1, 100)?;

    let (password_hash, answer_hash) = blocking(move || {
        Ok((hash_password(&req.password)?, hash_security_answer(&req.security_answer)?))
    })
    .await?;

    let user = state.db.with_conn(|conn| {
        create_user(
            conn,
            NewUser {
                name,
                email: req.email,
                password_hash,
                security_question: Some(req.security_question.trim().to_string()),
                security_answer_hash: Some(answer_hash),
                role: Role::User,
            },
        )
    })?;

    info!(user = %user.id, "User registered");
    state.events.emit(BattleEvent::UserRegistered {
        user_id: user.id.clone(),
    });

    Ok(created(RegisteredUser {
        id: user.id,
        name: user.name,
        email: user.email,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// Unix timestamp
    pub expires_at: u64,
    pub user: UserRow,
}

/// POST /api/auth/login
pub async fn login(State(state): State<AppState>, Body(req): Body<LoginRequest>) -> Result<Response, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".into());

    let user = state.db.with_conn(|conn| find_by_email(conn, &req.email))?.ok_or_else(invalid)?;

    let hash = user.password_hash.clone();
    let password = req.password;
    let valid = blocking(move || verify_password(&password, &hash)).await?;
    if !valid {
        warn!(user = %user.id, "Failed login");
        return Err(invalid());
    }

    let (token, expires_at) = state.jwt.generate_token(TokenInput {
        user_id: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role,
    })?;

    info!(user = %user.id, "User logged in");
    Ok(ok(LoginResponse {
        token,
        expires_at,
        user,
    }))
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    let row = state.db.with_conn(|conn| require_user(conn, &user.id))?;
    Ok(ok(row))
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityQuestion {
    pub question: String,
    pub question_text: String,
}

fn account_with_question(state: &AppState, email: &str) -> Result<(UserRow, String, String), ApiError> {
    let missing = || ApiError::NotFound("Account not found or no security question set".into());

    let user = state.db.with_conn(|conn| find_by_email(conn, email))?.ok_or_else(missing)?;
    let (Some(question), Some(hash)) = (user.security_question.clone(), user.security_answer_hash.clone()) else {
        return Err(missing());
    };
    Ok((user, question, hash))
}

/// POST /api/auth/security-question
pub async fn security_question(
    State(state): State<AppState>,
    Body(req): Body<EmailRequest>,
) -> Result<Response, ApiError> {
    validation::email(req.email.trim())?;
    let (_, question, _) = account_with_question(&state, &req.email)?;
    Ok(ok(SecurityQuestion {
        question_text: question_text(&question).to_string(),
        question,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub email: String,
    pub answer: String,
}

async fn check_answer(state: &AppState, email: &str, answer: String) -> Result<UserRow, ApiError> {
    if answer.trim().is_empty() {
        return Err(ApiError::bad_request("Answer is required"));
    }
    let (user, _, hash) = account_with_question(state, email)?;
    let valid = blocking(move || verify_security_answer(&answer, &hash)).await?;
    if !valid {
        warn!(user = %user.id, "Wrong security answer");
        return Err(ApiError::bad_request("Incorrect answer"));
    }
    Ok(user)
}

/// POST /api/auth/verify-answer
pub async fn verify_answer(State(state): State<AppState>, Body(req): Body<AnswerRequest>) -> Result<Response, ApiError> {
    check_answer(&state, &req.email, req.answer).await?;
    Ok(message("Answer verified"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub answer: String,
    pub new_password: String,
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Body(req): Body<ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    validation::password(&req.new_password)?;
    let user = check_answer(&state, &req.email, req.answer).await?;

    let new_password = req.new_password;
    let hash = blocking(move || hash_password(&new_password)).await?;
    state.db.with_conn(|conn| set_password(conn, &user.id, &hash))?;

    info!(user = %user.id, "Password reset");
    Ok(message("Password has been reset"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_text() {
        assert_eq!(question_text("pet"), "What was the name of your first pet?");
        // Custom questions are shown as written
        assert_eq!(question_text("Favourite colour?"), "Favourite colour?");
    }
}
