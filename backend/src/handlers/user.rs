use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        session::{AccountInfo, TokenPair},
        user::{LoginRequest, RegisterRequest, RegisterResponse},
    },
    services::user::{LoginInput, RegisterInput},
    state::AppState,
};

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    payload.validate()?;

    state
        .users
        .register(RegisterInput {
            user_name: payload.user_name,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "registered".to_string(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    payload.validate()?;

    let user = state
        .users
        .login(LoginInput {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    let token_pair = state.auth.create_session(user.id).await?;

    tracing::info!(account_id = %user.id, "User logged in");
    Ok(Json(token_pair))
}

pub async fn me(Extension(account): Extension<AccountInfo>) -> Json<AccountInfo> {
    Json(account)
}
