use axum::{Json, extract::State};
use serde_json::Value;
use std::sync::Arc;

use super::auth::BearerToken;
use crate::error::AppError;
use crate::state::AppState;

pub async fn current_user_handler(
    State(state): State<Arc<AppState>>,
    BearerToken(token): BearerToken,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.guilds.current_user(&token).await?))
}
