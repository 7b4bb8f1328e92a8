use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use std::sync::Arc;

use super::auth::BearerToken;
use crate::error::AppError;
use crate::models::{EnrichedGuild, GuildDetail};
use crate::state::AppState;

// Discord snowflakes are plain decimal ids
fn check_guild_id(guild_id: &str) -> Result<(), AppError> {
    if guild_id.is_empty() || !guild_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::BadRequest(format!("Invalid guild id: {}", guild_id)));
    }
    Ok(())
}

pub async fn list_guilds_handler(
    State(state): State<Arc<AppState>>,
    BearerToken(token): BearerToken,
) -> Result<Json<Vec<EnrichedGuild>>, AppError> {
    Ok(Json(state.guilds.admin_guilds(&token).await?))
}

// Bot-token lookup, only for signed-in dashboard users
pub async fn guild_detail_handler(
    State(state): State<Arc<AppState>>,
    _user: BearerToken,
    Path(guild_id): Path<String>,
) -> Result<Json<GuildDetail>, AppError> {
    check_guild_id(&guild_id)?;

    Ok(Json(state.guilds.guild_detail(&guild_id).await?))
}

pub async fn guild_roles_handler(
    State(state): State<Arc<AppState>>,
    Path(guild_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    check_guild_id(&guild_id)?;

    let roles = state.guilds.guild_roles(&guild_id).await?;
    Ok(Json(json!({ "roles": roles })))
}

pub async fn guild_channels_handler(
    State(state): State<Arc<AppState>>,
    Path(guild_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    check_guild_id(&guild_id)?;

    let channels = state.guilds.guild_channels(&guild_id).await?;
    Ok(Json(json!({ "channels": channels })))
}
