use axum::{
    extract::{Path, State},
    response::Redirect,
};
use reqwest::Url;
use std::sync::Arc;

use crate::error::AppError;
use crate::state::{AppState, InviteConfig};

const AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";

// Administrator, the dashboard manages everything through the bot
const BOT_PERMISSIONS: &str = "8";

pub fn invite_url(config: &InviteConfig, guild_id: Option<&str>) -> Result<Url, AppError> {
    let mut params = vec![("client_id", config.client_id.as_str())];
    if let Some(id) = guild_id {
        params.push(("guild_id", id));
    }
    params.push(("permissions", BOT_PERMISSIONS));
    params.push(("scope", "bot"));
    params.push(("redirect_uri", config.callback_url.as_str()));

    Url::parse_with_params(AUTHORIZE_URL, &params)
        .map_err(|e| AppError::BadRequest(format!("Could not build invite url: {}", e)))
}

pub async fn invite_handler(State(state): State<Arc<AppState>>) -> Result<Redirect, AppError> {
    let url = invite_url(&state.invite, None)?;
    Ok(Redirect::to(url.as_str()))
}

pub async fn guild_invite_handler(
    State(state): State<Arc<AppState>>,
    Path(guild_id): Path<String>,
) -> Result<Redirect, AppError> {
    let url = invite_url(&state.invite, Some(&guild_id))?;
    Ok(Redirect::to(url.as_str()))
}
