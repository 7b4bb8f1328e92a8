mod auth;
mod guilds;
mod health;
mod invite;
mod metrics;
mod users;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::get,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::state::AppState;

pub use auth::BearerToken;
pub use guilds::{guild_channels_handler, guild_detail_handler, guild_roles_handler, list_guilds_handler};
pub use health::health_handler;
pub use invite::{guild_invite_handler, invite_handler, invite_url};
pub use metrics::{metrics_handler, track_requests};
pub use users::current_user_handler;

// CORS for the dashboard frontend, credentials allowed so the session cookie travels
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.trim().parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/guilds", get(list_guilds_handler))
        .route("/api/guilds/{guild_id}", get(guild_detail_handler))
        .route("/api/guilds/{guild_id}/roles", get(guild_roles_handler))
        .route("/api/guilds/{guild_id}/channels", get(guild_channels_handler))
        .route("/api/users/@me", get(current_user_handler))
        .route("/discord/invite", get(invite_handler))
        .route("/discord/invite/{guild_id}", get(guild_invite_handler))
        .route_layer(middleware::from_fn(track_requests))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}
