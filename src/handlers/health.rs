use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::state::AppState;

// health handler, includes a snapshot of the Discord queue
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let queue = state.guilds.queue();
    let cooldown_ms = queue.cooldown_remaining().map(|d| d.as_millis() as u64);

    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "queue": {
            "pending": queue.pending(),
            "draining": queue.is_draining(),
            "cooldown_ms": cooldown_ms,
        },
        "guild_cache_entries": state.guilds.cache().len(),
    }))
}
