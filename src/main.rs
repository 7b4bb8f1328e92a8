use clap::Parser;
use std::sync::Arc;

use diode_gateway::cache::{TtlCache, cache_sweeper};
use diode_gateway::config::Args;
use diode_gateway::discord::{DiscordClient, http_client};
use diode_gateway::guilds::GuildService;
use diode_gateway::handlers;
use diode_gateway::keepalive::keepalive_pinger;
use diode_gateway::logging;
use diode_gateway::queue::RequestQueue;
use diode_gateway::state::{AppState, InviteConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional, real environment wins
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    logging::init("info")?;

    let http = http_client(args.discord_timeout())?;

    let discord = DiscordClient::new(http.clone(), args.discord_api_url.clone(), args.bot_token.clone());
    let queue = RequestQueue::new(args.queue_config());
    let guild_cache = TtlCache::new(args.cache_ttl());

    tokio::spawn(cache_sweeper(guild_cache.clone(), args.cache_sweep_interval()));

    if let Some(url) = args.keepalive_url.clone() {
        tokio::spawn(keepalive_pinger(http.clone(), url, args.keepalive_interval()));
    }

    let state = Arc::new(AppState {
        guilds: GuildService::new(discord, queue, guild_cache),
        invite: InviteConfig {
            client_id: args.client_id.clone(),
            callback_url: args.callback_url.clone(),
        },
    });

    let app = handlers::router(state, &args.allowed_origins);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, "diode gateway listening");
    tracing::info!(api = %args.discord_api_url, "forwarding to Discord");
    tracing::info!(ttl_secs = args.cache_ttl, "guild cache enabled");
    match args.max_rate_limit_retries {
        Some(max) => tracing::info!(max, "rate-limited calls give up after retries"),
        None => tracing::info!("rate-limited calls retry until they succeed"),
    }

    axum::serve(listener, app).await?;
    Ok(())
}
