use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use diode_gateway::cache::TtlCache;
use diode_gateway::discord::{DiscordClient, http_client};
use diode_gateway::error::{DiscordError, QueueError};
use diode_gateway::guilds::GuildService;
use diode_gateway::handlers;
use diode_gateway::metrics::REQUEST_LATENCY;
use diode_gateway::queue::{QueueConfig, RequestQueue};
use diode_gateway::state::{AppState, InviteConfig};

const USER_TOKEN: &str = "user-token";

// Stand-in for the Discord REST API
#[derive(Default)]
struct FakeDiscord {
    guild_one_hits: AtomicUsize,
    guild_one_limited: AtomicBool,
}

async fn fake_guild(State(fake): State<Arc<FakeDiscord>>, Path(id): Path<String>) -> Response {
    match id.as_str() {
        "1" => {
            fake.guild_one_hits.fetch_add(1, Ordering::SeqCst);
            if !fake.guild_one_limited.swap(true, Ordering::SeqCst) {
                let body = json!({"message": "You are being rate limited.", "retry_after": 0.05, "global": true});
                return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            }
            Json(json!({"id": "1", "name": "One", "roles": []})).into_response()
        }
        "2" => (StatusCode::NOT_FOUND, Json(json!({"message": "Unknown Guild", "code": 10004}))).into_response(),
        "3" => StatusCode::UNAUTHORIZED.into_response(),
        "7" => (StatusCode::TOO_MANY_REQUESTS, [(header::RETRY_AFTER, "2")], "slow down").into_response(),
        "8" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({"id": "8", "name": "Hung"})).into_response()
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
    }
}

async fn fake_roles(Path(id): Path<String>) -> Json<Value> {
    Json(json!([{"id": format!("{id}-everyone"), "name": "@everyone"}]))
}

async fn fake_channels(Path(id): Path<String>) -> Json<Value> {
    Json(json!([{"id": format!("{id}-general"), "name": "general", "type": 0}]))
}

fn user_authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {USER_TOKEN}"))
}

async fn fake_me(headers: HeaderMap) -> Response {
    if !user_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({"id": "u1", "username": "admin"})).into_response()
}

async fn fake_my_guilds(headers: HeaderMap) -> Response {
    if !user_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!([
        {"id": "1", "name": "One", "icon": null, "owner": true, "permissions": "8"},
        {"id": "2", "name": "Two", "icon": null, "owner": false, "permissions": "2147483647"},
        {"id": "4", "name": "Four", "icon": null, "owner": false, "permissions": "0"}
    ]))
    .into_response()
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn fake_discord() -> (String, Arc<FakeDiscord>) {
    let fake = Arc::new(FakeDiscord::default());
    let app = Router::new()
        .route("/guilds/{id}", get(fake_guild))
        .route("/guilds/{id}/roles", get(fake_roles))
        .route("/guilds/{id}/channels", get(fake_channels))
        .route("/users/@me", get(fake_me))
        .route("/users/@me/guilds", get(fake_my_guilds))
        .with_state(Arc::clone(&fake));
    (serve(app).await, fake)
}

fn guild_service(api_url: &str) -> GuildService {
    let discord = DiscordClient::new(reqwest::Client::new(), api_url, "bot-token");
    GuildService::new(
        discord,
        RequestQueue::new(QueueConfig::default()),
        TtlCache::new(Duration::from_secs(300)),
    )
}

#[tokio::test]
async fn client_maps_discord_statuses() {
    let (url, _fake) = fake_discord().await;
    let client = DiscordClient::new(reqwest::Client::new(), url, "bot-token");

    assert!(matches!(client.guild("2").await, Err(DiscordError::NotFound)));
    assert!(matches!(client.guild("3").await, Err(DiscordError::Unauthorized)));
    assert!(matches!(
        client.guild("5").await,
        Err(DiscordError::Status { status: 500, .. })
    ));

    // No JSON body, so the header value is used
    match client.guild("7").await {
        Err(DiscordError::RateLimited { retry_after, global }) => {
            assert_eq!(retry_after, 2.0);
            assert!(!global);
        }
        other => panic!("expected a rate limit, got {other:?}"),
    }

    let roles = client.guild_roles("9").await.unwrap();
    assert_eq!(roles[0]["id"], "9-everyone");
}

#[tokio::test]
async fn hung_discord_call_times_out_and_frees_the_queue() {
    let (url, _fake) = fake_discord().await;
    let client = DiscordClient::new(http_client(Duration::from_millis(100)).unwrap(), url, "bot-token");
    let guilds = GuildService::new(
        client,
        RequestQueue::new(QueueConfig::default()),
        TtlCache::new(Duration::from_secs(300)),
    );

    let start = Instant::now();
    let err = guilds.guild("8").await.unwrap_err();
    assert!(matches!(err, QueueError::Operation(DiscordError::Request(_))));
    assert!(start.elapsed() < Duration::from_secs(2));

    // Next call in line still goes through
    let roles = guilds.guild_roles("9").await.unwrap();
    assert_eq!(roles[0]["name"], "@everyone");
}

#[tokio::test]
async fn guild_lookup_rides_out_429_then_caches() {
    let (url, fake) = fake_discord().await;
    let guilds = guild_service(&url);

    let start = Instant::now();
    let guild = guilds.guild("1").await.unwrap();
    assert_eq!(guild["name"], "One");
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(fake.guild_one_hits.load(Ordering::SeqCst), 2);

    let again = guilds.guild("1").await.unwrap();
    assert_eq!(again, guild);
    assert_eq!(fake.guild_one_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_guild_is_reported_as_bot_absent() {
    let (url, _fake) = fake_discord().await;
    let guilds = guild_service(&url);

    let detail = guilds.guild_detail("2").await.unwrap();
    assert!(!detail.bot_present);
    assert!(detail.guild.is_none());
    assert!(guilds.cache().is_empty());

    let err = guilds.guild_detail("5").await.unwrap_err();
    assert!(matches!(
        err,
        QueueError::Operation(DiscordError::Status { status: 500, .. })
    ));
}

#[tokio::test]
async fn admin_guilds_are_filtered_and_enriched() {
    let (url, _fake) = fake_discord().await;
    let guilds = guild_service(&url);

    let listed = guilds.admin_guilds(USER_TOKEN).await.unwrap();
    let summary: Vec<(&str, bool)> = listed
        .iter()
        .map(|g| (g.guild.id.as_str(), g.bot_present))
        .collect();

    assert_eq!(summary, vec![("1", true), ("2", false)]);
    assert_eq!(listed[0].details.as_ref().unwrap()["name"], "One");

    let err = guilds.admin_guilds("wrong").await.unwrap_err();
    assert!(matches!(err, QueueError::Operation(DiscordError::Unauthorized)));
}

#[tokio::test]
async fn http_api_serves_the_dashboard() {
    let (discord_url, _fake) = fake_discord().await;
    let state = Arc::new(AppState {
        guilds: guild_service(&discord_url),
        invite: InviteConfig {
            client_id: "1234".into(),
            callback_url: "http://localhost:3000/auth/discord/callback".into(),
        },
    });
    let base = serve(handlers::router(state, &["http://localhost:3001".to_string()])).await;

    let http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let observed = REQUEST_LATENCY.get_sample_count();
    let res = http.get(format!("{base}/api/guilds")).send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);
    // Rejected requests are timed too
    assert!(REQUEST_LATENCY.get_sample_count() > observed);

    let res = http.get(format!("{base}/api/guilds/2")).send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);

    let listed: Value = http
        .get(format!("{base}/api/guilds"))
        .bearer_auth(USER_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed[0]["botPresent"], true);
    assert_eq!(listed[1]["botPresent"], false);
    assert_eq!(listed[1]["name"], "Two");

    let absent: Value = http
        .get(format!("{base}/api/guilds/2"))
        .bearer_auth(USER_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(absent, json!({"botPresent": false}));

    let channels: Value = http
        .get(format!("{base}/api/guilds/1/channels"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(channels["channels"][0]["name"], "general");

    let me: Value = http
        .get(format!("{base}/api/users/@me"))
        .bearer_auth(USER_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["id"], "u1");

    let res = http
        .get(format!("{base}/api/guilds/5"))
        .bearer_auth(USER_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    let res = http
        .get(format!("{base}/api/guilds/not-a-guild"))
        .bearer_auth(USER_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    let res = http.get(format!("{base}/discord/invite/42")).send().await.unwrap();
    assert!(res.status().is_redirection());
    let location = res.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://discord.com/oauth2/authorize?client_id=1234&guild_id=42"));

    let health: Value = http
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["queue"]["pending"], 0);
}
