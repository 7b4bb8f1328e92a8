//! Thin Discord REST client.
//!
//! Each method performs exactly one HTTP call and maps the response status to
//! a `DiscordError`. Nothing here queues or retries; callers put these calls
//! on the `RequestQueue`.

use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::error::DiscordError;
use crate::models::{PartialGuild, RateLimitBody};

pub const DEFAULT_API_URL: &str = "https://discord.com/api/v10";

// Used when a 429 carries neither a body nor a Retry-After header
const FALLBACK_RETRY_AFTER_SECS: f64 = 1.0;

// Calls run one at a time, so a hung connection would stall every caller
pub fn http_client(request_timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(request_timeout).build()
}

// Which credential a call is made with
pub enum Credential<'a> {
    Bot,
    User(&'a str),
}

#[derive(Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    api_url: String,
    bot_token: String,
}

impl DiscordClient {
    pub fn new(http: reqwest::Client, api_url: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
        }
    }

    pub async fn guild(&self, guild_id: &str) -> Result<Value, DiscordError> {
        self.get_json(&format!("/guilds/{}", guild_id), Credential::Bot).await
    }

    pub async fn guild_roles(&self, guild_id: &str) -> Result<Vec<Value>, DiscordError> {
        self.get_json(&format!("/guilds/{}/roles", guild_id), Credential::Bot)
            .await
    }

    pub async fn guild_channels(&self, guild_id: &str) -> Result<Vec<Value>, DiscordError> {
        self.get_json(&format!("/guilds/{}/channels", guild_id), Credential::Bot)
            .await
    }

    pub async fn current_user(&self, access_token: &str) -> Result<Value, DiscordError> {
        self.get_json("/users/@me", Credential::User(access_token)).await
    }

    pub async fn current_user_guilds(&self, access_token: &str) -> Result<Vec<PartialGuild>, DiscordError> {
        self.get_json("/users/@me/guilds", Credential::User(access_token))
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        credential: Credential<'_>,
    ) -> Result<T, DiscordError> {
        let auth = match credential {
            Credential::Bot => format!("Bot {}", self.bot_token),
            Credential::User(token) => format!("Bearer {}", token),
        };

        let res = self
            .http
            .get(format!("{}{}", self.api_url, path))
            .header(AUTHORIZATION, auth)
            .send()
            .await?;

        read_response(res).await
    }
}

async fn read_response<T: DeserializeOwned>(res: Response) -> Result<T, DiscordError> {
    let status = res.status();

    if status.is_success() {
        let body = res.bytes().await?;
        return Ok(serde_json::from_slice(&body)?);
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let header_wait = res
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok());
            let body = res.bytes().await.unwrap_or_default();

            // Body value is more precise than the header, prefer it
            let (retry_after, global) = match serde_json::from_slice::<RateLimitBody>(&body) {
                Ok(limit) => (limit.retry_after, limit.global),
                Err(_) => (header_wait.unwrap_or(FALLBACK_RETRY_AFTER_SECS), false),
            };
            Err(DiscordError::RateLimited { retry_after, global })
        }
        StatusCode::UNAUTHORIZED => Err(DiscordError::Unauthorized),
        StatusCode::NOT_FOUND => Err(DiscordError::NotFound),
        _ => {
            let body = res.text().await.unwrap_or_default();
            Err(DiscordError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
