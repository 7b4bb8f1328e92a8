//! Guild lookups built on the request queue and the guild cache.

use serde_json::Value;
use std::future::Future;

use crate::cache::{TtlCache, guild_cache_key};
use crate::discord::DiscordClient;
use crate::error::{DiscordResult, QueueError, RateLimitSignal};
use crate::metrics::{CACHE_HITS, CACHE_MISSES};
use crate::models::{EnrichedGuild, GuildDetail};
use crate::queue::RequestQueue;

/// Cache-fronted fetch.
///
/// A fresh cached value is returned without touching the queue. On a miss
/// `fetch` is submitted to the queue and its result cached on success.
/// Concurrent misses for the same key each submit their own fetch.
pub async fn fetch_with_cache<V, E, F, Fut>(
    cache: &TtlCache<V>,
    queue: &RequestQueue,
    key: &str,
    fetch: F,
) -> Result<V, QueueError<E>>
where
    V: Clone + Send + 'static,
    E: RateLimitSignal + Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
{
    if let Some(hit) = cache.get(key) {
        CACHE_HITS.inc();
        tracing::debug!(key, "cache hit");
        return Ok(hit);
    }
    CACHE_MISSES.inc();

    let value = queue.submit(fetch).await?;

    cache.set(key, value.clone());
    tracing::debug!(key, "cache set");

    Ok(value)
}

#[derive(Clone)]
pub struct GuildService {
    discord: DiscordClient,
    queue: RequestQueue,
    cache: TtlCache<Value>,
}

impl GuildService {
    pub fn new(discord: DiscordClient, queue: RequestQueue, cache: TtlCache<Value>) -> Self {
        Self {
            discord,
            queue,
            cache,
        }
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn cache(&self) -> &TtlCache<Value> {
        &self.cache
    }

    /// Full guild object as the bot sees it, cached for the configured TTL.
    pub async fn guild(&self, guild_id: &str) -> DiscordResult<Value> {
        let discord = self.discord.clone();
        let id = guild_id.to_string();

        fetch_with_cache(&self.cache, &self.queue, &guild_cache_key(guild_id), move || {
            let discord = discord.clone();
            let id = id.clone();
            async move { discord.guild(&id).await }
        })
        .await
    }

    /// Guild lookup where 401/404 just mean the bot isn't in the guild.
    pub async fn guild_detail(&self, guild_id: &str) -> DiscordResult<GuildDetail> {
        match self.guild(guild_id).await {
            Ok(guild) => Ok(GuildDetail {
                bot_present: true,
                guild: Some(guild),
            }),
            Err(QueueError::Operation(e)) if e.is_missing_access() => {
                tracing::debug!(guild_id, "bot has no access to guild");
                Ok(GuildDetail {
                    bot_present: false,
                    guild: None,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Guilds the user administers, each marked with whether the bot is in it.
    pub async fn admin_guilds(&self, access_token: &str) -> DiscordResult<Vec<EnrichedGuild>> {
        let discord = self.discord.clone();
        let token = access_token.to_string();
        let user_guilds = self
            .queue
            .submit(move || {
                let discord = discord.clone();
                let token = token.clone();
                async move { discord.current_user_guilds(&token).await }
            })
            .await?;

        let mut enriched = Vec::new();
        for guild in user_guilds.into_iter().filter(|g| g.is_admin()) {
            match self.guild(&guild.id).await {
                Ok(details) => enriched.push(EnrichedGuild {
                    guild,
                    bot_present: true,
                    details: Some(details),
                }),
                Err(QueueError::Operation(e)) if e.is_missing_access() => {
                    enriched.push(EnrichedGuild {
                        guild,
                        bot_present: false,
                        details: None,
                    })
                }
                Err(e) => return Err(e),
            }
        }

        tracing::debug!(count = enriched.len(), "resolved admin guilds");
        Ok(enriched)
    }

    pub async fn guild_roles(&self, guild_id: &str) -> DiscordResult<Vec<Value>> {
        let discord = self.discord.clone();
        let id = guild_id.to_string();
        self.queue
            .submit(move || {
                let discord = discord.clone();
                let id = id.clone();
                async move { discord.guild_roles(&id).await }
            })
            .await
    }

    pub async fn guild_channels(&self, guild_id: &str) -> DiscordResult<Vec<Value>> {
        let discord = self.discord.clone();
        let id = guild_id.to_string();
        self.queue
            .submit(move || {
                let discord = discord.clone();
                let id = id.clone();
                async move { discord.guild_channels(&id).await }
            })
            .await
    }

    pub async fn current_user(&self, access_token: &str) -> DiscordResult<Value> {
        let discord = self.discord.clone();
        let token = access_token.to_string();
        self.queue
            .submit(move || {
                let discord = discord.clone();
                let token = token.clone();
                async move { discord.current_user(&token).await }
            })
            .await
    }
}
