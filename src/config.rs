use clap::Parser;
use std::time::Duration;

use crate::discord::DEFAULT_API_URL;
use crate::queue::QueueConfig;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "diode-gateway")]
#[command(about = "Dashboard API for the Diode Discord bot")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    // Discord REST base url
    #[arg(long, env = "DISCORD_API_URL", default_value = DEFAULT_API_URL)]
    pub discord_api_url: String,

    // Per-request timeout for Discord calls, in seconds
    #[arg(long, env = "DISCORD_TIMEOUT", default_value_t = 15)]
    pub discord_timeout: u64,

    // Bot token used for guild lookups
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,

    // OAuth application id, used for bot invite links
    #[arg(long, env = "CLIENT_ID")]
    pub client_id: String,

    // Redirect after the bot is added
    #[arg(long, env = "CALLBACK_URL", default_value = "http://localhost:3000/auth/discord/callback")]
    pub callback_url: String,

    // Guild cache TTL in seconds
    #[arg(short, long, env = "GUILD_CACHE_TTL", default_value_t = 300)]
    pub cache_ttl: u64,

    // How often expired guild cache entries are swept, in seconds
    #[arg(long, env = "GUILD_CACHE_SWEEP", default_value_t = 60)]
    pub cache_sweep_interval: u64,

    // Give up on a call after this many rate-limited retries (unbounded when unset)
    #[arg(long, env = "MAX_RATE_LIMIT_RETRIES")]
    pub max_rate_limit_retries: Option<u32>,

    // Dashboard origins allowed by CORS (comma-separated)
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',', default_value = "http://localhost:3001")]
    pub allowed_origins: Vec<String>,

    // Companion bot ping url, keeps a sleeping host awake
    #[arg(long, env = "KEEPALIVE_URL")]
    pub keepalive_url: Option<String>,

    // Keep-alive interval in seconds
    #[arg(long, env = "KEEPALIVE_INTERVAL", default_value_t = 300)]
    pub keepalive_interval: u64,
}

impl Args {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn discord_timeout(&self) -> Duration {
        Duration::from_secs(self.discord_timeout.max(1))
    }

    // Zero would make tokio's interval panic
    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval.max(1))
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval.max(1))
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_rate_limit_retries: self.max_rate_limit_retries,
        }
    }
}
