use serde::{Deserialize, Serialize};
use serde_json::Value;

// Discord's ADMINISTRATOR permission bit
pub const ADMINISTRATOR: u64 = 0x8;

// Guild as listed by /users/@me/guilds
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct PartialGuild {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub owner: bool,
    // Discord sends the bitset as a decimal string
    #[serde(default)]
    pub permissions: String,
}

impl PartialGuild {
    pub fn is_admin(&self) -> bool {
        self.permissions
            .parse::<u64>()
            .map(|bits| bits & ADMINISTRATOR == ADMINISTRATOR)
            .unwrap_or(false)
    }
}

// Guild listing entry returned to the dashboard
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedGuild {
    #[serde(flatten)]
    pub guild: PartialGuild,
    pub bot_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

// Single guild lookup, bot presence plus the full guild object
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GuildDetail {
    pub bot_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild: Option<Value>,
}

// Body Discord sends with a 429
#[derive(Deserialize, Debug)]
pub struct RateLimitBody {
    pub retry_after: f64,
    #[serde(default)]
    pub global: bool,
}
