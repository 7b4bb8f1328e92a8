use crate::guilds::GuildService;

// Bot invite link settings
#[derive(Clone, Debug)]
pub struct InviteConfig {
    pub client_id: String,
    pub callback_url: String,
}

// app's shared state, built once in main and handed to every handler

pub struct AppState {
    pub guilds: GuildService,
    pub invite: InviteConfig,
}
