//! Dashboard API backend for the Diode Discord bot.
//!
//! All Discord REST traffic goes through a single [`queue::RequestQueue`],
//! which runs calls one at a time and pauses everything when Discord answers
//! 429. Guild lookups are fronted by a short-lived [`cache::TtlCache`].

pub mod cache;
pub mod config;
pub mod discord;
pub mod error;
pub mod guilds;
pub mod handlers;
pub mod keepalive;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod queue;
pub mod state;
