//! Discord gateway glue: command registration, interaction dispatch and
//! thread operations.

pub mod commands;
pub mod handler;
pub mod threads;

use serenity::all::{Client, GatewayIntents};

use crate::error::{AppError, AppResult};

pub use self::handler::Handler;
pub use self::threads::DiscordThreads;

/// Build the gateway client. Slash commands only need the guilds intent.
pub async fn build_client(token: &str, handler: Handler) -> AppResult<Client> {
    Client::builder(token, GatewayIntents::GUILDS)
        .event_handler(handler)
        .await
        .map_err(|e| AppError::Discord(format!("Failed to build Discord client: {}", e)))
}
