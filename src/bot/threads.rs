use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{
    AutoArchiveDuration, ChannelId, ChannelType, CreateThread, EditThread, Http,
};

use crate::error::{AppError, AppResult};
use crate::services::workflow::ChatSurface;

/// Thread operations through the Discord REST API.
pub struct DiscordThreads {
    http: Arc<Http>,
}

impl DiscordThreads {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

pub fn parse_channel_id(raw: &str) -> AppResult<ChannelId> {
    match raw.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(ChannelId::new(id)),
        _ => Err(AppError::Discord(format!("Invalid channel id: {}", raw))),
    }
}

#[async_trait]
impl ChatSurface for DiscordThreads {
    async fn create_thread(&self, channel_id: &str, name: &str) -> AppResult<String> {
        let channel = parse_channel_id(channel_id)?;
        let builder = CreateThread::new(name)
            .kind(ChannelType::PublicThread)
            .auto_archive_duration(AutoArchiveDuration::OneWeek)
            .audit_log_reason("To discuss the marketing project deadline");

        let thread = channel
            .create_thread(&self.http, builder)
            .await
            .map_err(|e| AppError::Discord(format!("Failed to create thread: {}", e)))?;

        tracing::info!("Created thread {} ('{}') in {}", thread.id, name, channel);
        Ok(thread.id.to_string())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> AppResult<()> {
        let channel = parse_channel_id(channel_id)?;
        channel
            .say(&self.http, content)
            .await
            .map_err(|e| AppError::Discord(format!("Failed to send message: {}", e)))?;
        Ok(())
    }

    async fn thread_name(&self, thread_id: &str) -> AppResult<String> {
        let channel = parse_channel_id(thread_id)?;
        let fetched = channel
            .to_channel(&self.http)
            .await
            .map_err(|e| AppError::Discord(format!("Failed to fetch thread: {}", e)))?;

        fetched
            .guild()
            .map(|c| c.name)
            .ok_or_else(|| AppError::Discord(format!("{} is not a guild thread", thread_id)))
    }

    async fn rename_thread(&self, thread_id: &str, name: &str) -> AppResult<()> {
        let channel = parse_channel_id(thread_id)?;
        channel
            .edit_thread(&self.http, EditThread::new().name(name))
            .await
            .map_err(|e| AppError::Discord(format!("Failed to rename thread: {}", e)))?;
        Ok(())
    }

    async fn archive_thread(&self, thread_id: &str) -> AppResult<()> {
        let channel = parse_channel_id(thread_id)?;
        channel
            .edit_thread(
                &self.http,
                EditThread::new()
                    .archived(true)
                    .audit_log_reason("The thread has been marked as completed."),
            )
            .await
            .map_err(|e| AppError::Discord(format!("Failed to archive thread: {}", e)))?;
        tracing::info!("Archived thread {}", thread_id);
        Ok(())
    }
}
