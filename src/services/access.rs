use crate::error::{AppError, AppResult};

pub const THREAD_ONLY_MESSAGE: &str = "This command can only be used within a thread.";
pub const CHANNEL_ONLY_MESSAGE: &str = "This command can only be used in a text channel, not in a thread.";

/// The user behind an interaction, as far as permission checks care.
#[derive(Debug, Clone, Default)]
pub struct Invoker {
    pub user_id: u64,
    pub username: String,
    pub role_ids: Vec<u64>,
    pub is_admin: bool,
}

/// The channel an interaction was invoked in.
#[derive(Debug, Clone, Default)]
pub struct ChannelRef {
    pub id: String,
    pub name: String,
    pub is_thread: bool,
}

/// Members without the configured team role are rejected; with no role configured nobody passes.
pub fn require_team_role(invoker: &Invoker, team_role: Option<u64>) -> AppResult<()> {
    match team_role {
        Some(role) if invoker.role_ids.contains(&role) => Ok(()),
        Some(_) => {
            tracing::info!(
                "User {} ({}) lacks the team role",
                invoker.username,
                invoker.user_id
            );
            Err(AppError::PermissionDenied)
        }
        None => {
            tracing::warn!(
                "No team role configured, rejecting {}",
                invoker.username
            );
            Err(AppError::PermissionDenied)
        }
    }
}

pub fn require_admin(invoker: &Invoker) -> AppResult<()> {
    if invoker.is_admin {
        Ok(())
    } else {
        tracing::info!("User {} is not an administrator", invoker.user_id);
        Err(AppError::AdminRequired)
    }
}

pub fn require_thread(channel: &ChannelRef) -> AppResult<()> {
    if channel.is_thread {
        Ok(())
    } else {
        Err(AppError::PreconditionFailed(THREAD_ONLY_MESSAGE.to_string()))
    }
}

/// New request threads are opened under a regular channel.
pub fn require_text_channel(channel: &ChannelRef) -> AppResult<()> {
    if channel.is_thread {
        Err(AppError::PreconditionFailed(CHANNEL_ONLY_MESSAGE.to_string()))
    } else {
        Ok(())
    }
}
