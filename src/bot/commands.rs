use serenity::all::{
    ChannelType, CommandDataOption, CommandInteraction, CommandOptionType, CreateCommand,
    CreateCommandOption, Member, PartialChannel, Permissions, User,
};

use crate::services::access::{ChannelRef, Invoker};
use crate::services::workflow::MAX_ASSIGNEE_CHARS;

pub const CREATE: &str = "marketingthread";
pub const ASSIGN: &str = "assign";
pub const CHANGE_DEADLINE: &str = "change-deadline";
pub const COMPLETE: &str = "complete";
pub const RETRIEVE: &str = "retrieve";
pub const CONFIGURE: &str = "configure";

/// Slash commands registered on startup.
pub fn definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(CREATE)
            .description("Open a marketing request thread and add it to the calendar.")
            .dm_permission(false),
        CreateCommand::new(ASSIGN)
            .description("Assign this request to a team member.")
            .dm_permission(false)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "username",
                    "The username to assign",
                )
                .required(true)
                .max_length(MAX_ASSIGNEE_CHARS as u16),
            ),
        CreateCommand::new(CHANGE_DEADLINE)
            .description("Change the deadline of this request.")
            .dm_permission(false)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "deadline",
                    "The new deadline (dd-mm-yyyy)",
                )
                .required(true),
            ),
        CreateCommand::new(COMPLETE)
            .description("Mark this request as completed and archive the thread.")
            .dm_permission(false),
        CreateCommand::new(RETRIEVE)
            .description("List all marketing requests that are not completed yet.")
            .dm_permission(false),
        CreateCommand::new(CONFIGURE)
            .description("Configure the role ID for command permissions.")
            .dm_permission(false)
            .default_member_permissions(Permissions::ADMINISTRATOR)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "role",
                    "The new role ID to use for permission checks",
                )
                .required(true),
            ),
    ]
}

/// String value of a named option; missing or non-string options read as empty.
pub fn string_option<'a>(options: &'a [CommandDataOption], name: &str) -> &'a str {
    options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| o.value.as_str())
        .unwrap_or_default()
}

pub fn invoker_of(user: &User, member: Option<&Member>) -> Invoker {
    Invoker {
        user_id: user.id.get(),
        username: user.name.clone(),
        role_ids: member
            .map(|m| m.roles.iter().map(|r| r.get()).collect())
            .unwrap_or_default(),
        is_admin: member
            .and_then(|m| m.permissions)
            .map(|p| p.administrator())
            .unwrap_or(false),
    }
}

pub fn is_thread_kind(kind: ChannelType) -> bool {
    matches!(
        kind,
        ChannelType::PublicThread | ChannelType::PrivateThread | ChannelType::NewsThread
    )
}

pub fn channel_of(command: &CommandInteraction) -> ChannelRef {
    channel_ref(command.channel_id.get(), command.channel.as_ref())
}

pub fn channel_ref(channel_id: u64, partial: Option<&PartialChannel>) -> ChannelRef {
    ChannelRef {
        id: channel_id.to_string(),
        name: partial
            .and_then(|c| c.name.clone())
            .unwrap_or_default(),
        is_thread: partial.map(|c| is_thread_kind(c.kind)).unwrap_or(false),
    }
}
