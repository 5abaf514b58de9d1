use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serenity::all::{
    ActionRowComponent, Command, CommandInteraction, Context, CreateActionRow,
    CreateInputText, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateModal, EditInteractionResponse, EventHandler, GuildId,
    InputTextStyle, Interaction, ModalInteraction, ModalInteractionCollector, Ready,
};

use super::commands::{self, channel_of, invoker_of, string_option};
use crate::error::{AppError, AppResult, GENERIC_UPDATE_FAILURE};
use crate::services::access;
use crate::services::workflow::{
    CreateRequest, MarketingService, CONFIGURE_FAILURE_MESSAGE, CREATE_FAILURE_MESSAGE,
    MAX_PROJECT_NAME_CHARS, RETRIEVE_FAILURE_MESSAGE,
};

const PROJECT_INPUT: &str = "projectNameInput";
const DESCRIPTION_INPUT: &str = "describeInput";
const DEADLINE_INPUT: &str = "deadlineInput";

pub struct Handler {
    service: Arc<MarketingService>,
    guild_id: Option<u64>,
    modal_timeout: Duration,
}

impl Handler {
    pub fn new(service: Arc<MarketingService>, guild_id: Option<u64>, modal_timeout: Duration) -> Self {
        Self {
            service,
            guild_id,
            modal_timeout,
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!("Connected to Discord as {}", ready.user.name);

        let definitions = commands::definitions();
        let count = definitions.len();
        let registered = match self.guild_id {
            Some(guild) => GuildId::new(guild)
                .set_commands(&ctx.http, definitions)
                .await
                .map(|_| ()),
            None => Command::set_global_commands(&ctx.http, definitions)
                .await
                .map(|_| ()),
        };

        match registered {
            Ok(()) => tracing::info!("Registered {} slash commands", count),
            Err(e) => tracing::error!("Failed to register slash commands: {}", e),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        let service = self.service.clone();
        let modal_timeout = self.modal_timeout;
        let name = command.data.name.clone();

        // Panics inside a command are contained to its task and logged.
        let task = tokio::spawn(async move {
            dispatch(&ctx, &service, &command, modal_timeout).await;
        });
        if let Err(e) = task.await {
            if e.is_panic() {
                tracing::error!("Command /{} panicked: {:?}", name, e);
            } else {
                tracing::error!("Command /{} was cancelled: {}", name, e);
            }
        }
    }
}

async fn dispatch(
    ctx: &Context,
    service: &MarketingService,
    command: &CommandInteraction,
    modal_timeout: Duration,
) {
    let invoker = invoker_of(&command.user, command.member.as_deref());
    let channel = channel_of(command);
    tracing::debug!(
        "/{} from {} in channel {}",
        command.data.name,
        invoker.username,
        channel.id
    );

    if command.guild_id.is_none() {
        respond_now(ctx, command, "This command can only be used in a server.").await;
        return;
    }

    match command.data.name.as_str() {
        commands::CREATE => run_create(ctx, service, command, modal_timeout).await,
        commands::ASSIGN => {
            defer(ctx, command).await;
            let username = string_option(&command.data.options, "username");
            let result = service.assign(&invoker, &channel, username).await;
            finish(ctx, command, result, GENERIC_UPDATE_FAILURE).await;
        }
        commands::CHANGE_DEADLINE => {
            defer(ctx, command).await;
            let deadline = string_option(&command.data.options, "deadline");
            let result = service.change_deadline(&invoker, &channel, deadline).await;
            finish(ctx, command, result, GENERIC_UPDATE_FAILURE).await;
        }
        commands::COMPLETE => {
            defer(ctx, command).await;
            let result = service.complete(&invoker, &channel).await;
            finish(ctx, command, result, GENERIC_UPDATE_FAILURE).await;
        }
        commands::RETRIEVE => {
            defer(ctx, command).await;
            match service.pending_report(&invoker).await {
                Ok(chunks) => send_chunks(ctx, command, chunks).await,
                Err(e) => {
                    let message = e.user_message(RETRIEVE_FAILURE_MESSAGE);
                    edit_reply(ctx, command, &message).await;
                }
            }
        }
        commands::CONFIGURE => {
            defer(ctx, command).await;
            let role = string_option(&command.data.options, "role");
            let result = service.configure(&invoker, role).await;
            finish(ctx, command, result, CONFIGURE_FAILURE_MESSAGE).await;
        }
        other => tracing::warn!("Received unknown command /{}", other),
    }
}

// ============================================================================
// Create: modal round trip
// ============================================================================

fn create_modal(custom_id: &str) -> CreateModal {
    CreateModal::new(custom_id, "Marketing").components(vec![
        CreateActionRow::InputText(
            CreateInputText::new(InputTextStyle::Short, "What's your project name?", PROJECT_INPUT)
                .max_length(MAX_PROJECT_NAME_CHARS as u16),
        ),
        CreateActionRow::InputText(CreateInputText::new(
            InputTextStyle::Paragraph,
            "Please describe the marketing request.",
            DESCRIPTION_INPUT,
        )),
        CreateActionRow::InputText(CreateInputText::new(
            InputTextStyle::Short,
            "What's the deadline (dd-mm-yyyy)?",
            DEADLINE_INPUT,
        )),
    ])
}

fn modal_value(modal: &ModalInteraction, custom_id: &str) -> String {
    modal
        .data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .find_map(|component| match component {
            ActionRowComponent::InputText(input) if input.custom_id == custom_id => {
                input.value.clone()
            }
            _ => None,
        })
        .unwrap_or_default()
}

async fn run_create(
    ctx: &Context,
    service: &MarketingService,
    command: &CommandInteraction,
    modal_timeout: Duration,
) {
    let channel = channel_of(command);
    if let Err(e) = access::require_text_channel(&channel) {
        respond_now(ctx, command, &e.user_message(CREATE_FAILURE_MESSAGE)).await;
        return;
    }

    let modal_id = format!("marketing-{}-{}", command.user.id, command.id);
    if let Err(e) = command
        .create_response(&ctx.http, CreateInteractionResponse::Modal(create_modal(&modal_id)))
        .await
    {
        tracing::error!("Failed to show the create modal: {}", e);
        return;
    }

    let submitted = ModalInteractionCollector::new(&ctx.shard)
        .author_id(command.user.id)
        .custom_ids(vec![modal_id])
        .timeout(modal_timeout)
        .next()
        .await;

    let Some(modal) = submitted else {
        tracing::info!("Create modal for {} timed out", command.user.name);
        let message = AppError::Timeout("create modal".to_string()).user_message(CREATE_FAILURE_MESSAGE);
        if let Err(e) = command
            .create_followup(
                &ctx.http,
                CreateInteractionResponseFollowup::new()
                    .content(message)
                    .ephemeral(true),
            )
            .await
        {
            tracing::error!("Failed to send timeout notice: {}", e);
        }
        return;
    };

    if let Err(e) = modal.defer_ephemeral(&ctx.http).await {
        tracing::error!("Failed to defer modal submission: {}", e);
        return;
    }

    let request = CreateRequest {
        channel,
        project_name: modal_value(&modal, PROJECT_INPUT),
        description: modal_value(&modal, DESCRIPTION_INPUT),
        deadline: modal_value(&modal, DEADLINE_INPUT),
    };
    let invoker = invoker_of(&modal.user, modal.member.as_ref());
    let message = match service.create(&invoker, request, Utc::now()).await {
        Ok(message) => message,
        Err(e) => e.user_message(CREATE_FAILURE_MESSAGE),
    };

    if let Err(e) = modal
        .edit_response(&ctx.http, EditInteractionResponse::new().content(message))
        .await
    {
        tracing::error!("Failed to answer modal submission: {}", e);
    }
}

// ============================================================================
// Replies
// ============================================================================

async fn respond_now(ctx: &Context, command: &CommandInteraction, content: &str) {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    );
    if let Err(e) = command.create_response(&ctx.http, response).await {
        tracing::error!("Failed to respond to /{}: {}", command.data.name, e);
    }
}

async fn defer(ctx: &Context, command: &CommandInteraction) {
    if let Err(e) = command.defer_ephemeral(&ctx.http).await {
        tracing::error!("Failed to defer /{}: {}", command.data.name, e);
    }
}

async fn edit_reply(ctx: &Context, command: &CommandInteraction, content: &str) {
    if let Err(e) = command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(content))
        .await
    {
        tracing::error!("Failed to reply to /{}: {}", command.data.name, e);
    }
}

async fn finish(
    ctx: &Context,
    command: &CommandInteraction,
    result: AppResult<String>,
    fallback: &str,
) {
    let message = match result {
        Ok(message) => message,
        Err(e) => e.user_message(fallback),
    };
    edit_reply(ctx, command, &message).await;
}

/// First chunk replaces the deferred reply; the rest are follow-ups.
async fn send_chunks(ctx: &Context, command: &CommandInteraction, chunks: Vec<String>) {
    let mut chunks = chunks.into_iter();
    if let Some(first) = chunks.next() {
        edit_reply(ctx, command, &first).await;
    }
    for chunk in chunks {
        if let Err(e) = command
            .create_followup(
                &ctx.http,
                CreateInteractionResponseFollowup::new()
                    .content(chunk)
                    .ephemeral(true),
            )
            .await
        {
            tracing::error!("Failed to send report chunk: {}", e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modal_has_three_inputs() {
        let json = serde_json::to_value(create_modal("marketing-1-2")).unwrap();
        assert_eq!(json["custom_id"], "marketing-1-2");
        assert_eq!(json["title"], "Marketing");
        let rows = json["components"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["components"][0]["custom_id"], PROJECT_INPUT);
        assert_eq!(rows[0]["components"][0]["max_length"], 80);
        assert_eq!(rows[2]["components"][0]["custom_id"], DEADLINE_INPUT);
    }
}
