use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod bot;
mod config;
mod error;
mod google;
mod models;
mod routes;
mod services;

use config::Config;
use google::auth::{CALENDAR_SCOPE, SHEETS_SCOPE};
use google::{CalendarClient, ServiceAccountAuth, ServiceAccountKey, SheetsClient};
use services::{
    journal::ActionJournal, records::SheetRecordStore, settings::RoleSettings,
    workflow::MarketingService,
};

pub struct AppState {
    pub journal: Arc<ActionJournal>,
    pub started_at: DateTime<Utc>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "marketing_threads=debug,serenity=warn,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; ENV_FILE is also where /configure persists the team role
    let env_file = std::env::var("ENV_FILE").unwrap_or_else(|_| ".env".to_string());
    dotenvy::from_path(&env_file).ok();
    let config = Config::from_env()?;

    tracing::info!("Starting marketing threads bot");

    // Google clients share one HTTP client and one service account token
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let key = ServiceAccountKey::from_file(&config.google.credentials_path)?;
    tracing::info!("Using Google service account {}", key.client_email);
    let auth = Arc::new(ServiceAccountAuth::new(
        http.clone(),
        key,
        &[SHEETS_SCOPE, CALENDAR_SCOPE],
    )?);
    let sheets = SheetsClient::new(http.clone(), auth.clone(), config.google.sheet_id.clone());
    let calendar = CalendarClient::new(http, auth, config.google.calendar_id.clone());

    if config.team.role_id.is_none() {
        tracing::warn!("TEAM_ROLE_ID is not set; team commands are refused until /configure is run");
    }
    let settings = Arc::new(RoleSettings::new(
        config.team.env_file.clone(),
        config.team.role_id,
    ));
    let journal = Arc::new(ActionJournal::new(config.journal.capacity));

    let discord_http = Arc::new(serenity::all::Http::new(&config.discord.bot_token));
    let service = Arc::new(MarketingService::new(
        Arc::new(SheetRecordStore::new(sheets)),
        Arc::new(calendar),
        Arc::new(bot::DiscordThreads::new(discord_http)),
        settings,
        journal.clone(),
        config.google.utc_offset,
        config.google.time_zone.clone(),
    ));

    let handler = bot::Handler::new(
        service,
        config.discord.guild_id,
        config.discord.modal_timeout,
    );
    let mut client = bot::build_client(&config.discord.bot_token, handler).await?;
    let shard_manager = client.shard_manager.clone();

    let app_state = Arc::new(AppState {
        journal,
        started_at: Utc::now(),
    });

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(routes::health::health_check))
        // Action journal for operators
        .nest("/api/actions", routes::actions::router())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server_fut = axum::serve(listener, app);
    let bot_fut = client.start();

    let signal_fut = async {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = ctrl_c => {},
                        _ = term.recv() => {},
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to bind SIGTERM: {}", e);
                    let _ = ctrl_c.await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        tracing::info!("Shutdown signal received");
    };

    tokio::select! {
        res = server_fut => {
            if let Err(e) = res {
                tracing::error!("Server error: {}", e);
            }
        }
        res = bot_fut => {
            if let Err(e) = res {
                tracing::error!("Discord client error: {}", e);
            }
        }
        _ = signal_fut => {
            tracing::info!("Stopping server and Discord shards");
        }
    }

    shard_manager.shutdown_all().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
