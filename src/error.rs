/// Generic reply used when a remote call failed and the cause must stay hidden.
pub const GENERIC_UPDATE_FAILURE: &str = "There was an error updating the data. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Permission denied")]
    PermissionDenied,

    #[error("Administrator required")]
    AdminRequired,

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Google Sheets error: {0}")]
    Sheets(String),

    #[error("Google Calendar error: {0}")]
    Calendar(String),

    #[error("Google auth error: {0}")]
    GoogleAuth(String),

    #[error("Discord error: {0}")]
    Discord(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the error came from an external service call.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            AppError::Sheets(_)
                | AppError::Calendar(_)
                | AppError::GoogleAuth(_)
                | AppError::Discord(_)
                | AppError::Request(_)
                | AppError::Jwt(_)
        )
    }

    /// Text shown to the invoking user.
    ///
    /// Validation, permission and context errors carry their own message.
    /// Remote and internal failures are logged here and replaced by
    /// `remote_fallback`, so the underlying cause never reaches the user.
    pub fn user_message(&self, remote_fallback: &str) -> String {
        if self.is_remote() {
            tracing::error!("Remote service failure: {:?}", self);
            return remote_fallback.to_string();
        }

        match self {
            AppError::PermissionDenied => {
                "You do not have permission to use this command.".to_string()
            }
            AppError::AdminRequired => {
                "You need to be an administrator to use this command.".to_string()
            }
            AppError::PreconditionFailed(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Timeout(_) => "You did not respond in time. Please try again.".to_string(),
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                remote_fallback.to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                remote_fallback.to_string()
            }
            // Logged by the `is_remote` branch above.
            AppError::Sheets(_)
            | AppError::Calendar(_)
            | AppError::GoogleAuth(_)
            | AppError::Discord(_)
            | AppError::Request(_)
            | AppError::Jwt(_) => remote_fallback.to_string(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
