use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};

const ROLE_KEY: &str = "TEAM_ROLE_ID";

pub const INVALID_ROLE_MESSAGE: &str = "The role ID must be a numeric Discord ID. Please try again.";

/// Process-wide team role.
///
/// A new role is written to the env file first and only applied in memory once
/// the file has been replaced, so a failed write leaves both the file and the
/// running process on the old value.
pub struct RoleSettings {
    env_file: PathBuf,
    role_id: RwLock<Option<u64>>,
}

impl RoleSettings {
    pub fn new(env_file: impl Into<PathBuf>, role_id: Option<u64>) -> Self {
        Self {
            env_file: env_file.into(),
            role_id: RwLock::new(role_id),
        }
    }

    pub async fn role_id(&self) -> Option<u64> {
        *self.role_id.read().await
    }

    /// Validate, persist and apply a new team role.
    pub async fn apply(&self, raw: &str) -> AppResult<u64> {
        let role_id = parse_role_id(raw)?;

        // Held across the file rewrite so two applies cannot interleave.
        let mut current = self.role_id.write().await;
        persist_env_value(&self.env_file, ROLE_KEY, &role_id.to_string()).await?;
        *current = Some(role_id);

        tracing::info!(
            "Team role updated to {} (persisted to {})",
            role_id,
            self.env_file.display()
        );
        Ok(role_id)
    }
}

/// Discord ids are unsigned 64-bit snowflakes written in decimal.
pub fn parse_role_id(raw: &str) -> AppResult<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::Validation(INVALID_ROLE_MESSAGE.to_string()));
    }
    match trimmed.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::Validation(INVALID_ROLE_MESSAGE.to_string())),
    }
}

/// Replace `key=...` in env-file contents, or append it when absent.
pub fn upsert_env_line(contents: &str, key: &str, value: &str) -> String {
    let prefix = format!("{}=", key);
    let mut replaced = false;
    let mut lines: Vec<String> = contents
        .lines()
        .map(|line| {
            let bare = line.trim_start();
            let bare = bare.strip_prefix("export ").unwrap_or(bare);
            if !replaced && bare.starts_with(&prefix) {
                replaced = true;
                format!("{}{}", prefix, value)
            } else {
                line.to_string()
            }
        })
        .collect();

    if !replaced {
        lines.push(format!("{}{}", prefix, value));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Rewrite one key of an env file by writing a sibling temp file and renaming it over the original.
pub async fn persist_env_value(path: &Path, key: &str, value: &str) -> AppResult<()> {
    let existing = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(AppError::Config(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };
    let updated = upsert_env_line(&existing, key, value);

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| ".env".to_string());
    let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    if let Err(e) = tokio::fs::write(&tmp_path, updated).await {
        return Err(AppError::Config(format!(
            "Failed to write {}: {}",
            tmp_path.display(),
            e
        )));
    }

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(AppError::Config(format!(
            "Failed to replace {}: {}",
            path.display(),
            e
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ids_must_be_numeric() {
        assert_eq!(parse_role_id(" 123456789012345678 ").unwrap(), 123456789012345678);
        assert!(parse_role_id("").is_err());
        assert!(parse_role_id("abc").is_err());
        assert!(parse_role_id("-5").is_err());
        assert!(parse_role_id("0").is_err());
        assert!(parse_role_id("99999999999999999999999").is_err());
    }

    #[test]
    fn replaces_existing_line_in_place() {
        let contents = "DISCORD_BOT_TOKEN=abc\nTEAM_ROLE_ID=1\nGOOGLE_SHEET_ID=sheet\n";
        assert_eq!(
            upsert_env_line(contents, "TEAM_ROLE_ID", "42"),
            "DISCORD_BOT_TOKEN=abc\nTEAM_ROLE_ID=42\nGOOGLE_SHEET_ID=sheet\n"
        );
    }

    #[test]
    fn appends_missing_line() {
        assert_eq!(
            upsert_env_line("A=1\n# comment", "TEAM_ROLE_ID", "42"),
            "A=1\n# comment\nTEAM_ROLE_ID=42\n"
        );
        assert_eq!(upsert_env_line("", "TEAM_ROLE_ID", "42"), "TEAM_ROLE_ID=42\n");
    }

    #[test]
    fn similar_keys_are_not_touched() {
        assert_eq!(
            upsert_env_line("TEAM_ROLE_ID_OLD=1\n", "TEAM_ROLE_ID", "42"),
            "TEAM_ROLE_ID_OLD=1\nTEAM_ROLE_ID=42\n"
        );
    }

    #[tokio::test]
    async fn apply_rewrites_file_then_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "DISCORD_BOT_TOKEN=abc\nTEAM_ROLE_ID=1\n").unwrap();

        let settings = RoleSettings::new(&path, Some(1));
        assert_eq!(settings.apply("555").await.unwrap(), 555);
        assert_eq!(settings.role_id().await, Some(555));

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "DISCORD_BOT_TOKEN=abc\nTEAM_ROLE_ID=555\n");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn apply_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        let settings = RoleSettings::new(&path, None);
        settings.apply("777").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "TEAM_ROLE_ID=777\n");
    }

    #[tokio::test]
    async fn invalid_role_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "TEAM_ROLE_ID=1\n").unwrap();

        let settings = RoleSettings::new(&path, Some(1));
        assert!(matches!(
            settings.apply("not-a-role").await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(settings.role_id().await, Some(1));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "TEAM_ROLE_ID=1\n");
    }

    #[tokio::test]
    async fn failed_write_keeps_old_role() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join(".env");

        let settings = RoleSettings::new(&path, Some(1));
        assert!(matches!(settings.apply("2").await, Err(AppError::Config(_))));
        assert_eq!(settings.role_id().await, Some(1));
    }
}
