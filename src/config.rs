use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_BOT_NAME: &str = "norrisbot";

/// Runtime configuration, sourced from the process environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Slack bot token (`xoxb-...`) used for Web API calls.
    pub api_key: String,
    /// Slack app-level token (`xapp-...`) required by Socket Mode.
    pub app_token: String,
    /// Path of the SQLite database holding bot run records.
    pub db_path: PathBuf,
    /// Display and trigger name of the bot.
    pub name: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var("BOT_API_KEY").context("BOT_API_KEY is not set (Slack bot token)")?;
        let app_token = std::env::var("BOT_APP_TOKEN")
            .context("BOT_APP_TOKEN is not set (Slack app-level token for Socket Mode)")?;
        let db_path = std::env::var("BOT_DB_PATH")
            .map(PathBuf::from)
            .context("BOT_DB_PATH is not set (SQLite database path)")?;
        let name = bot_name(std::env::var("BOT_NAME").ok());

        Ok(Self {
            api_key,
            app_token,
            db_path,
            name,
        })
    }
}

/// An unset or empty `BOT_NAME` falls back to the default.
fn bot_name(raw: Option<String>) -> String {
    match raw {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_BOT_NAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_defaults_when_unset() {
        assert_eq!(bot_name(None), "norrisbot");
    }

    #[test]
    fn name_defaults_when_empty() {
        assert_eq!(bot_name(Some(String::new())), "norrisbot");
    }

    #[test]
    fn name_kept_when_set() {
        assert_eq!(bot_name(Some("jokebot".into())), "jokebot");
    }
}
