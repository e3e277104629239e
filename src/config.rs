use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::coach::Personality;
use crate::flow::{QUIZ_FEEDBACK_DELAY, REWARD_CLOSE_DELAY};
use crate::session::Delays;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be a number of milliseconds, got '{value}'")]
    InvalidDelay { name: &'static str, value: String },

    #[error("Unknown coach personality '{0}' (expected mentor, hype or scientist)")]
    UnknownPersonality(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub chatgpt_api_key: Option<String>,
    pub personality: Personality,
    pub delays: Delays,
}

impl Config {
    /// Reads the process environment. Call after `dotenv()`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let personality = match non_empty("G3MS_COACH") {
            Some(name) => {
                Personality::from_name(&name).ok_or(ConfigError::UnknownPersonality(name))?
            }
            None => Personality::default(),
        };

        Ok(Self {
            db_path: non_empty("G3MS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("db.sqlite")),
            catalog_path: non_empty("G3MS_CATALOG_PATH").map(PathBuf::from),
            chatgpt_api_key: non_empty("CHATGPT_API_KEY"),
            personality,
            delays: Delays {
                quiz_feedback: delay(
                    "G3MS_QUIZ_FEEDBACK_DELAY_MS",
                    non_empty("G3MS_QUIZ_FEEDBACK_DELAY_MS"),
                    QUIZ_FEEDBACK_DELAY,
                )?,
                reward_close: delay(
                    "G3MS_REWARD_CLOSE_DELAY_MS",
                    non_empty("G3MS_REWARD_CLOSE_DELAY_MS"),
                    REWARD_CLOSE_DELAY,
                )?,
            },
        })
    }
}

fn delay(
    name: &'static str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidDelay { name, value }),
    }
}
