//! Engine configuration: remote endpoint, credentials, and data directory.
//!
//! Values come from an optional TOML file overlaid with environment
//! variables. Credential provisioning is the deployment's concern; a missing
//! key is a valid configuration (the client fails fast into an apology
//! message instead of erroring).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::logging;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

const API_KEY_ENV: &str = "STUDYBOT_API_KEY";
const BASE_URL_ENV: &str = "STUDYBOT_BASE_URL";
const MODEL_ENV: &str = "STUDYBOT_MODEL";

/// Runtime configuration for the chat engine.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    /// API key for the remote model. `None` is valid; the streaming client
    /// substitutes an apology reply without touching the network.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Directory holding the persisted chat-history and profile records.
    pub data_dir: PathBuf,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            data_dir: default_data_dir(),
        }
    }
}

impl ChatConfig {
    /// Load from a TOML file, then apply environment overrides. A missing
    /// file yields defaults; a malformed file is an error the host should
    /// surface at startup.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Defaults plus environment overrides, loading a `.env` file if present.
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.trim().is_empty()
        {
            self.api_key = Some(key);
        }
        if let Ok(url) = std::env::var(BASE_URL_ENV)
            && !url.trim().is_empty()
        {
            self.base_url = url;
        }
        if let Ok(model) = std::env::var(MODEL_ENV)
            && !model.trim().is_empty()
        {
            self.model = model;
        }
    }
}

fn default_data_dir() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("studybot"),
        None => {
            logging::warn("No platform data directory; persisting under ./studybot");
            PathBuf::from("studybot")
        }
    }
}
