use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{PainCareError, Result};
use crate::prompt::{DEFAULT_MODEL, MAX_TOKENS, TEMPERATURE};

const PLACEHOLDER_API_KEY: &str = "PLACEHOLDER_GROQ_API_KEY";

/// Main configuration structure for the pain care bot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub groq: GroqConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    /// host:port the HTTP listener binds to
    pub bind: String,
    /// Optional bearer token guarding the JSON API
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Sessions untouched for this long are dropped
    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: u64,
    /// Upper bound on live sessions; the least recently used idle one is evicted
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_session_idle_minutes() -> u64 {
    60
}

fn default_max_sessions() -> usize {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqConfig {
    #[serde(default)]
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: i32,
    pub timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "pain-care-bot".to_string(),
            bind: "127.0.0.1:8501".to_string(),
            bearer_token: None,
            session_idle_minutes: default_session_idle_minutes(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            timeout_seconds: 60,
        }
    }
}

impl Config {
    /// Load configuration from `.env`, an optional YAML file and environment overrides.
    ///
    /// Fails when the result is unusable, most importantly when no Groq API key is set,
    /// so the process never starts accepting submissions it cannot answer.
    pub fn load() -> Result<Self> {
        let env_paths = [".env", "../.env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::warn!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("PAIN_BOT_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = Self::from_file(Path::new(&config_path));
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Read a YAML config file, falling back to defaults when it is missing or broken
    pub fn from_file(path: &Path) -> Self {
        if !path.exists() {
            tracing::warn!(
                "Config file not found at {} - using defaults",
                path.display()
            );
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!(
                    "Failed to read config file {}: {} - using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(bind) = env::var("PAIN_BOT_HTTP_BIND") {
            self.server.bind = bind;
        }
        if let Ok(token) = env::var("PAIN_BOT_BEARER_TOKEN") {
            if !token.is_empty() {
                self.server.bearer_token = Some(token);
            }
        }

        if let Ok(minutes) = env::var("PAIN_BOT_SESSION_IDLE_MINUTES") {
            if let Ok(minutes) = minutes.parse() {
                self.server.session_idle_minutes = minutes;
            }
        }
        if let Ok(max) = env::var("PAIN_BOT_MAX_SESSIONS") {
            if let Ok(max) = max.parse() {
                self.server.max_sessions = max;
            }
        }

        if let Ok(api_key) = env::var("GROQ_API_KEY") {
            self.groq.api_key = api_key;
        }
        if let Ok(model) = env::var("GROQ_MODEL") {
            self.groq.model = model;
        }
        if let Ok(url) = env::var("GROQ_API_URL") {
            self.groq.api_url = url;
        }
        if let Ok(timeout) = env::var("GROQ_TIMEOUT_SECONDS") {
            if let Ok(secs) = timeout.parse() {
                self.groq.timeout_seconds = secs;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.groq.api_key.trim().is_empty() || self.groq.api_key == PLACEHOLDER_API_KEY {
            return Err(PainCareError::Config(
                "GROQ_API_KEY environment variable must be set".to_string(),
            ));
        }
        if self.groq.model.trim().is_empty() {
            return Err(PainCareError::Config("groq.model cannot be empty".to_string()));
        }
        if self.groq.timeout_seconds == 0 {
            return Err(PainCareError::Config(
                "groq.timeout_seconds cannot be 0".to_string(),
            ));
        }
        if self.server.session_idle_minutes == 0 {
            return Err(PainCareError::Config(
                "server.session_idle_minutes cannot be 0".to_string(),
            ));
        }
        if self.server.max_sessions == 0 {
            return Err(PainCareError::Config(
                "server.max_sessions cannot be 0".to_string(),
            ));
        }
        self.bind_addr()?;

        // The composer always sends its own constants; differing values here are ignored.
        if (self.groq.temperature - TEMPERATURE).abs() > f32::EPSILON
            || self.groq.max_tokens != MAX_TOKENS
        {
            tracing::warn!(
                "groq.temperature/max_tokens are fixed at {}/{} - configured values ignored",
                TEMPERATURE,
                MAX_TOKENS
            );
        }

        Ok(())
    }

    /// Parsed listener address
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind.parse().map_err(|e| {
            PainCareError::Config(format!(
                "Invalid bind address '{}' (expected host:port): {e}",
                self.server.bind
            ))
        })
    }

    /// How long a session may sit untouched before it is dropped
    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.server.session_idle_minutes * 60)
    }

    /// Transport-level timeout for the Groq call
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.groq.timeout_seconds)
    }
}
