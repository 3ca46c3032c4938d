use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

/// Secrets that must never sign production sessions.
const PLACEHOLDER_SECRETS: &[&str] = &["oh-so-secret", "change-me", "dev-secret-change-me"];

const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub secret_key: String,
    pub debug: bool,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| {
            var(key).unwrap_or_else(|| {
                info!("{} not set, using default: {}", key, default);
                default.to_string()
            })
        };

        let debug = parse_bool("FEEDBACK_DEBUG", &get("FEEDBACK_DEBUG", "false"))?;
        let port = get("FEEDBACK_PORT", "5000")
            .parse()
            .context("FEEDBACK_PORT must be a port number")?;
        let session_ttl_hours: i64 = get("FEEDBACK_SESSION_TTL_HOURS", "168")
            .parse()
            .context("FEEDBACK_SESSION_TTL_HOURS must be a whole number of hours")?;
        if session_ttl_hours <= 0 {
            bail!("FEEDBACK_SESSION_TTL_HOURS must be positive");
        }

        let secret_key = var("FEEDBACK_SECRET_KEY").unwrap_or_default();
        let secret_key = if secret_key.is_empty() || PLACEHOLDER_SECRETS.contains(&secret_key.as_str()) {
            if !debug {
                bail!("FEEDBACK_SECRET_KEY is unset or still a placeholder; set it in your .env file");
            }
            warn!("FEEDBACK_SECRET_KEY is unset or a placeholder; using a dev key (debug mode)");
            DEV_SECRET.to_string()
        } else {
            secret_key
        };

        Ok(Self {
            host: get("FEEDBACK_HOST", "0.0.0.0"),
            port,
            db_path: get("FEEDBACK_DB_PATH", "feedback.db").into(),
            secret_key,
            debug,
            session_ttl_hours,
            secure_cookies: parse_bool(
                "FEEDBACK_SECURE_COOKIES",
                &get("FEEDBACK_SECURE_COOKIES", "false"),
            )?,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("{} must be true or false, got {:?}", key, other),
    }
}
