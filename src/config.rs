use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub api_key: Option<String>,
    pub model: String,
    pub chat_url: String,
    pub image_url: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("MIXTAPE_PORT", "8787"),
            api_key: read_secret("MIXTAPE_API_KEY"),
            model: try_load("MIXTAPE_MODEL", "deepseek-chat"),
            chat_url: try_load(
                "MIXTAPE_CHAT_URL",
                "https://api.deepseek.com/chat/completions",
            ),
            image_url: try_load("MIXTAPE_IMAGE_URL", "https://image.pollinations.ai/prompt"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

/// The upstream credential comes from the environment, or a mounted secret
/// file as a fallback. A missing key is not fatal at startup; generation
/// requests are refused with a configuration error until it is provided.
fn read_secret(secret_name: &str) -> Option<String> {
    if let Ok(value) = env::var(secret_name) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }

    let path = format!("/run/secrets/{secret_name}");

    match read_to_string(&path) {
        Ok(contents) if !contents.trim().is_empty() => Some(contents.trim().to_string()),
        _ => {
            warn!("{secret_name} not set, generation requests will be refused");
            None
        }
    }
}
