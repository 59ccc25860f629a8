//! Upstream calls: the chat-completions request that writes the tracklist
//! and the image service the cover tokens point at.
//!
//! The caller's vibe feeds two independent prompt templates, one per
//! upstream. Status handling maps the interesting upstream failures onto
//! their own error kinds so the client can tell "retry later" from "the
//! operator has to fix something".
use rand::random;
use reqwest::{Client, StatusCode, Url};
use serde_json::from_str;
use tracing::warn;

use crate::{
    config::Config,
    error::AppError,
    models::{ChatMessage, ChatRequest, ChatResponse, SYSTEM_PROMPT, Tracklist},
    utils::extract_json,
};

pub fn tracklist_prompt(vibe: &str) -> String {
    format!(
        "Build a mixtape of 8 to 12 real songs matching this vibe: \"{vibe}\". \
         Reply with JSON shaped as \
         {{\"title\": \"mixtape name\", \"tracks\": [{{\"title\": \"song\", \"artist\": \"artist\"}}]}}. \
         Double quotes, no trailing commas, no commentary."
    )
}

pub fn cover_prompt(vibe: &str) -> String {
    format!("album cover art, {vibe}, grainy risograph print, muted palette, no text, no lettering")
}

/// Builds the cover-image URL for a vibe. The seed busts upstream caching so
/// identical vibes still get fresh art.
pub fn build_cover_url(image_url: &str, vibe: &str) -> Result<String, AppError> {
    let mut url = Url::parse(image_url).map_err(|_| AppError::MisconfiguredServer)?;

    url.path_segments_mut()
        .map_err(|_| AppError::MisconfiguredServer)?
        .push(&cover_prompt(vibe));

    url.query_pairs_mut()
        .append_pair("width", "768")
        .append_pair("height", "768")
        .append_pair("nologo", "true")
        .append_pair("seed", &random::<u32>().to_string());

    Ok(url.to_string())
}

pub async fn generate_tracklist(
    client: &Client,
    config: &Config,
    api_key: &str,
    vibe: &str,
) -> Result<Tracklist, AppError> {
    let request = ChatRequest {
        model: config.model.clone(),
        messages: vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: tracklist_prompt(vibe),
            },
        ],
    };

    let response = client
        .post(&config.chat_url)
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await?;

    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            warn!("Upstream rejected our credentials");
            return Err(AppError::UpstreamAuthFailed);
        }
        StatusCode::PAYMENT_REQUIRED => {
            warn!("Upstream balance exhausted");
            return Err(AppError::UpstreamBalanceExhausted);
        }
        status if !status.is_success() => {
            warn!("Upstream returned status {status}");
            return Err(AppError::UpstreamUnavailable(status.as_u16()));
        }
        _ => {}
    }

    let body = response.text().await?;
    let chat: ChatResponse = from_str(&body).map_err(|_| AppError::MalformedUpstreamPayload)?;

    let content = chat
        .choices
        .first()
        .map(|choice| choice.message.content.as_str())
        .ok_or(AppError::MalformedUpstreamPayload)?;

    parse_tracklist(content)
}

pub fn parse_tracklist(content: &str) -> Result<Tracklist, AppError> {
    let tracklist: Tracklist =
        from_str(extract_json(content)).map_err(|_| AppError::MalformedUpstreamPayload)?;

    if tracklist.tracks.is_empty() {
        return Err(AppError::EmptyResult);
    }

    Ok(tracklist)
}

pub async fn fetch_cover(
    client: &Client,
    resource: &str,
) -> Result<(String, axum::body::Bytes), AppError> {
    let response = client.get(resource).send().await?;

    if !response.status().is_success() {
        warn!("Cover upstream returned status {}", response.status());
        return Err(AppError::UpstreamUnavailable(response.status().as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_string();

    let bytes = response.bytes().await?;

    Ok((content_type, bytes))
}
