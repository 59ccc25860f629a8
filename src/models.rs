use serde::{Deserialize, Serialize};

pub const SYSTEM_PROMPT: &str = "You are a meticulous music curator. \
You reply with JSON only: no prose, no markdown headings, no explanations.";

#[derive(Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
pub struct ChatChoice {
    pub message: ChatContent,
}

#[derive(Deserialize)]
pub struct ChatContent {
    pub content: String,
}

/// The payload the model is asked to produce. Anything without at least one
/// track is treated as an empty result upstream of the quota commit.
#[derive(Debug, Serialize, Deserialize)]
pub struct Tracklist {
    #[serde(default)]
    pub title: Option<String>,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub artist: String,
}
