use serde::{Deserialize, Serialize};

pub const DEFAULT_SENTENCES: u32 = 3;
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;
pub const MAX_HISTORY_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub text: Option<String>,
    pub url: Option<String>,
    #[serde(default = "default_sentences")]
    pub sentences_count: u32,
}

fn default_sentences() -> u32 {
    DEFAULT_SENTENCES
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    pub search: Option<String>,
}

fn default_limit() -> u32 {
    DEFAULT_HISTORY_LIMIT
}

impl HistoryQuery {
    pub fn clamped_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_HISTORY_LIMIT)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
