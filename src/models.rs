use rustyline::error::ReadlineError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Label written in front of a turn in the transcript.
    pub fn prefix(self) -> &'static str {
        match self {
            Role::User => "You: ",
            Role::Assistant => "AI: ",
            Role::System => "System: ",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(Error::UnknownRole(other.to_string())),
        }
    }
}

/// One role-tagged message of the conversation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Turn>,
    pub stream: bool,
}

/// A model installed on the server, as reported by `/api/tags`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: String,
}

impl ModelDescriptor {
    pub fn human_size(&self) -> String {
        const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
        let mut value = self.size as f64;
        let mut unit = 0;
        while value >= 1000.0 && unit < UNITS.len() - 1 {
            value /= 1000.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{} B", self.size)
        } else {
            format!("{:.1} {}", value, UNITS[unit])
        }
    }

    /// Modification time as `YYYY-MM-DD HH:MM`, or the raw text when it is not RFC 3339.
    pub fn modified_display(&self) -> String {
        chrono::DateTime::parse_from_rfc3339(&self.modified_at)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|_| self.modified_at.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
}

/// One incremental unit of a streamed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    Content { role: Role, content: String },
    Done,
    Error(String),
}

impl StreamChunk {
    pub fn is_final(&self) -> bool {
        !matches!(self, StreamChunk::Content { .. })
    }

    /// Decodes one NDJSON line of a `/api/chat` stream. Lines carrying
    /// neither an error nor a `done` flag yield `None`.
    pub fn from_line(line: &str) -> Option<StreamChunk> {
        let event: ChatStreamEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("malformed stream line {:?}: {}", line, e);
                return Some(StreamChunk::Error(format!("malformed response: {}", e)));
            }
        };
        if let Some(error) = event.error {
            return Some(StreamChunk::Error(error));
        }
        match event.done {
            Some(false) => {
                let message = event.message.unwrap_or_default();
                // Roles outside the conversation's three (e.g. "tool") are shown as the model's.
                let role = message
                    .role
                    .and_then(|r| r.parse().ok())
                    .unwrap_or(Role::Assistant);
                Some(StreamChunk::Content {
                    role,
                    content: message.content,
                })
            }
            Some(true) => Some(StreamChunk::Done),
            None => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatStreamEvent {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<StreamMessage>,
    #[serde(default)]
    done: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: String,
}

// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("API error: {0}")]
    Api(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Terminal error: {0}")]
    Terminal(#[from] clearscreen::Error),
    #[error("Readline error: {0}")]
    Readline(String),
    #[error("Invalid port {0:?}: expected a number between 1 and 65535")]
    InvalidPort(String),
    #[error("Unknown role {0:?}: expected user, assistant or system")]
    UnknownRole(String),
    #[error("Message is empty")]
    EmptyMessage,
    #[error("No model selected")]
    NoModel,
    #[error("A reply is still streaming")]
    SendInFlight,
    #[error("No reply is streaming")]
    NotStreaming,
}

impl From<ReadlineError> for Error {
    fn from(err: ReadlineError) -> Self {
        Error::Readline(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
