use crate::models::{Error, Result, Role, StreamChunk, Turn};
use crate::speech::{Announcer, Speaker};
use std::path::Path;

/// What a send hands to the worker, plus the echo to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub model: String,
    pub messages: Vec<Turn>,
    pub display: String,
}

/// Result of applying one chunk: text to show, and whether the exchange is over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Update {
    pub display: String,
    pub finished: bool,
}

#[derive(Debug, Default)]
struct Exchange {
    output: String,
    prefixed: bool,
}

/// A conversation with one model: turn history, the visible transcript,
/// and the reply currently streaming, if any.
pub struct ChatSession {
    history: Vec<Turn>,
    model: Option<String>,
    transcript: String,
    exchange: Option<Exchange>,
    announcer: Announcer,
    speaker: Box<dyn Speaker>,
}

impl ChatSession {
    pub fn new(speaker: Box<dyn Speaker>) -> Self {
        Self {
            history: Vec::new(),
            model: None,
            transcript: String::new(),
            exchange: None,
            announcer: Announcer::default(),
            speaker,
        }
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        let model = model.into();
        log::info!("active model: {}", model);
        self.model = Some(model);
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn is_streaming(&self) -> bool {
        self.exchange.is_some()
    }

    pub fn set_speech_enabled(&mut self, enabled: bool) {
        self.announcer.set_enabled(enabled);
    }

    /// Records a new turn and opens an exchange for its reply.
    pub fn begin_send(&mut self, role: Role, text: &str) -> Result<Outgoing> {
        if self.exchange.is_some() {
            return Err(Error::SendInFlight);
        }
        if text.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }
        let model = self.model.clone().ok_or(Error::NoModel)?;

        self.history.push(Turn::new(role, text));
        let display = format!("{}{}\n", role.prefix(), text);
        self.append(&display);

        self.exchange = Some(Exchange::default());
        self.announcer.start_streaming();

        Ok(Outgoing {
            model,
            messages: self.history.clone(),
            display,
        })
    }

    pub fn apply(&mut self, chunk: StreamChunk) -> Result<Update> {
        let exchange = self.exchange.as_mut().ok_or(Error::NotStreaming)?;
        match chunk {
            StreamChunk::Content { role, content } => {
                let mut display = String::new();
                if !exchange.prefixed {
                    exchange.prefixed = true;
                    display.push_str(role.prefix());
                }
                exchange.output.push_str(&content);
                display.push_str(&content);
                self.append(&display);
                Ok(Update {
                    display,
                    finished: false,
                })
            }
            StreamChunk::Done => {
                let output = std::mem::take(&mut exchange.output);
                self.history.push(Turn::new(Role::Assistant, output));
                let display = "\n".to_string();
                self.append(&display);
                self.finish();
                Ok(Update {
                    display,
                    finished: true,
                })
            }
            StreamChunk::Error(message) => Ok(self.fail(&message)),
        }
    }

    /// The stream stopped without a terminal chunk.
    pub fn abort(&mut self, reason: &str) -> Result<Update> {
        if self.exchange.is_none() {
            return Err(Error::NotStreaming);
        }
        Ok(self.fail(reason))
    }

    /// Forgets the conversation. Not allowed while a reply streams.
    pub fn clear(&mut self) -> Result<()> {
        if self.exchange.is_some() {
            return Err(Error::SendInFlight);
        }
        self.history.clear();
        self.transcript.clear();
        self.announcer.clear();
        Ok(())
    }

    pub fn save_transcript(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.transcript)?;
        log::info!("transcript saved to {}", path.display());
        Ok(())
    }

    fn fail(&mut self, message: &str) -> Update {
        let prefixed = self.exchange.as_ref().is_some_and(|e| e.prefixed);
        let mut display = String::new();
        if prefixed {
            display.push('\n');
        }
        display.push_str(&format!("{}error, {}\n", Role::Assistant.prefix(), message));
        self.append(&display);
        self.finish();
        Update {
            display,
            finished: true,
        }
    }

    fn finish(&mut self) {
        self.exchange = None;
        if let Some(announcement) = self.announcer.stop_streaming() {
            self.speaker.speak(&announcement.text, announcement.interrupt);
        }
    }

    fn append(&mut self, text: &str) {
        self.transcript.push_str(text);
        if let Some(announcement) = self.announcer.push(text) {
            self.speaker.speak(&announcement.text, announcement.interrupt);
        }
    }
}
