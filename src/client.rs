use crate::models::{ChatRequest, Error, ModelDescriptor, Result, StreamChunk, TagsResponse, Turn};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};

pub type ChunkStream = BoxStream<'static, StreamChunk>;

/// The remote side of a chat: lists models and streams replies.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>>;

    async fn chat(&self, model: &str, messages: Vec<Turn>) -> Result<ChunkStream>;
}

pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn api_error(response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        // The server reports failures as {"error": "..."}.
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or(body);
        Error::Api(format!("{} {}", status, message).trim().to_string())
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        let url = format!("{}/api/tags", self.base_url);
        log::debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let tags = response.json::<TagsResponse>().await?;
        Ok(tags.models)
    }

    async fn chat(&self, model: &str, messages: Vec<Turn>) -> Result<ChunkStream> {
        let url = format!("{}/api/chat", self.base_url);
        log::debug!("POST {} model={} turns={}", url, model, messages.len());
        let request = ChatRequest {
            model: model.to_string(),
            messages,
            stream: true,
        };
        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(ndjson_chunks(response))
    }
}

/// Splits a byte stream into newline-terminated lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Next complete, non-blank line.
    pub fn next_line(&mut self) -> Option<String> {
        while let Some(i) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=i).collect();
            let line = String::from_utf8_lossy(&line).trim().to_string();
            if !line.is_empty() {
                return Some(line);
            }
        }
        None
    }

    /// Whatever is left once the stream has ended without a trailing newline.
    pub fn finish(&mut self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.buffer).trim().to_string();
        self.buffer.clear();
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}

fn ndjson_chunks(response: reqwest::Response) -> ChunkStream {
    let bytes = response.bytes_stream().boxed();
    let state = (bytes, LineBuffer::default(), false);
    stream::unfold(state, |(mut bytes, mut lines, finished)| async move {
        if finished {
            return None;
        }
        loop {
            if let Some(line) = lines.next_line() {
                if let Some(chunk) = StreamChunk::from_line(&line) {
                    let finished = chunk.is_final();
                    return Some((chunk, (bytes, lines, finished)));
                }
                continue;
            }
            match bytes.next().await {
                Some(Ok(data)) => lines.push(&data),
                Some(Err(e)) => {
                    let chunk = StreamChunk::Error(e.to_string());
                    return Some((chunk, (bytes, lines, true)));
                }
                None => {
                    let chunk = lines
                        .finish()
                        .and_then(|line| StreamChunk::from_line(&line))
                        .unwrap_or_else(|| {
                            StreamChunk::Error("stream ended before the reply completed".to_string())
                        });
                    return Some((chunk, (bytes, lines, true)));
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_reassembles_split_lines() {
        let mut lines = LineBuffer::default();
        lines.push(b"{\"done\":fal");
        assert_eq!(lines.next_line(), None);
        lines.push(b"se}\n\n{\"done\":true}\n{\"tail\"");
        assert_eq!(lines.next_line().as_deref(), Some("{\"done\":false}"));
        assert_eq!(lines.next_line().as_deref(), Some("{\"done\":true}"));
        assert_eq!(lines.next_line(), None);
        assert_eq!(lines.finish().as_deref(), Some("{\"tail\""));
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/");
        assert_eq!(client.base_url(), "http://localhost:11434");
    }
}
