use crate::client::ChatBackend;
use crate::models::{Result, Role, StreamChunk, Turn};
use crate::session::ChatSession;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Starts the one worker task of a send. It streams the reply and forwards
/// every chunk, stopping after the first terminal or error chunk.
pub fn spawn_worker(
    backend: Arc<dyn ChatBackend>,
    model: String,
    messages: Vec<Turn>,
) -> mpsc::UnboundedReceiver<StreamChunk> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut chunks = match backend.chat(&model, messages).await {
            Ok(chunks) => chunks,
            Err(e) => {
                let _ = tx.send(StreamChunk::Error(e.to_string()));
                return;
            }
        };
        while let Some(chunk) = chunks.next().await {
            let last = chunk.is_final();
            if tx.send(chunk).is_err() || last {
                break;
            }
        }
    });
    rx
}

/// Sends one turn and applies the streamed reply to `session`, reporting
/// each piece of transcript text through `on_display`.
pub async fn run(
    session: &mut ChatSession,
    backend: Arc<dyn ChatBackend>,
    role: Role,
    text: &str,
    mut on_display: impl FnMut(&str),
) -> Result<()> {
    let outgoing = session.begin_send(role, text)?;
    on_display(&outgoing.display);

    let mut chunks = spawn_worker(backend, outgoing.model, outgoing.messages);
    while let Some(chunk) = chunks.recv().await {
        let update = session.apply(chunk)?;
        on_display(&update.display);
        if update.finished {
            return Ok(());
        }
    }

    let update = session.abort("stream ended before the reply completed")?;
    on_display(&update.display);
    Ok(())
}
