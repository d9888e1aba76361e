//! Spoken announcements of transcript text.
//!
//! While a reply streams, text is collected by an [`Announcer`] and handed to
//! the [`Speaker`] in batches of at least [`ANNOUNCE_WORDS`] words, so the
//! speech program is not restarted for every fragment. Anything still pending
//! when streaming stops is flushed without interrupting.

use std::collections::VecDeque;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

pub const ANNOUNCE_WORDS: usize = 10;

/// Best-effort text-to-speech sink.
pub trait Speaker: Send {
    fn speak(&mut self, text: &str, interrupt: bool);
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak(&mut self, _text: &str, _interrupt: bool) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub text: String,
    pub interrupt: bool,
}

#[derive(Debug)]
pub struct Announcer {
    pending: String,
    streaming: bool,
    enabled: bool,
}

impl Default for Announcer {
    fn default() -> Self {
        Self {
            pending: String::new(),
            streaming: false,
            enabled: true,
        }
    }
}

impl Announcer {
    #[cfg(test)]
    fn is_streaming(&self) -> bool {
        self.streaming
    }

    #[cfg(test)]
    fn pending(&self) -> &str {
        &self.pending
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.pending.clear();
        }
    }

    /// Text appended to the transcript.
    pub fn push(&mut self, text: &str) -> Option<Announcement> {
        if !self.enabled || text.is_empty() {
            return None;
        }
        if !self.streaming {
            return Some(Announcement {
                text: text.to_string(),
                interrupt: true,
            });
        }
        self.pending.push_str(text);
        self.flush_complete_words()
    }

    pub fn start_streaming(&mut self) {
        self.streaming = true;
    }

    /// Leaves streaming mode, returning whatever was still buffered.
    pub fn stop_streaming(&mut self) -> Option<Announcement> {
        self.streaming = false;
        self.flush()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Announces everything up to the last whitespace once that prefix holds
    /// enough words. A trailing fragment may be the start of a longer word,
    /// so it stays pending.
    fn flush_complete_words(&mut self) -> Option<Announcement> {
        let boundary = self.pending.rfind(char::is_whitespace)?;
        if self.pending[..boundary].split_whitespace().count() < ANNOUNCE_WORDS {
            return None;
        }
        let end = boundary + self.pending[boundary..].chars().next().map_or(1, char::len_utf8);
        let rest = self.pending.split_off(end);
        Some(Announcement {
            text: std::mem::replace(&mut self.pending, rest),
            interrupt: false,
        })
    }

    fn flush(&mut self) -> Option<Announcement> {
        if self.pending.trim().is_empty() {
            self.pending.clear();
            return None;
        }
        Some(Announcement {
            text: std::mem::take(&mut self.pending),
            interrupt: false,
        })
    }
}

enum SpeechJob {
    Say(String),
    Interrupt(String),
}

/// Speaks through an external program such as `spd-say`, `espeak` or `say`,
/// one utterance at a time, from a background task.
pub struct CommandSpeaker {
    jobs: mpsc::UnboundedSender<SpeechJob>,
}

impl CommandSpeaker {
    /// `command` is split on whitespace; the text is passed as the last
    /// argument. Needs a running tokio runtime.
    pub fn new(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        let args: Vec<String> = parts.collect();
        let runtime = Handle::try_current()
            .map_err(|e| log::warn!("speech disabled: {}", e))
            .ok()?;
        let (jobs, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_speech(program, args, rx));
        Some(Self { jobs })
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&mut self, text: &str, interrupt: bool) {
        let job = if interrupt {
            SpeechJob::Interrupt(text.to_string())
        } else {
            SpeechJob::Say(text.to_string())
        };
        if self.jobs.send(job).is_err() {
            log::warn!("speech task has exited");
        }
    }
}

enum Wake {
    Job(Option<SpeechJob>),
    Spoken,
}

async fn run_speech(program: String, args: Vec<String>, mut jobs: mpsc::UnboundedReceiver<SpeechJob>) {
    let mut queue: VecDeque<String> = VecDeque::new();
    let mut current: Option<Child> = None;

    loop {
        if current.is_none() {
            if let Some(text) = queue.pop_front() {
                current = spawn_utterance(&program, &args, &text);
                continue;
            }
        }

        let wake = match current.as_mut() {
            Some(child) => tokio::select! {
                job = jobs.recv() => Wake::Job(job),
                _ = child.wait() => Wake::Spoken,
            },
            None => Wake::Job(jobs.recv().await),
        };

        match wake {
            Wake::Spoken => current = None,
            Wake::Job(None) => break,
            Wake::Job(Some(SpeechJob::Say(text))) => queue.push_back(text),
            Wake::Job(Some(SpeechJob::Interrupt(text))) => {
                queue.clear();
                if let Some(mut child) = current.take() {
                    let _ = child.kill().await;
                }
                queue.push_back(text);
            }
        }
    }
}

fn spawn_utterance(program: &str, args: &[String], text: &str) -> Option<Child> {
    Command::new(program)
        .args(args)
        .arg(text)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| log::warn!("speech program {} failed: {}", program, e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speaks_immediately_when_not_streaming() {
        let mut announcer = Announcer::default();
        assert_eq!(
            announcer.push("You: Hello\n"),
            Some(Announcement {
                text: "You: Hello\n".to_string(),
                interrupt: true
            })
        );
        assert_eq!(announcer.pending(), "");
    }

    #[test]
    fn holds_text_below_ten_words() {
        let mut announcer = Announcer::default();
        announcer.start_streaming();
        for word in ["one ", "two ", "three ", "four ", "five ", "six ", "seven ", "eight ", "nine "] {
            assert_eq!(announcer.push(word), None);
        }
        assert_eq!(announcer.pending().split_whitespace().count(), 9);

        // "ten" may still grow into a longer word.
        assert_eq!(announcer.push("ten"), None);
        let flushed = announcer.push(" eleven").unwrap();
        assert!(!flushed.interrupt);
        assert_eq!(flushed.text, "one two three four five six seven eight nine ten ");
        assert_eq!(announcer.pending(), "eleven");
    }

    #[test]
    fn never_splits_a_streamed_word() {
        let mut announcer = Announcer::default();
        announcer.start_streaming();
        assert_eq!(announcer.push("one two three four five six seven eight nine te"), None);
        let flushed = announcer.push("n eleven").unwrap();
        assert_eq!(flushed.text, "one two three four five six seven eight nine ten ");
        assert_eq!(
            announcer.stop_streaming(),
            Some(Announcement {
                text: "eleven".to_string(),
                interrupt: false
            })
        );
    }

    #[test]
    fn word_count_ignores_fragment_boundaries() {
        let mut announcer = Announcer::default();
        announcer.start_streaming();
        // "Hel" + "lo" is one word.
        assert_eq!(announcer.push("Hel"), None);
        assert_eq!(announcer.push("lo"), None);
        assert_eq!(announcer.pending(), "Hello");
    }

    #[test]
    fn stop_flushes_remainder_and_empty_is_noop() {
        let mut announcer = Announcer::default();
        announcer.start_streaming();
        announcer.push("short reply");
        assert_eq!(
            announcer.stop_streaming(),
            Some(Announcement {
                text: "short reply".to_string(),
                interrupt: false
            })
        );
        assert!(!announcer.is_streaming());

        announcer.start_streaming();
        assert_eq!(announcer.stop_streaming(), None);
    }

    #[test]
    fn disabled_announcer_is_silent() {
        let mut announcer = Announcer::default();
        announcer.set_enabled(false);
        assert_eq!(announcer.push("anything"), None);
        announcer.start_streaming();
        announcer.push("a b c d e f g h i j k");
        assert_eq!(announcer.stop_streaming(), None);
    }

    #[test]
    fn blank_command_has_no_speaker() {
        assert!(CommandSpeaker::new("   ").is_none());
    }

    #[test]
    fn command_speaker_needs_a_runtime() {
        assert!(CommandSpeaker::new("espeak").is_none());
    }

    #[tokio::test]
    async fn missing_program_is_tolerated() {
        let mut speaker = CommandSpeaker::new("ollama-chat-no-such-speech-program --rate 2")
            .expect("runtime is running");
        speaker.speak("hello", false);
        speaker.speak("again", true);
        tokio::task::yield_now().await;
        speaker.speak("still accepted", false);
    }
}
