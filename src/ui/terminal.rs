use super::commands::{Command, COMMAND_BOX};
use super::model_picker::{pick_model, PickerMode};
use crate::client::ChatBackend;
use crate::config::{parse_port, ServerConfig};
use crate::exchange;
use crate::models::{Result, Role};
use crate::session::ChatSession;
use crate::speech::Speaker;
use colored::*;
use rustyline::{config::Configurer, error::ReadlineError, DefaultEditor};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use terminal_size::{terminal_size, Width};
use textwrap::wrap;

const WELCOME_MESSAGE: &str = "Ollama Chat. Type a message and press Enter; the reply \
streams in as the model writes it. Messages are sent with the selected role, and the \
whole conversation is sent with every message.";

/// Reads one line, `None` when the user cancels with Ctrl-C or Ctrl-D.
fn read_line(editor: &mut DefaultEditor, prompt: &str, initial: &str) -> Result<Option<String>> {
    match editor.readline_with_initial(prompt, (initial, "")) {
        Ok(line) => Ok(Some(line.trim().to_string())),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Asks for host and port, pre-filled with `defaults`. `None` means cancelled.
pub fn capture_config(defaults: &ServerConfig) -> Result<Option<ServerConfig>> {
    let mut editor = DefaultEditor::new()?;
    println!("{}", "Server Configuration".green().bold());

    let host = match read_line(&mut editor, "Host: ", &defaults.host)? {
        Some(host) if host.is_empty() => defaults.host.clone(),
        Some(host) => host,
        None => return Ok(None),
    };

    let default_port = defaults.port.to_string();
    let port = loop {
        let text = match read_line(&mut editor, "Port: ", &default_port)? {
            Some(text) if text.is_empty() => break defaults.port,
            Some(text) => text,
            None => return Ok(None),
        };
        match parse_port(&text) {
            Ok(port) => break port,
            Err(e) => println!("{}", e.to_string().red()),
        }
    };

    Ok(Some(ServerConfig {
        host,
        port,
        speech_command: defaults.speech_command.clone(),
    }))
}

pub struct TerminalUI {
    backend: Arc<dyn ChatBackend>,
    session: ChatSession,
    role: Role,
    editor: DefaultEditor,
    history_file: PathBuf,
    width: usize,
}

impl TerminalUI {
    pub fn new(backend: Arc<dyn ChatBackend>, speaker: Box<dyn Speaker>) -> Result<Self> {
        let width = match terminal_size() {
            Some((Width(w), _)) => (w as usize).saturating_sub(2),
            None => 80,
        };

        let mut editor = DefaultEditor::new()?;
        editor.set_max_history_size(100)?;

        let history_file = dirs::home_dir()
            .map(|mut path| {
                path.push(".ollama_chat_history");
                path
            })
            .unwrap_or_else(|| ".ollama_chat_history".into());

        if history_file.exists() {
            let _ = editor.load_history(&history_file);
        }

        Ok(Self {
            backend,
            session: ChatSession::new(speaker),
            role: Role::User,
            editor,
            history_file,
            width,
        })
    }

    /// Mandatory first model choice. `false` means the user backed out and
    /// the application should close.
    pub async fn select_initial_model(&mut self) -> Result<bool> {
        let choice = pick_model(
            &mut self.editor,
            self.backend.as_ref(),
            None,
            PickerMode::Required,
            self.width,
        )
        .await?;
        match choice {
            Some(model) => {
                self.session.set_model(model);
                Ok(true)
            }
            None => {
                println!("{}", "No model selected, exiting.".yellow());
                Ok(false)
            }
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.show_welcome_message()?;

        loop {
            let prompt = format!("{}", "> ".blue().bold());
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let command = line.parse::<Command>().unwrap_or_else(|_| Command::Message(line));
                    match command {
                        Command::Exit => {
                            let _ = self.editor.save_history(&self.history_file);
                            break;
                        }
                        Command::Clear => {
                            clearscreen::clear()?;
                            self.show_command_box();
                        }
                        Command::New => match self.session.clear() {
                            Ok(()) => {
                                clearscreen::clear()?;
                                self.show_command_box();
                                println!("{}", "Starting a fresh conversation...".green());
                            }
                            Err(e) => self.show_error(&e.to_string()),
                        },
                        Command::Models => self.manage_models().await,
                        Command::Help => self.show_command_box(),
                        Command::Role(Some(role)) => {
                            self.role = role;
                            println!("{}", format!("Sending as {}.", role).green());
                        }
                        Command::Role(None) => {
                            println!("Sending as {}. Use `/role user|assistant|system`.", self.role);
                        }
                        Command::Save(Some(path)) => self.save_transcript(path),
                        Command::Save(None) => println!("Use `/save <file>`."),
                        Command::Speech(Some(enabled)) => {
                            self.session.set_speech_enabled(enabled);
                            let state = if enabled { "on" } else { "off" };
                            println!("{}", format!("Speech {}.", state).green());
                        }
                        Command::Speech(None) => println!("Use `/speech on` or `/speech off`."),
                        Command::Message(input) => {
                            if !input.trim().is_empty() {
                                self.editor.add_history_entry(&input)?;
                                self.handle_message(&input).await?;
                            }
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Use 'exit' to quit");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    println!("Error: {}", err);
                    break;
                }
            }
        }

        Ok(())
    }

    fn show_welcome_message(&self) -> Result<()> {
        clearscreen::clear()?;
        for line in wrap(WELCOME_MESSAGE, self.width) {
            println!("{}", line.cyan());
        }
        println!();
        self.show_command_box();
        self.show_status();
        Ok(())
    }

    fn show_command_box(&self) {
        println!("{}", COMMAND_BOX.green());
        println!();
    }

    fn show_status(&self) {
        let model = self.session.model().unwrap_or("none");
        println!("{}", format!("Model: {}  Role: {}", model, self.role).dimmed());
    }

    fn show_error(&self, message: &str) {
        for line in wrap(&format!("Error: {}", message), self.width) {
            println!("{}", line.red());
        }
    }

    async fn manage_models(&mut self) {
        let current = self.session.model().map(str::to_string);
        let choice = pick_model(
            &mut self.editor,
            self.backend.as_ref(),
            current.as_deref(),
            PickerMode::Optional,
            self.width,
        )
        .await;
        match choice {
            Ok(Some(model)) => self.session.set_model(model),
            Ok(None) => {}
            Err(e) => self.show_error(&e.to_string()),
        }
        self.show_status();
    }

    fn save_transcript(&self, path: PathBuf) {
        match self.session.save_transcript(&path) {
            Ok(()) => println!("{}", format!("Transcript saved to {}.", path.display()).green()),
            Err(e) => self.show_error(&e.to_string()),
        }
    }

    async fn handle_message(&mut self, input: &str) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let sent = exchange::run(&mut self.session, backend, self.role, input, |text| {
            print!("{}", text.cyan());
            let _ = io::stdout().flush();
        })
        .await;

        if let Err(e) = sent {
            self.show_error(&e.to_string());
        }
        io::stdout().flush()?;
        Ok(())
    }
}
