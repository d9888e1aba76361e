use crate::models::Role;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Exit,
    Clear,
    New,
    Models,
    Help,
    Role(Option<Role>),
    Save(Option<PathBuf>),
    Speech(Option<bool>),
    Message(String),
}

impl FromStr for Command {
    type Err = ();

    /// Bare words are commands only when they make up the whole line.
    /// Commands with an argument need a leading `/`, so a message such as
    /// "save the whales" still goes to the model.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(command) = s.strip_prefix('/') else {
            return Ok(match s.to_lowercase().as_str() {
                "exit" => Command::Exit,
                "clear" => Command::Clear,
                "new" => Command::New,
                "models" => Command::Models,
                "help" => Command::Help,
                _ => Command::Message(s.to_string()),
            });
        };

        let (word, rest) = match command.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (command, ""),
        };
        Ok(match (word.to_lowercase().as_str(), rest) {
            ("exit", "") => Command::Exit,
            ("clear", "") => Command::Clear,
            ("new", "") => Command::New,
            ("models", "") => Command::Models,
            ("help", "") => Command::Help,
            ("role", "") => Command::Role(None),
            ("role", role) => Command::Role(role.parse().ok()),
            ("save", "") => Command::Save(None),
            ("save", path) => Command::Save(Some(PathBuf::from(path))),
            ("speech", "on") => Command::Speech(Some(true)),
            ("speech", "off") => Command::Speech(Some(false)),
            ("speech", _) => Command::Speech(None),
            _ => Command::Help,
        })
    }
}

pub const COMMAND_BOX: &str = "\
┌───────────────────────────────────────────────┐\n\
│              Available Commands               │\n\
├───────────────────────────────────────────────┤\n\
│  `exit`           - Quit the application      │\n\
│  `clear`          - Clear the screen          │\n\
│  `new`            - Start a new chat          │\n\
│  `models`         - Choose another model      │\n\
│  `/role <name>`   - user, assistant or system │\n\
│  `/save <file>`   - Save the transcript       │\n\
│  `/speech on|off` - Toggle announcements      │\n\
└───────────────────────────────────────────────┘";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!("EXIT".parse::<Command>(), Ok(Command::Exit));
        assert_eq!(" models ".parse::<Command>(), Ok(Command::Models));
        assert_eq!("/new".parse::<Command>(), Ok(Command::New));
        assert_eq!("/role system".parse::<Command>(), Ok(Command::Role(Some(Role::System))));
        assert_eq!("/role robot".parse::<Command>(), Ok(Command::Role(None)));
        assert_eq!(
            "/save chat log.txt".parse::<Command>(),
            Ok(Command::Save(Some(PathBuf::from("chat log.txt"))))
        );
        assert_eq!("/speech off".parse::<Command>(), Ok(Command::Speech(Some(false))));
        assert_eq!("/frobnicate".parse::<Command>(), Ok(Command::Help));
    }

    #[test]
    fn everything_else_is_a_message() {
        for text in [
            "exit the loop please",
            "Hello",
            "save the whales please",
            "save",
            "role of enzymes in digestion?",
            "role system",
            "speech on",
            "speech therapy for toddlers",
        ] {
            assert_eq!(
                text.parse::<Command>(),
                Ok(Command::Message(text.to_string())),
                "{:?}",
                text
            );
        }
    }
}
