use crate::models::{Error, Result};
use std::env;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 11434;

/// Where the model server lives, plus the optional speech program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub speech_command: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            speech_command: None,
        }
    }
}

impl ServerConfig {
    /// Defaults, overridden by `OLLAMA_CHAT_HOST`, `OLLAMA_CHAT_PORT` and
    /// `OLLAMA_CHAT_SPEECH` when they are set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(host) = non_empty_var("OLLAMA_CHAT_HOST") {
            config.host = host;
        }
        if let Some(port) = non_empty_var("OLLAMA_CHAT_PORT") {
            match parse_port(&port) {
                Ok(port) => config.port = port,
                Err(e) => log::warn!("ignoring OLLAMA_CHAT_PORT: {}", e),
            }
        }
        config.speech_command = non_empty_var("OLLAMA_CHAT_SPEECH");
        config
    }

    /// `http://host:port`. A host that already carries a scheme keeps it,
    /// and a host that already names a port keeps that port.
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        let (scheme, rest) = host.split_once("://").unwrap_or(("http", host));
        let (authority, path) = match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, ""),
        };
        if names_port(authority) {
            format!("{}://{}{}", scheme, authority, path)
        } else {
            format!("{}://{}:{}{}", scheme, authority, self.port, path)
        }
    }
}

fn names_port(authority: &str) -> bool {
    authority
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
}

pub fn parse_port(text: &str) -> Result<u16> {
    match text.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(Error::InvalidPort(text.trim().to_string())),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_parsing_rejects_garbage() {
        assert_eq!(parse_port(" 11434 ").unwrap(), 11434);
        assert!(matches!(parse_port("abc"), Err(Error::InvalidPort(_))));
        assert!(matches!(parse_port("0"), Err(Error::InvalidPort(_))));
        assert!(matches!(parse_port("70000"), Err(Error::InvalidPort(_))));
    }

    #[test]
    fn base_url_from_host_and_port() {
        let config = ServerConfig::default();
        assert_eq!(config.base_url(), "http://localhost:11434");

        let config = ServerConfig {
            host: "https://models.example.net/".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(config.base_url(), "https://models.example.net:11434");
    }

    #[test]
    fn prompted_port_applies_to_host_with_scheme() {
        let config = ServerConfig {
            host: "http://localhost".to_string(),
            port: 8080,
            ..ServerConfig::default()
        };
        assert_eq!(config.base_url(), "http://localhost:8080");

        let config = ServerConfig {
            host: "https://gpu-box/ollama".to_string(),
            port: 8443,
            ..ServerConfig::default()
        };
        assert_eq!(config.base_url(), "https://gpu-box:8443/ollama");
    }

    #[test]
    fn port_in_host_wins() {
        let config = ServerConfig {
            host: "http://localhost:9000".to_string(),
            port: 8080,
            ..ServerConfig::default()
        };
        assert_eq!(config.base_url(), "http://localhost:9000");

        let config = ServerConfig {
            host: "[::1]".to_string(),
            port: 8080,
            ..ServerConfig::default()
        };
        assert_eq!(config.base_url(), "http://[::1]:8080");

        let config = ServerConfig {
            host: "[::1]:9000".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(config.base_url(), "http://[::1]:9000");
    }
}
