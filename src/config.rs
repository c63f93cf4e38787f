// src/config.rs
use std::time::Duration;

use crate::cli::Cli;
use crate::services::chatbot::EngineSettings;
use crate::services::openai::OpenAiSettings;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Runtime configuration: CLI flags first, then environment, then defaults.
///
/// | Variable          | Default                     |
/// |-------------------|-----------------------------|
/// | `OPENAI_API_KEY`  | unset (no auth header)      |
/// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
/// | `OPENAI_MODEL`    | `gpt-3.5-turbo`             |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub provider_timeout: Duration,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    pub fn resolve(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        Self {
            host: cli.host.clone(),
            port: cli.port,
            model: cli
                .model
                .clone()
                .or_else(|| lookup("OPENAI_MODEL"))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: lookup("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: lookup("OPENAI_API_KEY"),
            provider_timeout: Duration::from_secs(cli.timeout_secs),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn provider_settings(&self) -> OpenAiSettings {
        OpenAiSettings {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            request_timeout: self.provider_timeout,
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            provider_timeout: self.provider_timeout,
            ..EngineSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;

    #[test]
    fn defaults_without_environment() {
        let cli = Cli::parse_from(["typed-chat-backend"]);
        let config = Config::resolve(&cli, |_| None);
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api_key, None);
        assert_eq!(config.provider_timeout, Duration::from_secs(60));
    }

    #[test]
    fn flags_override_environment() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("OPENAI_BASE_URL", "http://localhost:1234/v1"),
            ("OPENAI_API_KEY", ""),
        ]);
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let cli = Cli::parse_from(["typed-chat-backend"]);
        let config = Config::resolve(&cli, lookup);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.base_url, "http://localhost:1234/v1");
        assert_eq!(config.api_key, None);

        let cli = Cli::parse_from(["typed-chat-backend", "--model", "gpt-4o", "--port", "9000"]);
        let config = Config::resolve(&cli, lookup);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.port, 9000);
        assert_eq!(config.provider_settings().model, "gpt-4o");
    }
}
