//! Endpoint configuration for the four collaborating services.
//!
//! Endpoints are read from `~/.config/ragchat/config.toml` when it
//! exists, with environment variables as the fallback. The three
//! required endpoints are a hard startup failure when absent; the file
//! access endpoint is the only optional one and its absence simply
//! disables file-URL resolution.

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::error::{Result, ServiceError};

/// User-Agent header sent on every request to the collaborators.
pub const USER_AGENT: &str = "RAG-ChatBot/1.0";

const AUTH_URL_VAR: &str = "AUTH_API_URL";
const RETRIEVAL_URL_VAR: &str = "RAG_API_URL";
const CHAT_URL_VAR: &str = "CHAT_API_URL";
const FILE_ACCESS_URL_VAR: &str = "FILE_ACCESS_API_URL";

/// Resolved endpoint URLs for the collaborating services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth_url: String,
    pub retrieval_url: String,
    pub chat_url: String,
    /// Optional collaborator; `None` disables file-URL resolution.
    pub file_access_url: Option<String>,
}

/// On-disk shape of `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    endpoints: EndpointsFile,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EndpointsFile {
    auth_url: Option<String>,
    retrieval_url: Option<String>,
    chat_url: Option<String>,
    file_access_url: Option<String>,
}

impl Endpoints {
    /// Loads endpoints from the config file, falling back to
    /// environment variables per field.
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` naming the missing variables when any
    /// required endpoint cannot be resolved. Callers treat this as a
    /// startup failure.
    pub fn load() -> Result<Self> {
        let file = Self::config_path()
            .and_then(|path| Self::read_config_file(&path))
            .unwrap_or_default();
        Self::from_sources(file, |var| env::var(var).ok())
    }

    /// Builds endpoints from environment variables only.
    pub fn from_env() -> Result<Self> {
        Self::from_sources(EndpointsFile::default(), |var| env::var(var).ok())
    }

    fn from_sources<F>(file: EndpointsFile, env_lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |file_value: Option<String>, var: &str| {
            file_value
                .or_else(|| env_lookup(var))
                .map(|value| value.trim().trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
        };

        let auth_url = resolve(file.auth_url, AUTH_URL_VAR);
        let retrieval_url = resolve(file.retrieval_url, RETRIEVAL_URL_VAR);
        let chat_url = resolve(file.chat_url, CHAT_URL_VAR);
        let file_access_url = resolve(file.file_access_url, FILE_ACCESS_URL_VAR);

        match (auth_url, retrieval_url, chat_url) {
            (Some(auth_url), Some(retrieval_url), Some(chat_url)) => Ok(Self {
                auth_url,
                retrieval_url,
                chat_url,
                file_access_url,
            }),
            (auth_url, retrieval_url, chat_url) => {
                let mut missing = Vec::new();
                if auth_url.is_none() {
                    missing.push(AUTH_URL_VAR);
                }
                if retrieval_url.is_none() {
                    missing.push(RETRIEVAL_URL_VAR);
                }
                if chat_url.is_none() {
                    missing.push(CHAT_URL_VAR);
                }
                Err(ServiceError::not_configured(format!(
                    "missing required API endpoints: set {} (or provide them in \
                     ~/.config/ragchat/config.toml)",
                    missing.join(", ")
                )))
            }
        }
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ragchat").join("config.toml"))
    }

    fn read_config_file(path: &PathBuf) -> Option<EndpointsFile> {
        let raw = std::fs::read_to_string(path).ok()?;
        match toml::from_str::<ConfigFile>(&raw) {
            Ok(config) => Some(config.endpoints),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring malformed config file");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |var| {
            pairs
                .iter()
                .find(|(name, _)| *name == var)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn resolves_all_endpoints_from_env() {
        let endpoints = Endpoints::from_sources(
            EndpointsFile::default(),
            env_with(&[
                (AUTH_URL_VAR, "https://auth.example.com/"),
                (RETRIEVAL_URL_VAR, "https://rag.example.com"),
                (CHAT_URL_VAR, "https://chat.example.com"),
                (FILE_ACCESS_URL_VAR, "https://files.example.com"),
            ]),
        )
        .unwrap();

        // Trailing slashes are normalized away.
        assert_eq!(endpoints.auth_url, "https://auth.example.com");
        assert_eq!(
            endpoints.file_access_url.as_deref(),
            Some("https://files.example.com")
        );
    }

    #[test]
    fn file_access_endpoint_is_optional() {
        let endpoints = Endpoints::from_sources(
            EndpointsFile::default(),
            env_with(&[
                (AUTH_URL_VAR, "https://auth.example.com"),
                (RETRIEVAL_URL_VAR, "https://rag.example.com"),
                (CHAT_URL_VAR, "https://chat.example.com"),
            ]),
        )
        .unwrap();
        assert!(endpoints.file_access_url.is_none());
    }

    #[test]
    fn missing_required_endpoint_is_a_hard_failure() {
        let err = Endpoints::from_sources(
            EndpointsFile::default(),
            env_with(&[(AUTH_URL_VAR, "https://auth.example.com")]),
        )
        .unwrap_err();

        match err {
            ServiceError::NotConfigured(message) => {
                assert!(message.contains(RETRIEVAL_URL_VAR));
                assert!(message.contains(CHAT_URL_VAR));
                assert!(!message.contains(AUTH_URL_VAR));
            }
            other => panic!("expected NotConfigured, got {other:?}"),
        }
    }

    #[test]
    fn config_file_takes_priority_over_env() {
        let file = EndpointsFile {
            auth_url: Some("https://auth.file.example.com".into()),
            retrieval_url: None,
            chat_url: None,
            file_access_url: None,
        };
        let endpoints = Endpoints::from_sources(
            file,
            env_with(&[
                (AUTH_URL_VAR, "https://auth.env.example.com"),
                (RETRIEVAL_URL_VAR, "https://rag.example.com"),
                (CHAT_URL_VAR, "https://chat.example.com"),
            ]),
        )
        .unwrap();
        assert_eq!(endpoints.auth_url, "https://auth.file.example.com");
    }

    #[test]
    fn reads_endpoints_from_a_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[endpoints]\nauth_url = \"https://auth.example.com\"\n",
        )
        .unwrap();

        let file = Endpoints::read_config_file(&path).unwrap();
        assert_eq!(file.auth_url.as_deref(), Some("https://auth.example.com"));
        assert!(file.chat_url.is_none());
    }

    #[test]
    fn malformed_config_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "endpoints = [[not toml").unwrap();

        assert!(Endpoints::read_config_file(&path).is_none());
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = Endpoints::from_sources(
            EndpointsFile::default(),
            env_with(&[
                (AUTH_URL_VAR, "   "),
                (RETRIEVAL_URL_VAR, "https://rag.example.com"),
                (CHAT_URL_VAR, "https://chat.example.com"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured(_)));
    }
}
