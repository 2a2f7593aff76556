use crate::collaborators::InMemoryDirectory;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid TIMETABLE_BIND_ADDR '{value}': {source}")]
    BindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("cannot read directory file {}: {source}", .path.display())]
    DirectoryRead { path: PathBuf, source: std::io::Error },
    #[error("cannot parse directory file {}: {source}", .path.display())]
    DirectoryParse { path: PathBuf, source: serde_json::Error },
}

/// Server settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub log_filter: String,
    pub directory_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = lookup("TIMETABLE_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = value
            .parse()
            .map_err(|source| ConfigError::BindAddr { value: value.clone(), source })?;
        let log_filter = lookup("TIMETABLE_LOG")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let directory_path = lookup("TIMETABLE_DIRECTORY")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        Ok(Self {
            bind_addr,
            log_filter,
            directory_path,
        })
    }

    /// The preloaded directory, or an empty one when no file is configured.
    pub fn load_directory(&self) -> Result<InMemoryDirectory, ConfigError> {
        let Some(path) = &self.directory_path else {
            return Ok(InMemoryDirectory::new());
        };
        let text = fs::read_to_string(path).map_err(|source| ConfigError::DirectoryRead {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::DirectoryParse {
            path: path.clone(),
            source,
        })
    }
}
