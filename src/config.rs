//! Server configuration parsed from environment variables.
//!
//! `main` loads `.env` through `dotenvy` first, so everything here can also be
//! set from a file. Parsing goes through a lookup function so tests can feed
//! a map instead of mutating the process environment.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::services::snapshot::is_valid_name;

pub const DEFAULT_BIND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_SNAPSHOT_DIR: &str = "drawings";
pub const DEFAULT_SESSION: &str = "default";
pub const DEFAULT_SESSION_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?} ({reason})")]
    Invalid { var: &'static str, value: String, reason: String },
    #[error("unknown SNAPSHOT_BACKEND: {0:?} (expected 'file' or 'memory')")]
    UnknownBackend(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotBackend {
    File { dir: PathBuf },
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub snapshot_backend: SnapshotBackend,
    pub default_session: String,
    pub session_queue_capacity: usize,
    pub client_channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR,
            port: DEFAULT_PORT,
            snapshot_backend: SnapshotBackend::File { dir: PathBuf::from(DEFAULT_SNAPSHOT_DIR) },
            default_session: DEFAULT_SESSION.to_owned(),
            session_queue_capacity: DEFAULT_SESSION_QUEUE_CAPACITY,
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Build typed config from the process environment.
    ///
    /// Optional:
    /// - `BIND_ADDR`: default `0.0.0.0`
    /// - `PORT`: default 5001
    /// - `SNAPSHOT_BACKEND`: `file` (default) or `memory`
    /// - `SNAPSHOT_DIR`: default `drawings`, used by the file backend
    /// - `DEFAULT_SESSION`: session joined by `/ws`, default `default`
    /// - `SESSION_QUEUE_CAPACITY`: per-session command queue, default 1024
    /// - `CLIENT_CHANNEL_CAPACITY`: per-client outbound queue, default 256
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is present but malformed.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = env_parse(&lookup, "BIND_ADDR", DEFAULT_BIND_ADDR)?;
        let port = env_parse(&lookup, "PORT", DEFAULT_PORT)?;

        let snapshot_dir = lookup("SNAPSHOT_DIR").unwrap_or_else(|| DEFAULT_SNAPSHOT_DIR.to_owned());
        let snapshot_backend = match lookup("SNAPSHOT_BACKEND").as_deref().map(str::trim) {
            None | Some("" | "file") => SnapshotBackend::File { dir: PathBuf::from(snapshot_dir) },
            Some("memory") => SnapshotBackend::Memory,
            Some(other) => return Err(ConfigError::UnknownBackend(other.to_owned())),
        };

        let default_session = match lookup("DEFAULT_SESSION") {
            Some(raw) if !raw.trim().is_empty() => raw.trim().to_owned(),
            _ => DEFAULT_SESSION.to_owned(),
        };
        // `/ws` joins this id, so it must pass the same check as `/ws/{session_id}`.
        if !is_valid_name(&default_session) {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_SESSION",
                value: default_session,
                reason: "expected 1-128 chars of [A-Za-z0-9_.-], not starting with '.'".into(),
            });
        }

        let session_queue_capacity =
            env_parse_capacity(&lookup, "SESSION_QUEUE_CAPACITY", DEFAULT_SESSION_QUEUE_CAPACITY)?;
        let client_channel_capacity =
            env_parse_capacity(&lookup, "CLIENT_CHANNEL_CAPACITY", DEFAULT_CLIENT_CHANNEL_CAPACITY)?;

        Ok(Self { bind_addr, port, snapshot_backend, default_session, session_queue_capacity, client_channel_capacity })
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::Invalid { var, value: raw.clone(), reason: e.to_string() }),
    }
}

/// Tokio channels panic on zero capacity, so zero is rejected here.
fn env_parse_capacity(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: usize,
) -> Result<usize, ConfigError> {
    let value = env_parse(lookup, var, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid { var, value: "0".into(), reason: "must be at least 1".into() });
    }
    Ok(value)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
