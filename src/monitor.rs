//! Monitoring message and log level types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Log levels, ordered most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    /// Unrecoverable failure; the process cannot continue.
    Fatal,
    /// A panic-equivalent failure inside a unit.
    Panic,
    /// An operation failed.
    Error,
    /// Something unexpected but tolerable happened.
    Warn,
    /// Routine operational information.
    Info,
    /// Developer diagnostics.
    Debug,
}

impl LogLevel {
    /// Map to the nearest `tracing` level.
    ///
    /// `Fatal` and `Panic` have no tracing equivalent and map to `ERROR`.
    pub fn as_tracing(&self) -> tracing::Level {
        match self {
            Self::Fatal | Self::Panic | Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fatal => "fatal",
            Self::Panic => "panic",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        };
        write!(f, "{}", name)
    }
}

/// Structured status record broadcast upward for observability tooling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorMessage {
    /// Application identifier.
    pub app_id: String,
    /// Composite unit instance identifier.
    pub id: String,
    /// Current status text.
    pub status: String,
    /// Free-form key/value details.
    pub info: BTreeMap<String, String>,
}

impl MonitorMessage {
    /// Create a message with an empty info map.
    pub fn new(
        app_id: impl Into<String>,
        id: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            id: id.into(),
            status: status.into(),
            info: BTreeMap::new(),
        }
    }

    /// Add an info entry.
    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }

    /// Serialize to JSON bytes.
    ///
    /// Returns `None` on serialization failure; monitoring messages are
    /// dropped silently rather than surfaced as errors.
    pub fn encode(&self) -> Option<Vec<u8>> {
        match serde_json::to_vec(self) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!("dropping monitor message: {}", e);
                None
            }
        }
    }
}
