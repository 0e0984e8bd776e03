//! Capability contracts for framework-managed plugin instances.
//!
//! Units consume these contracts, they never implement them: concrete
//! plugins live behind the framework and are resolved by declared type
//! name (see [`CapabilityRegistry`](crate::registry::CapabilityRegistry)).

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Self-describing build record exposed by every plugin and unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Version recorded at build time.
    pub version: String,
    /// Build timestamp.
    pub built: String,
    /// User or pipeline that produced the build.
    pub builder: String,
    /// Toolchain the build used.
    pub toolchain: String,
}

/// Configuration reader plugin contract.
pub trait ConfigReader: Send {
    /// Load the given configuration file.
    fn load(&mut self, config_file: &str) -> Result<()>;

    /// Raw content of the loaded configuration.
    fn content(&self) -> String;

    /// String value of the given element, empty when absent.
    fn get(&self, element: &str) -> String;

    /// Integer value of the given element, -1 when absent or malformed.
    fn get_int(&self, element: &str) -> i64;

    /// Key/value pairs under the given element.
    fn key_val_pairs(&self, element: &str) -> Option<BTreeMap<String, String>>;

    /// Array of values under the given element.
    fn array(&self, element: &str) -> Option<Vec<String>>;

    /// Build information of the plugin.
    fn info(&self) -> BuildInfo;
}

/// An HTTP request handed to an [`HttpClient`] plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Target URL.
    pub url: String,
    /// Request body. Ignored for GET.
    pub body: Vec<u8>,
    /// Request headers.
    pub headers: BTreeMap<String, String>,
    /// How long to wait for a result.
    pub timeout: Option<Duration>,
}

/// The result of a performed HTTP request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

/// HTTP client plugin contract.
pub trait HttpClient: Send {
    /// Bind the instance to an id for cross-instance correlation.
    fn initialize(&mut self, instance_id: i32) -> bool;

    /// The id set at initialization.
    fn id(&self) -> i32;

    /// Perform a GET request.
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse>;

    /// Perform a POST request.
    fn post(&self, request: &HttpRequest) -> Result<HttpResponse>;

    /// Perform a PUT request.
    fn put(&self, request: &HttpRequest) -> Result<HttpResponse>;

    /// Perform a DELETE request.
    fn delete(&self, request: &HttpRequest) -> Result<HttpResponse>;

    /// Build information of the plugin.
    fn info(&self) -> BuildInfo;
}

/// A WebSocket frame read from or written to a [`WsClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

/// WebSocket client plugin contract.
pub trait WsClient: Send {
    /// Bind the instance to an id for cross-instance correlation.
    fn initialize(&mut self, instance_id: i32) -> bool;

    /// The id set at initialization.
    fn id(&self) -> i32;

    /// Release the underlying connection.
    fn deinitialize(&mut self);

    /// Establish a connection. Returns the HTTP status of the upgrade.
    fn connect(
        &mut self,
        url: &str,
        headers: &BTreeMap<String, Vec<String>>,
        subprotocols: &[String],
        compression: bool,
    ) -> Result<u16>;

    /// Close the connection.
    fn disconnect(&mut self) -> Result<()>;

    /// Check liveness of the connection.
    fn is_connected(&self) -> bool;

    /// Read the next frame.
    fn read(&mut self) -> Result<WsMessage>;

    /// Write a frame.
    fn write(&mut self, message: &WsMessage) -> Result<()>;

    /// Build information of the plugin.
    fn info(&self) -> BuildInfo;
}

/// An email handed to a [`Mailer`] plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailMessage {
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Carbon-copy addresses.
    pub cc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
}

/// Mail client plugin contract.
pub trait Mailer: Send {
    /// Bind the instance to an id for cross-instance correlation.
    fn initialize(&mut self, instance_id: i32) -> bool;

    /// The id set at initialization.
    fn id(&self) -> i32;

    /// Send the given message.
    fn send(&self, message: &MailMessage) -> Result<()>;

    /// Build information of the plugin.
    fn info(&self) -> BuildInfo;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_serde() {
        let info = BuildInfo {
            version: "1.2.0".into(),
            built: "2024-05-01T00:00:00Z".into(),
            builder: "ci".into(),
            toolchain: "1.75.0".into(),
        };

        let json = serde_json::to_string(&info).unwrap();
        let back: BuildInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_http_request_defaults() {
        let req = HttpRequest {
            url: "https://example.test/health".into(),
            ..HttpRequest::default()
        };
        assert!(req.body.is_empty());
        assert!(req.timeout.is_none());
    }
}
