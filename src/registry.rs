//! Capability factory registry keyed by declared type name.
//!
//! Owned by the framework side: a framework implementation registers one
//! factory per plugin type name ("rest_v1", "ws_compressed", ...) and
//! resolves unit acquisitions against it. Units never touch the registry
//! directly; they go through [`AppFramework`](crate::framework::AppFramework).

use dashmap::DashMap;

use crate::capability::{ConfigReader, HttpClient, Mailer, WsClient};
use crate::error::{Error, Result};

type HttpFactory = Box<dyn Fn() -> Result<Box<dyn HttpClient>> + Send + Sync>;
type WsFactory = Box<dyn Fn() -> Result<Box<dyn WsClient>> + Send + Sync>;
type MailerFactory = Box<dyn Fn() -> Result<Box<dyn Mailer>> + Send + Sync>;
type ConfigFactory = Box<dyn Fn() -> Result<Box<dyn ConfigReader>> + Send + Sync>;

/// Runtime registry of capability factories.
///
/// Each resolution constructs a fresh plugin instance; no caching or
/// pooling happens at this layer.
#[derive(Default)]
pub struct CapabilityRegistry {
    http: DashMap<String, HttpFactory>,
    ws: DashMap<String, WsFactory>,
    mailers: DashMap<String, MailerFactory>,
    config: DashMap<String, ConfigFactory>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an HTTP client factory under a type name.
    pub fn register_http<F>(&self, kind: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn HttpClient>> + Send + Sync + 'static,
    {
        self.http.insert(kind.into(), Box::new(factory));
    }

    /// Register a WebSocket client factory under a type name.
    pub fn register_ws<F>(&self, kind: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn WsClient>> + Send + Sync + 'static,
    {
        self.ws.insert(kind.into(), Box::new(factory));
    }

    /// Register a mailer factory under a type name.
    pub fn register_mailer<F>(&self, kind: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn Mailer>> + Send + Sync + 'static,
    {
        self.mailers.insert(kind.into(), Box::new(factory));
    }

    /// Register a config reader factory under a type name.
    pub fn register_config<F>(&self, kind: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn ConfigReader>> + Send + Sync + 'static,
    {
        self.config.insert(kind.into(), Box::new(factory));
    }

    /// Resolve a fresh HTTP client instance.
    pub fn http(&self, kind: &str) -> Result<Box<dyn HttpClient>> {
        match self.http.get(kind) {
            Some(factory) => factory(),
            None => Err(Error::capability_not_found(kind)),
        }
    }

    /// Resolve a fresh WebSocket client instance.
    pub fn ws(&self, kind: &str) -> Result<Box<dyn WsClient>> {
        match self.ws.get(kind) {
            Some(factory) => factory(),
            None => Err(Error::capability_not_found(kind)),
        }
    }

    /// Resolve a fresh mailer instance.
    pub fn mailer(&self, kind: &str) -> Result<Box<dyn Mailer>> {
        match self.mailers.get(kind) {
            Some(factory) => factory(),
            None => Err(Error::capability_not_found(kind)),
        }
    }

    /// Resolve a fresh config reader instance.
    pub fn config(&self, kind: &str) -> Result<Box<dyn ConfigReader>> {
        match self.config.get(kind) {
            Some(factory) => factory(),
            None => Err(Error::capability_not_found(kind)),
        }
    }

    /// Registered HTTP client type names.
    pub fn http_kinds(&self) -> Vec<String> {
        self.http.iter().map(|r| r.key().clone()).collect()
    }

    /// Registered WebSocket client type names.
    pub fn ws_kinds(&self) -> Vec<String> {
        self.ws.iter().map(|r| r.key().clone()).collect()
    }

    /// Registered mailer type names.
    pub fn mailer_kinds(&self) -> Vec<String> {
        self.mailers.iter().map(|r| r.key().clone()).collect()
    }

    /// Registered config reader type names.
    pub fn config_kinds(&self) -> Vec<String> {
        self.config.iter().map(|r| r.key().clone()).collect()
    }

    /// Total number of registered factories across all kinds.
    pub fn len(&self) -> usize {
        self.http.len() + self.ws.len() + self.mailers.len() + self.config.len()
    }

    /// Check if no factories are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("http", &self.http.len())
            .field("ws", &self.ws.len())
            .field("mailers", &self.mailers.len())
            .field("config", &self.config.len())
            .finish()
    }
}
