//! Framework capability surface consumed by units.

use std::time::SystemTime;

use crate::capability::{ConfigReader, HttpClient, Mailer, WsClient};
use crate::error::Result;
use crate::metrics::UnitMetrics;
use crate::monitor::LogLevel;

/// The contract a unit uses to reach its hosting framework.
///
/// The framework outlives every unit; units hold a non-owning
/// [`Weak`](std::sync::Weak) reference to this trait object and must never
/// assume liveness. All notification-style calls here (`write_log`,
/// `send_monitor_message`, the counter mirrors) are reached through the
/// unit's best-effort notifier and may be lost during framework shutdown.
pub trait AppFramework: Send + Sync {
    /// Write an entry to the framework log.
    fn write_log(&self, entry: &str, level: LogLevel);

    /// Broadcast a message over the framework's monitoring channel.
    ///
    /// Discarded if monitoring is not running.
    fn send_monitor_message(&self, message: &[u8]);

    /// Mirror a routine-count increment into the global aggregate.
    fn add_routine(&self);

    /// Mirror a routine-count decrement into the global aggregate.
    fn remove_routine(&self);

    /// Mirror a handled-request increment into the global aggregate.
    fn add_request_handled(&self);

    /// Mirror a failed-request increment into the global aggregate.
    fn add_request_failed(&self);

    /// Execute an OS command and return its output.
    fn execute_command(&self, command: &str) -> Result<String>;

    /// Acquire an HTTP client plugin instance by declared type name.
    fn http_client(&self, kind: &str) -> Result<Box<dyn HttpClient>>;

    /// Acquire a WebSocket client plugin instance by declared type name.
    fn ws_client(&self, kind: &str) -> Result<Box<dyn WsClient>>;

    /// Acquire a mailer plugin instance by declared type name.
    fn mailer(&self, kind: &str) -> Result<Box<dyn Mailer>>;

    /// Acquire a configuration reader plugin instance by declared type name.
    fn config_reader(&self, kind: &str) -> Result<Box<dyn ConfigReader>>;

    /// Application name.
    fn name(&self) -> String;

    /// Application version.
    fn version(&self) -> String;

    /// OS process id of the framework.
    fn pid(&self) -> u32;

    /// When the framework started.
    fn started(&self) -> SystemTime;

    /// Names of the units the framework currently hosts.
    fn unit_names(&self) -> Vec<String>;

    /// Start the named unit.
    fn unit_start(&self, name: &str) -> Result<()>;

    /// Stop the named unit, forcing if requested.
    fn unit_stop(&self, name: &str, force: bool) -> Result<()>;

    /// Restart the named unit, forcing the stop if requested.
    fn unit_restart(&self, name: &str, force: bool) -> Result<()>;

    /// Fetch the current metrics of the named unit.
    fn unit_status(&self, name: &str) -> Result<UnitMetrics>;
}
