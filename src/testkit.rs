//! In-memory framework stub shared by the unit test modules.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::capability::{ConfigReader, HttpClient, Mailer, WsClient};
use crate::error::{Error, Result};
use crate::framework::AppFramework;
use crate::metrics::UnitMetrics;
use crate::monitor::LogLevel;

/// Framework double that records everything forwarded to it.
#[derive(Default)]
pub(crate) struct StubFramework {
    routines: AtomicI64,
    handled: AtomicU64,
    failed: AtomicU64,
    logs: Mutex<Vec<(String, LogLevel)>>,
    monitor: Mutex<Vec<Vec<u8>>>,
    /// When set, `write_log` panics to exercise the swallowing path.
    pub panic_on_log: bool,
}

impl StubFramework {
    /// A stub whose log sink panics, for exercising the swallowing path.
    pub fn panicking() -> Self {
        Self {
            panic_on_log: true,
            ..Self::default()
        }
    }

    pub fn routines(&self) -> i64 {
        self.routines.load(Ordering::SeqCst)
    }

    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn logs(&self) -> Vec<(String, LogLevel)> {
        self.logs.lock().clone()
    }

    pub fn monitor_messages(&self) -> Vec<Vec<u8>> {
        self.monitor.lock().clone()
    }
}

impl AppFramework for StubFramework {
    fn write_log(&self, entry: &str, level: LogLevel) {
        if self.panic_on_log {
            panic!("log sink is broken");
        }
        self.logs.lock().push((entry.to_string(), level));
    }

    fn send_monitor_message(&self, message: &[u8]) {
        self.monitor.lock().push(message.to_vec());
    }

    fn add_routine(&self) {
        self.routines.fetch_add(1, Ordering::SeqCst);
    }

    fn remove_routine(&self) {
        self.routines.fetch_sub(1, Ordering::SeqCst);
    }

    fn add_request_handled(&self) {
        self.handled.fetch_add(1, Ordering::SeqCst);
    }

    fn add_request_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn execute_command(&self, command: &str) -> Result<String> {
        Ok(format!("ran: {}", command))
    }

    fn http_client(&self, kind: &str) -> Result<Box<dyn HttpClient>> {
        Err(Error::capability_not_found(kind))
    }

    fn ws_client(&self, kind: &str) -> Result<Box<dyn WsClient>> {
        Err(Error::capability_not_found(kind))
    }

    fn mailer(&self, kind: &str) -> Result<Box<dyn Mailer>> {
        Err(Error::capability_not_found(kind))
    }

    fn config_reader(&self, kind: &str) -> Result<Box<dyn ConfigReader>> {
        Err(Error::capability_not_found(kind))
    }

    fn name(&self) -> String {
        "stub-framework".into()
    }

    fn version(&self) -> String {
        "0.0.0".into()
    }

    fn pid(&self) -> u32 {
        9901
    }

    fn started(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH
    }

    fn unit_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn unit_start(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn unit_stop(&self, _name: &str, _force: bool) -> Result<()> {
        Ok(())
    }

    fn unit_restart(&self, _name: &str, _force: bool) -> Result<()> {
        Ok(())
    }

    fn unit_status(&self, name: &str) -> Result<UnitMetrics> {
        Ok(UnitMetrics::new(name))
    }
}
