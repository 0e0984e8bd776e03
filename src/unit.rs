//! Application unit lifecycle core.
//!
//! [`UnitBase`] owns the metrics record, the lifecycle state machine, and
//! the stop signal for one unit instance, and forwards aggregate events to
//! the framework through a best-effort notifier. Business-specific units
//! embed a `UnitBase` and layer their own work on top of it.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::capability::{BuildInfo, ConfigReader, HttpClient, Mailer, WsClient};
use crate::error::{Error, Result};
use crate::framework::AppFramework;
use crate::lifecycle::UnitState;
use crate::metrics::{default_memory_source, MemorySource, UnitMetrics};
use crate::monitor::{LogLevel, MonitorMessage};
use crate::notify::{BestEffortNotifier, Notification};
use crate::signal::StopSignal;

/// Immutable identity of a unit instance, set at initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitIdentity {
    /// Instance id assigned by the supervisor.
    pub instance_id: i32,
    /// Unit name.
    pub name: String,
    /// Path the unit was loaded from.
    pub path: String,
    /// Configuration file name for the unit.
    pub config_file: String,
    /// `"{instance_id}-{framework_pid}"`, used for cross-process
    /// correlation in monitoring messages.
    pub composite_id: String,
}

/// The Supervisor → Unit surface.
///
/// Implemented by [`UnitBase`]; custom units embedding a base typically
/// delegate these and add their own work on `start`/`stop`.
pub trait ApplicationUnit: Send + Sync {
    /// Initialize the unit against a framework reference.
    fn initialize(
        &self,
        framework: Weak<dyn AppFramework>,
        instance_id: i32,
        unit_name: &str,
        unit_path: &str,
        config_file: &str,
    ) -> Result<()>;

    /// Clear all held references and return to the uninitialized state.
    fn deinitialize(&self);

    /// Start the unit.
    fn start(&self) -> Result<()>;

    /// Stop the unit.
    fn stop(&self) -> Result<()>;

    /// Whether initialization has completed.
    fn is_initialized(&self) -> bool;

    /// Whether the unit is currently started.
    fn is_started(&self) -> bool;

    /// Point-in-time metrics snapshot.
    fn status(&self) -> Result<UnitMetrics>;

    /// Instance id, if initialized.
    fn id(&self) -> Option<i32>;

    /// Build information of the unit.
    fn info(&self) -> BuildInfo;
}

struct UnitInner {
    state: UnitState,
    framework: Option<Weak<dyn AppFramework>>,
    framework_pid: Option<u32>,
    identity: Option<UnitIdentity>,
    metrics: Option<UnitMetrics>,
    notifier: Option<BestEffortNotifier>,
    stopper: Option<StopSignal>,
    memory: Box<dyn MemorySource>,
    build_info: BuildInfo,
}

/// Base implementation of one application unit instance.
///
/// All state lives behind a single exclusive lock held only for in-memory
/// mutation; upward notifications are dispatched through the notifier and
/// never awaited.
pub struct UnitBase {
    inner: Mutex<UnitInner>,
}

impl UnitBase {
    /// Create an uninitialized unit base.
    pub fn new() -> Self {
        Self::with_memory_source(default_memory_source())
    }

    /// Create a unit base sampling memory from the given source.
    pub fn with_memory_source(memory: Box<dyn MemorySource>) -> Self {
        Self {
            inner: Mutex::new(UnitInner {
                state: UnitState::Uninitialized,
                framework: None,
                framework_pid: None,
                identity: None,
                metrics: None,
                notifier: None,
                stopper: None,
                memory,
                build_info: BuildInfo::default(),
            }),
        }
    }

    /// Record the unit's build information, reported via [`ApplicationUnit::info`].
    pub fn set_build_info(&self, info: BuildInfo) {
        self.inner.lock().build_info = info;
    }

    /// Record the unit's version in the metrics identity.
    pub fn set_version(&self, version: impl Into<String>) {
        let mut inner = self.inner.lock();
        if let Some(metrics) = inner.metrics.as_mut() {
            metrics.identity.version = version.into();
        }
    }

    /// Composite `"{instance_id}-{framework_pid}"` id, if initialized.
    pub fn composite_id(&self) -> Option<String> {
        self.inner
            .lock()
            .identity
            .as_ref()
            .map(|i| i.composite_id.clone())
    }

    /// The framework process id recorded at initialization.
    pub fn framework_pid(&self) -> Option<u32> {
        self.inner.lock().framework_pid
    }

    /// Identity record, if initialized.
    pub fn identity(&self) -> Option<UnitIdentity> {
        self.inner.lock().identity.clone()
    }

    /// The stop signal of the current run, if the unit is started.
    ///
    /// Background listeners clone this and wait on it as their terminator.
    pub fn stop_signal(&self) -> Option<StopSignal> {
        self.inner.lock().stopper.clone()
    }

    /// Number of upward notifications that could not be delivered.
    pub fn failed_notifications(&self) -> u64 {
        self.inner
            .lock()
            .notifier
            .as_ref()
            .map(|n| n.failed_deliveries())
            .unwrap_or(0)
    }

    /// Install a hook invoked on every failed upward delivery.
    pub fn on_notification_failure<F>(&self, hook: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        if let Some(notifier) = self.inner.lock().notifier.as_ref() {
            notifier.on_failure(hook);
        }
    }

    // ---- counter operations -------------------------------------------

    /// Increment the routine count, mirroring the delta upward.
    pub fn add_routine(&self) {
        self.bump(Notification::RoutineAdded, |m| {
            m.routines = m.routines.saturating_add(1);
        });
    }

    /// Decrement the routine count, mirroring the delta upward.
    pub fn remove_routine(&self) {
        self.bump(Notification::RoutineRemoved, |m| {
            m.routines = m.routines.saturating_sub(1);
        });
    }

    /// Increment the handled-request count, mirroring the delta upward.
    pub fn add_request_handled(&self) {
        self.bump(Notification::RequestHandled, |m| {
            m.requests_handled = m.requests_handled.saturating_add(1);
        });
    }

    /// Increment the failed-request count, mirroring the delta upward.
    pub fn add_request_failed(&self) {
        self.bump(Notification::RequestFailed, |m| {
            m.requests_failed = m.requests_failed.saturating_add(1);
        });
    }

    /// Increment the active-execution count. Local only, not mirrored.
    pub fn incr_active(&self) {
        let mut inner = self.inner.lock();
        if let Some(metrics) = inner.metrics.as_mut() {
            metrics.active = metrics.active.saturating_add(1);
        }
    }

    /// Decrement the active-execution count. Local only, not mirrored.
    ///
    /// Saturates at zero; the count never goes negative.
    pub fn decr_active(&self) {
        let mut inner = self.inner.lock();
        if let Some(metrics) = inner.metrics.as_mut() {
            metrics.active = metrics.active.saturating_sub(1);
        }
    }

    /// Mutate a counter under the lock, then dispatch the matching upward
    /// notification. The mutation is strictly ordered before the dispatch;
    /// delivery is never awaited. Counters are undefined before
    /// initialization, so the call is a no-op then.
    fn bump<F>(&self, notification: Notification, mutate: F)
    where
        F: FnOnce(&mut UnitMetrics),
    {
        let mut inner = self.inner.lock();
        let Some(metrics) = inner.metrics.as_mut() else {
            return;
        };
        mutate(metrics);
        if let Some(notifier) = inner.notifier.as_ref() {
            notifier.enqueue(notification);
        }
    }

    // ---- upward forwarding --------------------------------------------

    /// Forward a log entry to the framework, best-effort.
    pub fn write_log(&self, entry: impl Into<String>, level: LogLevel) {
        let inner = self.inner.lock();
        if let Some(notifier) = inner.notifier.as_ref() {
            notifier.enqueue(Notification::Log {
                entry: entry.into(),
                level,
            });
        }
    }

    /// Broadcast raw bytes over the framework monitor channel, best-effort.
    pub fn send_monitor_message(&self, message: Vec<u8>) {
        let inner = self.inner.lock();
        if let Some(notifier) = inner.notifier.as_ref() {
            notifier.enqueue(Notification::Monitor(message));
        }
    }

    /// Build and serialize a monitoring message.
    ///
    /// Returns `None` when the unit has no framework reference or the
    /// message does not serialize; monitoring is never an error path.
    pub fn monitoring_message(
        &self,
        app_id: &str,
        id: &str,
        status: &str,
        info: BTreeMap<String, String>,
    ) -> Option<Vec<u8>> {
        if self.inner.lock().framework.is_none() {
            return None;
        }
        let mut message = MonitorMessage::new(app_id, id, status);
        message.info = info;
        message.encode()
    }

    // ---- capability forwarding ----------------------------------------

    /// Acquire an HTTP client plugin through the framework.
    pub fn http_client(&self, kind: &str) -> Result<Box<dyn HttpClient>> {
        self.framework()?.http_client(kind)
    }

    /// Acquire a WebSocket client plugin through the framework.
    pub fn ws_client(&self, kind: &str) -> Result<Box<dyn WsClient>> {
        self.framework()?.ws_client(kind)
    }

    /// Acquire a mailer plugin through the framework.
    pub fn mailer(&self, kind: &str) -> Result<Box<dyn Mailer>> {
        self.framework()?.mailer(kind)
    }

    /// Acquire a configuration reader plugin through the framework.
    pub fn config_reader(&self, kind: &str) -> Result<Box<dyn ConfigReader>> {
        self.framework()?.config_reader(kind)
    }

    /// Execute an OS command through the framework and fetch its output.
    pub fn execute_and_fetch(&self, command: &str) -> Result<String> {
        self.framework()?.execute_command(command)
    }

    /// Upgrade the framework reference or report it unavailable.
    fn framework(&self) -> Result<Arc<dyn AppFramework>> {
        let inner = self.inner.lock();
        inner
            .framework
            .as_ref()
            .and_then(|weak| weak.upgrade())
            .ok_or_else(|| Error::framework_unavailable("app instance is not initialized"))
    }
}

impl ApplicationUnit for UnitBase {
    fn initialize(
        &self,
        framework: Weak<dyn AppFramework>,
        instance_id: i32,
        unit_name: &str,
        unit_path: &str,
        config_file: &str,
    ) -> Result<()> {
        let Some(framework_strong) = framework.upgrade() else {
            // The failure notice still goes through the best-effort path,
            // where the dead reference makes it undeliverable; it is
            // counted and dropped, never raised.
            let notifier = BestEffortNotifier::new(framework);
            notifier.enqueue(Notification::Monitor(
                format!("{} framework reference is invalid", instance_id).into_bytes(),
            ));
            drop(notifier);
            tracing::debug!(
                instance_id,
                unit_name,
                "initialize failed, framework reference is dead"
            );
            let mut inner = self.inner.lock();
            inner.state = UnitState::Uninitialized;
            return Err(Error::InvalidFrameworkReference(instance_id));
        };

        let pid = framework_strong.pid();
        let composite_id = format!("{}-{}", instance_id, pid);

        // Spawn the delivery worker outside the state lock.
        let notifier = BestEffortNotifier::new(framework.clone());

        let mut inner = self.inner.lock();

        // Re-initialization overwrites prior state wholesale; the
        // supervisor only does this after a full stop.
        let stale_notifier = inner.notifier.replace(notifier);
        inner.framework = Some(framework);
        inner.framework_pid = Some(pid);
        inner.identity = Some(UnitIdentity {
            instance_id,
            name: unit_name.to_string(),
            path: unit_path.to_string(),
            config_file: config_file.to_string(),
            composite_id,
        });

        let mut metrics = UnitMetrics::new(unit_name);
        let sample = inner.memory.sample();
        metrics.apply_sample(sample);
        inner.metrics = Some(metrics);

        inner.stopper = None;
        inner.state = UnitState::Initialized;

        tracing::info!(instance_id, unit_name, "unit initialized");
        drop(inner);

        // Joining the stale worker happens outside the lock.
        drop(stale_notifier);
        Ok(())
    }

    fn deinitialize(&self) {
        let mut inner = self.inner.lock();
        let notifier = inner.notifier.take();
        inner.framework = None;
        inner.framework_pid = None;
        inner.identity = None;
        inner.metrics = None;
        inner.stopper = None;
        inner.state = UnitState::Uninitialized;
        drop(inner);

        // Dropping the notifier drains its queue and joins the worker,
        // which must not happen while the state lock is held.
        drop(notifier);
        tracing::debug!("unit deinitialized");
    }

    fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.state.can_start() {
            return Err(Error::NotInitialized);
        }

        inner.stopper = Some(StopSignal::new());
        inner.state = UnitState::Started;

        tracing::info!(state = %inner.state, "unit started");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.framework.is_none() {
            return Err(Error::NotInitialized);
        }

        let (id, name, composite) = match inner.identity.as_ref() {
            Some(identity) => (
                identity.instance_id,
                identity.name.clone(),
                identity.composite_id.clone(),
            ),
            None => (0, String::new(), String::new()),
        };

        if let Some(notifier) = inner.notifier.as_ref() {
            notifier.enqueue(Notification::Log {
                entry: format!("{} - stopping unit", composite),
                level: LogLevel::Info,
            });
            if let Some(bytes) = MonitorMessage::new(&name, &composite, "stopping").encode() {
                notifier.enqueue(Notification::Monitor(bytes));
            }
        }

        if !inner.state.can_stop() {
            if let Some(notifier) = inner.notifier.as_ref() {
                notifier.enqueue(Notification::Log {
                    entry: format!("{} - failed to stop, unit is not started", composite),
                    level: LogLevel::Info,
                });
                if let Some(bytes) = MonitorMessage::new(&name, &composite, "not started").encode()
                {
                    notifier.enqueue(Notification::Monitor(bytes));
                }
            }
            return Err(Error::not_started(id, name));
        }

        // Absent signal is a no-op, not an error: a unit may legally stop
        // without ever having created background listeners.
        if let Some(stopper) = inner.stopper.take() {
            stopper.close();
        }

        if let Some(notifier) = inner.notifier.as_ref() {
            notifier.enqueue(Notification::Log {
                entry: format!("{} - stopping unit done", composite),
                level: LogLevel::Info,
            });
            if let Some(bytes) = MonitorMessage::new(&name, &composite, "stopped").encode() {
                notifier.enqueue(Notification::Monitor(bytes));
            }
        }

        // Transition only after the close has completed; waiters unblocked
        // by the signal are guaranteed to observe the stopped state.
        inner.state = UnitState::Stopped;

        tracing::info!(instance_id = id, unit_name = %name, "unit stopped");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.inner.lock().state.is_initialized()
    }

    fn is_started(&self) -> bool {
        self.inner.lock().state == UnitState::Started
    }

    fn status(&self) -> Result<UnitMetrics> {
        let mut inner = self.inner.lock();
        let sample = inner.memory.sample();
        let metrics = inner.metrics.as_mut().ok_or(Error::NotInitialized)?;
        metrics.apply_sample(sample);
        Ok(metrics.clone())
    }

    fn id(&self) -> Option<i32> {
        self.inner
            .lock()
            .identity
            .as_ref()
            .map(|i| i.instance_id)
    }

    fn info(&self) -> BuildInfo {
        self.inner.lock().build_info.clone()
    }
}

impl Default for UnitBase {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UnitBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("UnitBase")
            .field("state", &inner.state)
            .field("identity", &inner.identity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NullMemory;
    use crate::testkit::StubFramework;

    fn initialized_unit() -> (UnitBase, Arc<StubFramework>) {
        let framework = Arc::new(StubFramework::default());
        let dyn_fw: Arc<dyn AppFramework> = framework.clone();
        let unit = UnitBase::with_memory_source(Box::new(NullMemory));
        unit.initialize(
            Arc::downgrade(&dyn_fw),
            1,
            "billing",
            "/units/billing",
            "billing.cfg",
        )
        .unwrap();
        // dyn_fw shares the allocation with `framework`, which keeps the
        // weak reference alive for the duration of the test.
        (unit, framework)
    }

    #[test]
    fn test_initialize_records_identity() {
        let (unit, _fw) = initialized_unit();

        assert!(unit.is_initialized());
        assert!(!unit.is_started());
        assert_eq!(unit.id(), Some(1));

        let identity = unit.identity().unwrap();
        assert_eq!(identity.name, "billing");
        assert_eq!(identity.path, "/units/billing");
        assert_eq!(identity.config_file, "billing.cfg");
        assert_eq!(identity.composite_id, format!("1-{}", unit.framework_pid().unwrap()));
    }

    #[test]
    fn test_initialize_dead_framework_fails() {
        let framework: Arc<dyn AppFramework> = Arc::new(StubFramework::default());
        let weak = Arc::downgrade(&framework);
        drop(framework);

        let unit = UnitBase::with_memory_source(Box::new(NullMemory));
        let result = unit.initialize(weak, 9, "billing", "/units/billing", "billing.cfg");

        assert!(matches!(result, Err(Error::InvalidFrameworkReference(9))));
        assert!(!unit.is_initialized());
    }

    #[test]
    fn test_counters_accumulate_and_mirror() {
        let (unit, fw) = initialized_unit();

        unit.add_request_handled();
        unit.add_request_handled();
        unit.add_request_failed();
        unit.add_routine();

        let status = unit.status().unwrap();
        assert_eq!(status.requests_handled, 2);
        assert_eq!(status.requests_failed, 1);
        assert_eq!(status.routines, 1);

        unit.deinitialize(); // joins the notifier, flushing deliveries
        assert_eq!(fw.handled(), 2);
        assert_eq!(fw.failed(), 1);
        assert_eq!(fw.routines(), 1);
    }

    #[test]
    fn test_counters_noop_before_initialize() {
        let unit = UnitBase::with_memory_source(Box::new(NullMemory));
        unit.add_request_handled();
        unit.add_routine();
        unit.incr_active();
        assert!(unit.status().is_err());
    }

    #[test]
    fn test_active_never_negative() {
        let (unit, _fw) = initialized_unit();

        unit.decr_active();
        unit.decr_active();
        assert_eq!(unit.status().unwrap().active, 0);

        unit.incr_active();
        unit.decr_active();
        unit.decr_active();
        assert_eq!(unit.status().unwrap().active, 0);
    }

    #[test]
    fn test_status_is_a_snapshot() {
        let (unit, _fw) = initialized_unit();
        unit.add_request_handled();

        let mut snapshot = unit.status().unwrap();
        snapshot.requests_handled = 999;
        snapshot.identity.name = "tampered".into();

        let fresh = unit.status().unwrap();
        assert_eq!(fresh.requests_handled, 1);
        assert_eq!(fresh.identity.name, "billing");
    }

    #[test]
    fn test_capability_forwarding_without_framework() {
        let unit = UnitBase::with_memory_source(Box::new(NullMemory));
        assert!(matches!(
            unit.http_client("rest_v1"),
            Err(Error::FrameworkUnavailable(_))
        ));
        assert!(matches!(
            unit.execute_and_fetch("uptime"),
            Err(Error::FrameworkUnavailable(_))
        ));
    }

    #[test]
    fn test_monitoring_message_requires_framework() {
        let unit = UnitBase::with_memory_source(Box::new(NullMemory));
        assert!(unit
            .monitoring_message("app", "1-1", "ok", BTreeMap::new())
            .is_none());

        let (unit, _fw) = initialized_unit();
        let bytes = unit
            .monitoring_message("app", "1-1", "ok", BTreeMap::new())
            .unwrap();
        let message: MonitorMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(message.status, "ok");
    }
}
