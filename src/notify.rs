//! Best-effort upward notification path.
//!
//! Every notification a unit sends to its framework (log writes, monitor
//! broadcasts, counter mirroring) goes through here: dispatched to a
//! background delivery thread, never awaited, never observable to the
//! caller. A slow or unavailable framework must never stall a unit's
//! request-handling path.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::framework::AppFramework;
use crate::monitor::LogLevel;

/// A single upward notification.
#[derive(Debug, Clone)]
pub enum Notification {
    /// Forward a log entry.
    Log {
        /// Log line.
        entry: String,
        /// Severity.
        level: LogLevel,
    },
    /// Broadcast a monitor message.
    Monitor(Vec<u8>),
    /// Mirror a routine-count increment.
    RoutineAdded,
    /// Mirror a routine-count decrement.
    RoutineRemoved,
    /// Mirror a handled-request increment.
    RequestHandled,
    /// Mirror a failed-request increment.
    RequestFailed,
}

type FailureHook = Box<dyn Fn(&Notification) + Send + Sync>;

struct Shared {
    failed: AtomicU64,
    hook: Mutex<Option<FailureHook>>,
}

impl Shared {
    fn record_failure(&self, notification: &Notification) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        if let Some(hook) = self.hook.lock().as_ref() {
            hook(notification);
        }
    }
}

/// Fire-and-forget notifier toward the framework.
///
/// Deliveries run on one background thread. Each delivery upgrades the
/// weak framework reference; a dead reference or a panicking framework
/// callback is swallowed and counted, never propagated. [`enqueue`]
/// (BestEffortNotifier::enqueue) does not block and has no observable
/// failure mode.
pub struct BestEffortNotifier {
    tx: Option<Sender<Notification>>,
    worker: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl BestEffortNotifier {
    /// Create a notifier delivering to the given framework reference.
    pub fn new(framework: Weak<dyn AppFramework>) -> Self {
        let (tx, rx) = mpsc::channel::<Notification>();
        let shared = Arc::new(Shared {
            failed: AtomicU64::new(0),
            hook: Mutex::new(None),
        });

        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("unit-notifier".into())
            .spawn(move || {
                while let Ok(notification) = rx.recv() {
                    deliver(&framework, notification, &worker_shared);
                }
            })
            .ok();

        Self {
            tx: Some(tx),
            worker,
            shared,
        }
    }

    /// Queue a notification for delivery. Never blocks.
    pub fn enqueue(&self, notification: Notification) {
        if let Some(tx) = &self.tx {
            if tx.send(notification).is_err() {
                // Worker is gone; nothing left to deliver to.
                self.shared.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Number of notifications that could not be delivered.
    pub fn failed_deliveries(&self) -> u64 {
        self.shared.failed.load(Ordering::Relaxed)
    }

    /// Install a hook invoked on every failed delivery.
    pub fn on_failure<F>(&self, hook: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        *self.shared.hook.lock() = Some(Box::new(hook));
    }

    /// Drain the queue and stop the delivery thread.
    ///
    /// Called from `Drop`; exposed for tests that need to observe all
    /// queued deliveries before asserting.
    pub fn shutdown(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn deliver(framework: &Weak<dyn AppFramework>, notification: Notification, shared: &Shared) {
    let Some(framework) = framework.upgrade() else {
        tracing::debug!("notification dropped, framework reference is dead");
        shared.record_failure(&notification);
        return;
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match &notification {
        Notification::Log { entry, level } => framework.write_log(entry, *level),
        Notification::Monitor(bytes) => framework.send_monitor_message(bytes),
        Notification::RoutineAdded => framework.add_routine(),
        Notification::RoutineRemoved => framework.remove_routine(),
        Notification::RequestHandled => framework.add_request_handled(),
        Notification::RequestFailed => framework.add_request_failed(),
    }));

    if outcome.is_err() {
        tracing::debug!("notification delivery panicked, swallowed");
        shared.record_failure(&notification);
    }
}

impl Drop for BestEffortNotifier {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for BestEffortNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BestEffortNotifier")
            .field("failed_deliveries", &self.failed_deliveries())
            .finish()
    }
}
