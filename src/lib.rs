//! # appunit-runtime
//!
//! Lifecycle, metrics aggregation, and capability contracts for application
//! units hosted by a long-lived pluggable framework process.
//!
//! This crate provides:
//! - **Lifecycle Core** - The per-unit state machine (uninitialized →
//!   initialized → started → stopped) with precise, recoverable errors for
//!   out-of-order operations
//! - **Unit Metrics** - Concurrency-safe routine/request/execution counters
//!   and approximate memory-activity sampling
//! - **Best-Effort Notification** - Fire-and-forget upward forwarding of
//!   logs, monitor broadcasts, and counter deltas that never blocks the
//!   unit's request path
//! - **Stop Signal** - One-shot broadcast cancellation observed by any
//!   number of listeners
//! - **Capability Contracts** - HTTP client, WebSocket client, mailer, and
//!   config reader traits resolved through the framework by type name
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use appunit_runtime::{ApplicationUnit, UnitBase};
//!
//! let unit = UnitBase::new();
//! unit.initialize(framework, 1, "billing", "/units/billing", "billing.cfg")?;
//! unit.start()?;
//!
//! unit.add_request_handled();
//! let metrics = unit.status()?;
//!
//! unit.stop()?;
//! ```
//!
//! ## Feature Flags
//!
//! - `system-memory` (default): sample process memory through `sysinfo`

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod capability;
mod error;
mod framework;
mod lifecycle;
mod metrics;
mod monitor;
mod notify;
mod registry;
mod signal;
mod unit;

#[cfg(test)]
mod testkit;

pub use capability::{
    BuildInfo, ConfigReader, HttpClient, HttpRequest, HttpResponse, MailMessage, Mailer,
    WsClient, WsMessage,
};
pub use error::{Error, Result};
pub use framework::AppFramework;
pub use lifecycle::UnitState;
pub use metrics::{Identity, MemSample, MemUsage, MemorySource, NullMemory, UnitMetrics};
pub use monitor::{LogLevel, MonitorMessage};
pub use notify::{BestEffortNotifier, Notification};
pub use registry::CapabilityRegistry;
pub use signal::StopSignal;
pub use unit::{ApplicationUnit, UnitBase, UnitIdentity};

#[cfg(feature = "system-memory")]
pub use metrics::SysinfoMemory;

/// Crate version for compatibility checks.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
