//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! RPC client, estimator, wallet produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and histograms via the `metrics` facade)
//!
//! Consumers:
//!     → stdout (fmt layer installed by the binary)
//!     → whatever recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a global recorder or subscriber
//! - Private keys never reach a log field

pub mod logging;
pub mod metrics;
