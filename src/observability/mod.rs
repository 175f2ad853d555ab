//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and relays produce:
//!     → logging.rs (structured log events, request ID on every relay line)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows from the inbound request to the upstream and back
//! - Metrics are cheap (no-ops when no recorder is installed)

pub mod logging;
pub mod metrics;
