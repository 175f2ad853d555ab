//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health
//!     → probe.rs (GET {upstream}/health on the short pool)
//!     → HealthReport: gateway always ok, upstream ok or unreachable
//! ```

pub mod probe;

pub use probe::{check, probe, HealthReport};
