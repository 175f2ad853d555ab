//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (exact or prefix match, capture identifier)
//!     → Return: ClassifiedRoute or ClassifyError
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - A missing identifier is rejected here, before any outbound work

pub mod matcher;
pub mod router;

pub use router::{ClassifiedRoute, ClassifyError, PoolKind, RouteClass, RouteTable};
