//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → Overrides (CLI flags / environment)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the pools built from it never change
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, Overrides};
pub use schema::{
    GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig, PoolsConfig, SearchConfig,
    ShortPoolConfig, StreamingPoolConfig, UpstreamConfig,
};
pub use validation::ValidationError;
