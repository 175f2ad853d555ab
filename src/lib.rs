//! Media API gateway library.
//!
//! Fronts a single media-lookup upstream. Short JSON calls (health, search,
//! song details) and long-lived audio streams go through two isolated
//! outbound pools with different timeout policies.

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod routing;
pub mod upstream;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use upstream::ClientPools;
