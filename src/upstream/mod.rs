//! Upstream client subsystem.
//!
//! # Data Flow
//! ```text
//! OutboundRequest
//!     → pool.rs (pick Short or Streaming pool by route class)
//!     → connector.rs (TCP + TLS under one connect deadline)
//!     → upstream service
//!     → Response<Incoming> (streaming) or BufferedResponse (short)
//! ```

pub mod connector;
pub mod error;
pub mod pool;

pub use error::UpstreamError;
pub use pool::{BufferedResponse, ClientPools, PoolPolicy, UpstreamPool};
