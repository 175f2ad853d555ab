//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (one task per connection, via axum::serve)
//!     → middleware (request ID, trace, CORS / OPTIONS short-circuit)
//!     → server.rs (classify route)
//!     → request.rs (validate, translate to OutboundRequest)
//!     → relay (buffered or streaming) / health probe
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use request::{OutboundRequest, RequestTranslator, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
