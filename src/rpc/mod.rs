//! JSON-RPC request construction and transport.
//!
//! # Data Flow
//! ```text
//! high-level call (address, block tag, call object, ...)
//!     → checks.rs (hex / address / hash / block / percentile validation)
//!     → builder.rs (one function per remote method)
//!     → RpcRequest {"jsonrpc": "2.0", method, params, id}
//!     → transport.rs (HTTP POST with timeout and failover)
//!     → raw response body
//! ```
//!
//! # Design Decisions
//! - Builders are pure: validation never touches the network
//! - Validation order is fixed per method and stops at the first failure
//! - Errors are values (`RequestError`), never panics

pub mod builder;
pub mod checks;
pub mod request;
pub mod transport;

pub use request::{parse_quantity, RequestError, RequestResult, RpcOutcome, RpcRequest};
pub use transport::{HttpTransport, Transport, TransportError};
