//! # connectscope
//!
//! connectscope is an observability filter for the Kafka Connect group
//! membership protocol. It sits inside a pass-through proxy, inspects the
//! group-coordination traffic exchanged between Connect workers and their
//! group coordinator, and renders the binary rebalance payloads embedded in
//! that traffic as human-readable diagnostic blocks. Messages are always
//! forwarded unchanged: the filter is a pure observer and never participates
//! in the rebalance itself.
//!
//! ## Architecture Overview
//!
//! - [`protocol`] - outer group-coordination message shapes and error codes
//! - [`connect`] - Connect protocol variants and the binary payload codec
//! - [`filter`] - per-message interception handlers and dispatch
//! - [`render`] - diagnostic text rendering and the operator-facing sink
//! - [`config`] - filter configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use connectscope::config::FilterConfig;
//! use connectscope::filter::RebalanceFilter;
//! use connectscope::render::StdoutSink;
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let config = FilterConfig::default();
//! let sink = Arc::new(StdoutSink::spawn(config.sink_capacity));
//! let filter = RebalanceFilter::new(config, sink);
//! // hand `filter` to the proxy layer; it will invoke one handler per
//! // intercepted group-coordination message
//! # let _ = filter;
//! # }
//! ```
//!
//! ## Guarantees
//!
//! Every handler forwards the original message regardless of whether a
//! diagnostic was emitted, a payload failed to decode, or the sink is
//! stalled. Loss of diagnostics never becomes loss of protocol traffic.

pub mod config;
pub mod connect;
pub mod filter;
pub mod protocol;
pub mod render;

pub use config::FilterConfig;
pub use connect::{classify, ProtocolVariant};
pub use filter::{FilterContext, RebalanceFilter};
pub use render::{DiagnosticSink, MemorySink, StdoutSink};

use thiserror::Error;

/// connectscope error types
///
/// Every failure in this crate degrades to "forward without full diagnostic";
/// no variant here is fatal to the hosting proxy.
#[derive(Debug, Error)]
pub enum ConnectScopeError {
    /// Connect rebalance payload could not be decoded
    #[error("Connect codec error: {0}")]
    Codec(#[from] connect::codec::ConnectCodecError),

    /// The host transport failed to forward a message
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration validation errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for connectscope operations
pub type Result<T> = std::result::Result<T, ConnectScopeError>;
