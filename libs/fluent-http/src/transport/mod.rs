//! The network side of a send.
//!
//! [`PendingRequest`](crate::PendingRequest) only assembles options; a
//! [`Transport`] turns them into an exchange. [`HyperTransport`] is the
//! bundled implementation. Tests and embedders can supply their own.

pub(crate) mod digest;
mod hyper_transport;
mod prepare;

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use http::Method;

use crate::error::HttpError;
use crate::interceptor::InterceptorChain;
use crate::options::Options;

pub use hyper_transport::HyperTransport;
pub use prepare::prepare;

/// Response as returned by a transport: status, headers and the full body.
pub type RawResponse = http::Response<Bytes>;

/// Invoked once per send with the outcome's transfer statistics.
pub type StatsCallback = Box<dyn FnOnce(TransferStats) + Send>;

/// Timing and addressing facts about one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferStats {
    /// URL of the last hop, after redirects
    pub effective_uri: String,
    /// Wall time from dispatch until the body was read (or the failure)
    pub total_time: Duration,
}

/// Everything a transport needs for one send.
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    /// Fully merged options, `http_errors = false` included
    pub options: Options,
    /// Run against the materialized request right before it leaves
    pub before_send: InterceptorChain,
    pub on_stats: Option<StatsCallback>,
}

impl fmt::Debug for TransportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("options", &self.options)
            .field("before_send", &self.before_send)
            .field("on_stats", &self.on_stats.is_some())
            .finish()
    }
}

/// Performs the network exchange for a prepared request.
///
/// Implementations must:
/// - honor `headers`, `query`, the body keys, `auth`, `cookies`,
///   `allow_redirects`, `verify` and `timeout`
/// - run `before_send` exactly once, after the request is fully configured
/// - return every HTTP status as `Ok`, reserving `Err` for exchanges that
///   never produced a response
/// - call `on_stats` once
pub trait Transport: Send + Sync {
    /// # Errors
    /// `HttpError::Connection` when no response was received; other variants
    /// when the options cannot be turned into a request.
    fn execute(&self, request: TransportRequest) -> Result<RawResponse, HttpError>;
}
