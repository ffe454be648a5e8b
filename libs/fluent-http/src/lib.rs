#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Fluent HTTP request/response client
//!
//! Build one outgoing request through chained configuration calls, send it,
//! and inspect the response through convenience accessors:
//! - Options accumulate in a JSON-like map and deep-merge in call order
//! - Any HTTP status is a response; only exchanges that never produced one
//!   are errors ([`ConnectionError`])
//! - Before-send interceptors see and may rewrite the final request
//! - Responses can be extended with named macros ([`ResponseMacros`])
//!
//! The network exchange is delegated to a [`Transport`]. The bundled
//! [`HyperTransport`] adds:
//! - TLS via rustls (WebPKI or native roots), with per-request `verify`
//! - Connection pooling
//! - Redirect following with credential stripping on cross-origin hops
//! - Basic and Digest authentication
//! - **Transparent response decompression** (gzip, brotli, deflate)
//!
//! # Example
//!
//! ```ignore
//! use fluent_http::HttpClient;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let client = HttpClient::builder()
//!     .user_agent("my-app/1.0")
//!     .build()?;
//!
//! let resp = client
//!     .request()
//!     .with_headers([("X-Request-Id", "abc123")])
//!     .timeout(Duration::from_secs(5))
//!     .as_json()
//!     .post("https://example.com/api/items", json!({"name": "widget"}))?;
//!
//! if resp.is_success() {
//!     let item: Item = resp.json()?;
//! }
//! ```
//!
//! Sends block the calling thread. Use a blocking task when calling from
//! async code.

mod builder;
mod client;
mod config;
mod cookies;
mod error;
mod extensions;
mod interceptor;
pub mod layers;
pub mod options;
mod request;
mod response;
mod tls;
pub mod transport;

pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use config::{DEFAULT_USER_AGENT, HttpClientConfig, RedirectConfig, TlsRootConfig};
pub use cookies::CookieJar;
pub use error::{BoxError, ConnectionError, HttpError, InvalidUriKind};
pub use extensions::{ResponseMacro, ResponseMacros};
pub use interceptor::{Interceptor, InterceptorChain, OutgoingRequest};
pub use options::{Auth, BodyFormat, Options, RedirectSetting};
pub use request::PendingRequest;
pub use response::{HttpResponse, ResponseBody};
pub use transport::{
    HyperTransport, RawResponse, StatsCallback, TransferStats, Transport, TransportRequest,
};
