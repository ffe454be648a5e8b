//! Tower layers for the bundled transport
//!
//! [`HyperTransport`](crate::HyperTransport) composes these around a hyper
//! client for every send.
//!
//! ## Available Layers
//!
//! - [`UserAgentLayer`] - Adds the client's User-Agent unless the request has one
//! - [`InterceptorLayer`] - Runs the before-send interceptors on the final request
//! - [`TraceLayer`] - Opens an `outgoing_http` tracing span per exchange
//! - [`DigestAuthLayer`] - Answers `401` Digest challenges
//! - [`RedirectPolicy`] - Redirect policy honoring `allow_redirects`

mod digest;
mod interceptor;
mod redirect;
mod trace;
mod user_agent;

pub use digest::{DigestAuthLayer, DigestAuthService, DigestCredentials};
pub use interceptor::{InterceptorLayer, InterceptorService};
pub use redirect::RedirectPolicy;
pub(crate) use trace::sanitized_url;
pub use trace::{TraceLayer, TraceService};
pub use user_agent::{UserAgentLayer, UserAgentService};
