use std::time::Duration;
use thiserror::Error;

/// Boxed error type carried as the source of transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classification of URL validation failures.
///
/// Provides programmatic matching for different failure modes without
/// relying on unstable error message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    /// URL could not be parsed (malformed syntax)
    ParseError,
    /// URL is missing required host/authority component
    MissingAuthority,
    /// URL uses a scheme other than http/https
    UnsupportedScheme,
}

/// The exchange never completed: no HTTP response was received.
///
/// Raised for DNS failures, refused connections, TLS handshake failures and
/// timeouts that expire before a response arrives. Never retried.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConnectionError {
    /// Could not establish a connection (DNS, refused, TLS handshake)
    #[error("connection failed: {message}")]
    Connect {
        message: String,
        #[source]
        source: BoxError,
    },

    /// No complete response before the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection broke while the exchange was in flight
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: BoxError,
    },
}

impl ConnectionError {
    /// Wrap a failure that happened while connecting.
    pub fn connect(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self::Connect {
            message: flatten_chain(source.as_ref()),
            source,
        }
    }

    /// Wrap a failure that happened after the connection was up.
    pub fn transport(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self::Transport {
            message: flatten_chain(source.as_ref()),
            source,
        }
    }

    /// Returns `true` if this failure is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Join an error and its sources into one message.
///
/// hyper's top-level errors only say "client error (Connect)"; the useful
/// text (e.g. "Connection refused") lives further down the chain.
fn flatten_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        let text = e.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        current = e.source();
    }
    message
}

/// Fluent HTTP client error types
///
/// Non-2xx responses are never represented here; they come back as a normal
/// [`HttpResponse`](crate::HttpResponse) and are classified by its predicates.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    /// The exchange never completed
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Request building failed
    #[error("Failed to build request: {0}")]
    RequestBuild(#[from] http::Error),

    /// Invalid header name
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// Invalid header value
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// Invalid URL
    ///
    /// Use the `kind` field for programmatic matching. The `reason` field is
    /// a diagnostic message for logging only.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUri {
        url: String,
        kind: InvalidUriKind,
        reason: String,
    },

    /// An option had a shape the transport cannot honor
    #[error("Invalid option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    /// JSON encoding or decoding failed
    #[error("JSON processing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Form URL encoding error
    #[error("Form encoding failed: {0}")]
    FormEncode(#[from] serde_urlencoded::ser::Error),

    /// Response body exceeded size limit
    #[error("Response body too large: limit {limit} bytes, got {actual} bytes")]
    BodyTooLarge { limit: usize, actual: usize },

    /// Neither a macro nor a delegated accessor matches the name
    #[error("Unknown response method '{0}'")]
    UnknownMethod(String),

    /// TLS configuration error
    #[error("TLS error: {0}")]
    Tls(#[source] BoxError),

    /// The transport runtime could not be started
    #[error("Failed to start transport runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// A blocking send was attempted from inside an async runtime
    #[error("blocking send called from within an async runtime")]
    BlockingInAsyncContext,
}

impl HttpError {
    /// Returns `true` if the exchange never completed.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    pub(crate) fn invalid_option(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            key: key.to_owned(),
            reason: reason.into(),
        }
    }
}
