use crate::client::HttpClient;
use crate::config::{HttpClientConfig, RedirectConfig, TlsRootConfig};
use crate::error::HttpError;
use crate::extensions::ResponseMacros;
use crate::transport::{HyperTransport, Transport};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Builder for constructing an [`HttpClient`].
///
/// Without an explicit [`transport`](Self::transport) the client gets a
/// [`HyperTransport`] built from the accumulated [`HttpClientConfig`].
pub struct HttpClientBuilder {
    config: HttpClientConfig,
    default_headers: Map<String, Value>,
    transport: Option<Arc<dyn Transport>>,
    macros: Option<ResponseMacros>,
}

impl HttpClientBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a builder with a specific configuration
    #[must_use]
    pub fn with_config(config: HttpClientConfig) -> Self {
        Self {
            config,
            default_headers: Map::new(),
            transport: None,
            macros: None,
        }
    }

    /// Set the default whole-exchange timeout
    ///
    /// Used when a request carries no `timeout` option.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Set the TCP connect timeout
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Set the user agent string
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the maximum response body size
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Set the maximum number of redirects to follow
    #[must_use]
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.redirect.max_redirects = max_redirects;
        self
    }

    /// Return every 3xx as-is unless a request asks otherwise
    #[must_use]
    pub fn no_redirects(mut self) -> Self {
        self.config.redirect.max_redirects = 0;
        self
    }

    /// Replace the redirect policy configuration
    #[must_use]
    pub fn redirect(mut self, config: RedirectConfig) -> Self {
        self.config.redirect = config;
        self
    }

    /// Choose the root certificate store
    #[must_use]
    pub fn tls_roots(mut self, roots: TlsRootConfig) -> Self {
        self.config.tls_roots = roots;
        self
    }

    /// Set idle timeout for pooled connections
    ///
    /// `None` keeps hyper-util's default.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// Set maximum idle connections per host; `0` disables reuse.
    #[must_use]
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.config.pool_max_idle_per_host = max;
        self
    }

    /// Headers merged into every request made through the client
    #[must_use]
    pub fn default_headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.default_headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Use `transport` instead of building a [`HyperTransport`]
    ///
    /// Network-related configuration is then up to the given transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Response macro registry for the client (default: the global one)
    #[must_use]
    pub fn macros(mut self, macros: ResponseMacros) -> Self {
        self.macros = Some(macros);
        self
    }

    /// Build the HTTP client
    ///
    /// # Errors
    /// Returns an error if the transport runtime or TLS cannot be initialized,
    /// or the user agent is not a valid header value
    pub fn build(self) -> Result<HttpClient, HttpError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HyperTransport::new(self.config)?) as Arc<dyn Transport>,
        };

        Ok(HttpClient {
            transport,
            default_headers: Arc::new(self.default_headers),
            macros: self.macros.unwrap_or_else(ResponseMacros::global),
        })
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
