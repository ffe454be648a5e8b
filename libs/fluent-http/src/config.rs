use std::collections::HashSet;
use std::time::Duration;

/// Default User-Agent string for HTTP requests
pub const DEFAULT_USER_AGENT: &str = concat!("fluent-http/", env!("CARGO_PKG_VERSION"));

/// Configuration for redirect behavior
///
/// Controls how the bundled transport handles 3xx responses when the
/// `allow_redirects` option does not turn following off.
///
/// ## Security Features
///
/// - **Header stripping**: Removes `Authorization`, `Cookie` on cross-origin redirects
/// - **Downgrade protection**: Blocks HTTPS → HTTP redirects
/// - **Same-origin enforcement** (opt-in): only follow redirects to the same host
/// - **Host allow-list**: trusted targets when same-origin enforcement is on
///
/// ## Example
///
/// ```rust,ignore
/// use fluent_http::RedirectConfig;
/// use std::collections::HashSet;
///
/// // Only follow redirects within the same origin or to a known CDN
/// let config = RedirectConfig {
///     same_origin_only: true,
///     allowed_redirect_hosts: HashSet::from(["cdn.example.com".to_string()]),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct RedirectConfig {
    /// Maximum number of redirects to follow (default: 10)
    ///
    /// Set to `0` to disable redirect following entirely.
    pub max_redirects: usize,

    /// Only allow same-origin redirects (default: false)
    ///
    /// When `true`, redirects to different hosts are blocked unless the target
    /// host is in `allowed_redirect_hosts`.
    pub same_origin_only: bool,

    /// Hosts that are allowed as redirect targets even when `same_origin_only` is true
    ///
    /// Entries are hostnames only, without scheme or port.
    pub allowed_redirect_hosts: HashSet<String>,

    /// Strip sensitive headers on cross-origin redirects (default: true)
    ///
    /// Removes `Authorization`, `Cookie` and `Proxy-Authorization` once a hop
    /// leaves the original origin.
    pub strip_sensitive_headers: bool,

    /// Allow HTTPS → HTTP downgrades (default: false)
    pub allow_https_downgrade: bool,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self::permissive()
    }
}

impl RedirectConfig {
    /// Follow redirects to any host, stripping credentials on cross-origin hops.
    ///
    /// Still blocks HTTPS → HTTP downgrades.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            max_redirects: 10,
            same_origin_only: false,
            allowed_redirect_hosts: HashSet::new(),
            strip_sensitive_headers: true,
            allow_https_downgrade: false,
        }
    }

    /// Only follow redirects that stay on the same scheme, host and port.
    #[must_use]
    pub fn same_origin() -> Self {
        Self {
            same_origin_only: true,
            ..Self::permissive()
        }
    }

    /// Create a configuration that disables redirect following
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_redirects: 0,
            ..Self::permissive()
        }
    }

    /// Create a configuration for testing (allows downgrades, permissive)
    ///
    /// **WARNING**: Only use for local testing with mock servers.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            allow_https_downgrade: true,
            ..Self::permissive()
        }
    }

    /// Same configuration with a different hop limit.
    #[must_use]
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }
}

/// TLS root certificate configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Use Mozilla's root certificates (webpki-roots, no OS dependency)
    #[default]
    WebPki,
    /// Use OS native root certificate store
    Native,
}

/// Overall HTTP client configuration
///
/// Per-request options (`timeout`, `allow_redirects`, `verify`) override the
/// matching defaults here.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// User-Agent header value (default: "fluent-http/<version>")
    ///
    /// Only added when the request does not carry its own User-Agent.
    pub user_agent: String,

    /// Timeout for establishing a TCP connection (default: 10 seconds)
    pub connect_timeout: Option<Duration>,

    /// Timeout for the whole exchange, body included (default: 30 seconds)
    ///
    /// Used when a request has no `timeout` option. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,

    /// Maximum response body size in bytes (default: 10 MB)
    pub max_body_size: usize,

    /// Redirect policy configuration (default: permissive with header stripping)
    pub redirect: RedirectConfig,

    /// TLS root certificate strategy (default: `WebPki`)
    pub tls_roots: TlsRootConfig,

    /// Timeout for idle connections in the pool (default: 90 seconds)
    ///
    /// Set to `None` to use hyper-util's default idle timeout.
    pub pool_idle_timeout: Option<Duration>,

    /// Maximum number of idle connections per host (default: 32)
    ///
    /// Setting this to `0` disables connection reuse entirely.
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            connect_timeout: Some(Duration::from_secs(10)),
            request_timeout: Some(Duration::from_secs(30)),
            max_body_size: 10 * 1024 * 1024, // 10 MB
            redirect: RedirectConfig::default(),
            tls_roots: TlsRootConfig::default(),
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }
}

impl HttpClientConfig {
    /// Create minimal configuration (small timeouts, small pool)
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            connect_timeout: Some(Duration::from_secs(5)),
            request_timeout: Some(Duration::from_secs(10)),
            max_body_size: 1024 * 1024, // 1 MB
            redirect: RedirectConfig::default(),
            tls_roots: TlsRootConfig::default(),
            pool_idle_timeout: Some(Duration::from_secs(30)),
            pool_max_idle_per_host: 8,
        }
    }

    /// Create configuration for testing with mock servers
    ///
    /// Allows HTTPS → HTTP redirect downgrades. Use only for local testing.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            connect_timeout: Some(Duration::from_secs(5)),
            request_timeout: Some(Duration::from_secs(10)),
            max_body_size: 1024 * 1024, // 1 MB
            redirect: RedirectConfig::for_testing(),
            tls_roots: TlsRootConfig::default(),
            pool_idle_timeout: Some(Duration::from_secs(10)),
            pool_max_idle_per_host: 4,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_config_default_is_permissive() {
        let config = RedirectConfig::default();
        assert_eq!(config.max_redirects, 10);
        assert!(!config.same_origin_only);
        assert!(config.strip_sensitive_headers);
        assert!(!config.allow_https_downgrade);
        assert!(config.allowed_redirect_hosts.is_empty());
    }

    #[test]
    fn test_redirect_config_same_origin() {
        let config = RedirectConfig::same_origin();
        assert!(config.same_origin_only);
        assert!(config.strip_sensitive_headers);
    }

    #[test]
    fn test_redirect_config_disabled() {
        let config = RedirectConfig::disabled();
        assert_eq!(config.max_redirects, 0);
    }

    #[test]
    fn test_redirect_config_for_testing() {
        let config = RedirectConfig::for_testing();
        assert!(!config.same_origin_only);
        assert!(config.allow_https_downgrade);
        assert!(config.strip_sensitive_headers); // Still strip headers
    }

    #[test]
    fn test_redirect_config_with_max_redirects() {
        let config = RedirectConfig::same_origin().with_max_redirects(3);
        assert_eq!(config.max_redirects, 3);
        assert!(config.same_origin_only);
    }

    #[test]
    fn test_http_client_config_defaults() {
        let config = HttpClientConfig::default();
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.max_body_size, 10 * 1024 * 1024);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.tls_roots, TlsRootConfig::WebPki);
        assert_eq!(config.pool_max_idle_per_host, 32);
    }

    #[test]
    fn test_http_client_config_minimal() {
        let config = HttpClientConfig::minimal();
        assert_eq!(config.request_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.max_body_size, 1024 * 1024);
    }

    #[test]
    fn test_http_client_config_for_testing() {
        let config = HttpClientConfig::for_testing();
        assert!(config.redirect.allow_https_downgrade);
        assert_eq!(config.pool_max_idle_per_host, 4);
    }

    #[test]
    fn test_default_user_agent_carries_version() {
        assert!(DEFAULT_USER_AGENT.starts_with("fluent-http/"));
        assert!(DEFAULT_USER_AGENT.len() > "fluent-http/".len());
    }
}
