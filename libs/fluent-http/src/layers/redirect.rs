//! Redirect policy for the bundled transport
//!
//! Follows 3xx responses up to a hop limit while:
//! - stripping credentials (`Authorization`, `Cookie`, `Proxy-Authorization`)
//!   once a hop leaves the original origin
//! - refusing HTTPS → HTTP downgrades
//! - optionally refusing cross-origin hops altogether
//!
//! A stopped redirect is not an error: the 3xx response is returned as-is.

use crate::config::RedirectConfig;
use crate::options::RedirectSetting;
use http::{Request, Uri, header};
use tower_http::follow_redirect::policy::{Action, Attempt, Policy};

/// Headers that are stripped on cross-origin redirects to prevent credential leakage
const SENSITIVE_HEADERS: &[header::HeaderName] = &[
    header::AUTHORIZATION,
    header::COOKIE,
    header::PROXY_AUTHORIZATION,
];

/// [`Policy`] driven by a [`RedirectConfig`].
///
/// State is per exchange: build a fresh policy for every request.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    config: RedirectConfig,
    hops: usize,
    crossed_origin: bool,
}

impl RedirectPolicy {
    #[must_use]
    pub fn new(config: RedirectConfig) -> Self {
        Self {
            config,
            hops: 0,
            crossed_origin: false,
        }
    }

    /// Client defaults adjusted by a request's `allow_redirects` option.
    #[must_use]
    pub fn for_request(defaults: &RedirectConfig, setting: RedirectSetting) -> Self {
        let config = match setting {
            RedirectSetting::Default => defaults.clone(),
            RedirectSetting::Disabled => defaults.clone().with_max_redirects(0),
            RedirectSetting::Max(max) => defaults.clone().with_max_redirects(max),
        };
        Self::new(config)
    }

    #[must_use]
    pub fn max_redirects(&self) -> usize {
        self.config.max_redirects
    }

    /// Scheme, host and port all match.
    ///
    /// A missing scheme counts as "https" so that scheme comparisons fail
    /// closed.
    pub(crate) fn is_same_origin(original: &Uri, target: &Uri) -> bool {
        let orig_scheme = original.scheme_str().unwrap_or("https");
        let target_scheme = target.scheme_str().unwrap_or("https");

        let orig_port = original
            .port_u16()
            .unwrap_or_else(|| default_port(orig_scheme));
        let target_port = target
            .port_u16()
            .unwrap_or_else(|| default_port(target_scheme));

        orig_scheme == target_scheme
            && original.host().unwrap_or("") == target.host().unwrap_or("")
            && orig_port == target_port
    }

    fn is_https_downgrade(original: &Uri, target: &Uri) -> bool {
        original.scheme_str().unwrap_or("https") == "https"
            && target.scheme_str().unwrap_or("https") == "http"
    }

    fn is_allowed_host(&self, target: &Uri) -> bool {
        target
            .host()
            .is_some_and(|host| self.config.allowed_redirect_hosts.contains(host))
    }
}

fn default_port(scheme: &str) -> u16 {
    match scheme {
        "http" => 80,
        "https" => 443,
        _ => 0,
    }
}

impl<B: Clone, E> Policy<B, E> for RedirectPolicy {
    fn redirect(&mut self, attempt: &Attempt<'_>) -> Result<Action, E> {
        self.hops += 1;
        if self.hops > self.config.max_redirects {
            tracing::debug!(
                hops = self.hops,
                max = self.config.max_redirects,
                "redirect not followed: hop limit reached"
            );
            return Ok(Action::Stop);
        }

        let previous = attempt.previous();
        let target = attempt.location();

        if !self.config.allow_https_downgrade && Self::is_https_downgrade(previous, target) {
            tracing::warn!(
                previous = %previous,
                target = %target,
                "blocking HTTPS to HTTP downgrade redirect"
            );
            return Ok(Action::Stop);
        }

        let same_origin = Self::is_same_origin(previous, target);
        if self.config.same_origin_only && !same_origin && !self.is_allowed_host(target) {
            tracing::warn!(
                previous = %previous,
                target = %target,
                "blocking cross-origin redirect (same_origin_only=true)"
            );
            return Ok(Action::Stop);
        }

        if !same_origin {
            self.crossed_origin = true;
        }

        tracing::debug!(status = %attempt.status(), target = %target, "following redirect");
        Ok(Action::Follow)
    }

    fn on_request(&mut self, request: &mut Request<B>) {
        if self.crossed_origin && self.config.strip_sensitive_headers {
            let headers = request.headers_mut();
            for name in SENSITIVE_HEADERS {
                if headers.remove(name).is_some() {
                    tracing::debug!(header = %name, "stripped sensitive header on cross-origin redirect");
                }
            }
        }
    }

    fn clone_body(&self, body: &B) -> Option<B> {
        // 307/308 replay the original body
        Some(body.clone())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_is_same_origin() {
        assert!(RedirectPolicy::is_same_origin(
            &uri("https://example.com/foo"),
            &uri("https://example.com:443/bar")
        ));
        assert!(!RedirectPolicy::is_same_origin(
            &uri("https://example.com/foo"),
            &uri("https://other.com/bar")
        ));
        assert!(!RedirectPolicy::is_same_origin(
            &uri("https://example.com/foo"),
            &uri("http://example.com/bar")
        ));
        assert!(!RedirectPolicy::is_same_origin(
            &uri("http://127.0.0.1:8080/a"),
            &uri("http://127.0.0.1:8081/a")
        ));
    }

    #[test]
    fn test_is_https_downgrade() {
        assert!(RedirectPolicy::is_https_downgrade(
            &uri("https://example.com/foo"),
            &uri("http://example.com/bar")
        ));
        assert!(!RedirectPolicy::is_https_downgrade(
            &uri("http://example.com/foo"),
            &uri("https://example.com/bar")
        ));
    }

    #[test]
    fn test_allowed_host() {
        let config = RedirectConfig {
            allowed_redirect_hosts: HashSet::from(["trusted.com".to_owned()]),
            ..RedirectConfig::same_origin()
        };
        let policy = RedirectPolicy::new(config);

        assert!(policy.is_allowed_host(&uri("https://trusted.com/path")));
        assert!(!policy.is_allowed_host(&uri("https://untrusted.com/path")));
    }

    #[test]
    fn test_for_request_applies_option() {
        let defaults = RedirectConfig::permissive();

        let policy = RedirectPolicy::for_request(&defaults, RedirectSetting::Default);
        assert_eq!(policy.max_redirects(), 10);

        let policy = RedirectPolicy::for_request(&defaults, RedirectSetting::Disabled);
        assert_eq!(policy.max_redirects(), 0);

        let policy = RedirectPolicy::for_request(&defaults, RedirectSetting::Max(2));
        assert_eq!(policy.max_redirects(), 2);
        assert!(!policy.crossed_origin);
    }

    #[test]
    fn test_on_request_strips_only_after_cross_origin() {
        let mut policy = RedirectPolicy::new(RedirectConfig::permissive());
        let mut req = Request::builder()
            .uri("http://other.test/")
            .header(header::AUTHORIZATION, "Basic abc")
            .header(header::COOKIE, "a=1")
            .header("x-keep", "1")
            .body(())
            .unwrap();

        Policy::<(), ()>::on_request(&mut policy, &mut req);
        assert!(req.headers().contains_key(header::AUTHORIZATION));

        policy.crossed_origin = true;
        Policy::<(), ()>::on_request(&mut policy, &mut req);
        assert!(!req.headers().contains_key(header::AUTHORIZATION));
        assert!(!req.headers().contains_key(header::COOKIE));
        assert!(req.headers().contains_key("x-keep"));
    }
}
