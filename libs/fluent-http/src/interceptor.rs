use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, Request, Uri};

use crate::error::HttpError;
use crate::options::Options;

/// Mutable view over a request that is about to leave.
///
/// Handed to each [`Interceptor`] in turn; edits made here are what the next
/// interceptor, and finally the network, sees.
pub struct OutgoingRequest<'a> {
    inner: &'a mut Request<Bytes>,
}

impl<'a> OutgoingRequest<'a> {
    pub(crate) fn new(inner: &'a mut Request<Bytes>) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Full URL, including the encoded query.
    #[must_use]
    pub fn url(&self) -> String {
        self.inner.uri().to_string()
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// First value of the named header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
    }

    /// First value of every header, keyed by lowercase name.
    #[must_use]
    pub fn headers(&self) -> BTreeMap<String, String> {
        first_values(self.inner.headers())
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    /// Replace every value of `name` with `value`.
    ///
    /// # Errors
    /// Returns an error if the name or value is not a valid header.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), HttpError> {
        let name = HeaderName::try_from(name)?;
        let value = HeaderValue::try_from(value)?;
        self.inner.headers_mut().insert(name, value);
        Ok(())
    }

    pub fn remove_header(&mut self, name: &str) {
        self.inner.headers_mut().remove(name);
    }

    /// Materialized request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    #[must_use]
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.inner.body())
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        *self.inner.body_mut() = body.into();
    }
}

impl fmt::Debug for OutgoingRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutgoingRequest")
            .field("method", self.inner.method())
            .field("uri", self.inner.uri())
            .field("body_len", &self.inner.body().len())
            .finish_non_exhaustive()
    }
}

pub(crate) fn first_values(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for name in headers.keys() {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            out.insert(name.as_str().to_owned(), value.to_owned());
        }
    }
    out
}

/// Callback run against the fully configured request just before it is sent.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, request: &mut OutgoingRequest<'_>, options: &Options);
}

impl<F> Interceptor for F
where
    F: Fn(&mut OutgoingRequest<'_>, &Options) + Send + Sync,
{
    fn intercept(&self, request: &mut OutgoingRequest<'_>, options: &Options) {
        self(request, options);
    }
}

/// Ordered list of interceptors; runs in registration order.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, interceptor: impl Interceptor + 'static) {
        self.interceptors.push(Arc::new(interceptor));
    }

    /// Append a closure; its signature is inferred from the bound.
    pub fn push_fn<F>(&mut self, f: F)
    where
        F: Fn(&mut OutgoingRequest<'_>, &Options) + Send + Sync + 'static,
    {
        self.push(f);
    }

    pub fn push_arc(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Append every interceptor of `other`, keeping its order.
    pub fn extend_from(&mut self, other: &InterceptorChain) {
        self.interceptors.extend(other.interceptors.iter().cloned());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run every interceptor against `request`.
    pub fn run(&self, request: &mut Request<Bytes>, options: &Options) {
        let mut view = OutgoingRequest::new(request);
        for interceptor in &self.interceptors {
            interceptor.intercept(&mut view, options);
        }
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.interceptors.len())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn request() -> Request<Bytes> {
        Request::builder()
            .method(Method::POST)
            .uri("http://example.test/path?a=1")
            .header("content-type", "application/json")
            .header("x-multi", "first")
            .header("x-multi", "second")
            .body(Bytes::from_static(br#"{"k":"v"}"#))
            .unwrap()
    }

    #[test]
    fn test_view_accessors() {
        let mut req = request();
        let view = OutgoingRequest::new(&mut req);

        assert_eq!(view.method(), Method::POST);
        assert_eq!(view.url(), "http://example.test/path?a=1");
        assert_eq!(view.header("Content-Type"), Some("application/json"));
        assert_eq!(view.headers().get("x-multi").map(String::as_str), Some("first"));
        assert_eq!(view.body_text(), r#"{"k":"v"}"#);
    }

    #[test]
    fn test_chain_runs_in_order_and_sees_prior_mutations() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut chain = InterceptorChain::new();

        chain.push_fn(|req, _| {
            req.set_header("x-step", "a").unwrap();
            req.set_body("changed");
        });
        let seen_b = Arc::clone(&seen);
        chain.push_fn(move |req, _| {
            seen_b.lock().push((
                req.header("x-step").map(str::to_owned),
                req.body_text().into_owned(),
            ));
            req.set_header("x-step", "b").unwrap();
        });

        let mut req = request();
        chain.run(&mut req, &Options::new());

        assert_eq!(
            *seen.lock(),
            vec![(Some("a".to_owned()), "changed".to_owned())]
        );
        assert_eq!(req.headers()["x-step"], "b");
        assert_eq!(req.body().as_ref(), b"changed");
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_interceptor_receives_options() {
        let captured = Arc::new(Mutex::new(None));
        let captured_c = Arc::clone(&captured);
        let mut chain = InterceptorChain::new();
        chain.push_fn(move |_, options| {
            *captured_c.lock() = options.get("cookies").cloned();
        });

        let options = Options::single("cookies", json!({"a": "1"}));
        chain.run(&mut request(), &options);

        assert_eq!(*captured.lock(), Some(json!({"a": "1"})));
    }

    #[test]
    fn test_remove_header_and_invalid_set() {
        let mut req = request();
        let mut view = OutgoingRequest::new(&mut req);
        view.remove_header("x-multi");
        assert!(view.header("x-multi").is_none());
        assert!(view.set_header("bad header", "v").is_err());
        assert!(view.set_header("x-ok", "line\nbreak").is_err());
    }
}
