use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::cookies::CookieJar;
use crate::error::HttpError;
use crate::extensions::ResponseMacros;
use crate::interceptor::{InterceptorChain, OutgoingRequest};
use crate::options::{BodyFormat, Options, keys, merge, parse_query};
use crate::response::HttpResponse;
use crate::transport::{TransferStats, Transport, TransportRequest};

/// Fluent request builder.
///
/// Configuration calls consume and return the builder; terminal calls
/// ([`send`](Self::send), [`get`](Self::get), [`post`](Self::post), ...) borrow
/// it, so one configured builder can send several requests.
///
/// # Example
///
/// ```ignore
/// use fluent_http::HttpClient;
///
/// let client = HttpClient::builder().build()?;
///
/// // Query parameters
/// let resp = client.request().get("https://api.example.com/users", json!({"page": 2}))?;
///
/// // Form body with a custom header
/// let resp = client
///     .request()
///     .as_form_params()
///     .with_headers([("X-Request-Id", "abc123")])
///     .post("https://auth.example.com/token", json!({"grant_type": "client_credentials"}))?;
///
/// // Redirect returned as-is
/// let resp = client.request().without_redirecting().get("https://example.com/old", ())?;
/// assert!(resp.is_redirect());
/// ```
#[must_use = "PendingRequest does nothing until a terminal call such as .get() is made"]
pub struct PendingRequest {
    transport: Arc<dyn Transport>,
    options: Options,
    body_format: BodyFormat,
    interceptors: InterceptorChain,
    macros: ResponseMacros,
}

impl PendingRequest {
    /// Builder over `transport` with the base option set
    /// (`http_errors = false`) and the JSON body format.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            options: Options::base(),
            body_format: BodyFormat::default(),
            interceptors: InterceptorChain::new(),
            macros: ResponseMacros::global(),
        }
    }

    /// Options accumulated so far.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn current_body_format(&self) -> BodyFormat {
        self.body_format
    }

    // --- configuration ------------------------------------------------------

    /// Merge headers into the `headers` option. Later calls win on the same
    /// name; list values become repeated headers.
    pub fn with_headers<K, V>(self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let headers: serde_json::Map<String, Value> = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.with_options(Options::single(keys::HEADERS, headers))
    }

    pub fn accept(self, value: impl Into<String>) -> Self {
        self.with_headers([("Accept", value.into())])
    }

    pub fn content_type(self, value: impl Into<String>) -> Self {
        self.with_headers([("Content-Type", value.into())])
    }

    /// Choose which option the verb helpers put their params under.
    pub fn body_format(mut self, format: BodyFormat) -> Self {
        self.body_format = format;
        self
    }

    pub fn as_json(self) -> Self {
        self.body_format(BodyFormat::Json)
            .content_type("application/json")
    }

    pub fn as_form_params(self) -> Self {
        self.body_format(BodyFormat::FormParams)
            .content_type("application/x-www-form-urlencoded")
    }

    /// Multipart bodies; the boundary Content-Type is set when the body is built.
    pub fn as_multipart(self) -> Self {
        self.body_format(BodyFormat::Multipart)
    }

    pub fn without_redirecting(mut self) -> Self {
        self.options.insert(keys::ALLOW_REDIRECTS, false);
        self
    }

    pub fn without_verifying(mut self) -> Self {
        self.options.insert(keys::VERIFY, false);
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.options.insert(
            keys::AUTH,
            Value::from(vec![username.into(), password.into()]),
        );
        self
    }

    pub fn with_digest_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.options.insert(
            keys::AUTH,
            Value::from(vec![username.into(), password.into(), "digest".to_owned()]),
        );
        self
    }

    /// Merge cookies into the `cookies` option.
    pub fn with_cookies<K, V>(self, cookies: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let cookies: serde_json::Map<String, Value> = cookies
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        self.with_options(Options::single(keys::COOKIES, cookies))
    }

    /// Bound the whole exchange, body included. A zero duration means no
    /// timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.insert(keys::TIMEOUT, timeout.as_secs_f64());
        self
    }

    /// Run `f` against the fully configured request right before it is sent.
    ///
    /// Interceptors run in registration order, once per send.
    pub fn before_sending<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut OutgoingRequest<'_>, &Options) + Send + Sync + 'static,
    {
        self.interceptors.push_fn(f);
        self
    }

    /// Deep-merge an arbitrary option set.
    pub fn with_options(mut self, options: Options) -> Self {
        self.options.merge_from(&options);
        self
    }

    /// Resolve [`HttpResponse::call`] against `macros` instead of the global
    /// registry.
    pub fn with_macros(mut self, macros: ResponseMacros) -> Self {
        self.macros = macros;
        self
    }

    // --- terminal calls -----------------------------------------------------

    /// `GET` with `params` as query parameters.
    ///
    /// # Errors
    /// See [`send`](Self::send).
    pub fn get(&self, url: &str, params: impl Serialize) -> Result<HttpResponse, HttpError> {
        self.send(Method::GET, url, &params_under(keys::QUERY, params)?)
    }

    /// `POST` with `params` as the body, encoded per the body format.
    ///
    /// # Errors
    /// See [`send`](Self::send).
    pub fn post(&self, url: &str, params: impl Serialize) -> Result<HttpResponse, HttpError> {
        self.send_with_body(Method::POST, url, params)
    }

    /// # Errors
    /// See [`send`](Self::send).
    pub fn put(&self, url: &str, params: impl Serialize) -> Result<HttpResponse, HttpError> {
        self.send_with_body(Method::PUT, url, params)
    }

    /// # Errors
    /// See [`send`](Self::send).
    pub fn patch(&self, url: &str, params: impl Serialize) -> Result<HttpResponse, HttpError> {
        self.send_with_body(Method::PATCH, url, params)
    }

    /// # Errors
    /// See [`send`](Self::send).
    pub fn delete(&self, url: &str, params: impl Serialize) -> Result<HttpResponse, HttpError> {
        self.send_with_body(Method::DELETE, url, params)
    }

    fn send_with_body(
        &self,
        method: Method,
        url: &str,
        params: impl Serialize,
    ) -> Result<HttpResponse, HttpError> {
        self.send(method, url, &params_under(self.body_format.key(), params)?)
    }

    /// Send one request.
    ///
    /// The URL's own query is parsed and merged under the builder options;
    /// `options` is merged last, so explicit params win on collision. Every
    /// HTTP status comes back as `Ok`.
    ///
    /// # Errors
    /// - `HttpError::Connection` if no response was received (refused,
    ///   DNS, TLS, timeout)
    /// - `HttpError::InvalidUri` / `HttpError::InvalidOption` for inputs that
    ///   cannot become a request
    pub fn send(
        &self,
        method: Method,
        url: &str,
        options: &Options,
    ) -> Result<HttpResponse, HttpError> {
        let query = Options::single(keys::QUERY, parse_query(url)?);
        let mut merged = merge(&self.options, [&query, options]);
        merged.insert(keys::HTTP_ERRORS, false);

        tracing::debug!(
            method = %method,
            url = %without_query(url),
            body_format = ?self.body_format,
            "sending request"
        );

        let stats: Arc<Mutex<Option<TransferStats>>> = Arc::new(Mutex::new(None));
        let stats_slot = Arc::clone(&stats);

        // cookies are captured first, ahead of the caller's interceptors
        let cookies: Arc<Mutex<Option<CookieJar>>> = Arc::new(Mutex::new(None));
        let cookie_slot = Arc::clone(&cookies);
        let mut before_send = InterceptorChain::new();
        before_send.push_fn(move |_request: &mut OutgoingRequest<'_>, options: &Options| {
            *cookie_slot.lock() = Some(options.cookies());
        });
        before_send.extend_from(&self.interceptors);

        let raw = self.transport.execute(TransportRequest {
            method,
            url: url.to_owned(),
            options: merged,
            before_send,
            on_stats: Some(Box::new(move |s| *stats_slot.lock() = Some(s))),
        })?;

        let mut response = HttpResponse::new(raw).with_macros(self.macros.clone());

        let mut jar = cookies.lock().take().unwrap_or_default();
        jar.absorb_set_cookie(response.header_map());
        response.set_cookies(jar);

        if let Some(stats) = stats.lock().take() {
            tracing::debug!(
                status = response.status().as_u16(),
                elapsed_ms = stats.total_time.as_millis(),
                effective_uri = %without_query(&stats.effective_uri),
                "received response"
            );
            response.set_transfer_stats(stats);
        }

        Ok(response)
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("options", &self.options)
            .field("body_format", &self.body_format)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

/// `{key: params}`, or nothing when `params` serializes to null.
fn params_under(key: &str, params: impl Serialize) -> Result<Options, HttpError> {
    match serde_json::to_value(params)? {
        Value::Null => Ok(Options::new()),
        value => Ok(Options::single(key, value)),
    }
}

fn without_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}
