use crate::builder::HttpClientBuilder;
use crate::error::HttpError;
use crate::extensions::ResponseMacros;
use crate::options::{Options, keys};
use crate::request::PendingRequest;
use crate::response::HttpResponse;
use crate::transport::Transport;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Entry point: hands out [`PendingRequest`]s seeded with the client defaults.
///
/// Use [`HttpClientBuilder`] to construct instances with custom configuration.
///
/// # Thread Safety
///
/// `HttpClient` is `Clone + Send + Sync`. Cloning is cheap (shared transport
/// and connection pool).
///
/// # Example
///
/// ```ignore
/// let client = HttpClient::new()?;
///
/// let resp = client.get("https://api.example.com/users", json!({"page": 1}))?;
/// if resp.is_success() {
///     let users: Vec<User> = resp.json()?;
/// }
///
/// let resp = client
///     .request()
///     .with_basic_auth("user", "secret")
///     .as_form_params()
///     .post("https://api.example.com/login", json!({"remember": true}))?;
/// ```
#[derive(Clone)]
pub struct HttpClient {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) default_headers: Arc<Map<String, Value>>,
    pub(crate) macros: ResponseMacros,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    ///
    /// # Errors
    /// Returns an error if the transport runtime or TLS cannot be initialized
    pub fn new() -> Result<Self, HttpError> {
        HttpClientBuilder::new().build()
    }

    /// Create a builder for configuring the HTTP client
    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Start a request with the client's default headers and macros.
    pub fn request(&self) -> PendingRequest {
        let request = PendingRequest::new(Arc::clone(&self.transport)).with_macros(self.macros.clone());
        if self.default_headers.is_empty() {
            request
        } else {
            request.with_options(Options::single(
                keys::HEADERS,
                Value::Object(self.default_headers.as_ref().clone()),
            ))
        }
    }

    /// `GET` with `params` as query parameters.
    ///
    /// # Errors
    /// See [`PendingRequest::send`].
    pub fn get(&self, url: &str, params: impl Serialize) -> Result<HttpResponse, HttpError> {
        self.request().get(url, params)
    }

    /// `POST` with `params` as a JSON body.
    ///
    /// # Errors
    /// See [`PendingRequest::send`].
    pub fn post(&self, url: &str, params: impl Serialize) -> Result<HttpResponse, HttpError> {
        self.request().post(url, params)
    }

    /// # Errors
    /// See [`PendingRequest::send`].
    pub fn put(&self, url: &str, params: impl Serialize) -> Result<HttpResponse, HttpError> {
        self.request().put(url, params)
    }

    /// # Errors
    /// See [`PendingRequest::send`].
    pub fn patch(&self, url: &str, params: impl Serialize) -> Result<HttpResponse, HttpError> {
        self.request().patch(url, params)
    }

    /// # Errors
    /// See [`PendingRequest::send`].
    pub fn delete(&self, url: &str, params: impl Serialize) -> Result<HttpResponse, HttpError> {
        self.request().delete(url, params)
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}
