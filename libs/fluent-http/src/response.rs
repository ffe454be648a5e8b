use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use http::{HeaderMap, Response, StatusCode, Version};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cookies::CookieJar;
use crate::error::{BoxError, ConnectionError, HttpError};
use crate::extensions::ResponseMacros;
use crate::interceptor::first_values;
use crate::transport::TransferStats;

/// Type alias for the boxed response body that supports decompression.
///
/// This type can hold either a raw body or a decompressed body (gzip/br/deflate).
/// The body is type-erased to allow the decompression layer to work transparently.
pub type ResponseBody = http_body_util::combinators::BoxBody<Bytes, BoxError>;

/// Buffered HTTP response with convenience accessors.
///
/// Any status is a valid response: a 404 or 503 is returned here, not as an
/// error. Use the `is_*` predicates to classify it.
///
/// # Example
///
/// ```ignore
/// let resp = client.get("https://example.com/api/users", ())?;
/// if resp.is_success() {
///     let users: Vec<User> = resp.json()?;
/// }
/// ```
#[derive(Debug)]
pub struct HttpResponse {
    inner: Response<Bytes>,
    cookies: Option<CookieJar>,
    transfer_stats: Option<TransferStats>,
    macros: ResponseMacros,
}

impl HttpResponse {
    /// Wrap a raw response. Extensions resolve against the global registry.
    #[must_use]
    pub fn new(inner: Response<Bytes>) -> Self {
        Self {
            inner,
            cookies: None,
            transfer_stats: None,
            macros: ResponseMacros::global(),
        }
    }

    #[must_use]
    pub(crate) fn with_macros(mut self, macros: ResponseMacros) -> Self {
        self.macros = macros;
        self
    }

    pub(crate) fn set_cookies(&mut self, cookies: CookieJar) {
        self.cookies = Some(cookies);
    }

    pub(crate) fn set_transfer_stats(&mut self, stats: TransferStats) {
        self.transfer_stats = Some(stats);
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// Body as text. Invalid UTF-8 is replaced, never an error.
    #[must_use]
    pub fn body(&self) -> String {
        String::from_utf8_lossy(self.inner.body()).into_owned()
    }

    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        self.inner.body()
    }

    /// Decode the body as JSON. Decodes again on every call.
    ///
    /// # Errors
    /// Returns `HttpError::Json` if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        Ok(serde_json::from_slice(self.inner.body())?)
    }

    /// First value of the named header (case-insensitive).
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

    /// All headers, including repeated values.
    #[must_use]
    pub fn header_map(&self) -> &HeaderMap {
        self.inner.headers()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status().is_success()
    }

    /// Alias of [`is_success`](Self::is_success).
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.is_success()
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        self.status().is_redirection()
    }

    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Status 500 and above.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().as_u16() >= 500
    }

    /// URL of the last hop, after redirects.
    #[must_use]
    pub fn effective_uri(&self) -> Option<&str> {
        self.transfer_stats
            .as_ref()
            .map(|stats| stats.effective_uri.as_str())
    }

    /// Cookies sent with the request plus any set by the response.
    #[must_use]
    pub fn cookies(&self) -> Option<&CookieJar> {
        self.cookies.as_ref()
    }

    #[must_use]
    pub fn transfer_stats(&self) -> Option<&TransferStats> {
        self.transfer_stats.as_ref()
    }

    #[must_use]
    pub fn raw(&self) -> &Response<Bytes> {
        &self.inner
    }

    #[must_use]
    pub fn into_inner(self) -> Response<Bytes> {
        self.inner
    }

    /// Invoke a named extension, or one of the raw response accessors.
    ///
    /// A registered macro wins over an accessor of the same name.
    ///
    /// # Errors
    /// Returns `HttpError::UnknownMethod` when nothing matches `name`, or
    /// whatever the macro returns.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, HttpError> {
        if let Some(f) = self.macros.get(name) {
            return f(self, args);
        }

        let value = match name {
            "status" => Value::from(self.status().as_u16()),
            "reason" => self
                .status()
                .canonical_reason()
                .map_or(Value::Null, Value::from),
            "version" => Value::from(version_str(self.inner.version())),
            "body" => Value::from(self.body()),
            "json" => self.json::<Value>()?,
            "headers" => Value::Object(
                self.headers()
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            ),
            "header" => {
                let header = args.first().and_then(Value::as_str).ok_or_else(|| {
                    HttpError::invalid_option("header", "expected a header name argument")
                })?;
                self.header(header).map_or(Value::Null, Value::from)
            }
            "effective_uri" => self.effective_uri().map_or(Value::Null, Value::from),
            _ => return Err(HttpError::UnknownMethod(name.to_owned())),
        };
        Ok(value)
    }
}

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

impl fmt::Display for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.inner.body()))
    }
}

/// Read the whole body, failing once more than `limit` bytes arrive.
///
/// The limit applies to decompressed bytes, so a small compressed payload
/// that expands past it is rejected.
pub(crate) async fn read_body_limited(
    response: Response<ResponseBody>,
    limit: usize,
) -> Result<Response<Bytes>, HttpError> {
    let (parts, body) = response.into_parts();

    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(ConnectionError::transport)?;
        if let Some(chunk) = frame.data_ref() {
            if collected.len() + chunk.len() > limit {
                return Err(HttpError::BodyTooLarge {
                    limit,
                    actual: collected.len() + chunk.len(),
                });
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(Response::from_parts(parts, Bytes::from(collected)))
}
