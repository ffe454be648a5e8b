use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, HeaderName, HeaderValue};
use http::{Method, Request};
use rand::Rng;
use serde_json::Value;

use crate::error::{HttpError, InvalidUriKind};
use crate::options::{Auth, Options, encode_pairs, keys, scalar_to_string, type_name};

/// Encoded body plus the Content-Type it implies.
enum BodyKind {
    Empty,
    /// Raw `body` option; no implied Content-Type
    Raw(Bytes),
    Json(Bytes),
    Form(Bytes),
    Multipart { boundary: String, body: Bytes },
}

impl BodyKind {
    fn default_content_type(&self) -> Option<String> {
        match self {
            Self::Empty | Self::Raw(_) => None,
            Self::Json(_) => Some("application/json".to_owned()),
            Self::Form(_) => Some("application/x-www-form-urlencoded".to_owned()),
            Self::Multipart { boundary, .. } => {
                Some(format!("multipart/form-data; boundary={boundary}"))
            }
        }
    }

    fn into_bytes(self) -> Bytes {
        match self {
            Self::Empty => Bytes::new(),
            Self::Raw(b) | Self::Json(b) | Self::Form(b) | Self::Multipart { body: b, .. } => b,
        }
    }
}

/// Turn `(method, url, options)` into the request that goes on the wire.
///
/// - `query` replaces the URL's own query string when present
/// - `headers` list values become repeated headers
/// - the body comes from the first of `json`, `form_params`, `multipart`,
///   `body` that is set; its Content-Type is only added if none was given
/// - basic `auth` and `cookies` become `Authorization` and `Cookie` headers
///
/// Digest auth is not applied here; it needs the server's challenge.
///
/// # Errors
///
/// `HttpError::InvalidUri` for URLs that are not absolute http(s) URLs,
/// `HttpError::InvalidOption` for option values of the wrong shape, and header
/// or encoding errors for values that cannot be put on the wire.
pub fn prepare(method: &Method, url: &str, options: &Options) -> Result<Request<Bytes>, HttpError> {
    let url = build_url(url, options)?;

    let mut request = Request::builder()
        .method(method.clone())
        .uri(url.as_str())
        .body(Bytes::new())?;

    let headers = request.headers_mut();
    for (name, value) in options.headers()? {
        headers.append(HeaderName::try_from(name)?, HeaderValue::try_from(value)?);
    }

    let body = build_body(options)?;
    if !headers.contains_key(CONTENT_TYPE)
        && let Some(content_type) = body.default_content_type()
    {
        headers.insert(CONTENT_TYPE, HeaderValue::try_from(content_type)?);
    }

    if let Some(Auth::Basic { username, password }) = options.auth()? {
        let token = BASE64.encode(format!("{username}:{password}"));
        headers.insert(AUTHORIZATION, HeaderValue::try_from(format!("Basic {token}"))?);
    }

    if let Some(jar) = options.cookies().to_header_value() {
        let value = match headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{existing}; {jar}"),
            None => jar,
        };
        headers.insert(COOKIE, HeaderValue::try_from(value)?);
    }

    *request.body_mut() = body.into_bytes();
    Ok(request)
}

fn build_url(raw: &str, options: &Options) -> Result<url::Url, HttpError> {
    let mut url = url::Url::parse(raw).map_err(|e| HttpError::InvalidUri {
        url: raw.to_owned(),
        kind: InvalidUriKind::ParseError,
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(HttpError::InvalidUri {
            url: raw.to_owned(),
            kind: InvalidUriKind::UnsupportedScheme,
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(HttpError::InvalidUri {
            url: raw.to_owned(),
            kind: InvalidUriKind::MissingAuthority,
            reason: "missing host/authority".to_owned(),
        });
    }

    if let Some(query) = options.get(keys::QUERY) {
        let pairs = match query {
            Value::Null => Vec::new(),
            Value::Object(_) | Value::Array(_) => encode_pairs(query),
            other => {
                return Err(HttpError::invalid_option(
                    keys::QUERY,
                    format!("expected a mapping, got {}", type_name(other)),
                ));
            }
        };
        url.set_query(None);
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
    }

    Ok(url)
}

fn build_body(options: &Options) -> Result<BodyKind, HttpError> {
    if let Some(value) = present(options, keys::JSON) {
        return Ok(BodyKind::Json(Bytes::from(serde_json::to_vec(value)?)));
    }

    if let Some(value) = present(options, keys::FORM_PARAMS) {
        let encoded = serde_urlencoded::to_string(encode_pairs(value))?;
        return Ok(BodyKind::Form(Bytes::from(encoded)));
    }

    if let Some(value) = present(options, keys::MULTIPART) {
        let boundary = random_boundary();
        let body = encode_multipart(value, &boundary)?;
        return Ok(BodyKind::Multipart { boundary, body });
    }

    if let Some(value) = present(options, keys::BODY) {
        let text = scalar_to_string(value).ok_or_else(|| {
            HttpError::invalid_option(
                keys::BODY,
                format!("expected a string, got {}", type_name(value)),
            )
        })?;
        return Ok(BodyKind::Raw(Bytes::from(text)));
    }

    Ok(BodyKind::Empty)
}

fn present<'a>(options: &'a Options, key: &str) -> Option<&'a Value> {
    options.get(key).filter(|v| !v.is_null())
}

fn random_boundary() -> String {
    format!("fluent-http-{:016x}", rand::rng().random::<u64>())
}

/// One `multipart/form-data` part.
struct Part {
    name: String,
    contents: String,
    filename: Option<String>,
    headers: Vec<(String, String)>,
}

fn multipart_parts(value: &Value) -> Result<Vec<Part>, HttpError> {
    match value {
        // [{name, contents, filename?, headers?}, ...]
        Value::Array(items) => items.iter().map(part_from_descriptor).collect(),
        // {name: contents, ...}
        Value::Object(_) => Ok(encode_pairs(value)
            .into_iter()
            .map(|(name, contents)| Part {
                name,
                contents,
                filename: None,
                headers: Vec::new(),
            })
            .collect()),
        other => Err(HttpError::invalid_option(
            keys::MULTIPART,
            format!("expected a list of parts or a mapping, got {}", type_name(other)),
        )),
    }
}

fn part_from_descriptor(item: &Value) -> Result<Part, HttpError> {
    let invalid = |reason: &str| HttpError::invalid_option(keys::MULTIPART, reason);

    let Value::Object(fields) = item else {
        return Err(invalid("each part must be a mapping"));
    };
    let name = fields
        .get("name")
        .and_then(scalar_to_string)
        .ok_or_else(|| invalid("part is missing 'name'"))?;
    let contents = match fields.get("contents") {
        Some(Value::Null) | None => String::new(),
        Some(value) => {
            scalar_to_string(value).ok_or_else(|| invalid("part 'contents' must be a scalar"))?
        }
    };
    let filename = fields.get("filename").and_then(scalar_to_string);
    let headers = match fields.get("headers") {
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| scalar_to_string(v).map(|v| (k.clone(), v)))
            .collect(),
        _ => Vec::new(),
    };

    Ok(Part {
        name,
        contents,
        filename,
        headers,
    })
}

fn encode_multipart(value: &Value, boundary: &str) -> Result<Bytes, HttpError> {
    let mut body = String::new();

    for part in multipart_parts(value)? {
        body.push_str("--");
        body.push_str(boundary);
        body.push_str("\r\n");

        let has_disposition = part
            .headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("content-disposition"));
        if !has_disposition {
            body.push_str("Content-Disposition: form-data; name=\"");
            body.push_str(&escape_quoted(&part.name));
            body.push('"');
            if let Some(filename) = &part.filename {
                body.push_str("; filename=\"");
                body.push_str(&escape_quoted(filename));
                body.push('"');
            }
            body.push_str("\r\n");
        }

        let has_content_type = part
            .headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
        if part.filename.is_some() && !has_content_type {
            body.push_str("Content-Type: application/octet-stream\r\n");
        }

        for (name, value) in &part.headers {
            body.push_str(name);
            body.push_str(": ");
            body.push_str(value);
            body.push_str("\r\n");
        }

        body.push_str("\r\n");
        body.push_str(&part.contents);
        body.push_str("\r\n");
    }

    body.push_str("--");
    body.push_str(boundary);
    body.push_str("--\r\n");

    Ok(Bytes::from(body))
}

fn escape_quoted(value: &str) -> String {
    value.replace('"', "%22").replace(['\r', '\n'], " ")
}
