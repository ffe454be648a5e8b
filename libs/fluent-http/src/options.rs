//! Option sets: the JSON-like mapping every request is described by.
//!
//! Builders accumulate options with [`Options::merge_from`]; the sender folds the
//! URL query and per-call parameters in with [`merge`]. Transports read the
//! result through the typed accessors at the bottom of this file.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cookies::CookieJar;
use crate::error::{HttpError, InvalidUriKind};

/// Option names understood by the bundled transport.
pub mod keys {
    pub const HEADERS: &str = "headers";
    pub const QUERY: &str = "query";
    pub const JSON: &str = "json";
    pub const FORM_PARAMS: &str = "form_params";
    pub const MULTIPART: &str = "multipart";
    pub const BODY: &str = "body";
    pub const AUTH: &str = "auth";
    pub const COOKIES: &str = "cookies";
    pub const ALLOW_REDIRECTS: &str = "allow_redirects";
    pub const VERIFY: &str = "verify";
    pub const TIMEOUT: &str = "timeout";
    pub const HTTP_ERRORS: &str = "http_errors";
}

/// How `post`/`put`/`patch`/`delete` parameters are encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BodyFormat {
    #[default]
    Json,
    FormParams,
    Multipart,
}

impl BodyFormat {
    /// Option key the parameters are stored under.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Json => keys::JSON,
            Self::FormParams => keys::FORM_PARAMS,
            Self::Multipart => keys::MULTIPART,
        }
    }
}

/// Ordered mapping from option name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Map<String, Value>);

impl Options {
    /// Empty option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The set every request starts from: `{http_errors: false}`.
    #[must_use]
    pub fn base() -> Self {
        Self::single(keys::HTTP_ERRORS, Value::Bool(false))
    }

    /// A set holding exactly one key.
    #[must_use]
    pub fn single(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut options = Self::new();
        options.insert(key, value);
        options
    }

    /// Build an option set from a JSON value.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidOption` if `value` is not an object.
    pub fn from_value(value: Value) -> Result<Self, HttpError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(HttpError::invalid_option(
                "<root>",
                format!("expected an object, got {}", type_name(&other)),
            )),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Set `key` to `value`, replacing whatever was there.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Deep-merge `overlay` into this set.
    pub fn merge_from(&mut self, overlay: &Options) {
        merge_maps(&mut self.0, &overlay.0);
    }

    /// Copy of this set with `overlay` merged on top.
    #[must_use]
    pub fn merged(&self, overlay: &Options) -> Options {
        let mut out = self.clone();
        out.merge_from(overlay);
        out
    }

    // --- typed accessors -------------------------------------------------

    /// Header pairs in insertion order. List values expand to repeated headers.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidOption` if `headers` is not a mapping of
    /// scalars or lists of scalars.
    pub fn headers(&self) -> Result<Vec<(String, String)>, HttpError> {
        let Some(value) = self.get(keys::HEADERS) else {
            return Ok(Vec::new());
        };
        let map = match value {
            Value::Null => return Ok(Vec::new()),
            Value::Object(map) => map,
            other => {
                return Err(HttpError::invalid_option(
                    keys::HEADERS,
                    format!("expected a mapping, got {}", type_name(other)),
                ));
            }
        };

        let mut pairs = Vec::with_capacity(map.len());
        for (name, value) in map {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        pairs.push((name.clone(), header_scalar(name, item)?));
                    }
                }
                scalar => pairs.push((name.clone(), header_scalar(name, scalar)?)),
            }
        }
        Ok(pairs)
    }

    /// Query parameters, if any were set.
    #[must_use]
    pub fn query(&self) -> Option<&Value> {
        self.get(keys::QUERY).filter(|v| !v.is_null())
    }

    /// Whole-exchange timeout. `0` means no timeout.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidOption` for negative or non-numeric values.
    pub fn timeout(&self) -> Result<Option<Duration>, HttpError> {
        let Some(value) = self.get(keys::TIMEOUT) else {
            return Ok(None);
        };
        let secs = match value {
            Value::Null => return Ok(None),
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| HttpError::invalid_option(keys::TIMEOUT, "expected seconds as a number"))?;

        if secs.abs() < f64::EPSILON {
            return Ok(None);
        }
        Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(|e| HttpError::invalid_option(keys::TIMEOUT, e.to_string()))
    }

    /// Whether TLS certificates are verified. Defaults to `true`.
    #[must_use]
    pub fn verify(&self) -> bool {
        !matches!(self.get(keys::VERIFY), Some(Value::Bool(false)))
    }

    /// Redirect handling requested for this call.
    #[must_use]
    pub fn allow_redirects(&self) -> RedirectSetting {
        match self.get(keys::ALLOW_REDIRECTS) {
            Some(Value::Bool(false)) => RedirectSetting::Disabled,
            Some(Value::Object(map)) => match map.get("max").and_then(Value::as_u64) {
                Some(0) => RedirectSetting::Disabled,
                Some(max) => RedirectSetting::Max(usize::try_from(max).unwrap_or(usize::MAX)),
                None => RedirectSetting::Default,
            },
            _ => RedirectSetting::Default,
        }
    }

    /// Credentials from the `auth` option.
    ///
    /// Accepts `[user, pass]`, `[user, pass, "basic"]` and
    /// `[user, pass, "digest"]`.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidOption` for any other shape or scheme.
    pub fn auth(&self) -> Result<Option<Auth>, HttpError> {
        let Some(value) = self.get(keys::AUTH) else {
            return Ok(None);
        };
        let items = match value {
            Value::Null => return Ok(None),
            Value::Array(items) if (2..=3).contains(&items.len()) => items,
            _ => {
                return Err(HttpError::invalid_option(
                    keys::AUTH,
                    "expected [username, password] or [username, password, scheme]",
                ));
            }
        };

        let field = |idx: usize| -> Result<String, HttpError> {
            items
                .get(idx)
                .and_then(scalar_to_string)
                .ok_or_else(|| HttpError::invalid_option(keys::AUTH, "credentials must be scalars"))
        };
        let username = field(0)?;
        let password = field(1)?;

        match items.get(2).and_then(Value::as_str) {
            None => Ok(Some(Auth::Basic { username, password })),
            Some(scheme) if scheme.eq_ignore_ascii_case("basic") => {
                Ok(Some(Auth::Basic { username, password }))
            }
            Some(scheme) if scheme.eq_ignore_ascii_case("digest") => {
                Ok(Some(Auth::Digest { username, password }))
            }
            Some(scheme) => Err(HttpError::invalid_option(
                keys::AUTH,
                format!("unsupported auth scheme '{scheme}'"),
            )),
        }
    }

    /// Cookies to send, as a jar.
    #[must_use]
    pub fn cookies(&self) -> CookieJar {
        self.get(keys::COOKIES)
            .map(CookieJar::from_value)
            .unwrap_or_default()
    }

    /// Whether a non-2xx status should be an error. Always `false` once sent.
    #[must_use]
    pub fn http_errors(&self) -> bool {
        matches!(self.get(keys::HTTP_ERRORS), Some(Value::Bool(true)))
    }
}

impl From<Map<String, Value>> for Options {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Redirect setting carried by `allow_redirects`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectSetting {
    /// Use the client's configured redirect policy
    Default,
    /// Return 3xx responses as-is
    Disabled,
    /// Follow at most this many hops
    Max(usize),
}

/// Credentials from the `auth` option.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Basic { username: String, password: String },
    Digest { username: String, password: String },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (scheme, username) = match self {
            Self::Basic { username, .. } => ("Basic", username),
            Self::Digest { username, .. } => ("Digest", username),
        };
        f.debug_struct(scheme)
            .field("username", username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Deep-merge `overlays` onto `base` without touching either.
///
/// Mappings merge recursively, sequences concatenate, anything else is
/// replaced by the overlay. Keys are never removed.
#[must_use]
pub fn merge<'a>(base: &Options, overlays: impl IntoIterator<Item = &'a Options>) -> Options {
    let mut out = base.clone();
    for overlay in overlays {
        out.merge_from(overlay);
    }
    out
}

fn merge_maps(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(headers)) if key == keys::HEADERS => {
                merge_header_maps(existing, headers);
            }
            (Some(existing), _) => merge_value(existing, value),
            (None, _) => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Header names compare case-insensitively; the first spelling is kept.
fn merge_header_maps(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (name, value) in overlay {
        let name = base
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| name.clone());
        match base.get_mut(&name) {
            Some(slot) => merge_value(slot, value),
            None => {
                base.insert(name, value.clone());
            }
        }
    }
}

fn merge_value(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => merge_maps(base, overlay),
        (Value::Array(base), Value::Array(overlay)) => base.extend(overlay.iter().cloned()),
        (slot, overlay) => *slot = overlay.clone(),
    }
}

/// Parse the query component of `url` into nested values.
///
/// `a[]=1&a[]=2` becomes a list and `a[x]=1` a mapping; repeated plain keys keep
/// the last value.
///
/// # Errors
/// Returns `HttpError::InvalidUri` if `url` does not parse.
pub fn parse_query(url: &str) -> Result<Map<String, Value>, HttpError> {
    let parsed = url::Url::parse(url).map_err(|e| HttpError::InvalidUri {
        url: url.to_owned(),
        kind: InvalidUriKind::ParseError,
        reason: e.to_string(),
    })?;

    let mut out = Map::new();
    for (key, value) in parsed.query_pairs() {
        insert_bracketed(&mut out, &key, value.into_owned());
    }
    Ok(out)
}

fn insert_bracketed(map: &mut Map<String, Value>, key: &str, value: String) {
    let (base, segments) = split_key(key);
    if segments.is_empty() {
        map.insert(base.to_owned(), Value::String(value));
        return;
    }
    let slot = map.entry(base.to_owned()).or_insert(Value::Null);
    insert_path(slot, &segments, value);
}

fn insert_path(slot: &mut Value, segments: &[&str], value: String) {
    let Some((first, rest)) = segments.split_first() else {
        *slot = Value::String(value);
        return;
    };

    if first.is_empty() {
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(items) = slot {
            items.push(Value::Null);
            if let Some(last) = items.last_mut() {
                insert_path(last, rest, value);
            }
        }
    } else {
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(children) = slot {
            let child = children.entry((*first).to_owned()).or_insert(Value::Null);
            insert_path(child, rest, value);
        }
    }
}

/// Split `a[b][]` into `("a", ["b", ""])`. Malformed keys are kept whole.
fn split_key(key: &str) -> (&str, Vec<&str>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };
    if open == 0 {
        return (key, Vec::new());
    }

    let (base, mut rest) = key.split_at(open);
    let mut segments = Vec::new();
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            return (key, Vec::new());
        };
        segments.push(&stripped[..close]);
        rest = &stripped[close + 1..];
    }
    if !rest.is_empty() {
        return (key, Vec::new());
    }
    (base, segments)
}

/// Flatten nested values into `key[sub]=value` pairs.
///
/// Sequences use their index as the sub-key. Nulls are skipped, as are
/// top-level scalars (they have no name to go under).
#[must_use]
pub fn encode_pairs(value: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                push_pairs(&mut pairs, key.clone(), value);
            }
        }
        Value::Array(items) => {
            for (idx, value) in items.iter().enumerate() {
                push_pairs(&mut pairs, idx.to_string(), value);
            }
        }
        _ => {}
    }
    pairs
}

fn push_pairs(pairs: &mut Vec<(String, String)>, prefix: String, value: &Value) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, value) in map {
                push_pairs(pairs, format!("{prefix}[{key}]"), value);
            }
        }
        Value::Array(items) => {
            for (idx, value) in items.iter().enumerate() {
                push_pairs(pairs, format!("{prefix}[{idx}]"), value);
            }
        }
        scalar => {
            if let Some(text) = scalar_to_string(scalar) {
                pairs.push((prefix, text));
            }
        }
    }
}

/// Render a scalar the way it goes on the wire.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn header_scalar(name: &str, value: &Value) -> Result<String, HttpError> {
    scalar_to_string(value).ok_or_else(|| {
        HttpError::invalid_option(
            keys::HEADERS,
            format!("header '{name}' must be a scalar, got {}", type_name(value)),
        )
    })
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn opts(value: Value) -> Options {
        Options::from_value(value).unwrap()
    }

    #[test]
    fn test_base_sets_http_errors_false() {
        let base = Options::base();
        assert_eq!(base.get(keys::HTTP_ERRORS), Some(&Value::Bool(false)));
        assert!(!base.http_errors());
    }

    #[test]
    fn test_merge_is_deep_and_overlay_wins() {
        let base = opts(json!({"headers": {"A": "1", "B": "2"}}));
        let overlay = opts(json!({"headers": {"B": "3", "C": "4"}}));

        let merged = merge(&base, [&overlay]);

        assert_eq!(
            merged.get(keys::HEADERS),
            Some(&json!({"A": "1", "B": "3", "C": "4"}))
        );
        // inputs untouched
        assert_eq!(base.get(keys::HEADERS), Some(&json!({"A": "1", "B": "2"})));
    }

    #[test]
    fn test_merge_header_names_ignore_case() {
        let base = opts(json!({"headers": {"Content-Type": "application/json", "X-Tag": ["a"]}}));
        let overlay = opts(json!({"headers": {"content-type": "text/plain", "x-tag": ["b"]}}));

        let merged = base.merged(&overlay);
        assert_eq!(
            merged.get(keys::HEADERS),
            Some(&json!({"Content-Type": "text/plain", "X-Tag": ["a", "b"]}))
        );
    }

    #[test]
    fn test_merge_concatenates_sequences() {
        let base = opts(json!({"list": [1, 2]}));
        let overlay = opts(json!({"list": [3]}));

        let merged = base.merged(&overlay);
        assert_eq!(merged.get("list"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn test_merge_scalar_replaces_mapping() {
        let base = opts(json!({"allow_redirects": {"max": 3}, "keep": true}));
        let overlay = opts(json!({"allow_redirects": false}));

        let merged = base.merged(&overlay);
        assert_eq!(merged.get(keys::ALLOW_REDIRECTS), Some(&json!(false)));
        assert_eq!(merged.get("keep"), Some(&json!(true)));
    }

    #[test]
    fn test_merge_applies_overlays_in_order() {
        let base = Options::base();
        let first = opts(json!({"query": {"a": "1", "b": "url"}}));
        let second = opts(json!({"query": {"b": "explicit"}}));

        let merged = merge(&base, [&first, &second]);
        assert_eq!(merged.query(), Some(&json!({"a": "1", "b": "explicit"})));
        assert_eq!(merged.get(keys::HTTP_ERRORS), Some(&json!(false)));
    }

    #[test]
    fn test_insert_overwrites_without_merging() {
        let mut options = opts(json!({"auth": ["a", "b", "digest"]}));
        options.insert(keys::AUTH, json!(["c", "d"]));
        assert_eq!(options.get(keys::AUTH), Some(&json!(["c", "d"])));
    }

    #[test]
    fn test_parse_query_plain_and_bracketed() {
        let parsed = parse_query("http://x.test/p?a=1&b=two&c[]=x&c[]=y&d[k]=v&d[n][]=1").unwrap();

        assert_eq!(
            Value::Object(parsed),
            json!({
                "a": "1",
                "b": "two",
                "c": ["x", "y"],
                "d": {"k": "v", "n": ["1"]}
            })
        );
    }

    #[test]
    fn test_parse_query_absent_and_decoding() {
        assert!(parse_query("http://x.test/p").unwrap().is_empty());

        let parsed = parse_query("http://x.test/?q=hello%20world&plus=a+b").unwrap();
        assert_eq!(parsed.get("q"), Some(&json!("hello world")));
        assert_eq!(parsed.get("plus"), Some(&json!("a b")));
    }

    #[test]
    fn test_parse_query_last_plain_key_wins_and_malformed_kept_whole() {
        let parsed = parse_query("http://x.test/?a=1&a=2&b[=3&[c]=4").unwrap();
        assert_eq!(parsed.get("a"), Some(&json!("2")));
        assert_eq!(parsed.get("b["), Some(&json!("3")));
        assert_eq!(parsed.get("[c]"), Some(&json!("4")));
    }

    #[test]
    fn test_parse_query_rejects_unparseable_url() {
        let err = parse_query("not a url").unwrap_err();
        assert!(matches!(
            err,
            HttpError::InvalidUri {
                kind: InvalidUriKind::ParseError,
                ..
            }
        ));
    }

    #[test]
    fn test_encode_pairs_flattens_nested_values() {
        let pairs = encode_pairs(&json!({
            "a": 1,
            "b": ["x", "y"],
            "c": {"d": true, "e": null}
        }));

        assert_eq!(
            pairs,
            vec![
                ("a".to_owned(), "1".to_owned()),
                ("b[0]".to_owned(), "x".to_owned()),
                ("b[1]".to_owned(), "y".to_owned()),
                ("c[d]".to_owned(), "true".to_owned()),
            ]
        );
        assert!(encode_pairs(&json!("scalar")).is_empty());
    }

    #[test]
    fn test_headers_expand_lists_and_stringify_scalars() {
        let options = opts(json!({"headers": {"X-A": ["1", "2"], "X-B": 3, "X-C": null}}));
        let headers = options.headers().unwrap();
        assert_eq!(
            headers,
            vec![
                ("X-A".to_owned(), "1".to_owned()),
                ("X-A".to_owned(), "2".to_owned()),
                ("X-B".to_owned(), "3".to_owned()),
            ]
        );

        let bad = opts(json!({"headers": {"X": {"nested": 1}}}));
        assert!(matches!(bad.headers(), Err(HttpError::InvalidOption { .. })));
    }

    #[test]
    fn test_timeout_accessor() {
        assert_eq!(Options::new().timeout().unwrap(), None);
        assert_eq!(
            opts(json!({"timeout": 1.5})).timeout().unwrap(),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(opts(json!({"timeout": 0})).timeout().unwrap(), None);
        assert!(opts(json!({"timeout": -1})).timeout().is_err());
        assert!(opts(json!({"timeout": "soon"})).timeout().is_err());
    }

    #[test]
    fn test_verify_defaults_to_true() {
        assert!(Options::new().verify());
        assert!(opts(json!({"verify": true})).verify());
        assert!(!opts(json!({"verify": false})).verify());
    }

    #[test]
    fn test_allow_redirects_accessor() {
        assert_eq!(Options::new().allow_redirects(), RedirectSetting::Default);
        assert_eq!(
            opts(json!({"allow_redirects": false})).allow_redirects(),
            RedirectSetting::Disabled
        );
        assert_eq!(
            opts(json!({"allow_redirects": {"max": 2}})).allow_redirects(),
            RedirectSetting::Max(2)
        );
        assert_eq!(
            opts(json!({"allow_redirects": true})).allow_redirects(),
            RedirectSetting::Default
        );
    }

    #[test]
    fn test_auth_accessor() {
        assert_eq!(Options::new().auth().unwrap(), None);
        assert_eq!(
            opts(json!({"auth": ["u", "p"]})).auth().unwrap(),
            Some(Auth::Basic {
                username: "u".into(),
                password: "p".into()
            })
        );
        assert_eq!(
            opts(json!({"auth": ["u", "p", "digest"]})).auth().unwrap(),
            Some(Auth::Digest {
                username: "u".into(),
                password: "p".into()
            })
        );
        assert!(opts(json!({"auth": ["u", "p", "ntlm"]})).auth().is_err());
        assert!(opts(json!({"auth": "u:p"})).auth().is_err());
    }

    #[test]
    fn test_auth_debug_redacts_password() {
        let auth = Auth::Basic {
            username: "user".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{auth:?}");
        assert!(rendered.contains("user"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_body_format_keys() {
        assert_eq!(BodyFormat::default(), BodyFormat::Json);
        assert_eq!(BodyFormat::Json.key(), "json");
        assert_eq!(BodyFormat::FormParams.key(), "form_params");
        assert_eq!(BodyFormat::Multipart.key(), "multipart");
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Options::from_value(json!([1, 2])).is_err());
        assert!(Options::from_value(Value::Null).unwrap().is_empty());
    }
}
