use std::collections::BTreeMap;
use std::time::SystemTime;

use http::HeaderMap;
use http::header::SET_COOKIE;
use serde_json::Value;

use crate::options::scalar_to_string;

/// Name/value cookie store attached to a request and its response.
///
/// Only the pair is kept; attributes such as `Path` or `Domain` are ignored
/// except for `Max-Age=0` or an `Expires` date in the past, which remove the
/// cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a jar from the `cookies` option value (a name/value mapping).
    ///
    /// Non-scalar values are skipped.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let mut jar = Self::new();
        if let Value::Object(map) = value {
            for (name, value) in map {
                if let Some(value) = scalar_to_string(value) {
                    jar.insert(name.clone(), value);
                }
            }
        }
        jar
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.cookies.remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as a `Cookie` request header value, `None` when empty.
    #[must_use]
    pub fn to_header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Apply every `Set-Cookie` header of a response.
    pub fn absorb_set_cookie(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(SET_COOKIE) {
            let Ok(text) = value.to_str() else {
                continue;
            };
            self.apply_set_cookie(text);
        }
    }

    fn apply_set_cookie(&mut self, text: &str) {
        let mut parts = text.split(';');
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            return;
        };
        let name = name.trim();
        if name.is_empty() {
            return;
        }

        let now = SystemTime::now();
        let expired = parts.any(|attr| {
            attr.split_once('=').is_some_and(|(k, v)| {
                let (k, v) = (k.trim(), v.trim());
                if k.eq_ignore_ascii_case("max-age") {
                    v.starts_with(['0', '-'])
                } else if k.eq_ignore_ascii_case("expires") {
                    httpdate::parse_http_date(v).is_ok_and(|at| at <= now)
                } else {
                    false
                }
            })
        });
        if expired {
            self.cookies.remove(name);
        } else {
            let value = value.trim().trim_matches('"');
            self.cookies.insert(name.to_owned(), value.to_owned());
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CookieJar {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cookies: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
