//! Named extensions ("macros") callable on a response by name.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::HttpError;
use crate::response::HttpResponse;

/// A response extension: receives the response and the call arguments.
pub type ResponseMacro =
    Arc<dyn Fn(&HttpResponse, &[Value]) -> Result<Value, HttpError> + Send + Sync>;

static GLOBAL_MACROS: OnceLock<ResponseMacros> = OnceLock::new();

/// Shared registry of response extensions.
///
/// Cloning yields another handle to the same registry. Use
/// [`ResponseMacros::global`] for the process-wide registry or
/// [`ResponseMacros::new`] for one scoped to a client.
#[derive(Clone, Default)]
pub struct ResponseMacros {
    inner: Arc<RwLock<HashMap<String, ResponseMacro>>>,
}

impl ResponseMacros {
    /// Empty, independent registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry used when a client is not given its own.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_MACROS.get_or_init(Self::new).clone()
    }

    /// Register `f` under `name`, replacing any previous entry.
    pub fn register<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&HttpResponse, &[Value]) -> Result<Value, HttpError> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(name = %name, "registered response macro");
        self.inner.write().insert(name, Arc::new(f));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains_key(name)
    }

    /// Remove `name`; returns whether it was registered.
    pub fn remove(&self, name: &str) -> bool {
        self.inner.write().remove(name).is_some()
    }

    /// Look up `name`. The lock is released before the macro runs.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ResponseMacro> {
        self.inner.read().get(name).cloned()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ResponseMacros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseMacros")
            .field("names", &self.names())
            .finish()
    }
}
