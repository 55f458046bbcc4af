use serde::Serialize;

use crate::{FetchError, QueryParams, Result};

/// Supported HTTP verbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// Defines the behavior of the in-memory cache for a single call.
///
/// Only GET requests ever touch the cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Serve a non-expired entry if present; otherwise fetch and store.
    #[default]
    Use,
    /// Always fetch, then store the fresh response.
    Refresh,
    /// Always fetch and leave the cache untouched.
    Bypass,
}

/// One logical outbound call.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
    /// Path relative to the client's base URL.
    pub endpoint_path: String,
    pub method: Method,
    pub query: QueryParams,
    /// JSON payload, only ever set for POST.
    pub body: Option<serde_json::Value>,
    /// Per-attempt timeout; falls back to the client default when `None`.
    pub timeout_ms: Option<u64>,
    pub cache_mode: CacheMode,
    /// When `false`, the client's terminal statuses are retried like any
    /// other non-2xx response.
    pub abort_on_terminal_status: bool,
}

impl RequestDescriptor {
    fn new(method: Method, endpoint_path: impl Into<String>) -> Self {
        Self {
            endpoint_path: endpoint_path.into(),
            method,
            query: QueryParams::default(),
            body: None,
            timeout_ms: None,
            cache_mode: CacheMode::Use,
            abort_on_terminal_status: true,
        }
    }

    /// Creates a GET request.
    pub fn get(endpoint_path: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint_path)
    }

    /// Creates a DELETE request.
    pub fn delete(endpoint_path: impl Into<String>) -> Self {
        Self::new(Method::Delete, endpoint_path)
    }

    /// Creates a POST request with a JSON body.
    pub fn post<B: Serialize + ?Sized>(endpoint_path: impl Into<String>, body: &B) -> Result<Self> {
        let body = serde_json::to_value(body)
            .map_err(|err| FetchError::InvalidRequest(format!("unserializable body: {err}")))?;
        let mut request = Self::new(Method::Post, endpoint_path);
        request.body = Some(body);
        Ok(request)
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key, value);
        self
    }

    #[must_use]
    pub fn params<P: Into<QueryParams>>(mut self, params: P) -> Self {
        self.query = params.into();
        self
    }

    #[must_use]
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    #[must_use]
    pub fn cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    /// Retries terminal statuses (401, 404 by default) like transient ones.
    #[must_use]
    pub fn retry_all_statuses(mut self) -> Self {
        self.abort_on_terminal_status = false;
        self
    }

    /// Path plus encoded query string, e.g. `/api/data/news?ticker=GOOG`.
    pub fn path_and_query(&self) -> String {
        let query = self.query.encode();
        if query.is_empty() {
            return self.endpoint_path.clone();
        }
        let separator = if self.endpoint_path.contains('?') { '&' } else { '?' };
        format!("{}{separator}{query}", self.endpoint_path)
    }

    /// Logical identity used as the cache key.
    pub fn cache_key(&self) -> String {
        self.path_and_query()
    }

    pub(crate) fn is_cacheable(&self) -> bool {
        self.method == Method::Get && self.cache_mode != CacheMode::Bypass
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.endpoint_path.trim().is_empty() {
            return Err(FetchError::InvalidRequest(
                "endpoint path cannot be empty".to_owned(),
            ));
        }
        if self.timeout_ms == Some(0) {
            return Err(FetchError::InvalidRequest(
                "timeout must be positive".to_owned(),
            ));
        }
        if self.body.is_some() && self.method != Method::Post {
            return Err(FetchError::InvalidRequest(format!(
                "{} requests cannot carry a body",
                self.method.as_str()
            )));
        }
        Ok(())
    }
}
