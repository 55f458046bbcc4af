use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::sleep;

use crate::{
    cache::{CacheStats, ResponseCache},
    decode::{normalize_records, Record},
    retry::RetryState,
    transport::{HttpRequest, ReqwestTransport, Transport},
    CacheMode, ClientOptions, FetchError, QueryParams, RequestDescriptor, Result,
};

/// Occupancy of the single in-flight slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct InFlight {
    generation: u64,
    active: bool,
}

/// JSON HTTP client with per-attempt timeouts, bounded retry and a TTL cache.
///
/// At most one call per instance is live: starting a call cancels the one
/// still pending, which then settles with [`FetchError::Cancelled`]. Use one
/// instance per data domain when calls must not supersede each other.
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    options: ClientOptions,
    authorization: Option<String>,
    cache: Mutex<ResponseCache>,
    in_flight: watch::Sender<InFlight>,
}

impl fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchClient")
            .field("options", &self.options)
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Default for FetchClient {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

impl FetchClient {
    /// Creates a client that talks HTTP through `reqwest`.
    pub fn new(options: ClientOptions) -> Self {
        Self::with_transport(options, ReqwestTransport::default())
    }

    /// Creates a client on top of a custom transport.
    pub fn with_transport(options: ClientOptions, transport: impl Transport + 'static) -> Self {
        let cache = ResponseCache::new(
            Duration::from_millis(options.cache_ttl_ms),
            options.max_cache_entries,
        );
        let (in_flight, _) = watch::channel(InFlight::default());
        Self {
            transport: Arc::new(transport),
            options,
            authorization: None,
            cache: Mutex::new(cache),
            in_flight,
        }
    }

    /// Attaches `Authorization: Bearer <token>` to every request.
    ///
    /// If the token is missing the `Bearer ` prefix, it is added automatically.
    pub fn with_bearer_token(mut self, token: impl AsRef<str>) -> Self {
        self.authorization = Some(normalize_bearer_authorization(token.as_ref()));
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Performs `request` and returns the decoded JSON payload.
    pub async fn fetch_json(&self, request: &RequestDescriptor) -> Result<Value> {
        request.validate()?;

        let cacheable = self.options.caching_enabled() && request.is_cacheable();
        let key = request.cache_key();
        if cacheable && request.cache_mode == CacheMode::Use {
            let hit = self.cache().get(&key);
            if let Some(payload) = hit {
                #[cfg(feature = "tracing")]
                tracing::debug!(key = %key, "serving cached response");
                return Ok(payload);
            }
        }

        let timeout_ms = request.timeout_ms.unwrap_or(self.options.timeout_ms);
        if timeout_ms == 0 {
            return Err(FetchError::InvalidRequest(
                "timeout must be positive".to_owned(),
            ));
        }

        let guard = self.begin();
        let mut slot = self.in_flight.subscribe();
        let outcome = self
            .run_attempts(request, timeout_ms, guard.generation, &mut slot)
            .await;
        drop(guard);

        let (payload, body) = outcome?;
        if cacheable {
            self.cache().insert(key, body);
        }
        Ok(payload)
    }

    /// Performs `request` and deserializes the payload into `T`.
    pub async fn fetch<T: DeserializeOwned>(&self, request: &RequestDescriptor) -> Result<T> {
        let payload = self.fetch_json(request).await?;
        serde_json::from_value(payload)
            .map_err(|err| FetchError::MalformedResponse(format!("unexpected payload shape: {err}")))
    }

    /// Performs `request` and validates each item of the payload as `R`.
    ///
    /// A non-array payload yields an empty list; invalid items are dropped.
    pub async fn fetch_records<R: Record>(&self, request: &RequestDescriptor) -> Result<Vec<R>> {
        self.fetch_normalized(request, R::from_record).await
    }

    /// Like [`FetchClient::fetch_records`] with an ad-hoc validation function.
    pub async fn fetch_normalized<T, F>(&self, request: &RequestDescriptor, parse: F) -> Result<Vec<T>>
    where
        F: FnMut(&Value) -> Option<T>,
    {
        let payload = self.fetch_json(request).await?;
        Ok(normalize_records(&payload, parse))
    }

    /// Sends a GET request.
    pub async fn get<P: Into<QueryParams>>(&self, path: &str, params: P) -> Result<Value> {
        self.fetch_json(&RequestDescriptor::get(path).params(params))
            .await
    }

    /// Sends a POST request with a JSON body.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        self.fetch_json(&RequestDescriptor::post(path, body)?).await
    }

    /// Sends a DELETE request.
    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.fetch_json(&RequestDescriptor::delete(path)).await
    }

    /// Cancels the pending call, if any. Returns whether one was pending.
    pub fn cancel_pending(&self) -> bool {
        self.in_flight.send_if_modified(|slot| {
            if !slot.active {
                return false;
            }
            slot.generation += 1;
            slot.active = false;
            true
        })
    }

    /// Whether a call is currently in flight.
    pub fn is_loading(&self) -> bool {
        self.in_flight.borrow().active
    }

    pub fn clear_cache(&self) {
        self.cache().clear();
    }

    /// Drops the cached response for `request`. Returns whether one existed.
    pub fn invalidate(&self, request: &RequestDescriptor) -> bool {
        self.cache().remove(&request.cache_key())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache().stats()
    }

    fn cache(&self) -> MutexGuard<'_, ResponseCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the in-flight slot, superseding whoever held it. The slot is
    /// released when the guard drops, including when the caller abandons
    /// the call mid-flight.
    fn begin(&self) -> SlotGuard<'_> {
        let mut generation = 0;
        self.in_flight.send_modify(|slot| {
            #[cfg(feature = "tracing")]
            if slot.active {
                tracing::debug!(superseded = slot.generation, "cancelling previous request");
            }
            slot.generation += 1;
            slot.active = true;
            generation = slot.generation;
        });
        SlotGuard {
            slot: &self.in_flight,
            generation,
        }
    }

    async fn run_attempts(
        &self,
        request: &RequestDescriptor,
        timeout_ms: u64,
        generation: u64,
        slot: &mut watch::Receiver<InFlight>,
    ) -> Result<(Value, String)> {
        let http_request = self.build_http_request(request);
        let mut state = RetryState::new();

        loop {
            let outcome = tokio::select! {
                biased;
                _ = superseded(slot, generation) => return Err(FetchError::Cancelled),
                outcome = self.attempt(http_request.clone(), timeout_ms) => outcome,
            };

            let err = match outcome {
                Ok(done) => {
                    let current = slot.borrow().generation;
                    if current != generation {
                        return Err(FetchError::Cancelled);
                    }
                    return Ok(done);
                }
                Err(err) => err,
            };

            #[cfg(feature = "tracing")]
            let attempt = state.attempt;
            let Some(delay) = state.record_failure(err, &self.options, request) else {
                let err = state.into_error();
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    url = %http_request.url,
                    attempts = attempt,
                    error = %err,
                    "request failed"
                );
                return Err(err);
            };

            #[cfg(feature = "tracing")]
            tracing::debug!(
                url = %http_request.url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying request"
            );

            tokio::select! {
                biased;
                _ = superseded(slot, generation) => return Err(FetchError::Cancelled),
                _ = sleep(delay) => {}
            }
        }
    }

    async fn attempt(&self, request: HttpRequest, timeout_ms: u64) -> Result<(Value, String)> {
        let send = self.transport.send(request);
        let response = match tokio::time::timeout(Duration::from_millis(timeout_ms), send).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(FetchError::Network(err.0)),
            Err(_) => return Err(FetchError::Timeout { timeout_ms }),
        };

        if !response.is_success() {
            return Err(FetchError::HttpStatus {
                status: response.status,
                body: response.body,
            });
        }

        let payload: Value = serde_json::from_str(&response.body)
            .map_err(|err| FetchError::MalformedResponse(format!("invalid JSON: {err}")))?;
        if let Some(message) = application_error(&payload) {
            return Err(FetchError::Application { message });
        }
        Ok((payload, response.body))
    }

    fn build_http_request(&self, request: &RequestDescriptor) -> HttpRequest {
        let mut headers = vec![
            ("Accept".to_owned(), "application/json".to_owned()),
            ("Content-Type".to_owned(), "application/json".to_owned()),
        ];
        if let Some(authorization) = &self.authorization {
            headers.push(("Authorization".to_owned(), authorization.clone()));
        }
        HttpRequest {
            method: request.method,
            url: join_url(&self.options.base_url, &request.path_and_query()),
            headers,
            body: request.body.clone(),
        }
    }
}

/// Holds the in-flight slot for one call.
struct SlotGuard<'a> {
    slot: &'a watch::Sender<InFlight>,
    generation: u64,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let generation = self.generation;
        self.slot.send_if_modified(|slot| {
            if slot.generation != generation || !slot.active {
                return false;
            }
            slot.active = false;
            true
        });
    }
}

/// Resolves once the slot has moved past `generation`.
async fn superseded(slot: &mut watch::Receiver<InFlight>, generation: u64) {
    // The sender lives inside the client, so this cannot observe a closed channel
    // while the client is borrowed.
    let _ = slot.wait_for(|state| state.generation != generation).await;
}

/// Extracts an embedded `error` field from an otherwise successful body.
fn application_error(payload: &Value) -> Option<String> {
    let error = payload.as_object()?.get("error")?;
    match error {
        Value::Null | Value::Bool(false) => None,
        Value::String(message) if message.trim().is_empty() => None,
        Value::String(message) => Some(message.clone()),
        Value::Object(fields) => Some(
            fields
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| error.to_string(), str::to_owned),
        ),
        other => Some(other.to_string()),
    }
}

fn join_url(base_url: &str, path_and_query: &str) -> String {
    match (base_url.ends_with('/'), path_and_query.starts_with('/')) {
        (true, true) => format!("{base_url}{}", &path_and_query[1..]),
        (false, false) if !base_url.is_empty() => format!("{base_url}/{path_and_query}"),
        _ => format!("{base_url}{path_and_query}"),
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
