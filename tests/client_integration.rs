use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use resilient_fetch::{
    CacheMode, ClientOptions, ErrorKind, FetchClient, FetchError, NewsApi, NewsFilters,
    RequestDescriptor, StocksApi,
};
use serde_json::{json, Value as JsonValue};

#[derive(Clone)]
struct MockResponse {
    status: StatusCode,
    body: String,
    delay: Duration,
}

impl MockResponse {
    fn json(status: StatusCode, body: JsonValue) -> Self {
        Self::raw(status, body.to_string())
    }

    fn raw(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::from_millis(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Debug)]
struct SeenRequest {
    uri: String,
    authorization: Option<String>,
    body: String,
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    hits: Arc<AtomicUsize>,
}

async fn handler(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state
        .seen
        .lock()
        .expect("seen mutex must not be poisoned")
        .push(SeenRequest {
            uri: uri.to_string(),
            authorization: headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned),
            body,
        });

    let response = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| {
            MockResponse::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "no mock response available"}),
            )
        })
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    (
        response.status,
        [(header::CONTENT_TYPE, "application/json")],
        response.body,
    )
}

struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().expect("seen mutex must not be poisoned").clone()
    }

    fn options(&self) -> ClientOptions {
        ClientOptions {
            timeout_ms: 1_000,
            retry_backoff_ms: 1,
            ..ClientOptions::with_base_url(&self.base_url)
        }
    }
}

async fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        seen: Arc::new(Mutex::new(Vec::new())),
        hits: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new().fallback(handler).with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        hits: state.hits,
        seen: state.seen,
        task,
    }
}

fn market_body() -> JsonValue {
    json!([
        {
            "symbol": "MDB",
            "name": "MongoDB",
            "sector": "TECH",
            "current_price": "$211.34",
            "change": -1.25,
            "high": 215.0,
            "low": 209.5,
            "volume": 1_200_000,
            "news_article": {
                "id": "n1",
                "title": "MongoDB beats estimates",
                "publisher": "Reuters",
                "date": "1700000000"
            }
        },
        { "symbol": "GTLB" },
        42
    ])
}

fn news_body() -> JsonValue {
    json!([
        { "id": "a1", "title": "Alphabet rallies", "publisher": "Bloomberg", "date": 1_700_000_000 },
        { "id": "a2", "publisher": "Reuters" }
    ])
}

#[tokio::test]
async fn market_overview_drops_invalid_records() {
    let server = spawn_server(vec![MockResponse::json(StatusCode::OK, market_body())]).await;
    let stocks = StocksApi::new(server.options());

    let quotes = stocks
        .market_overview(CacheMode::Use)
        .await
        .expect("overview must succeed");

    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].symbol, "MDB");
    assert_eq!(quotes[0].current_price, 211.34);
    assert_eq!(quotes[0].volume, 1_200_000);
    let article = quotes[0].news_article.as_ref().expect("article must survive");
    assert_eq!(article.publisher, "Reuters");
    assert_eq!(server.seen()[0].uri, "/api/data/market-overview");
}

#[tokio::test]
async fn identical_get_within_ttl_hits_network_once() {
    let server = spawn_server(vec![MockResponse::json(StatusCode::OK, news_body())]).await;
    let client = FetchClient::new(server.options());

    let first = client
        .fetch_json(&RequestDescriptor::get("/api/data/news").params([("ticker", "GOOG"), ("search", "ai")]))
        .await
        .expect("first call must succeed");
    let second = client
        .fetch_json(&RequestDescriptor::get("/api/data/news").params([("search", "ai"), ("ticker", "GOOG")]))
        .await
        .expect("second call must be served from cache");

    assert_eq!(first, second);
    assert_eq!(server.hits(), 1);
    assert_eq!(client.cache_stats().total_entries, 1);
}

#[tokio::test]
async fn refresh_mode_skips_cache_read_but_stores_result() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::OK, json!([1])),
        MockResponse::json(StatusCode::OK, json!([2])),
    ])
    .await;
    let client = FetchClient::new(server.options());
    let request = RequestDescriptor::get("/numbers");

    client.fetch_json(&request).await.expect("must succeed");
    let refreshed = client
        .fetch_json(&request.clone().cache_mode(CacheMode::Refresh))
        .await
        .expect("must succeed");
    let cached = client.fetch_json(&request).await.expect("must succeed");

    assert_eq!(refreshed, json!([2]));
    assert_eq!(cached, json!([2]));
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn expired_entry_is_refetched_and_overwritten() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::OK, json!(["old"])),
        MockResponse::json(StatusCode::OK, json!(["new"])),
    ])
    .await;
    let client = FetchClient::new(ClientOptions {
        cache_ttl_ms: 50,
        ..server.options()
    });
    let request = RequestDescriptor::get("/quotes");

    assert_eq!(client.fetch_json(&request).await.expect("must succeed"), json!(["old"]));
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(client.fetch_json(&request).await.expect("must succeed"), json!(["new"]));
    assert_eq!(client.fetch_json(&request).await.expect("must succeed"), json!(["new"]));
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn retries_on_server_error_then_succeeds() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})),
        MockResponse::json(StatusCode::SERVICE_UNAVAILABLE, json!({})),
        MockResponse::json(StatusCode::OK, news_body()),
    ])
    .await;
    let news = NewsApi::new(server.options());

    let articles = news
        .all_news(NewsFilters::default())
        .await
        .expect("request must succeed after retries");

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].id, "a1");
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::NOT_FOUND, json!({"detail": "missing"})),
        MockResponse::json(StatusCode::OK, json!([])),
    ])
    .await;
    let client = FetchClient::new(server.options());

    let err = client
        .fetch_json(&RequestDescriptor::get("/api/data/news"))
        .await
        .expect_err("404 must be terminal");

    assert_eq!(err.status(), Some(404));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn not_found_is_retried_when_caller_opts_out() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::NOT_FOUND, json!({})),
        MockResponse::json(StatusCode::OK, json!([])),
    ])
    .await;
    let client = FetchClient::new(server.options());

    let payload = client
        .fetch_json(&RequestDescriptor::get("/slow-index").retry_all_statuses())
        .await
        .expect("second attempt must succeed");

    assert_eq!(payload, json!([]));
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn exhausted_retries_surface_last_error() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::INTERNAL_SERVER_ERROR, json!({})),
        MockResponse::json(StatusCode::BAD_GATEWAY, json!({})),
        MockResponse::json(StatusCode::SERVICE_UNAVAILABLE, json!({})),
    ])
    .await;
    let client = FetchClient::new(server.options());

    let err = client
        .fetch_json(&RequestDescriptor::get("/flaky"))
        .await
        .expect_err("must fail after all attempts");

    assert_eq!(err.status(), Some(503));
    assert_eq!(server.hits(), 3);
    assert_eq!(client.cache_stats().total_entries, 0);
}

#[tokio::test]
async fn request_timeout_surfaces_timeout_kind() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::OK, json!([])).with_delay(Duration::from_millis(300)),
    ])
    .await;
    let client = FetchClient::new(ClientOptions {
        max_attempts: 1,
        ..server.options()
    });

    let err = client
        .fetch_json(&RequestDescriptor::get("/slow").timeout_ms(30))
        .await
        .expect_err("request must time out");

    assert_eq!(err, FetchError::Timeout { timeout_ms: 30 });
    assert!(!client.is_loading());
}

#[tokio::test]
async fn embedded_error_field_is_retried_as_transient() {
    let busy = json!({"error": "upstream busy"});
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::OK, busy.clone()),
        MockResponse::json(StatusCode::OK, busy.clone()),
        MockResponse::json(StatusCode::OK, busy),
    ])
    .await;
    let client = FetchClient::new(server.options());

    let err = client
        .fetch_json(&RequestDescriptor::get("/quotes"))
        .await
        .expect_err("must fail");

    assert_eq!(
        err,
        FetchError::Application {
            message: "upstream busy".to_owned()
        }
    );
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn malformed_body_is_retried_then_reported() {
    let server = spawn_server(vec![
        MockResponse::raw(StatusCode::OK, "<html>oops</html>"),
        MockResponse::raw(StatusCode::OK, "{\"truncated\": "),
    ])
    .await;
    let client = FetchClient::new(ClientOptions {
        max_attempts: 2,
        ..server.options()
    });

    let err = client
        .fetch_json(&RequestDescriptor::get("/quotes"))
        .await
        .expect_err("must fail");

    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn non_array_news_payload_is_an_empty_success() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        json!({"articles": "none"}),
    )])
    .await;
    let news = NewsApi::new(server.options());

    let articles = news
        .ticker_news("MDB", NewsFilters::default())
        .await
        .expect("non-array payload must not be an error");

    assert!(articles.is_empty());
}

#[tokio::test]
async fn empty_query_values_are_not_sent() {
    let server = spawn_server(vec![MockResponse::json(StatusCode::OK, json!([]))]).await;
    let news = NewsApi::new(server.options());

    news.all_news(NewsFilters::default().search("").publisher("  "))
        .await
        .expect("must succeed");

    let seen = server.seen();
    assert_eq!(seen[0].uri, "/api/data/news?ticker=GOOG");
}

#[tokio::test]
async fn bearer_token_and_post_body_are_forwarded() {
    let server = spawn_server(vec![MockResponse::json(StatusCode::OK, json!({"ok": true}))]).await;
    let client = FetchClient::new(server.options()).with_bearer_token("abc123");

    let payload = client
        .post("/signup", &json!({"email": "kit@example.com"}))
        .await
        .expect("post must succeed");

    assert_eq!(payload, json!({"ok": true}));
    let seen = server.seen();
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer abc123"));
    let body: JsonValue = serde_json::from_str(&seen[0].body).expect("body must be JSON");
    assert_eq!(body, json!({"email": "kit@example.com"}));
    assert_eq!(client.cache_stats().total_entries, 0);
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind");
    let address = listener.local_addr().expect("must have local addr");
    drop(listener);

    let client = FetchClient::new(ClientOptions {
        max_attempts: 2,
        retry_backoff_ms: 1,
        ..ClientOptions::with_base_url(format!("http://{address}"))
    });

    let err = client
        .get("/api/data/news", [("ticker", "GOOG")])
        .await
        .expect_err("nothing is listening");

    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(!err.user_message().contains(&address.to_string()));
}

#[tokio::test]
async fn publishers_are_collected_across_tickers() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::OK, json!([{ "id": "1", "title": "a", "publisher": "Reuters" }])),
        MockResponse::json(StatusCode::OK, json!([{ "id": "2", "title": "b", "publisher": "Bloomberg" }])),
        MockResponse::json(StatusCode::OK, json!([{ "id": "3", "title": "c" }])),
    ])
    .await;
    let news = NewsApi::new(ClientOptions {
        max_attempts: 1,
        ..server.options()
    })
    .with_supported_tickers(["MDB", "GOOG", "CFLT"]);

    let publishers = news.unique_publishers().await;

    assert_eq!(
        publishers,
        vec![
            "Bloomberg".to_owned(),
            "Reuters".to_owned(),
            "Unknown Publisher".to_owned(),
        ]
    );
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn publishers_fall_back_when_every_ticker_fails() {
    let server = spawn_server(vec![]).await;
    let news = NewsApi::new(ClientOptions {
        max_attempts: 1,
        ..server.options()
    })
    .with_supported_tickers(["MDB", "GOOG"]);

    let publishers = news.unique_publishers().await;

    assert!(publishers.contains(&"Reuters".to_owned()));
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn typed_fetch_and_delete() {
    #[derive(serde::Deserialize)]
    struct Status {
        healthy: bool,
    }

    let server = spawn_server(vec![
        MockResponse::json(StatusCode::OK, json!({"healthy": true})),
        MockResponse::json(StatusCode::OK, json!({"deleted": 1})),
        MockResponse::json(StatusCode::OK, json!([1, 2])),
    ])
    .await;
    let client = FetchClient::new(server.options());

    let status: Status = client
        .fetch(&RequestDescriptor::get("/health"))
        .await
        .expect("typed fetch must succeed");
    assert!(status.healthy);

    let deleted = client.delete("/watchlist/MDB").await.expect("delete must succeed");
    assert_eq!(deleted, json!({"deleted": 1}));

    let err = client
        .fetch::<Status>(&RequestDescriptor::get("/list"))
        .await
        .err()
        .expect("shape mismatch must fail");
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    assert_eq!(server.hits(), 3);
    assert_eq!(server.seen()[1].uri, "/watchlist/MDB");
}
