//! `resilient-fetch` is an async JSON HTTP client for dashboard backends.
//!
//! Every call through [`FetchClient`] gets:
//! - a per-attempt timeout,
//! - supersede-on-start cancellation (one live call per client instance),
//! - bounded retry with exponential (or linear) backoff,
//! - an optional TTL cache for GET responses.
//!
//! Domain wrappers [`StocksApi`] and [`NewsApi`] validate backend records
//! into [`StockQuote`] and [`NewsArticle`], dropping malformed items.

mod cache;
mod client;
mod decode;
mod error;
mod news;
mod options;
mod params;
mod request;
mod retry;
mod stocks;
pub mod transport;
mod types;
mod wire;

pub use cache::{CacheEntryInfo, CacheStats};
pub use client::FetchClient;
pub use decode::{lenient_f64, lenient_u64, normalize_records, parse_timestamp, Record};
pub use error::{ErrorKind, FetchError};
pub use news::{NewsApi, NewsFilters, DEFAULT_TICKER, NEWS_PATH, SUPPORTED_TICKERS};
pub use options::ClientOptions;
pub use params::QueryParams;
pub use request::{CacheMode, Method, RequestDescriptor};
pub use retry::Backoff;
pub use stocks::{StocksApi, EXPECTED_TICKERS, MARKET_OVERVIEW_PATH};
pub use types::{NewsArticle, StockQuote};

pub type Result<T> = std::result::Result<T, FetchError>;
