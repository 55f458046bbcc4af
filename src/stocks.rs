use crate::{CacheMode, ClientOptions, FetchClient, RequestDescriptor, Result, StockQuote};

/// Endpoint serving the market overview list.
pub const MARKET_OVERVIEW_PATH: &str = "/api/data/market-overview";

/// Tickers the backend is expected to report.
pub const EXPECTED_TICKERS: [&str; 4] = ["XMR-USD", "MDB", "GTLB", "CFLT"];

/// Market data access on a dedicated [`FetchClient`].
#[derive(Debug)]
pub struct StocksApi {
    client: FetchClient,
}

impl Default for StocksApi {
    fn default() -> Self {
        Self::new(Self::default_options())
    }
}

impl StocksApi {
    pub fn new(options: ClientOptions) -> Self {
        Self::from_client(FetchClient::new(options))
    }

    pub fn from_client(client: FetchClient) -> Self {
        Self { client }
    }

    /// Client defaults with a five minute cache.
    pub fn default_options() -> ClientOptions {
        ClientOptions {
            cache_ttl_ms: 5 * 60 * 1_000,
            ..ClientOptions::default()
        }
    }

    /// Fetches and validates the market overview.
    ///
    /// Entries without a symbol or name are dropped.
    pub async fn market_overview(&self, cache_mode: CacheMode) -> Result<Vec<StockQuote>> {
        let request = RequestDescriptor::get(MARKET_OVERVIEW_PATH).cache_mode(cache_mode);
        self.client.fetch_records(&request).await
    }

    pub fn expected_tickers(&self) -> &'static [&'static str] {
        &EXPECTED_TICKERS
    }

    pub fn client(&self) -> &FetchClient {
        &self.client
    }
}
