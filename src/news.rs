use std::collections::BTreeSet;

use crate::{
    ClientOptions, FetchClient, FetchError, NewsArticle, QueryParams, RequestDescriptor, Result,
};

/// Endpoint serving news articles.
pub const NEWS_PATH: &str = "/api/data/news";

/// Tickers the news backend serves.
pub const SUPPORTED_TICKERS: [&str; 5] = ["XMR-USD", "MDB", "GTLB", "CFLT", "GOOG"];

/// Ticker used when a general news request names none; the backend
/// requires one.
pub const DEFAULT_TICKER: &str = "GOOG";

const FALLBACK_PUBLISHERS: [&str; 7] = [
    "Barrons.com",
    "Bloomberg",
    "GuruFocus.com",
    "MT Newswires",
    "PR Newswire",
    "Reuters",
    "Yahoo Finance",
];

/// Optional filters for news queries. Empty values are not sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewsFilters {
    pub ticker: Option<String>,
    pub search: Option<String>,
    pub publisher: Option<String>,
    pub date: Option<String>,
}

impl NewsFilters {
    #[must_use]
    pub fn ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    #[must_use]
    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    fn into_params(self) -> QueryParams {
        let mut params = QueryParams::new();
        let fields = [
            ("ticker", self.ticker),
            ("search", self.search),
            ("publisher", self.publisher),
            ("date", self.date),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                params.insert(key, value);
            }
        }
        params
    }
}

/// News access on a dedicated [`FetchClient`].
#[derive(Debug)]
pub struct NewsApi {
    client: FetchClient,
    supported_tickers: Vec<String>,
}

impl Default for NewsApi {
    fn default() -> Self {
        Self::new(Self::default_options())
    }
}

impl NewsApi {
    pub fn new(options: ClientOptions) -> Self {
        Self::from_client(FetchClient::new(options))
    }

    pub fn from_client(client: FetchClient) -> Self {
        Self {
            client,
            supported_tickers: SUPPORTED_TICKERS.iter().map(|t| (*t).to_owned()).collect(),
        }
    }

    /// Client defaults with a fifteen minute cache.
    pub fn default_options() -> ClientOptions {
        ClientOptions {
            cache_ttl_ms: 15 * 60 * 1_000,
            ..ClientOptions::default()
        }
    }

    /// Replaces the set of tickers accepted by [`NewsApi::ticker_news`].
    #[must_use]
    pub fn with_supported_tickers<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_tickers = tickers.into_iter().map(Into::into).collect();
        self
    }

    /// Fetches general news. Without a ticker filter, [`DEFAULT_TICKER`] is used.
    pub async fn all_news(&self, mut filters: NewsFilters) -> Result<Vec<NewsArticle>> {
        let has_ticker = filters
            .ticker
            .as_deref()
            .is_some_and(|ticker| !ticker.trim().is_empty());
        if !has_ticker {
            filters.ticker = Some(DEFAULT_TICKER.to_owned());
        }
        self.fetch(filters).await
    }

    /// Fetches news for one supported ticker.
    pub async fn ticker_news(
        &self,
        ticker: &str,
        filters: NewsFilters,
    ) -> Result<Vec<NewsArticle>> {
        if !self.is_ticker_supported(ticker) {
            return Err(FetchError::InvalidRequest(format!(
                "unsupported ticker: {ticker}. Supported tickers: {}",
                self.supported_tickers.join(", ")
            )));
        }
        self.fetch(filters.ticker(ticker)).await
    }

    /// Sorted, de-duplicated publishers across all supported tickers.
    ///
    /// Articles without a publisher contribute "Unknown Publisher". Tickers
    /// are fetched one after another since calls on one client supersede
    /// each other. Individual failures are skipped; if every
    /// ticker fails a fixed list of well-known publishers is returned.
    pub async fn unique_publishers(&self) -> Vec<String> {
        let mut publishers = BTreeSet::new();
        let mut any_succeeded = false;

        for ticker in &self.supported_tickers {
            match self.ticker_news(ticker, NewsFilters::default()).await {
                Ok(articles) => {
                    any_succeeded = true;
                    publishers.extend(articles.into_iter().map(|article| article.publisher));
                }
                Err(_err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(ticker = %ticker, error = %_err, "publisher lookup failed");
                }
            }
        }

        if !any_succeeded {
            return FALLBACK_PUBLISHERS.iter().map(|p| (*p).to_owned()).collect();
        }
        publishers.into_iter().collect()
    }

    pub fn is_ticker_supported(&self, ticker: &str) -> bool {
        self.supported_tickers.iter().any(|t| t == ticker)
    }

    pub fn supported_tickers(&self) -> &[String] {
        &self.supported_tickers
    }

    pub fn client(&self) -> &FetchClient {
        &self.client
    }

    async fn fetch(&self, filters: NewsFilters) -> Result<Vec<NewsArticle>> {
        let request = RequestDescriptor::get(NEWS_PATH).params(filters.into_params());
        self.client.fetch_records(&request).await
    }
}
