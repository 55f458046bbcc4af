use chrono::{DateTime, Utc};
use serde::Serialize;

/// A validated news article.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    /// "Unknown Publisher" when the backend omits it.
    pub publisher: String,
    /// Link to the article, "#" when absent.
    pub source: String,
    /// Publication time; the decode time when the backend value is unusable.
    pub date: DateTime<Utc>,
    /// Short blurb chosen deterministically from the title.
    pub summary: String,
}

/// A validated market-overview entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StockQuote {
    pub symbol: String,
    pub name: String,
    /// Display ticker, defaults to `symbol`.
    pub short: String,
    /// "UNKNOWN" when the backend omits it.
    pub sector: String,
    pub current_price: f64,
    /// Percentage change.
    pub change: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
    pub news_article: Option<NewsArticle>,
}

impl StockQuote {
    /// Price rendered with a dollar sign and exactly two decimals.
    pub fn formatted_price(&self) -> String {
        format_price(self.current_price)
    }
}

pub(crate) fn format_price(price: f64) -> String {
    let price = if price.is_finite() { price } else { 0.0 };
    format!("${price:.2}")
}
