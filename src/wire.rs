use serde::Deserialize;
use serde_json::Value;

/// One market-overview item as the backend emits it.
///
/// Every field stays untyped so one badly typed optional field cannot
/// reject the whole record. Prices arrive as numbers or as formatted
/// strings (`"$211.34"`).
#[derive(Debug, Deserialize)]
pub(crate) struct StockItem {
    #[serde(default)]
    pub(crate) symbol: Option<Value>,
    #[serde(default)]
    pub(crate) name: Option<Value>,
    #[serde(default)]
    pub(crate) short: Option<Value>,
    #[serde(default)]
    pub(crate) sector: Option<Value>,
    #[serde(default)]
    pub(crate) current_price: Option<Value>,
    #[serde(default)]
    pub(crate) change: Option<Value>,
    #[serde(default)]
    pub(crate) high: Option<Value>,
    #[serde(default)]
    pub(crate) low: Option<Value>,
    #[serde(default)]
    pub(crate) volume: Option<Value>,
    #[serde(default)]
    pub(crate) news_article: Option<Value>,
}

/// One news item as the backend emits it.
#[derive(Debug, Deserialize)]
pub(crate) struct NewsItem {
    /// String or numeric identifier.
    #[serde(default)]
    pub(crate) id: Option<Value>,
    #[serde(default)]
    pub(crate) title: Option<Value>,
    #[serde(default)]
    pub(crate) publisher: Option<Value>,
    #[serde(default)]
    pub(crate) source: Option<Value>,
    /// Unix seconds as a digit string, a number, or a date string.
    #[serde(default)]
    pub(crate) date: Option<Value>,
}
