use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::{
    wire::{NewsItem, StockItem},
    NewsArticle, StockQuote,
};

const UNKNOWN_PUBLISHER: &str = "Unknown Publisher";
const UNKNOWN_SECTOR: &str = "UNKNOWN";
const MISSING_SOURCE: &str = "#";

/// A domain record that can be validated out of one raw JSON item.
pub trait Record: Sized {
    /// Returns `None` when `raw` lacks a required field.
    fn from_record(raw: &Value) -> Option<Self>;
}

/// Applies `parse` to every item of an array payload, keeping the valid ones.
///
/// A payload that is not an array yields an empty list.
pub fn normalize_records<T, F>(payload: &Value, mut parse: F) -> Vec<T>
where
    F: FnMut(&Value) -> Option<T>,
{
    let Some(items) = payload.as_array() else {
        #[cfg(feature = "tracing")]
        tracing::debug!("non-array payload normalized to an empty list");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let parsed = parse(item);
            #[cfg(feature = "tracing")]
            if parsed.is_none() {
                tracing::warn!(record = %item, "dropping invalid record");
            }
            parsed
        })
        .collect()
}

/// Parses a number or numeric-looking string, falling back to `0.0`.
///
/// Currency symbols, thousands separators and surrounding whitespace are
/// ignored; NaN and infinities also fall back.
pub fn lenient_f64(raw: Option<&Value>) -> f64 {
    let parsed = match raw {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => {
            let cleaned: String = text
                .chars()
                .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|value| value.is_finite()).unwrap_or(0.0)
}

/// Parses a non-negative count, falling back to `0`.
pub fn lenient_u64(raw: Option<&Value>) -> u64 {
    if let Some(Value::Number(number)) = raw {
        if let Some(value) = number.as_u64() {
            return value;
        }
    }
    let value = lenient_f64(raw);
    if value >= 0.0 && value <= u64::MAX as f64 {
        value.trunc() as u64
    } else {
        0
    }
}

/// Parses a publication timestamp, falling back to the current time.
///
/// Accepted forms: all-digit strings (Unix seconds), non-zero numbers
/// (seconds below 1e12, milliseconds otherwise), RFC 3339, RFC 2822 and
/// `YYYY-MM-DD`.
pub fn parse_timestamp(raw: Option<&Value>) -> DateTime<Utc> {
    parse_timestamp_opt(raw).unwrap_or_else(Utc::now)
}

fn parse_timestamp_opt(raw: Option<&Value>) -> Option<DateTime<Utc>> {
    match raw? {
        Value::Number(number) => {
            let value = number.as_f64().filter(|v| v.is_finite() && *v != 0.0)?;
            if value.abs() < 1e12 {
                DateTime::from_timestamp(value.trunc() as i64, 0)
            } else {
                DateTime::from_timestamp_millis(value.trunc() as i64)
            }
        }
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            if text.bytes().all(|b| b.is_ascii_digit()) {
                return DateTime::from_timestamp(text.parse().ok()?, 0);
            }
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                return Some(parsed.with_timezone(&Utc));
            }
            if let Ok(parsed) = DateTime::parse_from_rfc2822(text) {
                return Some(parsed.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()?
                .and_hms_opt(0, 0, 0)
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}

const SUMMARY_TEMPLATES: [&str; 5] = [
    "Latest developments and market insights related to this financial news story.",
    "Breaking news update with potential implications for market participants and investors.",
    "Important announcement affecting industry trends and market dynamics.",
    "Strategic business development with focus on market positioning and growth.",
    "Financial sector update with implications for stakeholders and market observers.",
];

/// Picks a canned summary for `title`. The same title always gets the same
/// summary.
fn summarize(title: &str) -> &'static str {
    let hash = title
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)));
    SUMMARY_TEMPLATES[hash.unsigned_abs() as usize % SUMMARY_TEMPLATES.len()]
}

/// Non-blank string content; other JSON types count as absent.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        _ => None,
    }
}

fn identifier(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

impl Record for NewsArticle {
    fn from_record(raw: &Value) -> Option<Self> {
        let item: NewsItem = serde_json::from_value(raw.clone()).ok()?;
        let id = identifier(item.id.as_ref())?;
        let title = text(item.title.as_ref())?;

        Some(Self {
            id,
            summary: summarize(&title).to_owned(),
            title,
            publisher: text(item.publisher.as_ref())
                .unwrap_or_else(|| UNKNOWN_PUBLISHER.to_owned()),
            source: text(item.source.as_ref()).unwrap_or_else(|| MISSING_SOURCE.to_owned()),
            date: parse_timestamp(item.date.as_ref()),
        })
    }
}

impl Record for StockQuote {
    fn from_record(raw: &Value) -> Option<Self> {
        let item: StockItem = serde_json::from_value(raw.clone()).ok()?;
        let symbol = text(item.symbol.as_ref())?;
        let name = text(item.name.as_ref())?;

        Some(Self {
            short: text(item.short.as_ref()).unwrap_or_else(|| symbol.clone()),
            sector: text(item.sector.as_ref()).unwrap_or_else(|| UNKNOWN_SECTOR.to_owned()),
            current_price: lenient_f64(item.current_price.as_ref()),
            change: lenient_f64(item.change.as_ref()),
            high: lenient_f64(item.high.as_ref()),
            low: lenient_f64(item.low.as_ref()),
            volume: lenient_u64(item.volume.as_ref()),
            news_article: item.news_article.as_ref().and_then(NewsArticle::from_record),
            symbol,
            name,
        })
    }
}
