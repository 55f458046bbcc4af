use std::collections::BTreeMap;

/// Query parameter container.
///
/// Keys are kept sorted so that two maps with the same contents encode to
/// the same string regardless of insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds parameters from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Sets a parameter, replacing any previous value under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parameters whose value is non-empty after trimming, trimmed.
    pub fn effective(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().filter_map(|(key, value)| {
            let value = value.trim();
            (!value.is_empty()).then_some((key.as_str(), value))
        })
    }

    /// URL-encoded query string without the leading `?`.
    ///
    /// Empty or whitespace-only values are omitted entirely.
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.effective() {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}

impl From<()> for QueryParams {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for QueryParams {
    fn from(pairs: [(K, V); N]) -> Self {
        Self::from_pairs(pairs)
    }
}

impl From<Vec<(String, String)>> for QueryParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::from_pairs(pairs)
    }
}

impl From<BTreeMap<String, String>> for QueryParams {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}
