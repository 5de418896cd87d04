//! Query string multimap.
//!
//! [`QueryValues`] keeps every occurrence of every key in the order it
//! appeared in the URL, which is what the exploded list encoding relies on.

use indexmap::IndexMap;

/// Decoded query parameters, keyed by name with all occurrences kept in order.
///
/// # Example
///
/// ```rust
/// use bindery::QueryValues;
///
/// let query = QueryValues::parse("id=adam&id=eve&active=true");
///
/// assert_eq!(query.get("active"), Some("true"));
/// assert_eq!(query.get_all("id"), Some(&["adam".to_string(), "eve".to_string()][..]));
/// assert!(query.get_all("missing").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues {
    inner: IndexMap<String, Vec<String>>,
}

impl QueryValues {
    /// Creates an empty multimap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` query string.
    ///
    /// Percent-escapes and `+` are decoded. A key without `=` is present with
    /// an empty value.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
        pairs.into_iter().collect()
    }

    /// Appends one occurrence of `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.entry(key.into()).or_default().push(value.into());
    }

    /// Returns the first occurrence of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns every occurrence of `key` in URL order, or `None` if the key
    /// never appeared.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        self.inner.get(key).map(Vec::as_slice)
    }

    /// Returns true if the key appeared at least once, even with an empty value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Self::new();
        for (key, value) in iter {
            query.append(key, value);
        }
        query
    }
}
