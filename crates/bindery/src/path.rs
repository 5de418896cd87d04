//! Router-resolved path variables.
//!
//! The router matches a route pattern such as `/users/{user}/posts/{post}`
//! and hands the engine the resulting name/value pairs. Most routes carry only
//! a handful of variables, so they are stored inline without a heap
//! allocation for the common case.

use smallvec::SmallVec;

/// Maximum number of variables stored inline (stack allocated).
const INLINE_VARS: usize = 4;

/// Path variables resolved by the router for the current request.
///
/// Behaves like a map: inserting a name that is already present replaces its
/// value, and lookups are exact (path variable names are case-sensitive).
///
/// # Example
///
/// ```rust
/// use bindery::PathVars;
///
/// let mut vars = PathVars::new();
/// vars.insert("user", "adam");
/// vars.insert("post", "42");
///
/// assert_eq!(vars.get("user"), Some("adam"));
/// assert_eq!(vars.get("post"), Some("42"));
/// assert_eq!(vars.get("User"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathVars {
    inner: SmallVec<[(String, String); INLINE_VARS]>,
}

impl PathVars {
    /// Creates an empty set of path variables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a variable, replacing any previous value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.inner.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.inner.push((name, value)),
        }
    }

    /// Returns the value for a variable by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if the router resolved a variable with this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns true if there are no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over the variables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for PathVars
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Self::new();
        for (name, value) in iter {
            vars.insert(name, value);
        }
        vars
    }
}
