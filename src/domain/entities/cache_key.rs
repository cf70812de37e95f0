//! Memory cache identity and the request parameter bag.

use std::collections::BTreeMap;

use super::Size;

/// Deterministic identity of a cached image.
///
/// Transformation keys and the resolved size are part of the identity only
/// when the request had transformations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    base: String,
    transformations: Vec<String>,
    size: Option<Size>,
    parameters: BTreeMap<String, String>,
}

impl CacheKey {
    /// Creates a key from a base identity alone.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            transformations: Vec::new(),
            size: None,
            parameters: BTreeMap::new(),
        }
    }

    /// Creates a key from all of its components.
    #[must_use]
    pub fn with_components(
        base: impl Into<String>,
        transformations: Vec<String>,
        size: Option<Size>,
        parameters: BTreeMap<String, String>,
    ) -> Self {
        Self {
            base: base.into(),
            transformations,
            size,
            parameters,
        }
    }

    /// Returns the base identity.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns the ordered transformation keys.
    #[must_use]
    pub fn transformations(&self) -> &[String] {
        &self.transformations
    }

    /// Returns the resolved size, if it is part of the identity.
    #[must_use]
    pub const fn size(&self) -> Option<Size> {
        self.size
    }

    /// Returns the cache-relevant parameters.
    #[must_use]
    pub const fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base)?;
        if !self.transformations.is_empty() {
            write!(f, "|t={}", self.transformations.join(","))?;
        }
        if let Some(size) = self.size {
            write!(f, "|s={size}")?;
        }
        for (key, value) in &self.parameters {
            write!(f, "|{key}={value}")?;
        }
        Ok(())
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterEntry {
    /// The value handed to fetchers and decoders.
    pub value: String,
    /// The string contributed to the cache key, if any.
    pub cache_key: Option<String>,
}

/// Extra values passed through to fetchers and decoders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: BTreeMap<String, ParameterEntry>,
}

impl Parameters {
    /// Creates an empty parameter bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a parameter.
    #[must_use]
    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        cache_key: Option<String>,
    ) -> Self {
        self.entries.insert(
            key.into(),
            ParameterEntry {
                value: value.into(),
                cache_key,
            },
        );
        self
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.value.as_str())
    }

    /// Returns the entries that contribute to the memory cache key.
    #[must_use]
    pub fn cache_keys(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter_map(|(k, e)| e.cache_key.clone().map(|c| (k.clone(), c)))
            .collect()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
