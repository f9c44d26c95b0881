use crate::types::{AggregatorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::form_urlencoded;

/// Every filter a collection view may declare. Declaration order is the
/// canonical order used when deriving keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterName {
    Issuer,
    Query,
    Category,
    WorkMode,
    Status,
    Ordering,
}

impl FilterName {
    pub const ALL: [FilterName; 6] = [
        FilterName::Issuer,
        FilterName::Query,
        FilterName::Category,
        FilterName::WorkMode,
        FilterName::Status,
        FilterName::Ordering,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterName::Issuer => "issuer",
            FilterName::Query => "query",
            FilterName::Category => "category",
            FilterName::WorkMode => "work_mode",
            FilterName::Status => "status",
            FilterName::Ordering => "ordering",
        }
    }
}

impl fmt::Display for FilterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterName {
    type Err = AggregatorError;

    fn from_str(s: &str) -> Result<Self> {
        FilterName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| AggregatorError::UnknownFilter { name: s.to_string() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkMode {
    Remote,
    Onsite,
    Hybrid,
}

impl WorkMode {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkMode::Remote => "remote",
            WorkMode::Onsite => "onsite",
            WorkMode::Hybrid => "hybrid",
        }
    }
}

impl FromStr for WorkMode {
    type Err = AggregatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(WorkMode::Remote),
            "onsite" => Ok(WorkMode::Onsite),
            "hybrid" => Ok(WorkMode::Hybrid),
            _ => Err(AggregatorError::InvalidFilterValue {
                name: FilterName::WorkMode.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// The current value of each recognised filter. Empty values are never
/// stored, so "set to empty" and "unset" are the same state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    values: BTreeMap<FilterName, String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a state from untyped `(name, value)` pairs, rejecting names
    /// that are not recognised.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut state = Self::new();
        for (name, value) in pairs {
            let name: FilterName = name.as_ref().parse()?;
            state.set(name, value)?;
        }
        Ok(state)
    }

    pub fn with(mut self, name: FilterName, value: impl Into<String>) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn set(&mut self, name: FilterName, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        if value.trim().is_empty() {
            self.values.remove(&name);
            return Ok(());
        }

        let value = match name {
            FilterName::WorkMode => value.parse::<WorkMode>()?.as_str().to_string(),
            _ => value,
        };
        self.values.insert(name, value);
        Ok(())
    }

    pub fn clear(&mut self, name: FilterName) {
        self.values.remove(&name);
    }

    pub fn get(&self, name: FilterName) -> Option<&str> {
        self.values.get(&name).map(String::as_str)
    }

    pub fn work_mode(&self) -> Option<WorkMode> {
        self.get(FilterName::WorkMode).and_then(|value| value.parse().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Set filters in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (FilterName, &str)> {
        self.values.iter().map(|(name, value)| (*name, value.as_str()))
    }

    /// Cache/partition key for this filter set: `name=value` pairs in
    /// canonical order, values form-encoded, joined by `&`. Encoding keeps
    /// the key injective when values contain `&` or `=`.
    pub fn derive_key(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in self.iter() {
            serializer.append_pair(name.as_str(), value);
        }
        serializer.finish()
    }
}

pub fn derive_key(filters: &FilterState) -> String {
    filters.derive_key()
}
