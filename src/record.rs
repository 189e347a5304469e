//! Leak records and per-source result shapes.
//!
//! Every source defines its own record schema, so a [`Record`] is an ordered
//! list of `field -> value` pairs looked up by name. Field order is whatever the
//! service sent and is preserved for display.
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Placeholder some sources emit instead of leaving a field out.
pub const NOT_AVAILABLE: &str = "N/A";

/// True when a value carries no information: empty or the `N/A` placeholder.
pub fn is_blank(value: &str) -> bool {
    value.is_empty() || value == NOT_AVAILABLE
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    /// First non-blank value whose name matches `field`, ignoring ASCII case.
    pub fn get_meaningful(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, v)| k.eq_ignore_ascii_case(field) && !is_blank(v))
            .map(|(_, v)| v.as_str())
    }

    /// Overwrite an existing field in place, or append it.
    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| k == field) {
            Some((_, v)) => *v = value,
            None => self.fields.push((field.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut r = Record::new();
        for (k, v) in iter {
            let k: String = k.into();
            r.set(&k, v);
        }
        r
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(map
            .into_iter()
            .map(|(k, v)| (k, value_to_text(v)))
            .collect())
    }
}

/// Records from one database inside a source returned for a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResultBucket {
    pub database: String,
    pub records: Vec<Record>,
}

/// One source's answer to a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    pub buckets: Vec<SearchResultBucket>,
    /// Result count as reported by the service.
    pub size: u64,
    /// Server-side processing time in milliseconds.
    pub took: u64,
}

impl SearchResult {
    /// Records actually present across all buckets.
    pub fn record_count(&self) -> usize {
        self.buckets.iter().map(|b| b.records.len()).sum()
    }
}

#[derive(Deserialize)]
struct SearchResultWire {
    #[serde(default)]
    results: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "lenient_u64")]
    size: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    took: u64,
}

/// Counters occasionally arrive as floats or null; anything else reads as 0.
fn counter_value(value: Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        _ => 0,
    }
}

pub(crate) fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Value::deserialize(deserializer).map(counter_value)
}

/// A `{name: counter}` object, in the order the service sent it.
pub(crate) fn lenient_counts<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<(String, u64)>, D::Error> {
    Ok(Map::<String, Value>::deserialize(deserializer)?
        .into_iter()
        .map(|(k, v)| (k, counter_value(v)))
        .collect())
}

impl<'de> Deserialize<'de> for SearchResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = SearchResultWire::deserialize(deserializer)?;
        let mut buckets = Vec::new();
        for (database, records) in wire.results.unwrap_or_default() {
            let records: Vec<Record> = match records {
                Value::Null => Vec::new(),
                v => serde_json::from_value(v).map_err(serde::de::Error::custom)?,
            };
            buckets.push(SearchResultBucket { database, records });
        }
        Ok(SearchResult {
            buckets,
            size: wire.size,
            took: wire.took,
        })
    }
}
