//! Folding per-source results into one [`AggregateResult`].
//!
//! Buckets are keyed by `(source, database)`, so two sources exposing a
//! database with the same name never collide. `size` is maintained as the sum
//! of bucket lengths on every merge.
use crate::catalog::SourceId;
use crate::error::QueryError;
use crate::query::SearchQuery;
use crate::record::{Record, SearchResult, is_blank};

/// Query types whose identity field is repaired from the search term.
pub const NORMALIZED_TYPES: [&str; 3] = ["email", "url", "username"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub source: SourceId,
    pub database: String,
}

impl std::fmt::Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} > {}", self.source, self.database)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub key: BucketKey,
    pub records: Vec<Record>,
}

/// What happened to one source during a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Found(usize),
    Empty,
    Failed(QueryError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateResult {
    buckets: Vec<Bucket>,
    size: usize,
    /// Sum of server-reported processing time across successful sources.
    pub elapsed_ms: u64,
    pub successful_sources: usize,
    /// One entry per queried source, in catalog order.
    pub outcomes: Vec<(SourceId, SourceOutcome)>,
}

impl AggregateResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a single source's answer without normalization, as returned by a
    /// single-source search.
    pub fn from_single(source: &str, result: SearchResult) -> Self {
        let mut agg = Self::new();
        agg.elapsed_ms = result.took;
        let found = agg.absorb(source, result, None);
        agg.record_found(source, found);
        agg
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, source: &str, database: &str) -> Option<&[Record]> {
        self.buckets
            .iter()
            .find(|b| b.key.source == source && b.key.database == database)
            .map(|b| b.records.as_slice())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &QueryError)> {
        self.outcomes.iter().filter_map(|(s, o)| match o {
            SourceOutcome::Failed(e) => Some((s.as_str(), e)),
            _ => None,
        })
    }

    /// Merge one source's successful answer, repairing identity fields from
    /// `query`. Returns the number of records merged.
    pub fn merge(&mut self, source: &str, result: SearchResult, query: &SearchQuery) -> usize {
        self.elapsed_ms += result.took;
        let merged = self.absorb(source, result, Some(query));
        self.record_found(source, merged);
        merged
    }

    pub fn record_failure(&mut self, source: &str, error: QueryError) {
        self.outcomes
            .push((source.to_string(), SourceOutcome::Failed(error)));
    }

    fn record_found(&mut self, source: &str, merged: usize) {
        let outcome = if merged > 0 {
            self.successful_sources += 1;
            SourceOutcome::Found(merged)
        } else {
            SourceOutcome::Empty
        };
        self.outcomes.push((source.to_string(), outcome));
    }

    fn absorb(&mut self, source: &str, result: SearchResult, query: Option<&SearchQuery>) -> usize {
        let mut merged = 0;
        for bucket in result.buckets {
            if bucket.records.is_empty() {
                continue;
            }
            let mut records = bucket.records;
            if let Some(q) = query {
                for r in &mut records {
                    normalize_record(r, q);
                }
            }
            merged += records.len();
            self.size += records.len();
            match self
                .buckets
                .iter_mut()
                .find(|b| b.key.source == source && b.key.database == bucket.database)
            {
                Some(existing) => existing.records.extend(records),
                None => self.buckets.push(Bucket {
                    key: BucketKey {
                        source: source.to_string(),
                        database: bucket.database,
                    },
                    records,
                }),
            }
        }
        merged
    }
}

/// Fill the identity field matching the query's primary type with the search
/// term when the source left it absent, empty, or `N/A`.
pub fn normalize_record(record: &mut Record, query: &SearchQuery) {
    let (Some(kind), Some(term)) = (query.primary_type(), query.primary_term()) else {
        return;
    };
    if !NORMALIZED_TYPES.contains(&kind) {
        return;
    }
    if record.get(kind).is_none_or(is_blank) {
        record.set(kind, term);
    }
}
