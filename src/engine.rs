//! Engine: fans searches and counts out across the source catalog and folds
//! the per-source outcomes into one result.
//!
//! Source calls run on a bounded rayon pool. Workers only perform the call;
//! merging happens afterwards on the caller's thread in catalog order, so the
//! result does not depend on which source answered first. A failing source is
//! recorded and skipped, never propagated.
//!
//! Typical usage:
//!
//! ```no_run
//! use keyscore::client::{ClientConfig, HttpExecutor};
//! use keyscore::engine::{Engine, EngineConfig};
//! # fn main() -> anyhow::Result<()> {
//! let exec = HttpExecutor::new(&ClientConfig::new("api-key"))?;
//! let engine = Engine::new(Box::new(exec), Default::default(), EngineConfig::default());
//! let results = engine.search_email_all_sources("a@b.com");
//! println!("{}", keyscore::report::render_results(&results));
//! # Ok(())
//! # }
//! ```
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::aggregate::AggregateResult;
use crate::catalog::{SourceCatalog, SourceId};
use crate::client::QueryExecutor;
use crate::count::CountResult;
use crate::error::QueryError;
use crate::query::SearchQuery;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum source calls in flight. `1` queries sources one after another.
    pub concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

pub struct Engine {
    executor: Box<dyn QueryExecutor>,
    catalog: SourceCatalog,
    pool: Option<rayon::ThreadPool>,
}

impl Engine {
    pub fn new(
        executor: Box<dyn QueryExecutor>,
        catalog: SourceCatalog,
        config: EngineConfig,
    ) -> Self {
        let pool = if config.concurrency > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(config.concurrency)
                .thread_name(|i| format!("keyscore-source-{i}"))
                .build()
            {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("could not start worker pool ({e}); querying sources sequentially");
                    None
                }
            }
        } else {
            None
        };
        Self {
            executor,
            catalog,
            pool,
        }
    }

    pub fn catalog(&self) -> &SourceCatalog {
        &self.catalog
    }

    /// Single-source calls may name any source; only warn about strays.
    fn note_unknown(&self, source: &str) {
        if !self.catalog.contains(source) {
            warn!("{} is not in the source catalog; sending anyway", source);
        }
    }

    fn fan_out<T, F>(&self, call: F) -> Vec<(SourceId, Result<T, QueryError>)>
    where
        T: Send,
        F: Fn(&str) -> Result<T, QueryError> + Sync,
    {
        let sources = self.catalog.sources();
        match &self.pool {
            Some(pool) => pool.install(|| {
                sources
                    .par_iter()
                    .map(|s| (s.clone(), call(s)))
                    .collect()
            }),
            None => sources.iter().map(|s| (s.clone(), call(s))).collect(),
        }
    }

    /// Search every source in the catalog and merge what they return.
    ///
    /// Only terms and types are forwarded; wildcard, regex, date range and
    /// paging stay at their defaults in this mode. Use [`Engine::search`] for
    /// the full parameter set against one source.
    pub fn run_across_sources(&self, query: &SearchQuery) -> AggregateResult {
        let forwarded = query.terms_and_types_only();
        let total = self.catalog.len();
        info!("searching {} sources", total);
        let outcomes = self.fan_out(|source| self.executor.perform_search(&forwarded, source));

        let mut agg = AggregateResult::new();
        for (i, (source, outcome)) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(result) => {
                    if result.size != result.record_count() as u64 {
                        debug!(
                            "{}: reported size {} but sent {} records",
                            source,
                            result.size,
                            result.record_count()
                        );
                    }
                    let merged = agg.merge(&source, result, query);
                    if merged > 0 {
                        info!("[{}/{}] {}: {} results", i + 1, total, source, merged);
                    } else {
                        info!("[{}/{}] {}: no results", i + 1, total, source);
                    }
                }
                Err(e) => {
                    warn!("[{}/{}] {}: {}", i + 1, total, source, e);
                    agg.record_failure(&source, e);
                }
            }
        }
        info!(
            "search completed: data in {}/{} sources, {} records",
            agg.successful_sources,
            total,
            agg.size()
        );
        agg
    }

    pub fn search_email_all_sources(&self, email: &str) -> AggregateResult {
        self.run_across_sources(&SearchQuery::single(email, "email"))
    }

    pub fn search_domain_all_sources(&self, domain: &str) -> AggregateResult {
        self.run_across_sources(&SearchQuery::single(domain, "url"))
    }

    pub fn search_username_all_sources(&self, username: &str) -> AggregateResult {
        self.run_across_sources(&SearchQuery::single(username, "username"))
    }

    /// Search one source with every query parameter forwarded. Records are
    /// returned exactly as the source sent them.
    pub fn search(&self, query: &SearchQuery, source: &str) -> Result<AggregateResult, QueryError> {
        self.note_unknown(source);
        let result = self.executor.perform_search(query, source)?;
        Ok(AggregateResult::from_single(source, result))
    }

    /// Count matches in every source. A failing source counts as zero.
    pub fn count_across_sources(&self, query: &SearchQuery) -> CountResult {
        let outcomes = self.fan_out(|source| self.executor.perform_count(query, source));
        let mut counts = CountResult::new();
        for (source, outcome) in outcomes {
            match outcome {
                Ok(resp) => {
                    let n = resp.total();
                    info!("{}: {} results", source, n);
                    counts.add(&source, n);
                }
                Err(e) => {
                    warn!("counting {} failed: {}", source, e);
                    counts.add(&source, 0);
                }
            }
        }
        counts
    }

    /// Count matches in one source, keeping any breakdown the service returns.
    pub fn count(&self, query: &SearchQuery, source: &str) -> Result<CountResult, QueryError> {
        self.note_unknown(source);
        let resp = self.executor.perform_count(query, source)?;
        Ok(CountResult::from_response(source, resp))
    }
}
