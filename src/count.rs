//! Count-only results and the credit estimate derived from them.
use crate::catalog::SourceId;
use crate::client::CountResponse;

/// Records delivered per page, and therefore per credit.
pub const RECORDS_PER_CREDIT: u64 = 10_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountResult {
    per_source: Vec<(SourceId, u64)>,
    total: u64,
    pub took: u64,
}

impl CountResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize either `/count` shape. A bare count is attributed to `source`.
    pub fn from_response(source: &str, response: CountResponse) -> Self {
        let mut out = Self::new();
        match response {
            CountResponse::Single { count } => out.add(source, count),
            CountResponse::Breakdown { took, counts, .. } => {
                out.took = took;
                for (s, c) in counts {
                    out.add(&s, c);
                }
            }
        }
        out
    }

    /// Record a source's count, adding to it if the source is already present.
    pub fn add(&mut self, source: &str, count: u64) {
        match self.per_source.iter_mut().find(|(s, _)| s == source) {
            Some((_, c)) => *c += count,
            None => self.per_source.push((source.to_string(), count)),
        }
        self.total += count;
    }

    pub fn per_source(&self) -> &[(SourceId, u64)] {
        &self.per_source
    }

    pub fn get(&self, source: &str) -> Option<u64> {
        self.per_source
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, c)| *c)
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Pages (credits) needed to pull `count` records from one source.
/// Zero records need no credit.
pub fn pages_for(count: u64) -> u64 {
    count.div_ceil(RECORDS_PER_CREDIT)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditEstimate {
    /// Sources with data and what a full pull from each costs.
    pub per_source: Vec<(SourceId, u64)>,
    /// Cost of fetching a single page from every source with data.
    pub first_page: u64,
    pub all_pages: u64,
}

/// Estimate what a full search would cost. `None` when nothing was found.
pub fn estimate_credits(counts: &CountResult) -> Option<CreditEstimate> {
    let per_source: Vec<(SourceId, u64)> = counts
        .per_source()
        .iter()
        .filter(|(_, c)| *c > 0)
        .map(|(s, c)| (s.clone(), pages_for(*c)))
        .collect();
    if per_source.is_empty() {
        return None;
    }
    Some(CreditEstimate {
        first_page: per_source.len() as u64,
        all_pages: per_source.iter().map(|(_, p)| p).sum(),
        per_source,
    })
}
