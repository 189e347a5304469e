//! Source catalog: the ordered list of backend databases reachable through the
//! search service.
//!
//! The catalog order is significant: the dispatcher queries sources and adds
//! their buckets in this order, so it also drives report layout.

/// Identifier of one queryable source, e.g. `snusbase` or `ghosint.seon`.
pub type SourceId = String;

/// Sources known to the service at the time of writing.
pub const DEFAULT_SOURCES: [&str; 11] = [
    "xkeyscore",
    "snusbase",
    "leakcheck",
    "hackcheck",
    "oathnet",
    "ghosint.leakosint",
    "ghosint.seon",
    "ghosint.breachvip",
    "osintdog.intelvault",
    "osintdog.breachbase",
    "osintdog.akula",
];

/// Source used when a single-source command does not name one.
pub const DEFAULT_SOURCE: &str = "xkeyscore";

/// Immutable, ordered set of source identifiers handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCatalog {
    sources: Vec<SourceId>,
}

impl Default for SourceCatalog {
    fn default() -> Self {
        Self::from_sources(DEFAULT_SOURCES)
    }
}

impl SourceCatalog {
    /// Build a catalog from any ordered list. Blank entries and repeats are
    /// dropped so every source is queried at most once.
    pub fn from_sources<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<SourceId> = Vec::new();
        for s in sources {
            let s = s.as_ref().trim();
            if s.is_empty() || out.iter().any(|o| o == s) {
                continue;
            }
            out.push(s.to_string());
        }
        Self { sources: out }
    }

    pub fn sources(&self) -> &[SourceId] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn contains(&self, source: &str) -> bool {
        self.sources.iter().any(|s| s == source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_eleven_sources_in_order() {
        let c = SourceCatalog::default();
        assert_eq!(c.len(), 11);
        assert_eq!(c.sources()[0], "xkeyscore");
        assert_eq!(c.sources()[10], "osintdog.akula");
        assert!(c.contains("ghosint.seon"));
    }

    #[test]
    fn custom_catalog_trims_and_dedups() {
        let c = SourceCatalog::from_sources([" snusbase ", "", "leakcheck", "snusbase"]);
        assert_eq!(c.sources(), &["snusbase".to_string(), "leakcheck".to_string()]);
    }
}
