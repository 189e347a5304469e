pub mod aggregate;
pub mod catalog;
pub mod client;
pub mod count;
pub mod engine;
pub mod error;
pub mod export;
pub mod query;
pub mod record;
pub mod report;

pub mod prelude {
    pub use crate::aggregate::AggregateResult;
    pub use crate::catalog::SourceCatalog;
    pub use crate::count::CountResult;
    pub use crate::engine::{Engine, EngineConfig};
    pub use crate::query::SearchQuery;
    pub use crate::record::Record;
}
