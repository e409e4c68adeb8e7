//! # incimap-engine
//!
//! Filtering and aggregation engine for incident record datasets.
//!
//! This crate is the computational core behind the incident map: it takes a
//! raw dataset of incident records plus user-selected filter criteria and
//! produces the filtered record set, per-criterion aggregate counts for
//! summaries and charts, and search suggestions. It is synchronous,
//! side-effect-free and performs no I/O, so downstream consumers (map layer,
//! charts, CSV export) only ever read its outputs.
//!
//! ## Architecture
//!
//! - **Filtering** ([`FilterEngine`]): conjunctive multi-field filtering with
//!   free-text search, `!` negation, peer-record rescue rules and an optional
//!   `expr:(...)` expression path ([`incimap_expr`]). Each pass compiles the
//!   active filters once, then evaluates every record against the compiled
//!   plans — the input is never mutated.
//! - **Aggregation** ([`aggregate`]): configuration-driven bucket counting
//!   with distinct or single-bucket strategies and peer count propagation.
//! - **Suggestions** ([`SuggestionCollector`]): searchable strings gathered
//!   from records touched during filtering, for autocomplete.
//!
//! ## Quick Start
//!
//! ```rust
//! use incimap_engine::{Dataset, FilterConfig, FilterEngine, FilterSet};
//!
//! let payload = r#"{
//!     "settings": {"up_to_date": false},
//!     "deaths": [
//!         {"house": "pn", "year": "2023", "published": true},
//!         {"house": "gn", "year": "2023", "published": true}
//!     ]
//! }"#;
//! let dataset = Dataset::from_json(payload).unwrap();
//!
//! let mut filters = FilterSet::new();
//! filters.set("house", "pn");
//!
//! let mut engine = FilterEngine::new(FilterConfig::default());
//! let result = engine.filter(&dataset.deaths, &filters);
//! assert!(!result.errored);
//! assert_eq!(result.records.len(), 1);
//! ```

pub mod aggregate;
pub mod filter;
pub mod normalize;
pub mod record;
pub mod result;
pub mod suggest;

// Re-export the most commonly used types and functions at crate root
pub use aggregate::{
    CountedProperty, CountingStrategy, Definition, Definitions, DefinitionsCount,
    SINGLE_BUCKET_KEY, aggregate, definitions_from_json,
};
pub use filter::{FilterConfig, FilterEngine, FilterSet, SEARCH_FIELD};
pub use normalize::{MatchMode, array_contains, contains, normalize};
pub use record::{Dataset, Gps, Origin, PeerRecord, Record, Settings};
pub use result::FilterResult;
pub use suggest::SuggestionCollector;
