//! Per-criterion aggregate counting.
//!
//! For each exposed definition field, records pool into value buckets used
//! by summary text and charts. Counting is configuration-driven: each
//! definition names a counting strategy and a counted property.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// How a field's values bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CountingStrategy {
    /// Bucket by the field's own value.
    Distinct,
    /// Pool every record into one synthetic bucket.
    SingleBucket,
}

/// What each record contributes to its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CountedProperty {
    /// Record presence: one unit per record.
    Deaths,
    /// The record's `count` field, with peer counts walked in.
    Count,
}

/// Key of the synthetic bucket used by [`CountingStrategy::SingleBucket`].
pub const SINGLE_BUCKET_KEY: &str = "0";

/// Aggregation configuration for one criterion field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    /// Human-readable label for summaries and charts.
    #[serde(default)]
    pub label: Option<String>,
    /// Whether the field appears in summary output at all.
    #[serde(default)]
    pub exposed: bool,
    #[serde(default = "default_counted")]
    pub counted: CountedProperty,
    #[serde(default = "default_strategy")]
    pub strategy: CountingStrategy,
}

fn default_counted() -> CountedProperty {
    CountedProperty::Deaths
}

fn default_strategy() -> CountingStrategy {
    CountingStrategy::Distinct
}

/// Per-field definitions, loaded once at startup from JSON.
pub type Definitions = BTreeMap<String, Definition>;

/// field name → bucket key → accumulated count.
pub type DefinitionsCount = BTreeMap<String, BTreeMap<String, u64>>;

/// Parse a definitions config from JSON text.
pub fn definitions_from_json(json: &str) -> serde_json::Result<Definitions> {
    serde_json::from_str(json)
}

/// Compute per-criterion counts over a (filtered or unfiltered) collection.
///
/// Fields absent from every record produce an empty bucket map; malformed or
/// missing values contribute nothing. There is no error path.
///
/// When the counted property is [`CountedProperty::Count`], each peer's
/// `count` is walked in as well. A peer's contribution lands in the peer's
/// own bucket for the `house` field (peers can belong to a different
/// organization than their parent) and in the parent's bucket for every
/// other field.
pub fn aggregate(records: &[Record], definitions: &Definitions) -> DefinitionsCount {
    let mut counts = DefinitionsCount::new();

    for (field, definition) in definitions {
        if !definition.exposed {
            continue;
        }
        let buckets = counts.entry(field.clone()).or_default();

        for record in records {
            let parent_key = match definition.strategy {
                CountingStrategy::Distinct => record.field(field),
                CountingStrategy::SingleBucket => Some(SINGLE_BUCKET_KEY.to_string()),
            };

            match definition.counted {
                CountedProperty::Deaths => {
                    if let Some(key) = &parent_key {
                        *buckets.entry(key.clone()).or_default() += 1;
                    }
                }
                CountedProperty::Count => {
                    if let Some(key) = &parent_key {
                        *buckets.entry(key.clone()).or_default() += record.count;
                    }
                    for peer in &record.peers {
                        let peer_key = match definition.strategy {
                            CountingStrategy::SingleBucket => {
                                Some(SINGLE_BUCKET_KEY.to_string())
                            }
                            // Peers bucket by their own organization; every
                            // other field inherits the parent bucket.
                            CountingStrategy::Distinct if field == "house" => {
                                peer.house.clone().or_else(|| parent_key.clone())
                            }
                            CountingStrategy::Distinct => parent_key.clone(),
                        };
                        if let Some(key) = peer_key {
                            *buckets.entry(key).or_default() += peer.count;
                        }
                    }
                }
            }
        }
    }

    counts
}

// =============================================================================
// Tests
// =============================================================================
