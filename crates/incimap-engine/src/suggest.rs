//! Autocomplete suggestion accumulation.

use crate::record::Record;

/// Accumulates searchable strings from records touched during filtering.
///
/// The list keeps duplicates; deduplication is the caller's concern. It is
/// refilled at the start of every filter pass. Records removed by the search
/// field still contribute so they stay reachable from future queries, but a
/// removal by a discrete filter suppresses the contribution.
#[derive(Debug, Default)]
pub struct SuggestionCollector {
    entries: Vec<String>,
}

impl SuggestionCollector {
    pub fn new() -> Self {
        SuggestionCollector::default()
    }

    /// Record a candidate's searchable strings: `location`, `section`, and
    /// every peer's `section`.
    pub fn record(&mut self, record: &Record) {
        if let Some(location) = &record.location {
            self.entries.push(location.clone());
        }
        if let Some(section) = &record.section {
            self.entries.push(section.clone());
        }
        for peer in &record.peers {
            if let Some(section) = &peer.section {
                self.entries.push(section.clone());
            }
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
