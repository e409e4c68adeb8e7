//! Shared helpers for integration tests.

use incimap_engine::{FilterConfig, FilterEngine, FilterSet, Record};
use serde_json::Value;

pub fn records(v: Value) -> Vec<Record> {
    serde_json::from_value(v).expect("test records are valid")
}

pub fn filters(pairs: &[(&str, &str)]) -> FilterSet {
    let mut set = FilterSet::new();
    for (field, value) in pairs {
        set.set(*field, *value);
    }
    set
}

pub fn engine() -> FilterEngine {
    FilterEngine::new(FilterConfig::default())
}

pub fn expr_engine() -> FilterEngine {
    FilterEngine::new(FilterConfig {
        expression_mode: true,
        ..FilterConfig::default()
    })
}
