//! Incident record data model.
//!
//! Records arrive as per-year JSON payloads of shape
//! `{ "settings": {...}, "deaths": [...] }` and are rebuilt on every load.
//! Unknown fields are kept in an open `extra` map so datasets can carry
//! attributes the engine does not interpret.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Where the incident occurred relative to the national territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    Domestic,
    Interior,
    OverseasOperation,
}

/// Geographic position with precision metadata.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Gps {
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub radius: Option<f64>,
}

/// A secondary victim grouped under a primary record.
///
/// Peers carry their own `house`, `section` and `count`; other criterion
/// fields (e.g. `cause`) may be absent, in which case the parent record's
/// value applies for aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerRecord {
    #[serde(default)]
    pub house: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub cause: Option<String>,
    #[serde(default = "default_count")]
    pub count: u64,

    /// Extra structured fields not interpreted by the engine.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One incident entry ("death") in the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub cause: Option<String>,
    #[serde(default)]
    pub house: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub origin: Option<Origin>,

    /// Date components as strings, not guaranteed zero-padded.
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub year: Option<String>,

    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub text: Option<String>,

    /// Searchable tokens; a bare string in the payload becomes a single token.
    #[serde(default, deserialize_with = "string_or_list")]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub published: bool,

    /// Number of principal victims.
    #[serde(default = "default_count")]
    pub count: u64,

    #[serde(default)]
    pub gps: Option<Gps>,

    #[serde(default)]
    pub peers: Vec<PeerRecord>,

    /// Extra structured fields not interpreted by the engine.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Record {
    /// Look up a discrete criterion field by name.
    ///
    /// Unknown names fall back to the `extra` map; a record without the
    /// field yields `None`, so the predicate naturally does not match.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "cause" => self.cause.clone(),
            "house" => self.house.clone(),
            "county" => self.county.clone(),
            "origin" => self.origin.map(origin_code),
            "day" => self.day.clone(),
            "month" => self.month.clone(),
            "year" => self.year.clone(),
            "location" => self.location.clone(),
            "section" => self.section.clone(),
            other => self.extra.get(other).and_then(value_as_string),
        }
    }
}

impl PeerRecord {
    /// Look up a criterion field on the peer itself.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "house" => self.house.clone(),
            "section" => self.section.clone(),
            "cause" => self.cause.clone(),
            other => self.extra.get(other).and_then(value_as_string),
        }
    }
}

fn origin_code(origin: Origin) -> String {
    match origin {
        Origin::Domestic => "domestic",
        Origin::Interior => "interior",
        Origin::OverseasOperation => "overseas-operation",
    }
    .to_string()
}

fn value_as_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn default_count() -> u64 {
    1
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => Ok(vec![s]),
        OneOrMany::Many(v) => Ok(v),
    }
}

// =============================================================================
// Dataset payload
// =============================================================================

/// Dataset-level settings from the per-year payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// `true` when the year is still accumulating entries.
    #[serde(default)]
    pub up_to_date: bool,
}

/// A per-year dataset payload: `{ settings, deaths }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub settings: Settings,
    pub deaths: Vec<Record>,
}

impl Dataset {
    /// Parse a dataset payload from JSON text.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
