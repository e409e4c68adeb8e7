//! The record filter engine.
//!
//! Applies a set of named filters to a record collection, producing a
//! filtered collection. Filters are conjunctive (AND across fields) and every
//! field's predicate is evaluated against the full input set, so the outcome
//! is independent of filter order. The input slice is read-only; each pass
//! returns a fresh `Vec<Record>`.
//!
//! The pass follows a compile-then-evaluate model: active filter values are
//! compiled once (search tokenization, comma-list splitting, expression
//! parsing) and the compiled plans are evaluated per record.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value, json};

use incimap_expr::{EvaluationError, Expression, get_evaluable};

use crate::normalize::{MatchMode, array_contains, contains, normalize};
use crate::record::Record;
use crate::result::FilterResult;
use crate::suggest::SuggestionCollector;

/// The filter field carrying free-text search terms.
pub const SEARCH_FIELD: &str = "search";

/// Separator for discrete filter value lists (`"pn,gn"`).
const FILTER_LIST_SEPARATOR: char = ',';

// =============================================================================
// Filter set
// =============================================================================

/// An ordered mapping from filter field name to filter value.
///
/// Insertion order is preserved. An empty value means "no filtering on that
/// field" and is skipped during compilation.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    entries: Vec<(String, String)>,
}

impl FilterSet {
    pub fn new() -> Self {
        FilterSet::default()
    }

    /// Set a filter value, replacing any existing value for the field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(f, _)| *f == field) {
            entry.1 = value;
        } else {
            self.entries.push((field, value));
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(f, v)| (f.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The filter set as a JSON object, for expression bindings.
    fn to_bindings(&self) -> Value {
        let mut map = Map::new();
        for (field, value) in &self.entries {
            map.insert(field.clone(), Value::String(value.clone()));
        }
        Value::Object(map)
    }
}

impl FromIterator<(String, String)> for FilterSet {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut set = FilterSet::new();
        for (field, value) in iter {
            set.set(field, value);
        }
        set
    }
}

// =============================================================================
// Engine configuration
// =============================================================================

/// Engine configuration, injected at construction.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Minimum normalized length for a search token to count as a term.
    pub min_search_length: usize,
    /// Whether `expr:(...)` filter values take the expression path.
    pub expression_mode: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            min_search_length: 3,
            expression_mode: false,
        }
    }
}

// =============================================================================
// Compiled filter plans
// =============================================================================

#[derive(Debug)]
enum FieldPlan {
    Search(SearchPlan),
    Discrete(DiscretePlan),
}

#[derive(Debug)]
struct SearchPlan {
    /// The raw, unsplit filter value.
    raw: String,
    /// Qualified affirmative terms, normalized.
    affirmative: Vec<String>,
    /// Qualified negated terms (`!` stripped), normalized.
    negated: Vec<String>,
    /// Compiled expression when the value is `expr:(...)`-shaped and
    /// expression mode is on.
    expression: Option<Expression>,
}

#[derive(Debug)]
struct DiscretePlan {
    field: String,
    raw: String,
    /// Accepted values from the comma-split list.
    accepted: Vec<String>,
    expression: Option<Expression>,
}

/// Short identifiers allowed below the minimum search length when adjacent
/// to a longer term: district numbers (`45`, `971`), Corse letter suffixes
/// (`2a`, `2b`), military unit fractions (`2/7`).
fn short_identifier_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"^\d{1,3}$").expect("district pattern is valid"),
            Regex::new(r"^\d{1,2}[ab]$").expect("corse pattern is valid"),
            Regex::new(r"^\d+/\d+$").expect("unit fraction pattern is valid"),
        ]
    })
}

fn is_short_identifier(token: &str) -> bool {
    short_identifier_patterns().iter().any(|re| re.is_match(token))
}

// =============================================================================
// Filter engine
// =============================================================================

/// Applies a [`FilterSet`] to a record collection.
///
/// # Example
///
/// ```
/// use incimap_engine::{FilterConfig, FilterEngine, FilterSet, Record};
/// use serde_json::json;
///
/// let records: Vec<Record> = serde_json::from_value(json!([
///     {"house": "pn", "year": "2023", "published": true},
///     {"house": "gn", "year": "2023", "published": true},
/// ])).unwrap();
///
/// let mut filters = FilterSet::new();
/// filters.set("house", "pn");
///
/// let mut engine = FilterEngine::new(FilterConfig::default());
/// let result = engine.filter(&records, &filters);
/// assert!(!result.errored);
/// assert_eq!(result.records.len(), 1);
/// ```
#[derive(Debug)]
pub struct FilterEngine {
    config: FilterConfig,
    suggestions: SuggestionCollector,
}

impl FilterEngine {
    pub fn new(config: FilterConfig) -> Self {
        FilterEngine {
            config,
            suggestions: SuggestionCollector::new(),
        }
    }

    /// Run one filter pass. The input slice is never mutated.
    ///
    /// Any expression evaluation failure aborts the pass: the result carries
    /// `errored: true` and zero records rather than a partially-filtered set.
    pub fn filter(&mut self, records: &[Record], filters: &FilterSet) -> FilterResult {
        self.suggestions.clear();

        let plans = match self.compile(filters) {
            Ok(plans) => plans,
            Err(e) => return FilterResult::errored(e.to_string()),
        };
        let filters_value = filters.to_bindings();

        let mut kept = Vec::new();
        for record in records {
            let mut discrete_ok = true;
            let mut search_ok = true;
            let mut peer_rescued = false;

            for plan in &plans {
                let verdict = match plan {
                    FieldPlan::Discrete(plan) => passes_discrete(plan, record, &filters_value),
                    FieldPlan::Search(plan) => passes_search(plan, record, &filters_value),
                };
                match verdict {
                    Ok(Verdict { passed, by_peer }) => {
                        peer_rescued |= by_peer;
                        if !passed {
                            match plan {
                                FieldPlan::Discrete(_) => discrete_ok = false,
                                FieldPlan::Search(_) => search_ok = false,
                            }
                        }
                    }
                    Err(e) => {
                        self.suggestions.clear();
                        return FilterResult::errored(e.to_string());
                    }
                }
            }

            // Unpublished records are out of every pass unless a peer-level
            // override matched one of the active filters.
            if !record.published && !peer_rescued {
                continue;
            }

            // Records removed only by the search step stay searchable.
            if discrete_ok {
                self.suggestions.record(record);
            }
            if discrete_ok && search_ok {
                kept.push(record.clone());
            }
        }

        FilterResult::ok(kept)
    }

    /// Suggestions accumulated during the last pass.
    pub fn suggestions(&self) -> &[String] {
        self.suggestions.entries()
    }

    pub fn clear_suggestions(&mut self) {
        self.suggestions.clear();
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    // -------------------------------------------------------------------
    // Plan compilation
    // -------------------------------------------------------------------

    fn compile(&self, filters: &FilterSet) -> Result<Vec<FieldPlan>, EvaluationError> {
        let mut plans = Vec::new();
        for (field, value) in filters.iter() {
            if value.is_empty() {
                continue;
            }
            let expression = self.compile_expression(value)?;
            if field == SEARCH_FIELD {
                plans.push(FieldPlan::Search(self.compile_search(value, expression)));
            } else {
                plans.push(FieldPlan::Discrete(DiscretePlan {
                    field: field.to_string(),
                    raw: value.to_string(),
                    accepted: value
                        .split(FILTER_LIST_SEPARATOR)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect(),
                    expression,
                }));
            }
        }
        Ok(plans)
    }

    fn compile_expression(&self, value: &str) -> Result<Option<Expression>, EvaluationError> {
        if !self.config.expression_mode {
            return Ok(None);
        }
        match get_evaluable(value) {
            Some(body) => Ok(Some(Expression::parse(body)?)),
            None => Ok(None),
        }
    }

    fn compile_search(&self, raw: &str, expression: Option<Expression>) -> SearchPlan {
        let mut blocks: Vec<&str> = Vec::new();
        for block in raw.split_whitespace() {
            if !blocks.contains(&block) {
                blocks.push(block);
            }
        }

        let mut affirmative = Vec::new();
        let mut negated = Vec::new();
        for (index, block) in blocks.iter().enumerate() {
            let (is_negated, term) = match block.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, *block),
            };
            let term = normalize(term);
            let qualifies = term.chars().count() >= self.config.min_search_length
                || (index == 1 && is_short_identifier(&term));
            if !qualifies {
                continue;
            }
            if is_negated {
                negated.push(term);
            } else {
                affirmative.push(term);
            }
        }

        SearchPlan {
            raw: raw.to_string(),
            affirmative,
            negated,
            expression,
        }
    }
}

// =============================================================================
// Per-record predicates
// =============================================================================

struct Verdict {
    passed: bool,
    /// Whether a peer override is what kept the record in.
    by_peer: bool,
}

fn passes_discrete(
    plan: &DiscretePlan,
    record: &Record,
    filters_value: &Value,
) -> Result<Verdict, EvaluationError> {
    let direct = if let Some(expr) = &plan.expression {
        let bindings = bindings_for(record, &plan.field, &plan.raw, filters_value);
        expr.eval_bool(&bindings)?
    } else {
        record.published
            && record
                .field(&plan.field)
                .is_some_and(|v| plan.accepted.iter().any(|a| *a == v))
    };
    if direct {
        return Ok(Verdict {
            passed: true,
            by_peer: false,
        });
    }

    // Peer override: a peer whose own field value is present, non-empty and
    // accepted rescues the parent record.
    let by_peer = record.peers.iter().any(|peer| {
        peer.field(&plan.field)
            .is_some_and(|v| !v.is_empty() && plan.accepted.iter().any(|a| *a == v))
    });
    Ok(Verdict {
        passed: by_peer,
        by_peer,
    })
}

fn passes_search(
    plan: &SearchPlan,
    record: &Record,
    filters_value: &Value,
) -> Result<Verdict, EvaluationError> {
    // Peer rescue: a peer section containing the raw, unsplit term retains
    // the parent regardless of term logic.
    let by_peer = record
        .peers
        .iter()
        .any(|peer| {
            peer.section
                .as_deref()
                .is_some_and(|section| contains(section, &plan.raw, false))
        });
    if by_peer {
        return Ok(Verdict {
            passed: true,
            by_peer: true,
        });
    }

    // Expression path replaces literal substring matching.
    if let Some(expr) = &plan.expression {
        let bindings = bindings_for(record, SEARCH_FIELD, &plan.raw, filters_value);
        let passed = expr.eval_bool(&bindings)?;
        return Ok(Verdict {
            passed,
            by_peer: false,
        });
    }

    let text = as_slice(&record.text);
    let section = as_slice(&record.section);
    let location = as_slice(&record.location);

    let term_found = |terms: &[String], mode: MatchMode| {
        array_contains(&text, terms, mode)
            || array_contains(&record.keywords, terms, MatchMode::One)
            || array_contains(&section, terms, mode)
            || array_contains(&location, terms, mode)
    };

    let affirmative_ok =
        plan.affirmative.is_empty() || term_found(&plan.affirmative, MatchMode::All);
    // Presence of any negated term anywhere excludes the record.
    let negated_hit = !plan.negated.is_empty() && term_found(&plan.negated, MatchMode::One);

    Ok(Verdict {
        passed: affirmative_ok && !negated_hit,
        by_peer: false,
    })
}

fn as_slice(field: &Option<String>) -> Vec<String> {
    field.iter().cloned().collect()
}

fn bindings_for(
    record: &Record,
    field_name: &str,
    field_value: &str,
    filters_value: &Value,
) -> Value {
    json!({
        "death": serde_json::to_value(record).unwrap_or(Value::Null),
        "fieldName": field_name,
        "fieldValue": field_value,
        "filters": filters_value.clone(),
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(v: Value) -> Vec<Record> {
        serde_json::from_value(v).unwrap()
    }

    fn sample() -> Vec<Record> {
        records(json!([
            {
                "house": "pn", "year": "2023", "cause": "malveillance",
                "location": "Orléans", "section": "Brigade d'Orléans",
                "text": "Décédé en service de nuit.",
                "keywords": ["nuit", "moto"],
                "published": true, "count": 1
            },
            {
                "house": "gn", "year": "2023", "cause": "accident",
                "location": "Ajaccio", "section": "Peloton de Corse",
                "text": "Accident de la route.",
                "published": true, "count": 2,
                "peers": [{"house": "pn", "section": "CRS Paris", "count": 3}]
            },
            {
                "house": "pn", "year": "2022", "cause": "accident",
                "location": "Paris", "section": "BAC de Paris",
                "text": "Intervention de nuit à Paris.",
                "published": true, "count": 1
            }
        ]))
    }

    fn engine() -> FilterEngine {
        FilterEngine::new(FilterConfig::default())
    }

    fn expr_engine() -> FilterEngine {
        FilterEngine::new(FilterConfig {
            expression_mode: true,
            ..FilterConfig::default()
        })
    }

    #[test]
    fn test_discrete_filter() {
        let mut filters = FilterSet::new();
        filters.set("house", "pn");
        let result = engine().filter(&sample(), &filters);
        assert!(!result.errored);
        assert_eq!(result.records.len(), 3); // gn record rescued by its pn peer
    }

    #[test]
    fn test_discrete_filter_comma_list() {
        let mut filters = FilterSet::new();
        filters.set("year", "2022, 2021");
        let result = engine().filter(&sample(), &filters);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].location.as_deref(), Some("Paris"));
    }

    #[test]
    fn test_conjunctive_fields() {
        let mut filters = FilterSet::new();
        filters.set("house", "pn");
        filters.set("year", "2022");
        let result = engine().filter(&sample(), &filters);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].year.as_deref(), Some("2022"));
    }

    #[test]
    fn test_search_affirmative() {
        let mut filters = FilterSet::new();
        filters.set("search", "nuit");
        let result = engine().filter(&sample(), &filters);
        assert_eq!(result.records.len(), 2);
    }

    #[test]
    fn test_search_diacritic_insensitive() {
        let mut filters = FilterSet::new();
        filters.set("search", "orleans");
        let result = engine().filter(&sample(), &filters);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].location.as_deref(), Some("Orléans"));
    }

    #[test]
    fn test_search_negation() {
        let mut filters = FilterSet::new();
        filters.set("search", "!paris");
        let result = engine().filter(&sample(), &filters);
        // Only the third record mentions Paris in its own fields
        assert_eq!(result.records.len(), 2);
        assert!(
            result
                .records
                .iter()
                .all(|r| r.location.as_deref() != Some("Paris"))
        );
    }

    #[test]
    fn test_search_short_token_needs_position_two() {
        // "2a" alone is below the minimum length and not at index 1
        let mut filters = FilterSet::new();
        filters.set("search", "2a");
        let result = engine().filter(&sample(), &filters);
        assert_eq!(result.records.len(), 3); // token dropped, no filtering

        // As second token next to a longer term it qualifies
        filters.set("search", "corse 2a");
        let result = engine().filter(&sample(), &filters);
        // "corse" matches only the Ajaccio record; "2a" matches nothing,
        // and All semantics require both
        assert!(result.records.is_empty());
    }

    #[test]
    fn test_search_token_dedup() {
        let mut filters = FilterSet::new();
        filters.set("search", "nuit nuit nuit");
        let result = engine().filter(&sample(), &filters);
        assert_eq!(result.records.len(), 2);
    }

    #[test]
    fn test_peer_rescue_on_search() {
        let mut filters = FilterSet::new();
        filters.set("search", "crs");
        let result = engine().filter(&sample(), &filters);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].house.as_deref(), Some("gn"));
    }

    #[test]
    fn test_peer_rescue_removed_with_peer() {
        let mut dataset = sample();
        dataset[1].peers.clear();
        let mut filters = FilterSet::new();
        filters.set("house", "pn");
        let result = engine().filter(&dataset, &filters);
        assert_eq!(result.records.len(), 2);
        assert!(result.records.iter().all(|r| r.house.as_deref() == Some("pn")));
    }

    #[test]
    fn test_unpublished_excluded() {
        let mut dataset = sample();
        dataset[0].published = false;
        let result = engine().filter(&dataset, &FilterSet::new());
        assert_eq!(result.records.len(), 2);
    }

    #[test]
    fn test_expression_filter() {
        let mut filters = FilterSet::new();
        filters.set("house", "expr:(death.count > 1)");
        let result = expr_engine().filter(&sample(), &filters);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].house.as_deref(), Some("gn"));
    }

    #[test]
    fn test_expression_disabled_outside_expression_mode() {
        let mut filters = FilterSet::new();
        filters.set("house", "expr:(death.count > 1)");
        // Treated as a literal value list; matches no house code
        let result = engine().filter(&sample(), &filters);
        assert!(!result.errored);
        assert!(result.records.is_empty());
    }

    #[test]
    fn test_expression_error_containment() {
        let mut filters = FilterSet::new();
        filters.set("search", "expr:(nonexistent_fn())");
        let result = expr_engine().filter(&sample(), &filters);
        assert!(result.errored);
        assert!(result.records.is_empty());
        assert!(result.error.is_some());
    }

    #[test]
    fn test_expression_runtime_error_containment() {
        let mut filters = FilterSet::new();
        filters.set("search", "expr:(death.house > 1)");
        let result = expr_engine().filter(&sample(), &filters);
        assert!(result.errored);
        assert!(result.records.is_empty());
    }

    #[test]
    fn test_search_expression_path() {
        let mut filters = FilterSet::new();
        filters.set("search", "expr:(death.section contains 'paris')");
        let result = expr_engine().filter(&sample(), &filters);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].section.as_deref(), Some("BAC de Paris"));
    }

    #[test]
    fn test_idempotence() {
        let mut filters = FilterSet::new();
        filters.set("search", "nuit");
        filters.set("house", "pn");
        let mut eng = engine();
        let once = eng.filter(&sample(), &filters);
        let twice = eng.filter(&once.records, &filters);
        assert_eq!(once.records, twice.records);
    }

    #[test]
    fn test_input_not_mutated() {
        let dataset = sample();
        let snapshot = dataset.clone();
        let mut filters = FilterSet::new();
        filters.set("house", "gn");
        let _ = engine().filter(&dataset, &filters);
        assert_eq!(dataset, snapshot);
    }

    #[test]
    fn test_suggestions_from_search_removed_records() {
        let mut eng = engine();
        let mut filters = FilterSet::new();
        filters.set("search", "orleans");
        let _ = eng.filter(&sample(), &filters);
        // All records pass the (absent) discrete filters, so all contribute
        assert!(eng.suggestions().iter().any(|s| s == "Ajaccio"));
        assert!(eng.suggestions().iter().any(|s| s == "CRS Paris"));
    }

    #[test]
    fn test_suggestions_suppressed_by_discrete_removal() {
        let mut eng = engine();
        let mut filters = FilterSet::new();
        filters.set("year", "2023");
        filters.set("search", "orleans");
        let _ = eng.filter(&sample(), &filters);
        // The 2022 record failed a discrete filter: no suggestions from it
        assert!(!eng.suggestions().iter().any(|s| s == "BAC de Paris"));
        assert!(eng.suggestions().iter().any(|s| s == "Ajaccio"));
    }

    #[test]
    fn test_suggestions_cleared_between_passes() {
        let mut eng = engine();
        let mut filters = FilterSet::new();
        filters.set("search", "orleans");
        let _ = eng.filter(&sample(), &filters);
        let first = eng.suggestions().len();
        let _ = eng.filter(&sample(), &filters);
        assert_eq!(eng.suggestions().len(), first);
    }

    #[test]
    fn test_concrete_scenario() {
        // Three records, filter {year: 2023, house: "pn,gn", search: ""} —
        // expect the 2023 published records, input order preserved.
        let mut filters = FilterSet::new();
        filters.set("year", "2023");
        filters.set("house", "pn,gn");
        filters.set("search", "");
        let result = engine().filter(&sample(), &filters);
        assert!(!result.errored);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].house.as_deref(), Some("pn"));
        assert_eq!(result.records[1].house.as_deref(), Some("gn"));
    }
}
