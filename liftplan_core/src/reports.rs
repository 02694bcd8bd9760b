//! Report aggregation over logged sessions.
//!
//! Day nodes in stored documents come in three historical shapes: a plain
//! exercise list, a map keyed by position, and a `{"ejercicios": ...}`
//! wrapper around either. [`normalize_day_node`] folds all of them into one
//! ordered list; row building then reads fields dynamically so documents
//! that predate the typed model still report correctly.
//!
//! Nothing in here raises on malformed input. Unusable nodes degrade to
//! empty lists, unusable entries are skipped with a warning.

use serde::Serialize;
use serde_json::Value;

use crate::numeric::is_blank;
use crate::store::PlanStore;
use crate::types::LoggedSet;
use crate::Result;

/// One summary row: a single logged set with its context
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ReportRow {
    pub athlete: String,
    pub day: u8,
    pub exercise: String,
    /// 1-based position of the set within its exercise.
    pub set_index: usize,
    pub reps: String,
    pub weight: String,
    pub rir: String,
    pub comment: String,
    /// Session-level RPE of the day, repeated on each of its rows.
    pub rpe: Option<f64>,
}

/// Row filters applied while aggregating
#[derive(Clone, Copy, Debug, Default)]
pub struct ReportFilter {
    /// Only emit rows whose set carries at least one value.
    pub require_data: bool,
    /// Only emit rows whose exercise carries a comment.
    pub require_comment: bool,
}

/// Normalize any historical day-node shape into an ordered exercise list.
///
/// Precedence, first match wins:
/// 1. A dict containing `"exercises"` (or the legacy `"ejercicios"`)
///    recurses into that value
/// 2. A dict whose keys are all numeric strings yields its values in
///    numeric key order
/// 3. Any other dict yields the values that are themselves dicts
/// 4. A one-element list whose only element is an exercise-list wrapper
///    dict unwraps and recurses
/// 5. Any other list yields its dict elements
///
/// Anything else normalizes to an empty list.
pub fn normalize_day_node(node: &Value) -> Vec<Value> {
    match node {
        Value::Object(map) => {
            if let Some(inner) = map.get("exercises").or_else(|| map.get("ejercicios")) {
                return normalize_day_node(inner);
            }
            if map.keys().all(|k| k.parse::<u64>().is_ok()) {
                let mut keyed: Vec<(u64, &Value)> = map
                    .iter()
                    .filter_map(|(k, v)| k.parse::<u64>().ok().map(|n| (n, v)))
                    .collect();
                keyed.sort_by_key(|(n, _)| *n);
                return keyed.into_iter().map(|(_, v)| v.clone()).collect();
            }
            map.values().filter(|v| v.is_object()).cloned().collect()
        }
        Value::Array(items) => {
            if items.len() == 1 {
                if let Value::Object(only) = &items[0] {
                    if only.contains_key("exercises") || only.contains_key("ejercicios") {
                        return normalize_day_node(&items[0]);
                    }
                }
            }
            items.iter().filter(|v| v.is_object()).cloned().collect()
        }
        _ => Vec::new(),
    }
}

/// A field that may be stored as a string or a bare number.
fn text_field(node: &Value, key: &str) -> String {
    match node.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn should_emit(set: &LoggedSet, comment: &str, filter: &ReportFilter) -> bool {
    let has_data = !set.is_empty();
    let has_comment = !is_blank(comment);
    if !has_data && !has_comment {
        return false;
    }
    if filter.require_data && !has_data {
        return false;
    }
    if filter.require_comment && !has_comment {
        return false;
    }
    true
}

fn rows_for_day(athlete: &str, day: u8, node: &Value, filter: &ReportFilter, out: &mut Vec<ReportRow>) {
    let rpe = node.get("rpe").and_then(Value::as_f64);

    for entry in normalize_day_node(node) {
        let name = match entry.get("name").and_then(Value::as_str) {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => {
                tracing::warn!("Skipping exercise entry without a name (day {})", day);
                continue;
            }
        };
        let comment = text_field(&entry, "comment");

        let Some(sets) = entry.get("logged_sets").and_then(Value::as_array) else {
            continue;
        };

        for (idx, raw_set) in sets.iter().enumerate() {
            let set = LoggedSet {
                reps: text_field(raw_set, "reps"),
                weight: text_field(raw_set, "weight"),
                rir: text_field(raw_set, "rir"),
            };
            if !should_emit(&set, &comment, filter) {
                continue;
            }
            out.push(ReportRow {
                athlete: athlete.to_string(),
                day,
                exercise: name.clone(),
                set_index: idx + 1,
                reps: set.reps,
                weight: set.weight,
                rir: set.rir,
                comment: comment.clone(),
                rpe,
            });
        }
    }
}

/// Build summary rows from one raw plan document.
pub fn rows_for_document(doc: &Value, filter: &ReportFilter) -> Vec<ReportRow> {
    let athlete = doc
        .get("athlete")
        .and_then(Value::as_str)
        .or_else(|| doc.get("correo").and_then(Value::as_str));
    let Some(athlete) = athlete else {
        tracing::warn!("Skipping document without an athlete identifier");
        return Vec::new();
    };

    let mut rows = Vec::new();
    match doc.get("days") {
        Some(Value::Object(days)) => {
            for (day_key, node) in days {
                match day_key.parse::<u8>() {
                    Ok(day) => rows_for_day(athlete, day, node, filter, &mut rows),
                    Err(_) => {
                        tracing::warn!("Skipping day with non-numeric key {:?}", day_key);
                    }
                }
            }
        }
        Some(Value::Array(days)) => {
            for (idx, node) in days.iter().enumerate() {
                rows_for_day(athlete, idx as u8 + 1, node, filter, &mut rows);
            }
        }
        _ => {}
    }
    rows
}

/// Build summary rows for every athlete on a coach's roster.
///
/// Documents are visited in week order, athletes alphabetically within a
/// week, so output order is stable across runs.
pub fn build_report(
    store: &dyn PlanStore,
    coach_email: &str,
    filter: &ReportFilter,
) -> Result<Vec<ReportRow>> {
    let mut rows = Vec::new();
    for (_key, doc) in store.list_raw_for_coach(coach_email)? {
        rows.extend(rows_for_document(&doc, filter));
    }
    tracing::info!(
        "Built report for {}: {} rows",
        coach_email,
        rows.len()
    );
    Ok(rows)
}

/// Build summary rows for one week of a coach's roster.
pub fn build_week_report(
    store: &dyn PlanStore,
    coach_email: &str,
    week_start: chrono::NaiveDate,
    filter: &ReportFilter,
) -> Result<Vec<ReportRow>> {
    let week_start = crate::plan::monday_of(week_start);
    let wanted = week_start.format("%Y-%m-%d").to_string();
    let mut rows = Vec::new();
    for (_key, doc) in store.list_raw_for_coach(coach_email)? {
        if doc.get("week_start").and_then(Value::as_str) == Some(wanted.as_str()) {
            rows.extend(rows_for_document(&doc, filter));
        }
    }
    Ok(rows)
}
