//! Core domain types for the liftplan system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercise entries and their logged sets
//! - Progression rules (variable, operation, operand, week offsets)
//! - Day plans and weekly plan documents
//!
//! Weekly plan documents round-trip through the plan store as JSON. Field
//! names follow this crate's conventions, with aliases for the legacy keys
//! still present in older documents (`correo`, `entrenador`, `ejercicios`).
//! Unrecognized fields are preserved untouched via `extra` maps.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rules past this count are ignored when applying progressions.
pub const MAX_PROGRESSION_RULES: usize = 3;

// ============================================================================
// Progression Rule Types
// ============================================================================

/// Which prescribed field a progression rule adjusts
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    Weight,
    Tempo,
    Rir,
    Sets,
    Reps,
}

/// Arithmetic applied by a progression rule
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// A stored instruction to adjust one field on specific week offsets.
///
/// `weeks` holds positive 1-based offsets into the block's sorted week list;
/// the rule fires once per qualifying offset, in ascending order, so
/// adjustments compound across weeks.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgressionRule {
    pub variable: Variable,
    pub operation: Operation,
    pub operand: f64,
    pub weeks: std::collections::BTreeSet<u32>,
}

// ============================================================================
// Exercise Types
// ============================================================================

/// One set actually performed, exactly as typed by the athlete.
///
/// All fields are free text: "82,5", "100kg", "8-10" and blanks all occur in
/// real documents. Parsing happens at aggregation time, never on load.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggedSet {
    #[serde(default)]
    pub reps: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub rir: String,
}

impl LoggedSet {
    /// True when every field is blank. Such sets produce no report rows.
    pub fn is_empty(&self) -> bool {
        crate::numeric::is_blank(&self.reps)
            && crate::numeric::is_blank(&self.weight)
            && crate::numeric::is_blank(&self.rir)
    }
}

/// One prescribed exercise within a day plan.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExerciseEntry {
    pub name: String,
    /// Single-letter grouping label (A, B, C, ...); drives ordering and the
    /// match key used by forward propagation.
    #[serde(default)]
    pub circuit: String,
    /// Free-text section label, e.g. "Warm Up" / "Work Out".
    #[serde(default)]
    pub block: String,
    #[serde(default)]
    pub sets: u32,
    #[serde(default)]
    pub reps_min: Option<u32>,
    #[serde(default)]
    pub reps_max: Option<u32>,
    /// Prescribed values as free text; empty string means "not prescribed".
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub tempo: String,
    #[serde(default)]
    pub rir: String,
    #[serde(default)]
    pub progressions: Vec<ProgressionRule>,
    #[serde(default)]
    pub logged_sets: Vec<LoggedSet>,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achieved_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achieved_reps: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achieved_rir: Option<String>,
    /// Who performed the save that last logged this exercise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coach_responsible: Option<String>,
    /// Fields this crate does not recognize, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ExerciseEntry {
    /// Identity key for matching "the same exercise" across weeks.
    ///
    /// Name, circuit and block label must all match; values are compared
    /// trimmed because older documents carry stray whitespace.
    pub fn match_key(&self) -> (&str, &str, &str) {
        (
            self.name.trim(),
            self.circuit.trim(),
            self.block.trim(),
        )
    }

    /// The progression rules that actually apply (the first
    /// [`MAX_PROGRESSION_RULES`]; any further entries are ignored).
    pub fn active_rules(&self) -> &[ProgressionRule] {
        let end = self.progressions.len().min(MAX_PROGRESSION_RULES);
        &self.progressions[..end]
    }
}

// ============================================================================
// Plan Document Types
// ============================================================================

/// One day's prescription: an ordered exercise list plus session RPE.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DayPlan {
    #[serde(default, alias = "ejercicios")]
    pub exercises: Vec<ExerciseEntry>,
    /// Session-level perceived exertion, 0-10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpe: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One athlete's plan for one week, keyed in the store by
/// `{athlete_key}_{week_start:YYYY_MM_DD}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeekPlan {
    /// Athlete identifier (email).
    #[serde(alias = "correo")]
    pub athlete: String,
    #[serde(default, alias = "entrenador")]
    pub coach_email: String,
    /// Monday the week starts on.
    pub week_start: NaiveDate,
    /// Groups consecutive weeks into one training block; weeks without a
    /// block id never qualify for offset-based progressions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    /// Day number (1..=5) to that day's plan.
    #[serde(default)]
    pub days: BTreeMap<u8, DayPlan>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WeekPlan {
    /// Build an empty plan for one athlete-week.
    pub fn new(athlete: &str, coach_email: &str, week_start: NaiveDate) -> Self {
        WeekPlan {
            athlete: athlete.to_string(),
            coach_email: coach_email.to_string(),
            week_start,
            block_id: None,
            days: BTreeMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// The store key for this document.
    pub fn key(&self) -> String {
        crate::plan::plan_key(&self.athlete, self.week_start)
    }
}
