//! Progression rule evaluation.
//!
//! This module implements the arithmetic side of progressions:
//! - Single-value adjustment (add/subtract/multiply/divide on free text)
//! - Compounding across week offsets (a rule firing at offsets {2,3}
//!   applies twice when computing offset 3)
//! - Whole-entry and whole-day projection for previewing a later week
//!
//! Adjustments never fail loudly. A value that cannot be parsed, or an
//! operation that cannot produce a finite number, yields an explicit
//! [`Adjusted::Skipped`] and the stored value stays as-is.

use crate::numeric::{format_number, parse_first_number};
use crate::types::{DayPlan, ExerciseEntry, Operation, ProgressionRule, Variable};

/// Why an adjustment left its input unchanged
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdjustSkip {
    /// The stored value has no parseable number
    NotNumeric,
    /// The operation cannot produce a finite number (divide by zero, overflow)
    UnusableOperand,
    /// None of the rule's week offsets are at or before the target offset
    NoQualifyingWeeks,
}

/// Outcome of adjusting one free-text value
#[derive(Clone, Debug, PartialEq)]
pub enum Adjusted {
    /// The adjustment applied; holds the re-rendered value
    Applied(String),
    /// The value was left unchanged, with the reason
    Skipped(AdjustSkip),
}

impl Adjusted {
    /// Resolve to the value the document should store: the adjusted value,
    /// or the original unchanged when the adjustment was skipped.
    pub fn or_keep(self, original: &str) -> String {
        match self {
            Adjusted::Applied(value) => value,
            Adjusted::Skipped(_) => original.to_string(),
        }
    }
}

/// Raw arithmetic step. `None` means the result is unusable and the caller
/// must leave the input alone.
fn apply_numeric(value: f64, operand: f64, operation: Operation) -> Option<f64> {
    let result = match operation {
        Operation::Add => value + operand,
        Operation::Subtract => value - operand,
        Operation::Multiply => value * operand,
        Operation::Divide => {
            if operand == 0.0 {
                return None;
            }
            value / operand
        }
    };
    result.is_finite().then_some(result)
}

/// Apply one operation to one free-text value.
///
/// The input is parsed leniently (see [`crate::numeric::parse_first_number`])
/// and the result rendered back to text. Parse failures and unusable
/// operations skip rather than error; callers keep the original value.
pub fn apply_operation(value: &str, operand: f64, operation: Operation) -> Adjusted {
    let Some(parsed) = parse_first_number(value) else {
        tracing::debug!("adjustment skipped, not numeric: {:?}", value);
        return Adjusted::Skipped(AdjustSkip::NotNumeric);
    };

    match apply_numeric(parsed, operand, operation) {
        Some(result) => Adjusted::Applied(format_number(result)),
        None => {
            tracing::debug!(
                "adjustment skipped, unusable operand {} for {:?}",
                operand,
                operation
            );
            Adjusted::Skipped(AdjustSkip::UnusableOperand)
        }
    }
}

/// Week offsets of a rule that fire when computing `target_offset`.
///
/// Offsets are 1-based; zero entries from malformed documents are dropped.
fn qualifying_firings(rule: &ProgressionRule, target_offset: u32) -> usize {
    rule.weeks
        .iter()
        .filter(|&&offset| offset >= 1 && offset <= target_offset)
        .count()
}

/// Adjust a free-text value for a target week offset, compounding one
/// application per qualifying firing.
///
/// A rule with `weeks = {2, 3}` and operand +2.5 turns a base of "100" into
/// "102.5" at offset 2 and "105" at offset 3. Each firing re-parses the
/// previous rendering, matching how saved documents chain week to week.
pub fn adjusted_value(base: &str, rule: &ProgressionRule, target_offset: u32) -> Adjusted {
    let firings = qualifying_firings(rule, target_offset);
    if firings == 0 {
        return Adjusted::Skipped(AdjustSkip::NoQualifyingWeeks);
    }

    let mut current = base.to_string();
    let mut applied = false;
    for _ in 0..firings {
        match apply_operation(&current, rule.operand, rule.operation) {
            Adjusted::Applied(value) => {
                current = value;
                applied = true;
            }
            skipped @ Adjusted::Skipped(_) => {
                if applied {
                    // Keep whatever compounded cleanly before the bad step.
                    break;
                }
                return skipped;
            }
        }
    }

    tracing::debug!(
        "progression {:?} {:?} {} x{}: {:?} -> {:?}",
        rule.variable,
        rule.operation,
        rule.operand,
        firings,
        base,
        current
    );
    Adjusted::Applied(current)
}

/// Integer counterpart of [`adjusted_value`] for sets and reps fields.
///
/// Rounds to the nearest whole number after each firing; unchanged when the
/// rule does not fire or the operation is unusable.
pub fn adjusted_count(base: u32, rule: &ProgressionRule, target_offset: u32) -> u32 {
    let firings = qualifying_firings(rule, target_offset);
    let mut current = base;
    for _ in 0..firings {
        match apply_numeric(f64::from(current), rule.operand, rule.operation) {
            Some(result) => current = result.round().max(0.0) as u32,
            None => break,
        }
    }
    current
}

/// Adjust both bounds of a reps range independently with the same rule.
pub fn adjusted_range(
    bounds: (Option<u32>, Option<u32>),
    rule: &ProgressionRule,
    target_offset: u32,
) -> (Option<u32>, Option<u32>) {
    (
        bounds.0.map(|v| adjusted_count(v, rule, target_offset)),
        bounds.1.map(|v| adjusted_count(v, rule, target_offset)),
    )
}

/// Project one exercise entry to a later week of its block.
///
/// Applies every active rule for the target offset to the field it names.
/// The result is a fresh prescription: logged sets, comments, achieved
/// values and the responsible coach do not carry over.
pub fn project_entry(entry: &ExerciseEntry, target_offset: u32) -> ExerciseEntry {
    let mut projected = entry.clone();
    projected.logged_sets = Vec::new();
    projected.comment = String::new();
    projected.achieved_weight = None;
    projected.achieved_reps = None;
    projected.achieved_rir = None;
    projected.coach_responsible = None;

    for rule in entry.active_rules() {
        match rule.variable {
            Variable::Weight => {
                projected.weight = adjusted_value(&projected.weight, rule, target_offset)
                    .or_keep(&projected.weight);
            }
            Variable::Tempo => {
                projected.tempo = adjusted_value(&projected.tempo, rule, target_offset)
                    .or_keep(&projected.tempo);
            }
            Variable::Rir => {
                projected.rir = adjusted_value(&projected.rir, rule, target_offset)
                    .or_keep(&projected.rir);
            }
            Variable::Sets => {
                projected.sets = adjusted_count(projected.sets, rule, target_offset);
            }
            Variable::Reps => {
                let bounds = adjusted_range(
                    (projected.reps_min, projected.reps_max),
                    rule,
                    target_offset,
                );
                projected.reps_min = bounds.0;
                projected.reps_max = bounds.1;
            }
        }
    }

    projected
}

/// Project a whole day plan to a later week of its block.
///
/// Session RPE belongs to the logged week and is not carried forward.
pub fn project_day(day: &DayPlan, target_offset: u32) -> DayPlan {
    DayPlan {
        exercises: day
            .exercises
            .iter()
            .map(|entry| project_entry(entry, target_offset))
            .collect(),
        rpe: None,
        extra: day.extra.clone(),
    }
}
