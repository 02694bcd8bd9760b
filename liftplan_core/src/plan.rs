//! Plan sequencing helpers: store keys, week normalization, block offsets.
//!
//! Document identity and progression offsets both derive from here, so the
//! rules are deliberately small and pure: lowercase-underscore athlete keys,
//! Monday-normalized week starts, 1-based offsets into a block's sorted
//! week list.

use chrono::{Datelike, Duration, NaiveDate};

use crate::types::WeekPlan;

/// Normalize an athlete identifier (email) into its store-key form.
///
/// Lowercased, with every non-alphanumeric character replaced by `_`.
pub fn athlete_key(email: &str) -> String {
    email
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Store key for one athlete-week document: `{athlete_key}_{YYYY_MM_DD}`.
pub fn plan_key(athlete: &str, week_start: NaiveDate) -> String {
    format!("{}_{}", athlete_key(athlete), week_start.format("%Y_%m_%d"))
}

/// Snap any date to the Monday of its week.
///
/// Week documents are keyed by Monday; saves and lookups normalize through
/// here so a Wednesday date still lands on the right document.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// The chronologically sorted week starts of one training block.
pub fn block_weeks(plans: &[WeekPlan], block_id: &str) -> Vec<NaiveDate> {
    let mut weeks: Vec<NaiveDate> = plans
        .iter()
        .filter(|p| p.block_id.as_deref() == Some(block_id))
        .map(|p| p.week_start)
        .collect();
    weeks.sort();
    weeks.dedup();
    weeks
}

/// 1-based position of a week within its block's sorted week list.
///
/// Returns `None` when the week is not part of the block; progression rules
/// never fire for such weeks.
pub fn week_offset(block: &[NaiveDate], week_start: NaiveDate) -> Option<u32> {
    block
        .iter()
        .position(|&w| w == week_start)
        .map(|idx| idx as u32 + 1)
}
