//! Forward propagation of logged performance.
//!
//! Saving a logged day does three things, in order:
//! 1. Computes each exercise's achieved values from its logged sets and
//!    writes them (plus the saver and session RPE) onto the current week
//! 2. Computes the weight delta between achieved and planned per exercise
//! 3. Walks every later week for the athlete and applies the delta to
//!    matching exercises on the same day number, one document write per
//!    touched week
//!
//! Exercises that cannot participate are skipped with an explicit reason,
//! never an error. Store failures abort the remaining writes; documents
//! already written stay written (no rollback).

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::journal::{SaveJournal, SaveRecord};
use crate::numeric::{format_number, parse_first_number, round2};
use crate::store::PlanStore;
use crate::types::{DayPlan, LoggedSet};
use crate::{plan, Config, Error, Identity, Result};

/// Best values derived from one exercise's logged sets.
///
/// Weight and reps take the maximum across sets, RIR the minimum (the
/// lowest reps-in-reserve logged is the hardest effort). A field is `None`
/// when no set carries a parseable value for it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Achieved {
    pub weight: Option<f64>,
    pub reps: Option<f64>,
    pub rir: Option<f64>,
}

/// Reduce logged sets to their achieved values.
///
/// Unparsable fields are dropped from the aggregation; they never error.
pub fn achieved_from_sets(sets: &[LoggedSet]) -> Achieved {
    Achieved {
        weight: sets
            .iter()
            .filter_map(|s| parse_first_number(&s.weight))
            .reduce(f64::max),
        reps: sets
            .iter()
            .filter_map(|s| parse_first_number(&s.reps))
            .reduce(f64::max),
        rir: sets
            .iter()
            .filter_map(|s| parse_first_number(&s.rir))
            .reduce(f64::min),
    }
}

/// What happened to one exercise during a save
#[derive(Clone, Debug, PartialEq)]
pub enum PropagationResult {
    /// Weight delta written into this many future week documents
    Applied { delta: f64, weeks_updated: usize },
    /// Achieved values recorded; delta was zero so no forward writes
    NoDelta,
    /// No logged set carried a parseable weight; exercise left untouched
    NoLoggedWeight,
}

/// Per-exercise outcome of a save
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseOutcome {
    pub name: String,
    pub result: PropagationResult,
}

/// Summary of one completed save
#[derive(Clone, Debug)]
pub struct SaveOutcome {
    pub exercises: Vec<ExerciseOutcome>,
    /// Distinct future week documents written.
    pub weeks_updated: usize,
}

/// Save one logged day and propagate weight deltas forward.
///
/// `logged` replaces the day's entries in the week document, exactly as the
/// logging form posted them; achieved values are then computed in place.
/// `week_start` may be any date in the week, it is normalized to Monday.
///
/// By default deltas reach every future week for the athlete and day,
/// crossing block boundaries; `config.propagation.within_block_only`
/// restricts the walk to weeks sharing the logged week's block id.
///
/// The journal records every completed save; a journal failure is logged
/// as a warning and never fails the save itself.
pub fn save_logged_day(
    store: &mut dyn PlanStore,
    journal: &mut dyn SaveJournal,
    saved_by: &Identity,
    athlete: &str,
    week_start: NaiveDate,
    day: u8,
    mut logged: DayPlan,
    config: &Config,
) -> Result<SaveOutcome> {
    let week_start = plan::monday_of(week_start);
    let key = plan::plan_key(athlete, week_start);

    let mut current = store.get(&key)?.ok_or_else(|| {
        Error::Plan(format!("no plan document for {} on {}", athlete, week_start))
    })?;

    if !saved_by.can_edit_plan(&current.athlete, &current.coach_email) {
        return Err(Error::Unauthorized(format!(
            "{} may not log against {}'s plan",
            saved_by.email, current.athlete
        )));
    }

    let mut outcomes: Vec<ExerciseOutcome> = Vec::with_capacity(logged.exercises.len());
    // (outcome index, owned match key, delta) for exercises that propagate.
    let mut pending: Vec<(usize, (String, String, String), f64)> = Vec::new();

    for entry in logged.exercises.iter_mut() {
        let achieved = achieved_from_sets(&entry.logged_sets);

        let Some(achieved_weight) = achieved.weight else {
            tracing::debug!(
                "No parseable logged weight for {:?}, skipping",
                entry.name
            );
            outcomes.push(ExerciseOutcome {
                name: entry.name.clone(),
                result: PropagationResult::NoLoggedWeight,
            });
            continue;
        };

        entry.achieved_weight = Some(format_number(achieved_weight));
        entry.achieved_reps = achieved.reps.map(format_number);
        entry.achieved_rir = achieved.rir.map(format_number);
        entry.coach_responsible = Some(saved_by.email.clone());

        let planned = parse_first_number(&entry.weight).unwrap_or(0.0);
        let delta = achieved_weight - planned;
        tracing::debug!(
            "{:?}: planned {} achieved {} delta {}",
            entry.name,
            planned,
            achieved_weight,
            delta
        );

        if delta == 0.0 {
            outcomes.push(ExerciseOutcome {
                name: entry.name.clone(),
                result: PropagationResult::NoDelta,
            });
            continue;
        }

        let (name, circuit, block) = entry.match_key();
        pending.push((
            outcomes.len(),
            (name.to_string(), circuit.to_string(), block.to_string()),
            delta,
        ));
        outcomes.push(ExerciseOutcome {
            name: entry.name.clone(),
            result: PropagationResult::Applied {
                delta,
                weeks_updated: 0,
            },
        });
    }

    // Current week first: achieved values survive even when a later write
    // fails partway through the walk.
    current.days.insert(day, logged);
    store.put(&current)?;

    let mut weeks_updated = 0usize;
    if !pending.is_empty() {
        let futures = store
            .list_for_athlete(&current.athlete)?
            .into_iter()
            .filter(|p| p.week_start > current.week_start)
            .filter(|p| {
                !config.propagation.within_block_only
                    || (current.block_id.is_some() && p.block_id == current.block_id)
            });

        for mut future in futures {
            let mut touched = false;
            if let Some(future_day) = future.days.get_mut(&day) {
                for (outcome_idx, key, delta) in &pending {
                    let mut matched_this_week = false;
                    for ex in future_day.exercises.iter_mut().filter(|ex| {
                        ex.match_key() == (key.0.as_str(), key.1.as_str(), key.2.as_str())
                    }) {
                        let current_weight = parse_first_number(&ex.weight).unwrap_or(0.0);
                        ex.weight = format_number(round2(current_weight + delta));
                        matched_this_week = true;
                        touched = true;
                    }
                    if matched_this_week {
                        if let PropagationResult::Applied { weeks_updated, .. } =
                            &mut outcomes[*outcome_idx].result
                        {
                            *weeks_updated += 1;
                        }
                    }
                }
            }
            if touched {
                store.put(&future)?;
                weeks_updated += 1;
                tracing::debug!(
                    "Propagated deltas into week {} for {}",
                    future.week_start,
                    current.athlete
                );
            }
        }
    }

    let exercises_logged = outcomes
        .iter()
        .filter(|o| o.result != PropagationResult::NoLoggedWeight)
        .count();

    let record = SaveRecord {
        id: Uuid::new_v4(),
        saved_at: Utc::now(),
        athlete: current.athlete.clone(),
        week_start: current.week_start,
        day,
        saved_by: saved_by.email.clone(),
        exercises_logged,
        weeks_updated,
    };
    if let Err(e) = journal.append(&record) {
        tracing::warn!("Failed to journal save {}: {}", record.id, e);
    }

    tracing::info!(
        "Saved day {} of {} for {}: {} exercises logged, {} future weeks updated",
        day,
        current.week_start,
        current.athlete,
        exercises_logged,
        weeks_updated
    );

    Ok(SaveOutcome {
        exercises: outcomes,
        weeks_updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::MemoryJournal;
    use crate::store::MemoryPlanStore;
    use crate::types::{ExerciseEntry, WeekPlan};
    use crate::Role;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn set(reps: &str, weight: &str, rir: &str) -> LoggedSet {
        LoggedSet {
            reps: reps.to_string(),
            weight: weight.to_string(),
            rir: rir.to_string(),
        }
    }

    fn squat(weight: &str) -> ExerciseEntry {
        ExerciseEntry {
            name: "Squat".to_string(),
            circuit: "A".to_string(),
            block: "Work Out".to_string(),
            sets: 3,
            weight: weight.to_string(),
            ..Default::default()
        }
    }

    fn week_with_squat(week_start: NaiveDate, weight: &str, block_id: &str) -> WeekPlan {
        let mut plan = WeekPlan::new("ana@example.com", "coach@example.com", week_start);
        plan.block_id = Some(block_id.to_string());
        plan.days.insert(
            1,
            DayPlan {
                exercises: vec![squat(weight)],
                rpe: None,
                extra: serde_json::Map::new(),
            },
        );
        plan
    }

    fn coach() -> Identity {
        Identity::new("coach@example.com", Role::Coach)
    }

    fn logged_day(weight: &str) -> DayPlan {
        let mut entry = squat("100");
        entry.logged_sets = vec![set("8", weight, "2")];
        DayPlan {
            exercises: vec![entry],
            rpe: Some(8.0),
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_achieved_from_sets_best_of() {
        let sets = vec![
            set("8", "100", "3"),
            set("10", "102,5", "2"),
            set("6", "95kg", "4"),
        ];
        let achieved = achieved_from_sets(&sets);
        assert_eq!(achieved.weight, Some(102.5));
        assert_eq!(achieved.reps, Some(10.0));
        assert_eq!(achieved.rir, Some(2.0));
    }

    #[test]
    fn test_achieved_from_sets_drops_unparsable() {
        let sets = vec![set("8", "heavy", "2"), set("", "100", "")];
        let achieved = achieved_from_sets(&sets);
        assert_eq!(achieved.weight, Some(100.0));
        assert_eq!(achieved.reps, Some(8.0));
        assert_eq!(achieved.rir, Some(2.0));
    }

    #[test]
    fn test_achieved_from_sets_empty() {
        assert_eq!(achieved_from_sets(&[]), Achieved::default());
        let sets = vec![set("", "", "")];
        assert_eq!(achieved_from_sets(&sets), Achieved::default());
    }

    #[test]
    fn test_save_writes_achieved_and_rpe() {
        let mut store = MemoryPlanStore::new();
        let mut journal = MemoryJournal::new();
        store
            .put(&week_with_squat(date(2026, 1, 5), "100", "block-1"))
            .unwrap();

        let outcome = save_logged_day(
            &mut store,
            &mut journal,
            &coach(),
            "ana@example.com",
            date(2026, 1, 5),
            1,
            logged_day("107.5"),
            &Config::default(),
        )
        .unwrap();

        assert_eq!(outcome.exercises.len(), 1);
        let saved = store.get("ana_example_com_2026_01_05").unwrap().unwrap();
        let entry = &saved.days[&1].exercises[0];
        assert_eq!(entry.achieved_weight.as_deref(), Some("107.5"));
        assert_eq!(entry.achieved_reps.as_deref(), Some("8"));
        assert_eq!(entry.achieved_rir.as_deref(), Some("2"));
        assert_eq!(entry.coach_responsible.as_deref(), Some("coach@example.com"));
        assert_eq!(saved.days[&1].rpe, Some(8.0));
    }

    #[test]
    fn test_save_propagates_delta_to_future_weeks() {
        let mut store = MemoryPlanStore::new();
        let mut journal = MemoryJournal::new();
        store
            .put(&week_with_squat(date(2026, 1, 5), "100", "block-1"))
            .unwrap();
        store
            .put(&week_with_squat(date(2026, 1, 12), "100", "block-1"))
            .unwrap();
        store
            .put(&week_with_squat(date(2026, 1, 19), "100", "block-1"))
            .unwrap();

        let outcome = save_logged_day(
            &mut store,
            &mut journal,
            &coach(),
            "ana@example.com",
            date(2026, 1, 5),
            1,
            logged_day("107.5"),
            &Config::default(),
        )
        .unwrap();

        assert_eq!(outcome.weeks_updated, 2);
        assert_eq!(
            outcome.exercises[0].result,
            PropagationResult::Applied {
                delta: 7.5,
                weeks_updated: 2
            }
        );

        let week2 = store.get("ana_example_com_2026_01_12").unwrap().unwrap();
        let week3 = store.get("ana_example_com_2026_01_19").unwrap().unwrap();
        assert_eq!(week2.days[&1].exercises[0].weight, "107.5");
        assert_eq!(week3.days[&1].exercises[0].weight, "107.5");

        // The logged week keeps its planned weight.
        let week1 = store.get("ana_example_com_2026_01_05").unwrap().unwrap();
        assert_eq!(week1.days[&1].exercises[0].weight, "100");
    }

    #[test]
    fn test_save_zero_delta_writes_nothing_forward() {
        let mut store = MemoryPlanStore::new();
        let mut journal = MemoryJournal::new();
        store
            .put(&week_with_squat(date(2026, 1, 5), "100", "block-1"))
            .unwrap();
        store
            .put(&week_with_squat(date(2026, 1, 12), "100", "block-1"))
            .unwrap();

        let outcome = save_logged_day(
            &mut store,
            &mut journal,
            &coach(),
            "ana@example.com",
            date(2026, 1, 5),
            1,
            logged_day("100"),
            &Config::default(),
        )
        .unwrap();

        assert_eq!(outcome.weeks_updated, 0);
        assert_eq!(outcome.exercises[0].result, PropagationResult::NoDelta);

        // Achieved still recorded on the current week.
        let week1 = store.get("ana_example_com_2026_01_05").unwrap().unwrap();
        assert_eq!(
            week1.days[&1].exercises[0].achieved_weight.as_deref(),
            Some("100")
        );
        let week2 = store.get("ana_example_com_2026_01_12").unwrap().unwrap();
        assert_eq!(week2.days[&1].exercises[0].weight, "100");
    }

    #[test]
    fn test_save_no_logged_weight_skips_entirely() {
        let mut store = MemoryPlanStore::new();
        let mut journal = MemoryJournal::new();
        store
            .put(&week_with_squat(date(2026, 1, 5), "100", "block-1"))
            .unwrap();
        store
            .put(&week_with_squat(date(2026, 1, 12), "100", "block-1"))
            .unwrap();

        let mut entry = squat("100");
        entry.logged_sets = vec![set("8", "", ""), set("", "heavy", "")];
        let logged = DayPlan {
            exercises: vec![entry],
            rpe: None,
            extra: serde_json::Map::new(),
        };

        let outcome = save_logged_day(
            &mut store,
            &mut journal,
            &coach(),
            "ana@example.com",
            date(2026, 1, 5),
            1,
            logged,
            &Config::default(),
        )
        .unwrap();

        assert_eq!(
            outcome.exercises[0].result,
            PropagationResult::NoLoggedWeight
        );
        assert_eq!(outcome.weeks_updated, 0);

        let week1 = store.get("ana_example_com_2026_01_05").unwrap().unwrap();
        assert!(week1.days[&1].exercises[0].achieved_weight.is_none());
        assert!(week1.days[&1].exercises[0].coach_responsible.is_none());
    }

    #[test]
    fn test_save_only_matching_exercises_updated() {
        let mut store = MemoryPlanStore::new();
        let mut journal = MemoryJournal::new();
        store
            .put(&week_with_squat(date(2026, 1, 5), "100", "block-1"))
            .unwrap();

        // Future week has the squat in a different circuit plus a bench.
        let mut future = week_with_squat(date(2026, 1, 12), "100", "block-1");
        future.days.get_mut(&1).unwrap().exercises[0].circuit = "B".to_string();
        future.days.get_mut(&1).unwrap().exercises.push(ExerciseEntry {
            name: "Bench".to_string(),
            circuit: "A".to_string(),
            block: "Work Out".to_string(),
            weight: "60".to_string(),
            ..Default::default()
        });
        store.put(&future).unwrap();

        save_logged_day(
            &mut store,
            &mut journal,
            &coach(),
            "ana@example.com",
            date(2026, 1, 5),
            1,
            logged_day("105"),
            &Config::default(),
        )
        .unwrap();

        let week2 = store.get("ana_example_com_2026_01_12").unwrap().unwrap();
        // Circuit mismatch: untouched.
        assert_eq!(week2.days[&1].exercises[0].weight, "100");
        assert_eq!(week2.days[&1].exercises[1].weight, "60");
    }

    #[test]
    fn test_save_crosses_block_boundary_by_default() {
        let mut store = MemoryPlanStore::new();
        let mut journal = MemoryJournal::new();
        store
            .put(&week_with_squat(date(2026, 1, 5), "100", "block-1"))
            .unwrap();
        store
            .put(&week_with_squat(date(2026, 1, 12), "100", "block-2"))
            .unwrap();

        save_logged_day(
            &mut store,
            &mut journal,
            &coach(),
            "ana@example.com",
            date(2026, 1, 5),
            1,
            logged_day("105"),
            &Config::default(),
        )
        .unwrap();

        let week2 = store.get("ana_example_com_2026_01_12").unwrap().unwrap();
        assert_eq!(week2.days[&1].exercises[0].weight, "105");
    }

    #[test]
    fn test_save_within_block_only_stops_at_boundary() {
        let mut store = MemoryPlanStore::new();
        let mut journal = MemoryJournal::new();
        store
            .put(&week_with_squat(date(2026, 1, 5), "100", "block-1"))
            .unwrap();
        store
            .put(&week_with_squat(date(2026, 1, 12), "100", "block-1"))
            .unwrap();
        store
            .put(&week_with_squat(date(2026, 1, 19), "100", "block-2"))
            .unwrap();

        let mut config = Config::default();
        config.propagation.within_block_only = true;

        save_logged_day(
            &mut store,
            &mut journal,
            &coach(),
            "ana@example.com",
            date(2026, 1, 5),
            1,
            logged_day("105"),
            &config,
        )
        .unwrap();

        let week2 = store.get("ana_example_com_2026_01_12").unwrap().unwrap();
        let week3 = store.get("ana_example_com_2026_01_19").unwrap().unwrap();
        assert_eq!(week2.days[&1].exercises[0].weight, "105");
        assert_eq!(week3.days[&1].exercises[0].weight, "100");
    }

    #[test]
    fn test_save_normalizes_week_start() {
        let mut store = MemoryPlanStore::new();
        let mut journal = MemoryJournal::new();
        store
            .put(&week_with_squat(date(2026, 1, 5), "100", "block-1"))
            .unwrap();

        // 2026-01-07 is the Wednesday of the same week.
        let outcome = save_logged_day(
            &mut store,
            &mut journal,
            &coach(),
            "ana@example.com",
            date(2026, 1, 7),
            1,
            logged_day("100"),
            &Config::default(),
        );
        assert!(outcome.is_ok());
    }

    #[test]
    fn test_save_missing_plan_is_an_error() {
        let mut store = MemoryPlanStore::new();
        let mut journal = MemoryJournal::new();
        let result = save_logged_day(
            &mut store,
            &mut journal,
            &coach(),
            "ana@example.com",
            date(2026, 1, 5),
            1,
            logged_day("100"),
            &Config::default(),
        );
        assert!(matches!(result, Err(Error::Plan(_))));
    }

    #[test]
    fn test_save_rejects_unrelated_user() {
        let mut store = MemoryPlanStore::new();
        let mut journal = MemoryJournal::new();
        store
            .put(&week_with_squat(date(2026, 1, 5), "100", "block-1"))
            .unwrap();

        let outsider = Identity::new("other@example.com", Role::Athlete);
        let result = save_logged_day(
            &mut store,
            &mut journal,
            &outsider,
            "ana@example.com",
            date(2026, 1, 5),
            1,
            logged_day("100"),
            &Config::default(),
        );
        assert!(matches!(result, Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_save_appends_journal_record() {
        let mut store = MemoryPlanStore::new();
        let mut journal = MemoryJournal::new();
        store
            .put(&week_with_squat(date(2026, 1, 5), "100", "block-1"))
            .unwrap();
        store
            .put(&week_with_squat(date(2026, 1, 12), "100", "block-1"))
            .unwrap();

        save_logged_day(
            &mut store,
            &mut journal,
            &coach(),
            "ana@example.com",
            date(2026, 1, 5),
            1,
            logged_day("107.5"),
            &Config::default(),
        )
        .unwrap();

        let records = journal.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].athlete, "ana@example.com");
        assert_eq!(records[0].day, 1);
        assert_eq!(records[0].exercises_logged, 1);
        assert_eq!(records[0].weeks_updated, 1);
        assert_eq!(records[0].saved_by, "coach@example.com");
    }
}
