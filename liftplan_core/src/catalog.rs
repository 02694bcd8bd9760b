//! Exercise catalog: the names and default prescriptions coaches pick from.
//!
//! Catalog lookups are keyed by a normalized form of the name (trimmed,
//! inner whitespace collapsed, lowercased), so "Bench  Press " and
//! "bench press" resolve to the same definition. The first definition
//! registered under a key wins; later duplicates are dropped.

use crate::store::PlanStore;
use crate::types::WeekPlan;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Cached default catalog - built once, shared by every lookup
static DEFAULT_CATALOG: Lazy<ExerciseCatalog> = Lazy::new(build_default_catalog_internal);

/// Borrow the cached default catalog
pub fn get_default_catalog() -> &'static ExerciseCatalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog of common barbell and accessory movements
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns
/// a cached reference. This function is retained for testing and as a seed
/// for coach-specific catalogs.
pub fn build_default_catalog() -> ExerciseCatalog {
    build_default_catalog_internal()
}

/// Canonical lookup key for an exercise name.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One movement a coach can prescribe
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseDefinition {
    /// Display name, in the coach's preferred capitalization.
    pub name: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub default_sets: u32,
    #[serde(default)]
    pub default_reps_min: Option<u32>,
    #[serde(default)]
    pub default_reps_max: Option<u32>,
    /// Starting tempo prescription, empty when unspecified.
    #[serde(default)]
    pub default_tempo: String,
    /// Form video or writeup, if the coach keeps one.
    #[serde(default)]
    pub reference_url: Option<String>,
}

/// A set of exercise definitions with normalized-name lookup
#[derive(Clone, Debug, Default)]
pub struct ExerciseCatalog {
    exercises: HashMap<String, ExerciseDefinition>,
}

impl ExerciseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Returns false (and keeps the existing entry)
    /// when another definition already owns the normalized name.
    pub fn add(&mut self, def: ExerciseDefinition) -> bool {
        let key = normalize_name(&def.name);
        if self.exercises.contains_key(&key) {
            tracing::debug!("Catalog already has an entry for {:?}, keeping the first", key);
            return false;
        }
        self.exercises.insert(key, def);
        true
    }

    pub fn get(&self, name: &str) -> Option<&ExerciseDefinition> {
        self.exercises.get(&normalize_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Display names, alphabetically.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.exercises.values().map(|d| d.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Load a catalog from a JSON array of definitions.
    ///
    /// Duplicate names in the file keep their first definition, same as
    /// repeated [`ExerciseCatalog::add`] calls. A file whose definitions
    /// fail validation is rejected outright.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let defs: Vec<ExerciseDefinition> = serde_json::from_str(&contents)?;

        let mut catalog = ExerciseCatalog::new();
        for def in defs {
            if !catalog.add(def) {
                tracing::warn!("Duplicate exercise definition in {:?}, keeping the first", path);
            }
        }

        let errors = catalog.validate();
        if !errors.is_empty() {
            for error in &errors {
                tracing::error!("Catalog validation: {}", error);
            }
            return Err(Error::CatalogValidation(format!(
                "{} problems in {:?}",
                errors.len(),
                path
            )));
        }

        tracing::info!("Loaded {} exercise definitions from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// Save the catalog as a JSON array of definitions, sorted by name.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut defs: Vec<&ExerciseDefinition> = self.exercises.values().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        std::fs::write(path, serde_json::to_string_pretty(&defs)?)?;
        Ok(())
    }

    /// Validate the catalog for consistency
    ///
    /// Returns human-readable problems, empty when the catalog is consistent.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (key, def) in &self.exercises {
            if key.is_empty() || def.name.trim().is_empty() {
                errors.push("Exercise has empty name".to_string());
            }
            if key != &normalize_name(&def.name) {
                errors.push(format!(
                    "Exercise key '{}' doesn't match its name '{}'",
                    key, def.name
                ));
            }
            if let (Some(lo), Some(hi)) = (def.default_reps_min, def.default_reps_max) {
                if lo > hi {
                    errors.push(format!(
                        "Exercise '{}': default reps {} > max {}",
                        def.name, lo, hi
                    ));
                }
            }
            if let Some(url) = &def.reference_url {
                if url.trim().is_empty() {
                    errors.push(format!("Exercise '{}' has an empty reference URL", def.name));
                }
            }
        }

        errors
    }
}

/// Exercise names used in a plan that the catalog does not know.
///
/// Useful as a sanity check before a plan goes out: typos and one-off
/// names show up here. Names come back normalized, deduplicated, sorted.
pub fn unknown_exercises(plan: &WeekPlan, catalog: &ExerciseCatalog) -> Vec<String> {
    let mut unknown: Vec<String> = plan
        .days
        .values()
        .flat_map(|day| day.exercises.iter())
        .filter(|ex| !ex.name.trim().is_empty() && !catalog.contains(&ex.name))
        .map(|ex| normalize_name(&ex.name))
        .collect();
    unknown.sort_unstable();
    unknown.dedup();
    unknown
}

/// Run the unknown-name check across every plan a coach owns.
pub fn unknown_exercises_for_coach(
    store: &dyn PlanStore,
    catalog: &ExerciseCatalog,
    coach_email: &str,
) -> Result<Vec<String>> {
    let mut unknown = Vec::new();
    for plan in store.list_for_coach(coach_email)? {
        unknown.extend(unknown_exercises(&plan, catalog));
    }
    unknown.sort_unstable();
    unknown.dedup();
    Ok(unknown)
}

/// Builds the definitions the default catalog ships with
fn build_default_catalog_internal() -> ExerciseCatalog {
    let mut catalog = ExerciseCatalog::new();

    // ========================================================================
    // Main lifts
    // ========================================================================

    catalog.add(ExerciseDefinition {
        name: "Back Squat".to_string(),
        tags: vec!["squat".into(), "quads".into(), "barbell".into()],
        default_sets: 3,
        default_reps_min: Some(5),
        default_reps_max: Some(8),
        default_tempo: String::new(),
        reference_url: None,
    });

    catalog.add(ExerciseDefinition {
        name: "Bench Press".to_string(),
        tags: vec!["press".into(), "chest".into(), "barbell".into()],
        default_sets: 3,
        default_reps_min: Some(5),
        default_reps_max: Some(8),
        default_tempo: String::new(),
        reference_url: None,
    });

    catalog.add(ExerciseDefinition {
        name: "Deadlift".to_string(),
        tags: vec!["hinge".into(), "posterior_chain".into(), "barbell".into()],
        default_sets: 3,
        default_reps_min: Some(3),
        default_reps_max: Some(5),
        default_tempo: String::new(),
        reference_url: None,
    });

    catalog.add(ExerciseDefinition {
        name: "Overhead Press".to_string(),
        tags: vec!["press".into(), "shoulders".into(), "barbell".into()],
        default_sets: 3,
        default_reps_min: Some(5),
        default_reps_max: Some(8),
        default_tempo: String::new(),
        reference_url: None,
    });

    // ========================================================================
    // Accessories
    // ========================================================================

    catalog.add(ExerciseDefinition {
        name: "Romanian Deadlift".to_string(),
        tags: vec!["hinge".into(), "hamstrings".into(), "barbell".into()],
        default_sets: 3,
        default_reps_min: Some(8),
        default_reps_max: Some(12),
        default_tempo: "3010".to_string(),
        reference_url: None,
    });

    catalog.add(ExerciseDefinition {
        name: "Barbell Row".to_string(),
        tags: vec!["pull".into(), "back".into(), "barbell".into()],
        default_sets: 3,
        default_reps_min: Some(8),
        default_reps_max: Some(12),
        default_tempo: String::new(),
        reference_url: None,
    });

    catalog.add(ExerciseDefinition {
        name: "Pull-up".to_string(),
        tags: vec!["pull".into(), "back".into(), "bodyweight".into()],
        default_sets: 3,
        default_reps_min: Some(6),
        default_reps_max: Some(10),
        default_tempo: String::new(),
        reference_url: None,
    });

    catalog.add(ExerciseDefinition {
        name: "Hip Thrust".to_string(),
        tags: vec!["hinge".into(), "glutes".into(), "barbell".into()],
        default_sets: 3,
        default_reps_min: Some(8),
        default_reps_max: Some(12),
        default_tempo: "2011".to_string(),
        reference_url: None,
    });

    catalog.add(ExerciseDefinition {
        name: "Walking Lunge".to_string(),
        tags: vec!["lunge".into(), "quads".into(), "unilateral".into()],
        default_sets: 3,
        default_reps_min: Some(10),
        default_reps_max: Some(16),
        default_tempo: String::new(),
        reference_url: None,
    });

    catalog.add(ExerciseDefinition {
        name: "Plank".to_string(),
        tags: vec!["core".into(), "isometric".into(), "bodyweight".into()],
        default_sets: 3,
        default_reps_min: None,
        default_reps_max: None,
        default_tempo: String::new(),
        reference_url: None,
    });

    catalog
}
