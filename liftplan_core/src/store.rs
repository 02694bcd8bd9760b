//! Plan document persistence.
//!
//! Weekly plan documents live in a store addressed by
//! `{athlete_key}_{YYYY_MM_DD}` keys. The engine only sees the [`PlanStore`]
//! trait; [`FsPlanStore`] is the shipping implementation (one JSON file per
//! document, locked reads, atomic writes) and [`MemoryPlanStore`] backs tests
//! and previews.
//!
//! Reads degrade: a missing document is `None`, an unreadable or unparsable
//! one logs a warning and is treated as absent. Writes fail loudly.

use crate::{plan, Error, Result, WeekPlan};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Document access used by the progression engine
pub trait PlanStore {
    /// Fetch one document by key. Missing documents are `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<WeekPlan>>;

    /// Fetch one document as raw JSON, for readers that handle legacy shapes.
    fn get_raw(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Write one document under its key, replacing any existing version.
    fn put(&mut self, plan: &WeekPlan) -> Result<()>;

    /// Every document for one athlete, sorted by week start.
    ///
    /// Matching uses the normalized athlete key, so any capitalization of
    /// the same email finds the same documents.
    fn list_for_athlete(&self, athlete: &str) -> Result<Vec<WeekPlan>>;

    /// Every document for one coach, sorted by week start then athlete.
    fn list_for_coach(&self, coach_email: &str) -> Result<Vec<WeekPlan>>;

    /// Every raw document for one coach, keyed, in the same order.
    ///
    /// Unlike [`PlanStore::list_for_coach`] this also returns documents whose
    /// shape predates the typed model, so report builders can normalize them.
    fn list_raw_for_coach(&self, coach_email: &str) -> Result<Vec<(String, serde_json::Value)>>;
}

/// A plan without an athlete would produce an unaddressable key.
fn ensure_storable(plan: &WeekPlan) -> Result<()> {
    if plan.athlete.trim().is_empty() {
        return Err(Error::Store(
            "cannot save a plan without an athlete".to_string(),
        ));
    }
    Ok(())
}

/// Coach match against a raw document, honoring the legacy field name.
fn raw_coach_matches(doc: &serde_json::Value, coach_email: &str) -> bool {
    doc.get("coach_email")
        .and_then(serde_json::Value::as_str)
        .or_else(|| doc.get("entrenador").and_then(serde_json::Value::as_str))
        .map(|c| c.eq_ignore_ascii_case(coach_email))
        .unwrap_or(false)
}

fn raw_sort_key(doc: &serde_json::Value) -> (String, String) {
    let week = doc
        .get("week_start")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("")
        .to_string();
    let athlete = doc
        .get("athlete")
        .and_then(serde_json::Value::as_str)
        .or_else(|| doc.get("correo").and_then(serde_json::Value::as_str))
        .unwrap_or("")
        .to_string();
    (week, athlete)
}

// ============================================================================
// Filesystem store
// ============================================================================

/// Plan store backed by one JSON file per document.
pub struct FsPlanStore {
    root: PathBuf,
}

impl FsPlanStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// Documents live under `root/plans/`.
    pub fn open(root: &Path) -> Result<Self> {
        let store = FsPlanStore {
            root: root.to_path_buf(),
        };
        std::fs::create_dir_all(store.plans_dir())?;
        Ok(store)
    }

    fn plans_dir(&self) -> PathBuf {
        self.root.join("plans")
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.plans_dir().join(format!("{}.json", key))
    }

    /// Read a document file with a shared lock.
    ///
    /// Any failure short of a lock poisoning the process logs a warning and
    /// yields `None`; a corrupt document must never take down a save or a
    /// report.
    fn read_value(&self, path: &Path) -> Option<serde_json::Value> {
        if !path.exists() {
            return None;
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open plan document {:?}: {}. Skipping.", path, e);
                return None;
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock plan document {:?}: {}. Skipping.", path, e);
            return None;
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read plan document {:?}: {}. Skipping.", path, e);
            return None;
        }
        let _ = file.unlock();

        match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Failed to parse plan document {:?}: {}. Skipping.", path, e);
                None
            }
        }
    }

    fn read_plan(&self, path: &Path) -> Option<WeekPlan> {
        let value = self.read_value(path)?;
        match serde_json::from_value(value) {
            Ok(plan) => Some(plan),
            Err(e) => {
                tracing::warn!(
                    "Plan document {:?} has an unusable shape: {}. Skipping.",
                    path,
                    e
                );
                None
            }
        }
    }

    fn list_all(&self) -> Result<Vec<WeekPlan>> {
        let dir = self.plans_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut plans = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(plan) = self.read_plan(&path) {
                plans.push(plan);
            }
        }
        Ok(plans)
    }
}

impl PlanStore for FsPlanStore {
    fn get(&self, key: &str) -> Result<Option<WeekPlan>> {
        Ok(self.read_plan(&self.path_for(key)))
    }

    fn get_raw(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.read_value(&self.path_for(key)))
    }

    /// Atomically writes the document by:
    /// 1. Writing to a temp file in the same directory
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    fn put(&mut self, plan: &WeekPlan) -> Result<()> {
        ensure_storable(plan)?;
        let path = self.path_for(&plan.key());
        std::fs::create_dir_all(self.plans_dir())?;

        let temp = NamedTempFile::new_in(self.plans_dir())?;

        // Exclusive lock serializes concurrent writers of the same store.
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(plan)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved plan document {:?}", path);
        Ok(())
    }

    fn list_for_athlete(&self, athlete: &str) -> Result<Vec<WeekPlan>> {
        let wanted = plan::athlete_key(athlete);
        let mut plans: Vec<WeekPlan> = self
            .list_all()?
            .into_iter()
            .filter(|p| plan::athlete_key(&p.athlete) == wanted)
            .collect();
        plans.sort_by_key(|p| p.week_start);
        Ok(plans)
    }

    fn list_for_coach(&self, coach_email: &str) -> Result<Vec<WeekPlan>> {
        let mut plans: Vec<WeekPlan> = self
            .list_all()?
            .into_iter()
            .filter(|p| p.coach_email.eq_ignore_ascii_case(coach_email))
            .collect();
        plans.sort_by(|a, b| {
            a.week_start
                .cmp(&b.week_start)
                .then_with(|| a.athlete.cmp(&b.athlete))
        });
        Ok(plans)
    }

    fn list_raw_for_coach(&self, coach_email: &str) -> Result<Vec<(String, serde_json::Value)>> {
        let dir = self.plans_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut docs = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(value) = self.read_value(&path) else {
                continue;
            };
            if !raw_coach_matches(&value, coach_email) {
                continue;
            }
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            docs.push((key, value));
        }
        docs.sort_by_key(|(_, doc)| raw_sort_key(doc));
        Ok(docs)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Plan store held entirely in memory.
///
/// Used by tests and previews. `insert_raw` plants arbitrary JSON so legacy
/// document shapes can be exercised without a filesystem.
#[derive(Default)]
pub struct MemoryPlanStore {
    docs: BTreeMap<String, serde_json::Value>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plant a raw document under a key, bypassing the typed model.
    pub fn insert_raw(&mut self, key: &str, doc: serde_json::Value) {
        self.docs.insert(key.to_string(), doc);
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn parse(key: &str, value: &serde_json::Value) -> Option<WeekPlan> {
        match serde_json::from_value(value.clone()) {
            Ok(plan) => Some(plan),
            Err(e) => {
                tracing::warn!("Document {:?} has an unusable shape: {}. Skipping.", key, e);
                None
            }
        }
    }
}

impl PlanStore for MemoryPlanStore {
    fn get(&self, key: &str) -> Result<Option<WeekPlan>> {
        Ok(self.docs.get(key).and_then(|v| Self::parse(key, v)))
    }

    fn get_raw(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.docs.get(key).cloned())
    }

    fn put(&mut self, plan: &WeekPlan) -> Result<()> {
        ensure_storable(plan)?;
        self.docs.insert(plan.key(), serde_json::to_value(plan)?);
        Ok(())
    }

    fn list_for_athlete(&self, athlete: &str) -> Result<Vec<WeekPlan>> {
        let wanted = plan::athlete_key(athlete);
        let mut plans: Vec<WeekPlan> = self
            .docs
            .iter()
            .filter_map(|(k, v)| Self::parse(k, v))
            .filter(|p| plan::athlete_key(&p.athlete) == wanted)
            .collect();
        plans.sort_by_key(|p| p.week_start);
        Ok(plans)
    }

    fn list_for_coach(&self, coach_email: &str) -> Result<Vec<WeekPlan>> {
        let mut plans: Vec<WeekPlan> = self
            .docs
            .iter()
            .filter_map(|(k, v)| Self::parse(k, v))
            .filter(|p| p.coach_email.eq_ignore_ascii_case(coach_email))
            .collect();
        plans.sort_by(|a, b| {
            a.week_start
                .cmp(&b.week_start)
                .then_with(|| a.athlete.cmp(&b.athlete))
        });
        Ok(plans)
    }

    fn list_raw_for_coach(&self, coach_email: &str) -> Result<Vec<(String, serde_json::Value)>> {
        let mut docs: Vec<(String, serde_json::Value)> = self
            .docs
            .iter()
            .filter(|(_, v)| raw_coach_matches(v, coach_email))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        docs.sort_by_key(|(_, doc)| raw_sort_key(doc));
        Ok(docs)
    }
}
