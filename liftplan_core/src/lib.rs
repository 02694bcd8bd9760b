#![forbid(unsafe_code)]

//! Core domain model and business logic for the liftplan coaching system.
//!
//! This crate provides:
//! - Domain types (weekly plans, exercise entries, progression rules)
//! - Plan persistence with keyed weekly documents
//! - Logged-session saves with forward weight propagation
//! - Progression rule evaluation
//! - Report aggregation, CSV export and weekly summary emails

pub mod types;
pub mod error;
pub mod numeric;
pub mod plan;
pub mod identity;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod store;
pub mod journal;
pub mod rules;
pub mod propagation;
pub mod reports;
pub mod summary;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, ExerciseCatalog};
pub use config::Config;
pub use export::{export_coach_report, export_rows};
pub use identity::{Identity, Role};
pub use journal::{JsonlJournal, SaveJournal};
pub use propagation::{save_logged_day, SaveOutcome};
pub use reports::{build_report, normalize_day_node, ReportFilter, ReportRow};
pub use store::{FsPlanStore, MemoryPlanStore, PlanStore};
pub use summary::{send_weekly_summaries, EmailSink, OutboxMailer};
