//! CSV export of report rows.
//!
//! Exports append, so a coach can accumulate a season of logged sets in one
//! file. Headers are written only when the file is new or empty; an export
//! of zero rows still produces the header line so downstream tooling sees
//! the schema.

use crate::reports::{build_report, ReportFilter, ReportRow};
use crate::store::PlanStore;
use crate::Result;
use std::fs::OpenOptions;
use std::path::Path;

const HEADERS: [&str; 9] = [
    "athlete",
    "day",
    "exercise",
    "set_index",
    "reps",
    "weight",
    "rir",
    "comment",
    "rpe",
];

/// Append report rows to a CSV file, creating it (with headers) if needed.
///
/// Returns the number of rows written.
pub fn export_rows(rows: &[ReportRow], csv_path: &Path) -> Result<usize> {
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Checking size after opening avoids an extra stat() syscall.
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    // serialize() only emits headers alongside a first row, so an empty
    // export writes them explicitly.
    if rows.is_empty() && needs_headers {
        writer.write_record(HEADERS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Wrote {} report rows to {:?}", rows.len(), csv_path);
    Ok(rows.len())
}

/// Build a coach's report and append it to a CSV file in one step.
pub fn export_coach_report(
    store: &dyn PlanStore,
    coach_email: &str,
    filter: &ReportFilter,
    csv_path: &Path,
) -> Result<usize> {
    let rows = build_report(store, coach_email, filter)?;
    export_rows(&rows, csv_path)
}
