//! Weekly summary emails for a coach's roster.
//!
//! Once the coming week's plans are saved, each athlete gets one email
//! describing their week. Delivery goes through the [`EmailSink`] trait;
//! the shipping implementation is [`OutboxMailer`], which drops rendered
//! messages as JSON files for an external relay to pick up.
//!
//! A failed send never aborts the run. It is logged, counted, and the
//! remaining athletes still get their summaries.

use crate::config::{Config, SummaryConfig};
use crate::numeric::{format_number, is_blank};
use crate::plan::monday_of;
use crate::store::PlanStore;
use crate::types::{ExerciseEntry, WeekPlan};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// One rendered summary email
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmailMessage {
    pub id: Uuid,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Delivery boundary for summary emails
pub trait EmailSink {
    fn send(&mut self, message: &EmailMessage) -> Result<()>;
}

// ============================================================================
// Composition
// ============================================================================

fn reps_text(entry: &ExerciseEntry) -> String {
    match (entry.reps_min, entry.reps_max) {
        (Some(lo), Some(hi)) if lo != hi => format!("{}-{}", lo, hi),
        (Some(lo), _) => lo.to_string(),
        (None, Some(hi)) => hi.to_string(),
        (None, None) => String::new(),
    }
}

/// What the athlete actually hit, when a save recorded it.
fn achieved_text(entry: &ExerciseEntry) -> Option<String> {
    let weight = entry.achieved_weight.as_deref().filter(|s| !is_blank(s));
    let reps = entry.achieved_reps.as_deref().filter(|s| !is_blank(s));
    let rir = entry.achieved_rir.as_deref().filter(|s| !is_blank(s));

    let mut parts = Vec::new();
    match (weight, reps) {
        (Some(w), Some(r)) => parts.push(format!("{} x {}", w, r)),
        (Some(w), None) => parts.push(w.to_string()),
        (None, Some(r)) => parts.push(format!("{} reps", r)),
        (None, None) => {}
    }
    if let Some(rir) = rir {
        parts.push(format!("RIR {}", rir));
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("achieved {}", parts.join(" ")))
    }
}

fn exercise_line(entry: &ExerciseEntry) -> String {
    let mut line = entry.name.trim().to_string();
    if !is_blank(&entry.circuit) {
        line.push_str(&format!(" ({})", entry.circuit.trim()));
    }

    let reps = reps_text(entry);
    let mut details = Vec::new();
    match (entry.sets > 0, reps.is_empty()) {
        (true, false) => details.push(format!("{}x{}", entry.sets, reps)),
        (true, true) => details.push(format!("{} sets", entry.sets)),
        (false, false) => details.push(reps),
        (false, true) => {}
    }
    if !is_blank(&entry.weight) {
        details.push(format!("@ {}", entry.weight.trim()));
    }
    if !is_blank(&entry.rir) {
        details.push(format!("RIR {}", entry.rir.trim()));
    }
    if !is_blank(&entry.tempo) {
        details.push(format!("tempo {}", entry.tempo.trim()));
    }

    if !details.is_empty() {
        line.push_str(": ");
        line.push_str(&details.join(" "));
    }
    if let Some(achieved) = achieved_text(entry) {
        line.push_str(" - ");
        line.push_str(&achieved);
    }
    line
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a plan into one summary email, or `None` when there is nothing
/// to say (no days with exercises).
pub fn compose_summary(plan: &WeekPlan, config: &SummaryConfig) -> Option<EmailMessage> {
    let week = plan.week_start.format("%Y-%m-%d").to_string();

    let mut text = format!("Week of {}\n", week);
    let mut html = format!("<h2>Week of {}</h2>\n", week);
    let mut has_content = false;

    for (day, day_plan) in &plan.days {
        if day_plan.exercises.is_empty() {
            continue;
        }
        has_content = true;

        let heading = match day_plan.rpe {
            Some(rpe) => format!("Day {} - RPE {}", day, format_number(rpe)),
            None => format!("Day {}", day),
        };
        text.push_str(&format!("\n{}\n", heading));
        html.push_str(&format!("<h3>{}</h3>\n<ul>\n", html_escape(&heading)));

        let cap = config.max_exercises_per_day;
        for entry in day_plan.exercises.iter().take(cap) {
            let line = exercise_line(entry);
            text.push_str(&format!("  - {}\n", line));
            html.push_str(&format!("<li>{}</li>\n", html_escape(&line)));
        }
        html.push_str("</ul>\n");

        let hidden = day_plan.exercises.len().saturating_sub(cap);
        if hidden > 0 {
            text.push_str(&format!("  ... and {} more\n", hidden));
            html.push_str(&format!("<p>... and {} more</p>\n", hidden));
        }
    }

    if !has_content {
        return None;
    }

    Some(EmailMessage {
        id: Uuid::new_v4(),
        to: plan.athlete.clone(),
        subject: format!(
            "{} {} - week of {}",
            config.subject_prefix, plan.athlete, week
        ),
        text,
        html,
    })
}

// ============================================================================
// Sending
// ============================================================================

/// Compose and send one summary per athlete on a coach's roster for the
/// given week. Returns `(sent, failed)`.
///
/// `week_start` is normalized to its Monday. Plans with no content are
/// skipped and counted in neither bucket.
pub fn send_weekly_summaries(
    store: &dyn PlanStore,
    mailer: &mut dyn EmailSink,
    coach_email: &str,
    week_start: NaiveDate,
    config: &Config,
) -> Result<(usize, usize)> {
    let week = monday_of(week_start);

    let mut sent = 0;
    let mut failed = 0;
    for plan in store.list_for_coach(coach_email)? {
        if plan.week_start != week {
            continue;
        }
        let Some(message) = compose_summary(&plan, &config.summary) else {
            tracing::debug!("No summary content for {}, skipping", plan.athlete);
            continue;
        };
        match mailer.send(&message) {
            Ok(()) => sent += 1,
            Err(e) => {
                tracing::warn!("Failed to send summary to {}: {}", message.to, e);
                failed += 1;
            }
        }
    }

    tracing::info!(
        "Weekly summaries for {} (week of {}): {} sent, {} failed",
        coach_email,
        week,
        sent,
        failed
    );
    Ok((sent, failed))
}

// ============================================================================
// Sinks
// ============================================================================

/// Mailer that drops each message as a JSON file in an outbox directory.
pub struct OutboxMailer {
    dir: PathBuf,
}

impl OutboxMailer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        OutboxMailer { dir: dir.into() }
    }
}

impl EmailSink for OutboxMailer {
    fn send(&mut self, message: &EmailMessage) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let temp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(message)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;

        let path = self.dir.join(format!("{}.json", message.id));
        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Queued summary for {} at {:?}", message.to, path);
        Ok(())
    }
}

/// Mailer that records messages in memory. Lets tests assert on delivery
/// and simulate refused recipients.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Vec<EmailMessage>,
    rejects: Vec<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `address` fail.
    pub fn reject(&mut self, address: &str) {
        self.rejects.push(address.to_string());
    }
}

impl EmailSink for RecordingMailer {
    fn send(&mut self, message: &EmailMessage) -> Result<()> {
        if self
            .rejects
            .iter()
            .any(|r| r.eq_ignore_ascii_case(&message.to))
        {
            return Err(Error::Other(format!("Delivery to {} refused", message.to)));
        }
        self.sent.push(message.clone());
        Ok(())
    }
}
