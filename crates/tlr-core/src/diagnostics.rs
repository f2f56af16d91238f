//! Diagnostics infrastructure for tracking recovered errors during a run.
//!
//! Every locally recovered error (dropped hour, discarded draw, degraded
//! result) is counted here and surfaced alongside the result table, so a
//! run that silently lost half its hours is visible to the caller.
//!
//! # Example
//!
//! ```
//! use tlr_core::diagnostics::Diagnostics;
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning("coverage", "hour dropped: 1 station reporting");
//! assert_eq!(diag.warning_count(), 1);
//! ```

use chrono::NaiveDateTime;
use serde::Serialize;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unusual but the run continued (e.g., an hour was dropped)
    Warning,
    /// Could not complete an element (e.g., singular kriging system)
    Error,
}

/// A single diagnostic issue encountered during a run
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    /// Severity of the issue
    pub severity: Severity,
    /// Category for grouping (e.g., "coverage", "interpolation", "solver")
    pub category: String,
    /// Human-readable description of the issue
    pub message: String,
    /// Optional hour the issue refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<NaiveDateTime>,
}

impl DiagnosticIssue {
    pub fn new(severity: Severity, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            hour: None,
        }
    }

    /// Attach the hour the issue refers to
    pub fn with_hour(mut self, hour: NaiveDateTime) -> Self {
        self.hour = Some(hour);
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;
        if let Some(hour) = self.hour {
            write!(f, " at {}", hour)?;
        }
        Ok(())
    }
}

/// Run-level counters and issues, surfaced with the result table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    /// Hours present in the joined station index
    pub hours_seen: usize,
    /// Hours discarded during preprocessing (incomplete across stations)
    pub hours_dropped_incomplete: usize,
    /// Hours dropped for insufficient station coverage
    pub hours_dropped_coverage: usize,
    /// Hours dropped for singular/non-finite kriging systems
    pub hours_dropped_interpolation: usize,
    /// Hours dropped because the current schedule had no entry
    pub hours_dropped_schedule: usize,
    /// Monte Carlo draws attempted
    pub draws_total: u64,
    /// Monte Carlo draws discarded (solver or numeric failure)
    pub draws_discarded: u64,
    /// Results flagged degraded (≥ 1% discarded draws)
    pub results_degraded: usize,
    /// (point, hour) results emitted
    pub results_emitted: usize,
    /// Whether the run was cancelled before completing
    pub cancelled: bool,
    /// All collected issues
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning-level issue
    pub fn add_warning(&mut self, category: impl Into<String>, message: impl Into<String>) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    /// Add an error-level issue
    pub fn add_error(&mut self, category: impl Into<String>, message: impl Into<String>) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message));
    }

    /// Add a warning tied to a specific hour
    pub fn add_warning_for_hour(
        &mut self,
        category: impl Into<String>,
        message: impl Into<String>,
        hour: NaiveDateTime,
    ) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_hour(hour));
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// Total hours dropped for any reason after preprocessing
    pub fn hours_dropped(&self) -> usize {
        self.hours_dropped_coverage + self.hours_dropped_interpolation + self.hours_dropped_schedule
    }

    /// Fraction of draws discarded across the whole run
    pub fn discard_fraction(&self) -> f64 {
        if self.draws_total == 0 {
            0.0
        } else {
            self.draws_discarded as f64 / self.draws_total as f64
        }
    }

    /// Merge counters and issues from another diagnostics instance
    pub fn merge(&mut self, other: Diagnostics) {
        self.hours_seen += other.hours_seen;
        self.hours_dropped_incomplete += other.hours_dropped_incomplete;
        self.hours_dropped_coverage += other.hours_dropped_coverage;
        self.hours_dropped_interpolation += other.hours_dropped_interpolation;
        self.hours_dropped_schedule += other.hours_dropped_schedule;
        self.draws_total += other.draws_total;
        self.draws_discarded += other.draws_discarded;
        self.results_degraded += other.results_degraded;
        self.results_emitted += other.results_emitted;
        self.cancelled |= other.cancelled;
        self.issues.extend(other.issues);
    }

    /// One-line summary for log output
    pub fn summary(&self) -> String {
        format!(
            "{} results ({} degraded), {} hours dropped, {:.2}% draws discarded",
            self.results_emitted,
            self.results_degraded,
            self.hours_dropped(),
            100.0 * self.discard_fraction()
        )
    }
}
