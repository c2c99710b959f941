use super::error::BootstrapError;
use super::unit::Phase;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Session operation succeeded and its transaction committed.
    Committed,
    /// Session operation failed (body or commit) and was rolled back.
    RolledBack,
    /// Standalone operation succeeded.
    Invoked,
    Failed,
    /// Never ran because an earlier failure stopped it.
    Skipped,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Committed => "committed",
            Outcome::RolledBack => "rolled back",
            Outcome::Invoked => "invoked",
            Outcome::Failed => "failed",
            Outcome::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationRecord {
    pub unit: String,
    pub phase: Phase,
    pub operation: String,
    pub outcome: Outcome,
}

/// What one bootstrap run did, operation by operation.
#[derive(Debug)]
pub struct BootstrapReport {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    records: Vec<OperationRecord>,
    failures: Vec<BootstrapError>,
    elapsed: Duration,
}

impl BootstrapReport {
    pub(crate) fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            records: Vec::new(),
            failures: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn record(&mut self, unit: &str, phase: Phase, operation: &str, outcome: Outcome) {
        self.records.push(OperationRecord {
            unit: unit.to_string(),
            phase,
            operation: operation.to_string(),
            outcome,
        });
    }

    pub(crate) fn push_failure(&mut self, error: BootstrapError) {
        self.failures.push(error);
    }

    pub(crate) fn finish(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn records(&self) -> &[OperationRecord] {
        &self.records
    }

    pub fn failures(&self) -> &[BootstrapError] {
        &self.failures
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.records.iter().filter(|r| r.outcome == outcome).count()
    }

    /// True when every operation ran and succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
            && self
                .records
                .iter()
                .all(|r| matches!(r.outcome, Outcome::Committed | Outcome::Invoked))
    }
}

impl fmt::Display for BootstrapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Bootstrap run {} started {} ({} ms)",
            self.run_id(),
            self.started_at().to_rfc3339(),
            self.elapsed.as_millis()
        )?;
        for record in &self.records {
            writeln!(
                f,
                "  {:<6} {:<30} {:<30} {}",
                record.phase.to_string(),
                record.unit,
                record.operation,
                record.outcome
            )?;
        }
        for failure in &self.failures {
            writeln!(f, "  error: {}", failure)?;
        }
        write!(
            f,
            "{} committed, {} invoked, {} rolled back, {} failed, {} skipped",
            self.count(Outcome::Committed),
            self.count(Outcome::Invoked),
            self.count(Outcome::RolledBack),
            self.count(Outcome::Failed),
            self.count(Outcome::Skipped)
        )
    }
}
