//! Per-stage outcome record of a run.

use crate::cli::RuntimeConfig;
use crate::error::Stage;
use std::fmt;

/// Outcome of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Stage ran and succeeded
    Success,
    /// Stage was not run (flag or dry run)
    Skipped,
    /// Stage failed; the run stopped here
    FatalFailure,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepOutcome::Success => "ok",
            StepOutcome::Skipped => "skipped",
            StepOutcome::FatalFailure => "FAILED",
        })
    }
}

/// One line of the summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    /// Stage
    pub stage: Stage,
    /// What happened
    pub outcome: StepOutcome,
    /// Short description (result, skip reason or error)
    pub detail: String,
}

/// Outcomes of the stages that were reached, in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    records: Vec<StageRecord>,
}

impl RunSummary {
    /// Empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stage outcome
    pub fn record(&mut self, stage: Stage, outcome: StepOutcome, detail: impl Into<String>) {
        self.records.push(StageRecord {
            stage,
            outcome,
            detail: detail.into(),
        });
    }

    /// All records
    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    /// Outcome recorded for `stage`
    pub fn outcome(&self, stage: Stage) -> Option<StepOutcome> {
        self.records
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| r.outcome)
    }

    /// Stage that failed, if any
    pub fn failed_stage(&self) -> Option<Stage> {
        self.records
            .iter()
            .find(|r| r.outcome == StepOutcome::FatalFailure)
            .map(|r| r.stage)
    }

    /// Print the summary table
    pub fn print(&self, runtime: &RuntimeConfig) {
        runtime.section("Summary");
        let width = Stage::ALL.iter().map(|s| s.name().len()).max().unwrap_or(0);
        for record in &self.records {
            let line = format!(
                "{:<width$}  {:<7}  {}",
                record.stage.name(),
                record.outcome.to_string(),
                record.detail
            );
            match record.outcome {
                StepOutcome::Success => runtime.success(&line),
                StepOutcome::Skipped => runtime.indent(&line),
                StepOutcome::FatalFailure => runtime.error_println(&line),
            }
        }
    }
}
