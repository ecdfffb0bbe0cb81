//! Stage dispatcher.
//!
//! Runs the requested stages in canonical order, gating each on its
//! precondition and applying the registry's failure policy centrally.
use super::precondition::Artifact;
use super::registry::{descriptor, OnMissing, StageDescriptor};
use super::stage::{StageId, StageRequest};
use crate::error::DriverError;
use crate::paths::PipelinePaths;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::time::Instant;

/// Runs one stage's action. The dispatcher owns gating and failure policy.
pub trait StageExecutor {
    /// Execute the stage action and return a one-line summary on success.
    fn execute(&mut self, stage: &StageDescriptor) -> Result<String, DriverError>;
}

/// Result of a single stage within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum StageOutcome {
    Ok { detail: String },
    Skipped { reason: String },
    Failed { error: String, tolerated: bool },
}

#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: StageId,
    #[serde(flatten)]
    pub outcome: StageOutcome,
    pub elapsed_ms: u64,
}

/// Overall state of a run, derived from its stage records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Partial,
    Failed,
}

/// Everything the driver learned while running one request.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub requested: StageRequest,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub records: Vec<StageRecord>,
}

impl PipelineRun {
    pub fn new(requested: StageRequest, run_id: String) -> Self {
        Self {
            requested,
            run_id,
            started_at: Utc::now(),
            records: Vec::new(),
        }
    }

    pub fn status(&self) -> RunStatus {
        let mut status = RunStatus::Ok;
        for record in &self.records {
            if let StageOutcome::Failed { tolerated, .. } = record.outcome {
                if !tolerated {
                    return RunStatus::Failed;
                }
                status = RunStatus::Partial;
            }
        }
        status
    }

    #[cfg(test)]
    pub fn outcome(&self, stage: StageId) -> Option<&StageOutcome> {
        self.records
            .iter()
            .find(|record| record.stage == stage)
            .map(|record| &record.outcome)
    }
}

/// Finished run plus the error that aborted it, if any.
#[derive(Debug)]
pub struct Dispatch {
    pub run: PipelineRun,
    pub abort: Option<DriverError>,
}

/// Create the per-stage output directories. Safe to call repeatedly.
pub fn prepare_output_dirs(paths: &PipelinePaths) -> anyhow::Result<()> {
    for dir in paths.stage_dirs() {
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    }
    Ok(())
}

/// Run `run.requested` to completion or to the first fatal failure.
pub fn dispatch(
    mut run: PipelineRun,
    paths: &PipelinePaths,
    executor: &mut dyn StageExecutor,
) -> Dispatch {
    if let Err(err) = prepare_output_dirs(paths) {
        return Dispatch {
            run,
            abort: Some(DriverError::Setup(err)),
        };
    }

    let in_all = run.requested.is_all();
    for stage in run.requested.stages() {
        let entry = descriptor(stage);
        let start = Instant::now();
        let mut gate_note = None;

        if let Some(artifact) = entry.precondition.missing(paths) {
            let location = paths.rel_path(&artifact.path(paths));
            match entry.on_missing {
                OnMissing::Skip => {
                    announce("warn", stage, &format!("skipped: {artifact} not found ({location})"));
                    push(&mut run, stage, start, skipped(artifact, &location));
                    continue;
                }
                OnMissing::FatalInAll if in_all => {
                    announce("need", stage, &format!("{artifact} not found ({location})"));
                    let err = DriverError::PreconditionUnmet { stage, artifact };
                    push(&mut run, stage, start, failed(&err, false));
                    return Dispatch {
                        run,
                        abort: Some(err),
                    };
                }
                OnMissing::FatalInAll => {
                    announce("need", stage, &format!("skipped: {artifact} not found ({location})"));
                    push(&mut run, stage, start, skipped(artifact, &location));
                    continue;
                }
                OnMissing::WarnAndRun => {
                    announce(
                        "warn",
                        stage,
                        &format!("{artifact} not found ({location}); output will be partial"),
                    );
                    gate_note = Some(format!("partial: {artifact} missing"));
                }
            }
        }

        tracing::info!(stage = %stage, "stage start");
        match executor.execute(entry) {
            Ok(summary) => {
                let detail = match gate_note {
                    Some(note) => format!("{summary} ({note})"),
                    None => summary,
                };
                announce("ok", stage, &detail);
                push(&mut run, stage, start, StageOutcome::Ok { detail });
            }
            Err(err) if entry.failure_policy.aborts(paths) => {
                announce("fail", stage, &err.to_string());
                push(&mut run, stage, start, failed(&err, false));
                return Dispatch {
                    run,
                    abort: Some(err),
                };
            }
            Err(err) => {
                announce("warn", stage, &format!("failed (continuing): {err}"));
                push(&mut run, stage, start, failed(&err, true));
            }
        }
    }

    Dispatch { run, abort: None }
}

fn skipped(artifact: Artifact, location: &str) -> StageOutcome {
    StageOutcome::Skipped {
        reason: format!("{artifact} not found ({location})"),
    }
}

fn failed(err: &DriverError, tolerated: bool) -> StageOutcome {
    StageOutcome::Failed {
        error: err.to_string(),
        tolerated,
    }
}

fn push(run: &mut PipelineRun, stage: StageId, start: Instant, outcome: StageOutcome) {
    let elapsed_ms = start.elapsed().as_millis() as u64;
    tracing::info!(stage = %stage, outcome = ?outcome, elapsed_ms, "stage finished");
    run.records.push(StageRecord {
        stage,
        outcome,
        elapsed_ms,
    });
}

fn announce(tag: &str, stage: StageId, message: &str) {
    eprintln!("[{tag}] {stage}: {message}");
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
