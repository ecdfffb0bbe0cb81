//! Driver error taxonomy and its exit-code mapping.
//!
//! Internal plumbing uses `anyhow`; errors that decide the process exit status
//! are lifted into [`DriverError`] at the dispatcher boundary.
use crate::pipeline::{Artifact, StageId};
use thiserror::Error;

/// Exit status for bad usage (unknown stage token, malformed arguments).
pub const EXIT_USAGE: i32 = 64;
/// Exit status when the audit stage has no input list under `all`.
pub const EXIT_NO_INPUT: i32 = 66;
/// Exit status for an invalid driver configuration.
pub const EXIT_CONFIG: i32 = 78;
/// Exit status when a collaborator exists but cannot be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;
/// Exit status when a collaborator program cannot be found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit status for a collaborator failure whose own status is reserved above.
pub const EXIT_FAILURE: i32 = 1;

/// Collaborator statuses that would be mistaken for a driver-level outcome.
const RESERVED_CODES: [i32; 3] = [EXIT_USAGE, EXIT_NO_INPUT, EXIT_CONFIG];

#[derive(Debug, Error)]
pub enum DriverError {
    /// The stage token (or another argument) was not understood.
    #[error("{0}")]
    Usage(String),

    /// The driver configuration could not be resolved.
    #[error("invalid configuration: {0:#}")]
    Config(anyhow::Error),

    /// A stage's required input artifact is absent.
    #[error("{stage}: required input missing ({artifact})")]
    PreconditionUnmet { stage: StageId, artifact: Artifact },

    /// A collaborator exited unsuccessfully.
    #[error("{stage}: {program} exited with {}{}", describe_code(.code), describe_detail(.detail))]
    ExternalProcess {
        stage: StageId,
        program: String,
        code: Option<i32>,
        detail: String,
    },

    /// A collaborator could not be started.
    #[error("{stage}: cannot run {program}: {reason}")]
    Spawn {
        stage: StageId,
        program: String,
        reason: String,
        not_found: bool,
    },

    /// A built-in stage action failed.
    #[error("{stage}: {source:#}")]
    Builtin {
        stage: StageId,
        source: anyhow::Error,
    },

    /// Output directories could not be prepared.
    #[error("prepare output directories: {0:#}")]
    Setup(anyhow::Error),

    /// The handoff stamp could not be written.
    #[error("write handoff stamp: {0:#}")]
    Stamp(anyhow::Error),
}

impl DriverError {
    /// Map the error to the process exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            DriverError::Usage(_) => EXIT_USAGE,
            DriverError::Config(_) => EXIT_CONFIG,
            DriverError::PreconditionUnmet { .. } => EXIT_NO_INPUT,
            DriverError::ExternalProcess { code, .. } => match code {
                Some(code) if *code != 0 && !RESERVED_CODES.contains(code) => *code,
                _ => EXIT_FAILURE,
            },
            DriverError::Spawn { not_found, .. } => {
                if *not_found {
                    EXIT_NOT_FOUND
                } else {
                    EXIT_NOT_EXECUTABLE
                }
            }
            DriverError::Builtin { .. } | DriverError::Setup(_) | DriverError::Stamp(_) => {
                EXIT_FAILURE
            }
        }
    }

    /// Stage the error is attributed to, when it came from a stage.
    pub fn stage(&self) -> Option<StageId> {
        match self {
            DriverError::PreconditionUnmet { stage, .. }
            | DriverError::ExternalProcess { stage, .. }
            | DriverError::Spawn { stage, .. }
            | DriverError::Builtin { stage, .. } => Some(*stage),
            DriverError::Usage(_)
            | DriverError::Config(_)
            | DriverError::Setup(_)
            | DriverError::Stamp(_) => None,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

fn describe_detail(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {detail}")
    }
}
