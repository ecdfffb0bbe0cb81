//! Stage registry, precondition evaluation and dispatch.
//!
//! The stage table is data; the dispatcher is the only place that interprets
//! it, so gating and failure policy stay uniform across stages.
mod dispatch;
mod plan;
mod precondition;
mod registry;
mod stage;

pub use dispatch::{
    dispatch, prepare_output_dirs, Dispatch, PipelineRun, RunStatus, StageExecutor, StageOutcome,
    StageRecord,
};
pub use plan::plan;
pub use precondition::Artifact;
pub use registry::{Action, Builtin, Collaborator, StageDescriptor};
pub use stage::{StageId, StageRequest};
