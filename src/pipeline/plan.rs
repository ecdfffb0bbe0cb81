//! Dry-run view of a request: the stages it would run and whether each one's
//! input is currently on disk. Nothing here writes to the filesystem.
use super::precondition::{Artifact, Precondition};
use super::registry::{descriptor, Action, FailurePolicy, OnMissing};
use super::stage::{StageId, StageRequest};
use crate::paths::PipelinePaths;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PlannedStage {
    pub stage: StageId,
    pub alias: usize,
    /// Artifacts the stage needs; any one suffices for `requires_any`.
    pub requires: Vec<Artifact>,
    pub requires_any: bool,
    pub ready: bool,
    pub missing: Option<Artifact>,
    pub on_missing: OnMissing,
    pub failure_policy: FailurePolicy,
    pub action: Action,
}

#[derive(Debug, Clone, Serialize)]
pub struct StagePlan {
    pub requested: String,
    pub root: String,
    pub stages: Vec<PlannedStage>,
}

/// Evaluate every stage of `request` against the current filesystem.
///
/// Later stages are evaluated as things stand now; inputs an earlier stage
/// would produce show up as missing.
pub fn plan(request: StageRequest, paths: &PipelinePaths) -> StagePlan {
    let stages = request
        .stages()
        .into_iter()
        .map(|stage| {
            let entry = descriptor(stage);
            let (requires, requires_any) = match entry.precondition {
                Precondition::Always => (Vec::new(), false),
                Precondition::Present(artifact) => (vec![artifact], false),
                Precondition::AnyPresent(artifacts) => (artifacts.to_vec(), true),
            };
            let missing = entry.precondition.missing(paths);
            PlannedStage {
                stage,
                alias: stage.alias(),
                requires,
                requires_any,
                ready: missing.is_none(),
                missing,
                on_missing: entry.on_missing,
                failure_policy: entry.failure_policy,
                action: entry.action,
            }
        })
        .collect();
    StagePlan {
        requested: request.to_string(),
        root: paths.root().display().to_string(),
        stages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn plan_reports_missing_inputs_without_writing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = PipelinePaths::new(dir.path().to_path_buf());

        let plan = plan(StageRequest::All, &paths);

        assert_eq!(plan.requested, "all");
        assert_eq!(plan.stages.len(), StageId::ALL.len());
        let audit = &plan.stages[StageId::LighthouseAuditLast.alias()];
        assert!(audit.requires_any);
        assert_eq!(audit.missing, Some(Artifact::DomainList));
        assert!(!audit.ready);
        assert!(plan.stages[StageId::Cleanup.alias()].ready);
        assert!(!paths.outputs_dir().exists());
    }

    #[test]
    fn single_stage_plan_sees_present_inputs() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = PipelinePaths::new(dir.path().to_path_buf());
        fs::create_dir_all(paths.configs_dir()).expect("mkdir");
        fs::write(paths.manifest_path(), "queries: []\n").expect("write");

        let plan = plan(StageRequest::Single(StageId::Discover), &paths);

        assert_eq!(plan.stages.len(), 1);
        assert!(plan.stages[0].ready);
        assert_eq!(plan.stages[0].requires, vec![Artifact::Manifest]);
    }
}
