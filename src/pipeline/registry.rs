//! Declarative stage table.
//!
//! Preconditions and failure policy for every stage live here so the
//! dispatcher can apply them uniformly and the policy is auditable in one place.
use super::precondition::{Artifact, Precondition};
use super::stage::StageId;
use crate::paths::PipelinePaths;
use serde::Serialize;

/// What happens when a stage's precondition is unmet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnMissing {
    /// Skip the stage with a warning.
    Skip,
    /// Warn, then run the action anyway (it produces partial output).
    WarnAndRun,
    /// Abort under `all`; skip with a warning for a single-stage request.
    FatalInAll,
}

/// How a failed action affects the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "unless")]
pub enum FailurePolicy {
    /// Mandatory stage: abort the run.
    Abort,
    /// Optional stage: log and continue.
    Continue,
    /// Mandatory only while the named artifact is absent.
    AbortUnless(Artifact),
}

impl FailurePolicy {
    /// Decide, at failure time, whether the failure aborts the run.
    pub fn aborts(self, paths: &PipelinePaths) -> bool {
        match self {
            FailurePolicy::Abort => true,
            FailurePolicy::Continue => false,
            FailurePolicy::AbortUnless(fallback) => !fallback.is_present(paths),
        }
    }
}

/// External programs the driver hands stages off to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    Discovery,
    Enrichment,
    Audit,
    Compiler,
}

impl Collaborator {
    pub const ALL: [Collaborator; 4] = [
        Collaborator::Discovery,
        Collaborator::Enrichment,
        Collaborator::Audit,
        Collaborator::Compiler,
    ];

    /// Key used in `configs/driver.json` and `DRIVER_<KEY>_CMD`.
    pub fn key(self) -> &'static str {
        match self {
            Collaborator::Discovery => "discover",
            Collaborator::Enrichment => "enrich",
            Collaborator::Audit => "audit",
            Collaborator::Compiler => "compile",
        }
    }
}

/// Actions implemented inside the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Builtin {
    CollectEmails,
    EmailsToUrls,
    Autodoc,
    Cleanup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum Action {
    External(Collaborator),
    Builtin(Builtin),
}

/// Immutable description of one stage.
#[derive(Debug, Clone, Copy)]
pub struct StageDescriptor {
    pub id: StageId,
    pub precondition: Precondition,
    pub on_missing: OnMissing,
    pub failure_policy: FailurePolicy,
    pub action: Action,
}

const AUDIT_INPUTS: &[Artifact] = &[Artifact::DomainList, Artifact::UrlList];

/// The stage table, in canonical order.
pub static REGISTRY: [StageDescriptor; 8] = [
    StageDescriptor {
        id: StageId::Discover,
        precondition: Precondition::Present(Artifact::Manifest),
        on_missing: OnMissing::Skip,
        failure_policy: FailurePolicy::AbortUnless(Artifact::Contacts),
        action: Action::External(Collaborator::Discovery),
    },
    StageDescriptor {
        id: StageId::CollectEmails,
        precondition: Precondition::Present(Artifact::Contacts),
        on_missing: OnMissing::Skip,
        failure_policy: FailurePolicy::Continue,
        action: Action::Builtin(Builtin::CollectEmails),
    },
    StageDescriptor {
        id: StageId::EmailsToUrls,
        precondition: Precondition::Always,
        on_missing: OnMissing::Skip,
        failure_policy: FailurePolicy::Continue,
        action: Action::Builtin(Builtin::EmailsToUrls),
    },
    StageDescriptor {
        id: StageId::EnrichContacts,
        precondition: Precondition::Present(Artifact::Contacts),
        on_missing: OnMissing::Skip,
        failure_policy: FailurePolicy::Continue,
        action: Action::External(Collaborator::Enrichment),
    },
    StageDescriptor {
        id: StageId::LighthouseAuditLast,
        precondition: Precondition::AnyPresent(AUDIT_INPUTS),
        on_missing: OnMissing::FatalInAll,
        failure_policy: FailurePolicy::Abort,
        action: Action::External(Collaborator::Audit),
    },
    StageDescriptor {
        id: StageId::CwvAnalyze,
        precondition: Precondition::Present(Artifact::AuditReports),
        on_missing: OnMissing::WarnAndRun,
        failure_policy: FailurePolicy::Abort,
        action: Action::External(Collaborator::Compiler),
    },
    StageDescriptor {
        id: StageId::Autodoc,
        precondition: Precondition::Present(Artifact::SummaryCsv),
        on_missing: OnMissing::Skip,
        failure_policy: FailurePolicy::Continue,
        action: Action::Builtin(Builtin::Autodoc),
    },
    StageDescriptor {
        id: StageId::Cleanup,
        precondition: Precondition::Always,
        on_missing: OnMissing::Skip,
        failure_policy: FailurePolicy::Continue,
        action: Action::Builtin(Builtin::Cleanup),
    },
];

/// Look up the descriptor for a stage.
pub fn descriptor(stage: StageId) -> &'static StageDescriptor {
    &REGISTRY[stage.alias()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_matches_canonical_order() {
        for (index, entry) in REGISTRY.iter().enumerate() {
            assert_eq!(entry.id, StageId::ALL[index]);
            assert_eq!(descriptor(entry.id).id, entry.id);
        }
    }

    #[test]
    fn mandatory_stages_are_discover_audit_and_compile() {
        let mandatory: Vec<StageId> = REGISTRY
            .iter()
            .filter(|entry| !matches!(entry.failure_policy, FailurePolicy::Continue))
            .map(|entry| entry.id)
            .collect();
        assert_eq!(
            mandatory,
            vec![
                StageId::Discover,
                StageId::LighthouseAuditLast,
                StageId::CwvAnalyze
            ]
        );
    }

    #[test]
    fn discover_failure_is_tolerated_once_contacts_exist() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = PipelinePaths::new(dir.path().to_path_buf());
        let policy = descriptor(StageId::Discover).failure_policy;
        assert!(policy.aborts(&paths));
        std::fs::create_dir_all(paths.contacts_dir()).expect("mkdir");
        std::fs::write(paths.contacts_path(), "email\n").expect("write");
        assert!(!policy.aborts(&paths));
    }
}
