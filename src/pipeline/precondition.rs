//! Artifacts and the precondition predicates evaluated over them.
//!
//! Predicates only look at the filesystem through [`PipelinePaths`] and are
//! re-evaluated every time a stage is about to run, since an earlier stage in
//! the same run may have produced the input.
use crate::paths::{PipelinePaths, REPORT_SUFFIX};
use crate::util::count_files_with_suffix;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A pipeline artifact that stages consume or produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    Manifest,
    Contacts,
    EnrichedContacts,
    DomainList,
    UrlList,
    AuditReports,
    SummaryCsv,
    Report,
}

impl Artifact {
    /// Filesystem location backing the artifact.
    pub fn path(self, paths: &PipelinePaths) -> PathBuf {
        match self {
            Artifact::Manifest => paths.manifest_path(),
            Artifact::Contacts => paths.contacts_path(),
            Artifact::EnrichedContacts => paths.enriched_path(),
            Artifact::DomainList => paths.domains_path(),
            Artifact::UrlList => paths.urls_path(),
            Artifact::AuditReports => paths.lighthouse_dir(),
            Artifact::SummaryCsv => paths.summary_csv_path(),
            Artifact::Report => paths.report_path(),
        }
    }

    /// Whether the artifact is currently present on disk.
    ///
    /// Audit reports count as present once at least one report file exists.
    pub fn is_present(self, paths: &PipelinePaths) -> bool {
        match self {
            Artifact::AuditReports => {
                count_files_with_suffix(&paths.lighthouse_dir(), REPORT_SUFFIX).unwrap_or(0) > 0
            }
            other => other.path(paths).is_file(),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Artifact::Manifest => "config manifest",
            Artifact::Contacts => "contacts CSV",
            Artifact::EnrichedContacts => "enriched contacts CSV",
            Artifact::DomainList => "domain list",
            Artifact::UrlList => "url list",
            Artifact::AuditReports => "audit reports",
            Artifact::SummaryCsv => "summary CSV",
            Artifact::Report => "summary report",
        };
        f.write_str(label)
    }
}

/// Predicate a stage declares over the current filesystem state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    Always,
    Present(Artifact),
    AnyPresent(&'static [Artifact]),
}

impl Precondition {
    /// Evaluate the predicate, returning the first artifact that is missing.
    ///
    /// For `AnyPresent` the reported artifact is the first alternative, which
    /// is the preferred input.
    pub fn missing(self, paths: &PipelinePaths) -> Option<Artifact> {
        match self {
            Precondition::Always => None,
            Precondition::Present(artifact) => (!artifact.is_present(paths)).then_some(artifact),
            Precondition::AnyPresent(artifacts) => {
                if artifacts.iter().any(|artifact| artifact.is_present(paths)) {
                    None
                } else {
                    artifacts.first().copied()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_paths() -> (tempfile::TempDir, PipelinePaths) {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = PipelinePaths::new(dir.path().to_path_buf());
        (dir, paths)
    }

    fn touch(path: PathBuf) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, "x\n").expect("write");
    }

    #[test]
    fn always_is_met_on_empty_root() {
        let (_dir, paths) = temp_paths();
        assert!(Precondition::Always.missing(&paths).is_none());
    }

    #[test]
    fn present_tracks_filesystem_changes() {
        let (_dir, paths) = temp_paths();
        let check = Precondition::Present(Artifact::Manifest);
        assert_eq!(check.missing(&paths), Some(Artifact::Manifest));
        touch(paths.manifest_path());
        assert!(check.missing(&paths).is_none());
    }

    #[test]
    fn any_present_accepts_fallback_input() {
        let (_dir, paths) = temp_paths();
        let check = Precondition::AnyPresent(&[Artifact::DomainList, Artifact::UrlList]);
        assert_eq!(check.missing(&paths), Some(Artifact::DomainList));
        touch(paths.urls_path());
        assert!(check.missing(&paths).is_none());
    }

    #[test]
    fn audit_reports_require_a_report_file() {
        let (_dir, paths) = temp_paths();
        fs::create_dir_all(paths.lighthouse_dir()).expect("mkdir");
        assert!(!Artifact::AuditReports.is_present(&paths));
        touch(paths.lighthouse_dir().join("example.report.html"));
        assert!(!Artifact::AuditReports.is_present(&paths));
        touch(paths.lighthouse_dir().join("example.report.json"));
        assert!(Artifact::AuditReports.is_present(&paths));
    }
}
