//! Stage actions: collaborator processes and in-driver builtins.
//!
//! [`StageRunner`] is the production [`StageExecutor`]; gating and failure
//! policy stay with the dispatcher.
mod cleanup;
mod contacts;
mod csv;
mod external;
mod report;

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::paths::REPORT_SUFFIX;
use crate::pipeline::{Action, Artifact, Builtin, Collaborator, StageDescriptor, StageExecutor};
use crate::util::{count_files_with_suffix, count_list_entries};
use anyhow::Result;

use external::{build_invocation, run_invocation};

/// Executes stage actions against a resolved configuration.
pub struct StageRunner<'a> {
    config: &'a DriverConfig,
}

impl<'a> StageRunner<'a> {
    pub fn new(config: &'a DriverConfig) -> Self {
        Self { config }
    }

    fn run_external(
        &self,
        stage: &StageDescriptor,
        collaborator: Collaborator,
    ) -> Result<String, DriverError> {
        let invocation =
            build_invocation(self.config, collaborator).map_err(|source| DriverError::Builtin {
                stage: stage.id,
                source,
            })?;
        run_invocation(self.config, stage.id, &invocation)?;
        Ok(self.external_summary(collaborator))
    }

    /// One-line summary of what a collaborator left on disk.
    fn external_summary(&self, collaborator: Collaborator) -> String {
        let paths = &self.config.paths;
        match collaborator {
            Collaborator::Discovery => match count_list_entries(&paths.domains_path()) {
                Ok(count) => format!("{count} domains discovered"),
                Err(_) => "discovery finished without a domain list".to_string(),
            },
            Collaborator::Enrichment => {
                if Artifact::EnrichedContacts.is_present(paths) {
                    let enriched = paths.rel_path(&paths.enriched_path());
                    format!("enriched contacts written to {enriched}")
                } else {
                    "enrichment finished without output".to_string()
                }
            }
            Collaborator::Audit => {
                let reports =
                    count_files_with_suffix(&paths.lighthouse_dir(), REPORT_SUFFIX).unwrap_or(0);
                format!("{reports} audit reports on disk")
            }
            Collaborator::Compiler => {
                if Artifact::SummaryCsv.is_present(paths) {
                    format!("summary written to {}", paths.rel_path(&paths.summary_csv_path()))
                } else {
                    "compiler finished without a summary CSV".to_string()
                }
            }
        }
    }

    fn run_builtin(&self, builtin: Builtin) -> Result<String> {
        let paths = &self.config.paths;
        match builtin {
            Builtin::CollectEmails => contacts::collect_emails(paths),
            Builtin::EmailsToUrls => contacts::emails_to_urls(paths),
            Builtin::Autodoc => report::autodoc(paths, &self.config.run_id),
            Builtin::Cleanup => cleanup::cleanup(paths),
        }
    }
}

impl StageExecutor for StageRunner<'_> {
    fn execute(&mut self, stage: &StageDescriptor) -> Result<String, DriverError> {
        match stage.action {
            Action::External(collaborator) => self.run_external(stage, collaborator),
            Action::Builtin(builtin) => {
                self.run_builtin(builtin).map_err(|source| DriverError::Builtin {
                    stage: stage.id,
                    source,
                })
            }
        }
    }
}
