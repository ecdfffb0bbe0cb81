//! Handoff stamp: the JSON record of a run and the artifacts it left behind.
//!
//! The stamp is captured from the filesystem after dispatch, so it reflects
//! what is on disk rather than what stages claimed to produce.
use crate::paths::{PipelinePaths, REPORT_SUFFIX};
use crate::pipeline::{Artifact, PipelineRun, RunStatus, StageRecord};
use crate::util::{count_files_with_suffix, count_list_entries, write_atomic};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::Path;

pub const STAMP_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct HandoffStamp {
    pub schema_version: u32,
    pub run_id: String,
    pub requested: String,
    pub status: RunStatus,
    pub started_at: String,
    pub finished_at: String,
    pub generated_at_epoch_ms: u128,
    pub stages: Vec<StageRecord>,
    pub manifest_present: bool,
    pub contacts_present: bool,
    pub enriched_present: bool,
    pub domains_present: bool,
    pub domains_count: usize,
    pub urls_present: bool,
    pub urls_count: usize,
    pub lh_reports: usize,
    pub summary_csv_present: bool,
    pub report_present: bool,
}

impl HandoffStamp {
    /// Snapshot `run` and the current artifact state under `paths`.
    ///
    /// A count that cannot be read is logged and recorded as zero so the stamp
    /// is still written.
    pub fn capture(run: &PipelineRun, paths: &PipelinePaths, finished_at: DateTime<Utc>) -> Self {
        let domains = paths.domains_path();
        let urls = paths.urls_path();
        let lighthouse = paths.lighthouse_dir();
        Self {
            schema_version: STAMP_SCHEMA_VERSION,
            run_id: run.run_id.clone(),
            requested: run.requested.to_string(),
            status: run.status(),
            started_at: run.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            finished_at: finished_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            generated_at_epoch_ms: finished_at.timestamp_millis().max(0) as u128,
            stages: run.records.clone(),
            manifest_present: Artifact::Manifest.is_present(paths),
            contacts_present: Artifact::Contacts.is_present(paths),
            enriched_present: Artifact::EnrichedContacts.is_present(paths),
            domains_present: Artifact::DomainList.is_present(paths),
            domains_count: or_zero("domains_count", list_count(&domains)),
            urls_present: Artifact::UrlList.is_present(paths),
            urls_count: or_zero("urls_count", list_count(&urls)),
            lh_reports: or_zero(
                "lh_reports",
                count_files_with_suffix(&lighthouse, REPORT_SUFFIX),
            ),
            summary_csv_present: Artifact::SummaryCsv.is_present(paths),
            report_present: Artifact::Report.is_present(paths),
        }
    }
}

fn or_zero(field: &str, count: Result<usize>) -> usize {
    count.unwrap_or_else(|err| {
        tracing::warn!(field, error = %format!("{err:#}"), "stamp count unavailable");
        0
    })
}

fn list_count(path: &Path) -> Result<usize> {
    if path.is_file() {
        count_list_entries(path)
    } else {
        Ok(0)
    }
}

/// Replace `outputs/shn_stamp.json` with `stamp`.
pub fn write_stamp(paths: &PipelinePaths, stamp: &HandoffStamp) -> Result<()> {
    let mut text = serde_json::to_string_pretty(stamp).context("serialize handoff stamp")?;
    text.push('\n');
    write_atomic(&paths.stamp_path(), text.as_bytes())
}

#[cfg(test)]
#[path = "stamp_tests.rs"]
mod tests;
