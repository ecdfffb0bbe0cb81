//! Typed paths into the pipeline layout.
//!
//! Every stage reads and writes through these helpers so the layout lives in
//! one place and the handoff stamp counts exactly what the stages produce.
use std::path::{Path, PathBuf};

/// File name suffix the audit runner uses for per-target JSON reports.
pub const REPORT_SUFFIX: &str = ".report.json";

/// Convenience wrapper for locating pipeline artifacts under a root.
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    root: PathBuf,
}

impl PipelinePaths {
    /// Create a new path helper rooted at the pipeline root.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Return the pipeline root used for path derivation.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `configs/` directory path.
    pub fn configs_dir(&self) -> PathBuf {
        self.root.join("configs")
    }

    /// Return the `configs/manifest.yaml` discovery manifest path.
    pub fn manifest_path(&self) -> PathBuf {
        self.configs_dir().join("manifest.yaml")
    }

    /// Return the `configs/driver.json` driver config path.
    pub fn driver_config_path(&self) -> PathBuf {
        self.configs_dir().join("driver.json")
    }

    /// Return the `configs/domains.txt` path written by discovery.
    pub fn domains_path(&self) -> PathBuf {
        self.configs_dir().join("domains.txt")
    }

    /// Return the `outputs/` directory path.
    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join("outputs")
    }

    /// Return the `outputs/contacts/` directory path.
    pub fn contacts_dir(&self) -> PathBuf {
        self.outputs_dir().join("contacts")
    }

    /// Return the `outputs/contacts/contacts.csv` path.
    pub fn contacts_path(&self) -> PathBuf {
        self.contacts_dir().join("contacts.csv")
    }

    /// Return the `outputs/contacts/urls.txt` path written by `emails_to_urls`.
    pub fn urls_path(&self) -> PathBuf {
        self.contacts_dir().join("urls.txt")
    }

    /// Return the `outputs/enriched/` directory path.
    pub fn enriched_dir(&self) -> PathBuf {
        self.outputs_dir().join("enriched")
    }

    /// Return the `outputs/enriched/contacts_enriched.csv` path.
    pub fn enriched_path(&self) -> PathBuf {
        self.enriched_dir().join("contacts_enriched.csv")
    }

    /// Return the `outputs/lighthouse/` report directory path.
    pub fn lighthouse_dir(&self) -> PathBuf {
        self.outputs_dir().join("lighthouse")
    }

    /// Return the `outputs/logs/` directory path.
    pub fn logs_dir(&self) -> PathBuf {
        self.outputs_dir().join("logs")
    }

    /// Return the per-stage log path, overwritten on every run of the stage.
    pub fn stage_log_path(&self, stage: &str) -> PathBuf {
        self.logs_dir().join(format!("{stage}.log"))
    }

    /// Return the `outputs/csv/` directory path.
    pub fn csv_dir(&self) -> PathBuf {
        self.outputs_dir().join("csv")
    }

    /// Return the `outputs/csv/results.csv` summary path.
    pub fn summary_csv_path(&self) -> PathBuf {
        self.csv_dir().join("results.csv")
    }

    /// Return the `outputs/reports/` directory path.
    pub fn reports_dir(&self) -> PathBuf {
        self.outputs_dir().join("reports")
    }

    /// Return the `outputs/reports/summary.md` path written by `autodoc`.
    pub fn report_path(&self) -> PathBuf {
        self.reports_dir().join("summary.md")
    }

    /// Return the `outputs/shn_stamp.json` handoff stamp path.
    pub fn stamp_path(&self) -> PathBuf {
        self.outputs_dir().join("shn_stamp.json")
    }

    /// Output directories each owned by one stage family.
    pub fn stage_dirs(&self) -> [PathBuf; 6] {
        [
            self.contacts_dir(),
            self.enriched_dir(),
            self.lighthouse_dir(),
            self.logs_dir(),
            self.csv_dir(),
            self.reports_dir(),
        ]
    }

    /// Convert an absolute path into a root-relative display string.
    pub fn rel_path(&self, path: &Path) -> String {
        crate::util::display_path(path, Some(&self.root))
    }
}
