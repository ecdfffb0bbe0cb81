//! Shared test infrastructure for driver integration tests.
//!
//! Each test gets a throwaway pipeline root with collaborators replaced by
//! small `sh` scripts wired in through `configs/driver.json`.
#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Environment variables the driver reads; cleared so the host cannot leak in.
const DRIVER_ENV: [&str; 11] = [
    "DRIVER_PROVIDER",
    "DRIVER_MAX_RESULTS",
    "DRIVER_WORKERS",
    "DRIVER_ENRICH_PROVIDER",
    "DRIVER_SEARCH_KEY",
    "DRIVER_DISCOVER_CMD",
    "DRIVER_ENRICH_CMD",
    "DRIVER_AUDIT_CMD",
    "DRIVER_COMPILE_CMD",
    "DRIVER_LOG",
    "DRIVER_LOG_FORMAT",
];

/// Writes two domains to the `--output` path.
pub const DISCOVER_OK: &str = r#"[ "$3" = "--output" ] || exit 9
printf 'a.com\nwww.B.com\n' > "$4"
"#;

/// Writes a report plus a trace side file per listed target.
pub const AUDIT_OK: &str = r#"for target in $(grep -v '^#' "$AUDIT_INPUT"); do
  slug=$(printf %s "$target" | sed 's#^https://##; s#[^A-Za-z0-9.]#_#g')
  printf '{}' > "$AUDIT_OUTPUT_DIR/$slug.report.json"
  printf '{}' > "$AUDIT_OUTPUT_DIR/$slug.trace.json"
done
echo "audited with $AUDIT_WORKERS workers"
"#;

/// Compiles one CSV row per report file.
pub const COMPILE_OK: &str = r#"echo 'domain,page_url,performance,seo,best_practices,accessibility,lcp_ms,cls,inp_ms' > "$COMPILE_OUTPUT"
for report in "$COMPILE_INPUT_DIR"/*.report.json; do
  [ -e "$report" ] || continue
  domain=$(basename "$report" .report.json)
  echo "$domain,https://$domain,90,80,70,60,1200,0.05,150" >> "$COMPILE_OUTPUT"
done
"#;

/// Copies contacts through unchanged.
pub const ENRICH_OK: &str = r#"cp "$2" "$4"
"#;

pub const FAIL_WITH_3: &str = r#"echo 'provider quota exceeded' >&2
exit 3
"#;

/// Result of one driver invocation.
#[derive(Debug)]
pub struct DriverRun {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// A temporary pipeline root.
pub struct Pipeline {
    dir: TempDir,
    commands: serde_json::Map<String, Value>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp pipeline root"),
            commands: serde_json::Map::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write fixture file");
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Install `script` as the command for a collaborator key.
    pub fn collaborator(mut self, key: &str, script: &str) -> Self {
        let rel = format!("scripts/{key}.sh");
        self.write(&rel, script);
        self.commands
            .insert(key.to_string(), Value::String(format!("sh {rel}")));
        self.write_config();
        self
    }

    /// Point a collaborator at a raw command string.
    pub fn command(mut self, key: &str, command: &str) -> Self {
        self.commands
            .insert(key.to_string(), Value::String(command.to_string()));
        self.write_config();
        self
    }

    fn write_config(&self) {
        let config = json!({
            "schema_version": 1,
            "commands": Value::Object(self.commands.clone()),
        });
        self.write(
            "configs/driver.json",
            &serde_json::to_string_pretty(&config).expect("serialize driver config"),
        );
    }

    /// Every collaborator replaced with a succeeding script.
    pub fn with_working_collaborators() -> Self {
        Self::new()
            .collaborator("discover", DISCOVER_OK)
            .collaborator("enrich", ENRICH_OK)
            .collaborator("audit", AUDIT_OK)
            .collaborator("compile", COMPILE_OK)
    }

    pub fn run(&self, args: &[&str]) -> DriverRun {
        let mut command = Command::new(env!("CARGO_BIN_EXE_driver"));
        command.args(args).arg("--root").arg(self.root());
        for key in DRIVER_ENV {
            command.env_remove(key);
        }
        let output = command.output().expect("spawn driver");
        DriverRun {
            code: output.status.code().expect("driver exited with a code"),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    pub fn stamp(&self) -> Value {
        let text = fs::read_to_string(self.path("outputs/shn_stamp.json")).expect("read stamp");
        serde_json::from_str(&text).expect("parse stamp")
    }

    /// Outcome recorded in the stamp for `stage`, if it ran.
    pub fn stage_outcome(&self, stage: &str) -> Option<Value> {
        self.stamp()["stages"]
            .as_array()
            .expect("stages array")
            .iter()
            .find(|record| record["stage"] == stage)
            .cloned()
    }

    /// Count of `*.report.json` files in the audit output directory.
    pub fn report_files(&self) -> usize {
        let Ok(entries) = fs::read_dir(self.path("outputs/lighthouse")) else {
            return 0;
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".report.json"))
            .count()
    }

    /// Every file under `outputs/`, relative to the root.
    pub fn output_files(&self) -> BTreeSet<String> {
        let mut files = BTreeSet::new();
        collect_files(self.root(), &self.path("outputs"), &mut files);
        files
    }
}

fn collect_files(root: &Path, dir: &Path, files: &mut BTreeSet<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(|entry| entry.ok()) {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, files);
        } else if let Ok(rel) = path.strip_prefix(root) {
            files.insert(rel.display().to_string());
        }
    }
}
