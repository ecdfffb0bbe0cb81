//! Collaborator invocation.
//!
//! Each collaborator is one external process run to completion with the
//! pipeline root as working directory. Success is the process exit status;
//! stdout and stderr go to the stage's log file.
use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::pipeline::{Artifact, Collaborator, StageId};
use crate::util::truncate_string;
use anyhow::{anyhow, Context, Result};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

const DETAIL_MAX_BYTES: usize = 200;

/// Fully built process invocation for a collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

/// Build the invocation for `collaborator` from the resolved config.
pub fn build_invocation(config: &DriverConfig, collaborator: Collaborator) -> Result<Invocation> {
    let paths = &config.paths;
    let command = config.command(collaborator)?;
    let mut args = command.args.clone();
    let mut envs = vec![
        ("PIPELINE_RUN_ID".to_string(), config.run_id.clone()),
        (
            "PIPELINE_ROOT".to_string(),
            path_to_string(paths.root(), "pipeline root")?,
        ),
    ];

    match collaborator {
        Collaborator::Discovery => {
            args.push("--config".to_string());
            args.push(path_to_string(&paths.manifest_path(), "manifest")?);
            args.push("--output".to_string());
            args.push(path_to_string(&paths.domains_path(), "domain list")?);
            args.push("--provider".to_string());
            args.push(config.provider.as_str().to_string());
            args.push("--max-results".to_string());
            args.push(config.max_results.to_string());
            if config.verbose {
                args.push("--verbose".to_string());
            }
        }
        Collaborator::Enrichment => {
            args.push("--input".to_string());
            args.push(path_to_string(&paths.contacts_path(), "contacts")?);
            args.push("--output".to_string());
            args.push(path_to_string(&paths.enriched_path(), "enriched contacts")?);
            args.push("--provider".to_string());
            args.push(config.enrich_provider.clone());
            args.push("--search-key".to_string());
            args.push(config.search_key.clone());
        }
        Collaborator::Audit => {
            let input = audit_input(config);
            envs.push(("AUDIT_INPUT".to_string(), path_to_string(&input, "audit input")?));
            envs.push((
                "AUDIT_OUTPUT_DIR".to_string(),
                path_to_string(&paths.lighthouse_dir(), "audit output")?,
            ));
            envs.push(("AUDIT_WORKERS".to_string(), config.workers.to_string()));
        }
        Collaborator::Compiler => {
            envs.push((
                "COMPILE_INPUT_DIR".to_string(),
                path_to_string(&paths.lighthouse_dir(), "audit reports")?,
            ));
            envs.push((
                "COMPILE_OUTPUT".to_string(),
                path_to_string(&paths.summary_csv_path(), "summary CSV")?,
            ));
        }
    }

    Ok(Invocation {
        program: command.program.clone(),
        args,
        envs,
    })
}

/// Domain list when present, otherwise the url list derived from contacts.
pub fn audit_input(config: &DriverConfig) -> PathBuf {
    if Artifact::DomainList.is_present(&config.paths) {
        config.paths.domains_path()
    } else {
        config.paths.urls_path()
    }
}

/// Run an invocation to completion for `stage`.
pub fn run_invocation(
    config: &DriverConfig,
    stage: StageId,
    invocation: &Invocation,
) -> Result<(), DriverError> {
    let paths = &config.paths;
    let program = resolve_program(&invocation.program, paths.root()).map_err(|err| {
        DriverError::Spawn {
            stage,
            program: invocation.program.clone(),
            reason: format!("{err:#}"),
            not_found: !program_exists(&invocation.program, paths.root()),
        }
    })?;

    let log_path = paths.stage_log_path(stage.token());
    let (stdout, stderr) = open_log(&log_path).map_err(|source| DriverError::Builtin {
        stage,
        source,
    })?;

    tracing::info!(
        stage = %stage,
        program = %program.display(),
        args = ?invocation.args,
        log = %log_path.display(),
        "spawning collaborator"
    );
    let start = Instant::now();
    let status = Command::new(&program)
        .args(&invocation.args)
        .envs(invocation.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(paths.root())
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .status()
        .map_err(|err| DriverError::Spawn {
            stage,
            program: invocation.program.clone(),
            not_found: err.kind() == ErrorKind::NotFound,
            reason: err.to_string(),
        })?;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        stage = %stage,
        elapsed_ms,
        code = ?status.code(),
        "collaborator finished"
    );

    if status.success() {
        return Ok(());
    }
    Err(DriverError::ExternalProcess {
        stage,
        program: invocation.program.clone(),
        code: status.code(),
        detail: last_log_line(&log_path),
    })
}

fn resolve_program(program: &str, root: &Path) -> Result<PathBuf> {
    which::which_in(program, std::env::var_os("PATH"), root)
        .with_context(|| format!("{program} not found"))
}

/// Whether `program` names an existing file, executable or not.
fn program_exists(program: &str, root: &Path) -> bool {
    let path = Path::new(program);
    if path.is_absolute() || path.components().count() > 1 {
        return root.join(path).is_file();
    }
    std::env::var_os("PATH")
        .is_some_and(|dirs| std::env::split_paths(&dirs).any(|dir| dir.join(path).is_file()))
}

fn open_log(path: &Path) -> Result<(File, File)> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let stdout = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let stderr = stdout
        .try_clone()
        .with_context(|| format!("share {}", path.display()))?;
    Ok((stdout, stderr))
}

/// Last non-empty log line, used as the failure detail.
fn last_log_line(path: &Path) -> String {
    let Ok(bytes) = fs::read(path) else {
        return String::new();
    };
    let text = String::from_utf8_lossy(&bytes);
    let line = text
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    truncate_string(line, DETAIL_MAX_BYTES)
}

fn path_to_string(path: &Path, label: &str) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("{label} path is not valid UTF-8"))
}

#[cfg(test)]
#[path = "external_tests.rs"]
mod tests;
