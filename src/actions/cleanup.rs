//! `cleanup`: remove transient audit artifacts under `outputs/`.
use crate::paths::PipelinePaths;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Suffixes of Lighthouse side files that are never consumed downstream.
const TRANSIENT_SUFFIXES: [&str; 2] = [".trace.json", ".devtoolslog.json"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CleanupCounts {
    files: usize,
    dirs: usize,
}

/// Remove transient files and empty non-canonical directories.
pub fn cleanup(paths: &PipelinePaths) -> Result<String> {
    let outputs = paths.outputs_dir();
    let mut counts = CleanupCounts::default();
    if outputs.is_dir() {
        sweep(paths, &outputs, &mut counts)?;
    }
    Ok(format!(
        "removed {} transient files and {} empty directories",
        counts.files, counts.dirs
    ))
}

fn sweep(paths: &PipelinePaths, dir: &Path, counts: &mut CleanupCounts) -> Result<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read {}", dir.display()))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("stat {}", path.display()))?;
        if file_type.is_dir() {
            sweep(paths, &path, counts)?;
            if !is_canonical_dir(paths, &path) && is_empty_dir(&path)? {
                fs::remove_dir(&path).with_context(|| format!("remove {}", path.display()))?;
                tracing::debug!(path = %path.display(), "removed empty directory");
                counts.dirs += 1;
            }
        } else if file_type.is_file() && is_transient(&entry.file_name().to_string_lossy()) {
            fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
            tracing::debug!(path = %path.display(), "removed transient file");
            counts.files += 1;
        }
    }
    Ok(())
}

fn is_transient(name: &str) -> bool {
    if TRANSIENT_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        return true;
    }
    // `.tmpXXXXXX` is what an interrupted atomic write leaves behind.
    name.starts_with(".tmp") || (name.starts_with('.') && name.ends_with(".tmp"))
}

fn is_canonical_dir(paths: &PipelinePaths, dir: &Path) -> bool {
    paths.stage_dirs().iter().any(|canonical| canonical == dir)
}

fn is_empty_dir(dir: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))?;
    Ok(entries.next().is_none())
}
