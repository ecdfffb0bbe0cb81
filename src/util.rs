use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = path.strip_prefix(base) {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}

pub fn truncate_string(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut truncated = String::new();
    for ch in text.chars() {
        if truncated.len() + ch.len_utf8() > max_bytes {
            break;
        }
        truncated.push(ch);
    }
    truncated
}

/// Count entries in a newline-delimited list, ignoring blanks and `#` comments.
///
/// Lists written by providers are not always UTF-8; invalid bytes are replaced.
pub fn count_list_entries(path: &Path) -> Result<usize> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .count())
}

/// Count regular files directly under `dir` whose name ends with `suffix`.
pub fn count_files_with_suffix(dir: &Path, suffix: &str) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut count = 0;
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        if entry.path().is_file() && name.to_string_lossy().ends_with(suffix) {
            count += 1;
        }
    }
    Ok(count)
}

/// Write bytes via a sibling temp file and rename so readers never see a torn file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("create temp file in {}", parent.display()))?;
    std::io::Write::write_all(&mut tmp, bytes)
        .with_context(|| format!("write {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("publish {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_string("héllo", 2), "h");
        assert_eq!(truncate_string("abc", 10), "abc");
    }

    #[test]
    fn list_entries_skip_comments_and_blanks() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("domains.txt");
        fs::write(&path, "# seeds\na.com\n\n  b.com  \n#c.com\n").expect("write list");
        assert_eq!(count_list_entries(&path).expect("count"), 2);
    }

    #[test]
    fn list_entries_tolerate_latin1_bytes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("domains.txt");
        fs::write(&path, b"caf\xe9.com\nb.com\n").expect("write list");
        assert_eq!(count_list_entries(&path).expect("count"), 2);
    }

    #[test]
    fn suffix_count_ignores_other_files_and_dirs() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("a.report.json"), "{}").expect("write");
        fs::write(dir.path().join("a.report.html"), "").expect("write");
        fs::create_dir(dir.path().join("b.report.json")).expect("mkdir");
        assert_eq!(
            count_files_with_suffix(dir.path(), ".report.json").expect("count"),
            1
        );
        assert_eq!(
            count_files_with_suffix(&dir.path().join("missing"), ".report.json").expect("count"),
            0
        );
    }

    #[test]
    fn atomic_write_replaces_previous_content() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("stamp.json");
        write_atomic(&path, b"{\"a\":1,\"b\":2}").expect("first write");
        write_atomic(&path, b"{}").expect("second write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "{}");
        let entries = fs::read_dir(path.parent().expect("parent"))
            .expect("read dir")
            .count();
        assert_eq!(entries, 1);
    }
}
