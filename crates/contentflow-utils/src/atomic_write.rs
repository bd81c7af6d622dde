//! Atomic file writes for local workflow state
//!
//! Content is written to a temporary file in the target directory, fsynced,
//! then renamed over the target so readers never observe a torn file.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;

use tempfile::NamedTempFile;

/// Atomically write `content` to `path`.
///
/// Parent directories are created as needed. Line endings are normalized to LF.
///
/// # Errors
///
/// Returns an error if the directory cannot be created, the temp file cannot be
/// written or synced, or the final rename fails.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<()> {
    let normalized = normalize_line_endings(content);

    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create parent directory: {parent}"))?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in: {parent}"))?;

    temp_file
        .write_all(normalized.as_bytes())
        .context("Failed to write content to temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .context("Failed to fsync temporary file")?;

    temp_file
        .persist(path.as_std_path())
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to atomically write file: {path}"))?;

    Ok(())
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = utf8_dir(&dir).join("nested/state/workflow.json");

        write_file_atomic(&path, "{}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_write_replaces_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = utf8_dir(&dir).join("state.json");

        write_file_atomic(&path, "first").unwrap();
        write_file_atomic(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_line_endings_normalized() {
        let dir = TempDir::new().unwrap();
        let path = utf8_dir(&dir).join("article.md");

        write_file_atomic(&path, "# Title\r\n\r\nBody\rEnd").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "# Title\n\nBody\nEnd");
    }
}
