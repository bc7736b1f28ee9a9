use std::fs;
use std::path::Path;

use crate::error::ReleaseError;

/// Replaces `dest` with a copy of `src`. Returns the number of files copied.
pub fn replace_dir(src: &Path, dest: &Path) -> Result<usize, ReleaseError> {
    if dest.exists() {
        fs::remove_dir_all(dest)
            .map_err(|e| ReleaseError::io("Failed to remove directory", dest, e))?;
    }

    copy_dir_recursive(src, dest)
}

pub fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<usize, ReleaseError> {
    fs::create_dir_all(dest).map_err(|e| ReleaseError::io("Failed to create directory", dest, e))?;

    let entries =
        fs::read_dir(src).map_err(|e| ReleaseError::io("Failed to read directory", src, e))?;

    let mut copied = 0;
    for entry in entries {
        let entry = entry.map_err(|e| ReleaseError::io("Failed to read directory", src, e))?;
        let path = entry.path();
        let target = dest.join(entry.file_name());

        if path.is_dir() {
            copied += copy_dir_recursive(&path, &target)?;
        } else {
            fs::copy(&path, &target).map_err(|e| ReleaseError::io("Failed to copy", &path, e))?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_dir_removes_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("data_lite");
        let dest = dir.path().join("data").join("lite");

        fs::create_dir_all(src.join("assets")).unwrap();
        fs::write(src.join("index.html"), "<html></html>").unwrap();
        fs::write(src.join("assets").join("app.js.gz"), "js").unwrap();

        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.css"), "old").unwrap();

        let copied = replace_dir(&src, &dest).unwrap();

        assert_eq!(copied, 2);
        assert!(!dest.join("stale.css").exists());
        assert_eq!(fs::read_to_string(dest.join("index.html")).unwrap(), "<html></html>");
        assert_eq!(
            fs::read_to_string(dest.join("assets").join("app.js.gz")).unwrap(),
            "js"
        );
    }

    #[test]
    fn test_replace_dir_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("staging");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();

        let dest = dir.path().join("x").join("y");
        replace_dir(&src, &dest).unwrap();
        assert!(dest.join("a.txt").exists());
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = copy_dir_recursive(&dir.path().join("absent"), &dir.path().join("dest"));
        assert!(matches!(result, Err(ReleaseError::Io { .. })));
    }
}
