//! Filesystem collaborator

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Filesystem operations the orchestrator depends on.
///
/// Kept behind a trait so pipelines can be exercised against an in-memory
/// store in tests.
pub trait FileStore: Send + Sync {
    /// Whether a file or directory exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Remove the file or directory tree at `path`
    fn delete(&self, path: &Path) -> io::Result<()>;

    /// Read a text file as an ordered sequence of lines
    fn read_lines(&self, path: &Path) -> io::Result<Vec<String>>;

    /// All descendant files of `path` with the given extension, recursively,
    /// in ascending path order
    fn list_descendants(&self, path: &Path, extension: &str) -> io::Result<Vec<PathBuf>>;
}

/// `FileStore` backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStore;

impl FileStore for LocalFileStore {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }

    fn read_lines(&self, path: &Path) -> io::Result<Vec<String>> {
        let content = fs::read_to_string(path)?;
        Ok(content.lines().map(str::to_string).collect())
    }

    fn list_descendants(&self, path: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(path).follow_links(true) {
            let entry = entry.map_err(io::Error::other)?;
            if entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
            {
                files.push(entry.path().to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn read_lines_preserves_order() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("list.txt");
        fs::write(&file, "first\nsecond\nthird").unwrap();

        let store = LocalFileStore;
        assert_eq!(store.read_lines(&file).unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn list_descendants_is_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        fs::write(dir.path().join("b.sql"), "").unwrap();
        fs::write(dir.path().join("nested/a.sql"), "").unwrap();
        fs::write(dir.path().join("nested/deeper/c.sql"), "").unwrap();
        fs::write(dir.path().join("nested/ignore.txt"), "").unwrap();

        let store = LocalFileStore;
        let found = store.list_descendants(dir.path(), "sql").unwrap();
        assert_eq!(found.len(), 3);
        let mut sorted = found.clone();
        sorted.sort();
        assert_eq!(found, sorted);
    }

    #[test]
    fn delete_removes_directories() {
        let dir = TempDir::new().unwrap();
        let victim = dir.path().join("victim");
        fs::create_dir_all(victim.join("inner")).unwrap();

        let store = LocalFileStore;
        store.delete(&victim).unwrap();
        assert!(!victim.exists());
    }
}
