//! Directory walking for document ingestion

use crate::error::Result;
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Files larger than this are skipped rather than embedded
const DEFAULT_MAX_FILE_BYTES: u64 = 16 * 1024 * 1024;

/// A candidate document found on disk
#[derive(Debug, Clone)]
pub struct FoundFile {
    pub path: PathBuf,
    /// Path relative to the walk root with `/` separators; used as the file id
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub pattern: String,
    pub follow_symlinks: bool,
    pub include_hidden: bool,
    pub max_file_bytes: u64,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            pattern: "**/*.txt".to_string(),
            follow_symlinks: true,
            include_hidden: false,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Find files under `root` whose relative path matches the pattern, ordered by id
pub fn find_documents(root: &Path, options: &WalkOptions) -> Result<Vec<FoundFile>> {
    let pattern = Pattern::new(&options.pattern)?;

    let walker = WalkDir::new(root)
        .follow_links(options.follow_symlinks)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || options.include_hidden || !is_hidden(e));

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let id = relative.to_string_lossy().replace('\\', "/");
        if !pattern.matches(&id) {
            continue;
        }

        let size = entry.metadata()?.len();
        if size > options.max_file_bytes {
            tracing::warn!(
                "Skipping {}: {} bytes exceeds limit of {}",
                id,
                size,
                options.max_file_bytes
            );
            continue;
        }

        found.push(FoundFile {
            path: entry.into_path(),
            id,
        });
    }

    found.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(found)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let temp = tempfile::TempDir::new().unwrap();
        fs::write(temp.path().join("b.txt"), "b").unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        fs::write(temp.path().join("notes.md"), "md").unwrap();
        fs::create_dir(temp.path().join(".hidden")).unwrap();
        fs::write(temp.path().join(".hidden/c.txt"), "c").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub/d.txt"), "d").unwrap();
        temp
    }

    fn ids(found: &[FoundFile]) -> Vec<&str> {
        found.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_filters_and_sorts() {
        let temp = tree();
        let found = find_documents(temp.path(), &WalkOptions::default()).unwrap();
        assert_eq!(ids(&found), vec!["a.txt", "b.txt", "sub/d.txt"]);
    }

    #[test]
    fn test_hidden_included_on_request() {
        let temp = tree();
        let options = WalkOptions {
            include_hidden: true,
            ..Default::default()
        };
        let found = find_documents(temp.path(), &options).unwrap();
        assert_eq!(ids(&found), vec![".hidden/c.txt", "a.txt", "b.txt", "sub/d.txt"]);
    }

    #[test]
    fn test_oversized_files_skipped() {
        let temp = tree();
        fs::write(temp.path().join("big.txt"), "x".repeat(64)).unwrap();
        let options = WalkOptions {
            max_file_bytes: 8,
            ..Default::default()
        };
        let found = find_documents(temp.path(), &options).unwrap();
        assert!(!ids(&found).contains(&"big.txt"));
        assert!(ids(&found).contains(&"a.txt"));
    }

    #[test]
    fn test_bad_pattern_is_error() {
        let temp = tree();
        let options = WalkOptions {
            pattern: "[".to_string(),
            ..Default::default()
        };
        assert!(find_documents(temp.path(), &options).is_err());
    }
}
