//! File-state snapshots.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Content of one file at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub content: String,
    /// SHA256 of path + content
    pub hash: String,
}

impl FileRecord {
    pub fn new(path: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        let hash = compute_content_hash(path, content.as_bytes());
        Self { content, hash }
    }
}

/// Compute a record hash using SHA256 of path + content
pub fn compute_content_hash(relative_path: &str, content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(relative_path.as_bytes());
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Workspace files keyed by relative path (forward slashes), sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSet(BTreeMap<String, FileRecord>);

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a file, returning the previous record.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) -> Option<FileRecord> {
        let path = path.into();
        let record = FileRecord::new(&path, content);
        self.0.insert(path, record)
    }

    pub fn remove(&mut self, path: &str) -> Option<FileRecord> {
        self.0.remove(path)
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.0.get(path)
    }

    pub fn content(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(|r| r.content.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FileRecord)> {
        self.0.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Total bytes of content held.
    pub fn total_bytes(&self) -> usize {
        self.0.values().map(|r| r.content.len()).sum()
    }
}

impl<P: Into<String>, C: Into<String>> FromIterator<(P, C)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut files = FileSet::new();
        for (path, content) in iter {
            files.insert(path, content);
        }
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash() {
        let hash = compute_content_hash("src/main.rs", b"fn main() {}");
        assert_eq!(hash.len(), 64); // SHA256 produces 64 hex characters
        assert_eq!(hash, compute_content_hash("src/main.rs", b"fn main() {}"));
        assert_ne!(hash, compute_content_hash("src/lib.rs", b"fn main() {}"));
    }

    #[test]
    fn test_file_set_operations() {
        let mut files: FileSet = [("b.txt", "two"), ("a.txt", "one")].into_iter().collect();
        assert_eq!(files.len(), 2);
        assert_eq!(files.paths().collect::<Vec<_>>(), vec!["a.txt", "b.txt"]);

        let previous = files.insert("a.txt", "uno").unwrap();
        assert_eq!(previous.content, "one");
        assert_eq!(files.content("a.txt"), Some("uno"));
        assert_ne!(previous.hash, files.get("a.txt").unwrap().hash);

        assert!(files.remove("b.txt").is_some());
        assert!(!files.contains("b.txt"));
        assert_eq!(files.total_bytes(), 3);
    }
}
