//! Carrying the patched entry directory across a forced branch switch.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// In-memory copy of every file below an entry directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntrySnapshot {
    root: PathBuf,
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl EntrySnapshot {
    /// Read all files below `root`; a missing `root` gives an empty snapshot
    pub fn capture(root: &Path) -> io::Result<Self> {
        let mut files = BTreeMap::new();
        if root.is_dir() {
            for entry in WalkDir::new(root) {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if let Ok(relative) = entry.path().strip_prefix(root) {
                    files.insert(relative.to_path_buf(), std::fs::read(entry.path())?);
                }
            }
        }
        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    /// Number of captured files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing was captured
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Make the directory hold exactly the captured files again
    pub fn restore(&self) -> io::Result<()> {
        if self.root.is_dir() {
            let stale: Vec<PathBuf> = WalkDir::new(&self.root)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| {
                    e.path()
                        .strip_prefix(&self.root)
                        .is_ok_and(|rel| !self.files.contains_key(rel))
                })
                .map(|e| e.into_path())
                .collect();
            for path in stale {
                std::fs::remove_file(path)?;
            }
        }

        for (relative, content) in &self.files {
            let path = self.root.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_round_trips_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("myapp");
        std::fs::create_dir_all(root.join("data")).unwrap();
        std::fs::write(root.join("umbrel-app.yml"), "version: \"2\"\n").unwrap();
        std::fs::write(root.join("data/keep"), "").unwrap();

        let snapshot = EntrySnapshot::capture(&root).unwrap();
        assert_eq!(snapshot.len(), 2);

        // what a forced checkout of an older branch might leave behind
        std::fs::write(root.join("umbrel-app.yml"), "version: \"1\"\n").unwrap();
        std::fs::write(root.join("obsolete.yml"), "x").unwrap();
        std::fs::remove_file(root.join("data/keep")).unwrap();

        snapshot.restore().unwrap();
        assert_eq!(
            std::fs::read_to_string(root.join("umbrel-app.yml")).unwrap(),
            "version: \"2\"\n"
        );
        assert!(root.join("data/keep").exists());
        assert!(!root.join("obsolete.yml").exists());
    }

    #[test]
    fn test_capture_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = EntrySnapshot::capture(&tmp.path().join("absent")).unwrap();
        assert!(snapshot.is_empty());
    }
}
