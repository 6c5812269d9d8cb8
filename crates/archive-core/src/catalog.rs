//! Content catalogs
//!
//! A [`ContentCatalog`] is the read-only snapshot a repository produces from
//! `index()`: every file with its checksum and size, plus lookup indices by
//! checksum and by path.

use std::collections::BTreeMap;

use archive_fs::ArchivePath;
use serde::Serialize;

use crate::{Error, Result};

/// One file in a catalog
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CatalogEntry {
    pub path: ArchivePath,
    pub checksum_sha256: String,
    pub size: u64,
}

impl CatalogEntry {
    pub fn new(path: ArchivePath, checksum_sha256: impl Into<String>, size: u64) -> Self {
        Self {
            path,
            checksum_sha256: checksum_sha256.into(),
            size,
        }
    }
}

/// Immutable snapshot of a repository's file listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentCatalog {
    /// Entries sorted by path
    entries: Vec<CatalogEntry>,
    by_path: BTreeMap<ArchivePath, usize>,
    by_checksum: BTreeMap<String, Vec<usize>>,
}

impl ContentCatalog {
    /// Build a catalog from entries in any order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicatePath`] if two entries share a path.
    pub fn new(entries: impl IntoIterator<Item = CatalogEntry>) -> Result<Self> {
        let mut entries: Vec<CatalogEntry> = entries.into_iter().collect();
        entries.sort();

        let mut by_path = BTreeMap::new();
        let mut by_checksum: BTreeMap<String, Vec<usize>> = BTreeMap::new();

        for (idx, entry) in entries.iter().enumerate() {
            if by_path.insert(entry.path.clone(), idx).is_some() {
                return Err(Error::DuplicatePath {
                    path: entry.path.clone(),
                });
            }
            by_checksum
                .entry(entry.checksum_sha256.clone())
                .or_default()
                .push(idx);
        }

        Ok(Self {
            entries,
            by_path,
            by_checksum,
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// All entries, sorted by path
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &ArchivePath) -> Option<&CatalogEntry> {
        self.by_path.get(path).map(|&idx| &self.entries[idx])
    }

    pub fn contains_path(&self, path: &ArchivePath) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn contains_checksum(&self, checksum: &str) -> bool {
        self.by_checksum.contains_key(checksum)
    }

    /// Entries holding the given content, sorted by path
    pub fn with_checksum(&self, checksum: &str) -> impl Iterator<Item = &CatalogEntry> {
        self.by_checksum
            .get(checksum)
            .into_iter()
            .flatten()
            .map(|&idx| &self.entries[idx])
    }

    /// Distinct checksums in ascending order
    pub fn checksums(&self) -> impl Iterator<Item = &str> {
        self.by_checksum.keys().map(String::as_str)
    }

    /// Sum of all entry sizes
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, checksum: &str) -> CatalogEntry {
        CatalogEntry::new(ArchivePath::new(path).unwrap(), checksum, 1)
    }

    #[test]
    fn indexes_by_path_and_checksum() {
        let catalog = ContentCatalog::new(vec![
            entry("b.txt", "x"),
            entry("a.txt", "x"),
            entry("c.txt", "y"),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.entries()[0].path.as_str(), "a.txt");

        let dupes: Vec<&str> = catalog.with_checksum("x").map(|e| e.path.as_str()).collect();
        assert_eq!(dupes, vec!["a.txt", "b.txt"]);

        let c = ArchivePath::new("c.txt").unwrap();
        assert_eq!(catalog.get(&c).unwrap().checksum_sha256, "y");
        assert!(!catalog.contains_checksum("z"));
        assert_eq!(catalog.checksums().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn rejects_duplicate_paths() {
        let result = ContentCatalog::new(vec![entry("a.txt", "x"), entry("a.txt", "y")]);
        assert!(matches!(result, Err(Error::DuplicatePath { .. })));
    }

    #[test]
    fn unknown_checksum_yields_nothing() {
        let catalog = ContentCatalog::empty();
        assert_eq!(catalog.with_checksum("x").count(), 0);
        assert!(catalog.is_empty());
        assert_eq!(catalog.total_size(), 0);
    }
}
