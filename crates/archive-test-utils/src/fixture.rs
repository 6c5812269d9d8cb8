//! [`FixtureRepoBuilder`] for declaring repository contents in tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use archive_core::{CatalogEntry, ContentCatalog, FilesRepository, MemoryRepository};
use archive_fs::{ArchivePath, compute_bytes_checksum};

/// Parse an archive path, panicking on invalid input.
pub fn path(value: &str) -> ArchivePath {
    ArchivePath::new(value).unwrap_or_else(|e| panic!("invalid fixture path {value:?}: {e}"))
}

/// Declarative repository contents.
///
/// # Example
///
/// ```rust,no_run
/// use archive_test_utils::FixtureRepoBuilder;
///
/// let base = FixtureRepoBuilder::new()
///     .add_stored("A/1.txt")
///     .add_stored_with("A/2.txt", "x")
///     .build_memory("base");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FixtureRepoBuilder {
    files: BTreeMap<ArchivePath, Vec<u8>>,
}

impl FixtureRepoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file whose content is its own path text.
    pub fn add_stored(self, file: &str) -> Self {
        self.add_stored_with(file, file)
    }

    pub fn add_stored_with(mut self, file: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path(file), content.into());
        self
    }

    pub fn contents(&self) -> &BTreeMap<ArchivePath, Vec<u8>> {
        &self.files
    }

    pub fn catalog(&self) -> ContentCatalog {
        ContentCatalog::new(self.files.iter().map(|(path, content)| {
            CatalogEntry::new(
                path.clone(),
                compute_bytes_checksum(content),
                content.len() as u64,
            )
        }))
        .unwrap_or_else(|e| panic!("fixture catalog: {e}"))
    }

    pub fn build_memory(&self, name: &str) -> MemoryRepository {
        MemoryRepository::with_files(name, self.files.clone())
    }

    /// Write the files below `root` and open it as a directory repository.
    ///
    /// # Panics
    /// Panics if the filesystem operations fail.
    pub fn build_dir(&self, root: &Path) -> FilesRepository {
        for (file, content) in &self.files {
            let native = file.to_native(root);
            if let Some(parent) = native.parent() {
                fs::create_dir_all(parent)
                    .unwrap_or_else(|e| panic!("build_dir: failed to create {}: {e}", parent.display()));
            }
            fs::write(&native, content)
                .unwrap_or_else(|e| panic!("build_dir: failed to write {}: {e}", native.display()));
        }
        FilesRepository::init(root).unwrap_or_else(|e| panic!("build_dir: {e}"))
    }
}
