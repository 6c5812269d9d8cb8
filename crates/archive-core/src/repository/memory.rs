//! In-memory repository driver

use std::collections::{BTreeMap, BTreeSet};

use archive_fs::{ArchivePath, compute_bytes_checksum};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;

use super::{FileInfo, FileReader, Repository};
use crate::catalog::{CatalogEntry, ContentCatalog};
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct StoredFile {
    content: Vec<u8>,
    checksum_sha256: String,
}

impl StoredFile {
    fn new(content: Vec<u8>) -> Self {
        let checksum_sha256 = compute_bytes_checksum(&content);
        Self {
            content,
            checksum_sha256,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<ArchivePath, StoredFile>,
    rejected_writes: BTreeSet<ArchivePath>,
}

/// Repository keeping all content in memory.
///
/// Used as the fixture driver in tests. Supports corrupt entries and write
/// fault injection to exercise integrity and failure handling.
#[derive(Debug)]
pub struct MemoryRepository {
    name: String,
    state: Mutex<State>,
}

impl MemoryRepository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_files(
        name: impl Into<String>,
        files: impl IntoIterator<Item = (ArchivePath, Vec<u8>)>,
    ) -> Self {
        let files = files
            .into_iter()
            .map(|(path, content)| (path, StoredFile::new(content)))
            .collect();
        Self {
            name: name.into(),
            state: Mutex::new(State {
                files,
                rejected_writes: BTreeSet::new(),
            }),
        }
    }

    /// Put content at `path`, replacing whatever was there.
    pub async fn insert(&self, path: ArchivePath, content: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().await;
        state.files.insert(path, StoredFile::new(content.into()));
    }

    /// Put content whose recorded checksum does not match its bytes.
    pub async fn insert_corrupted(
        &self,
        path: ArchivePath,
        content: impl Into<Vec<u8>>,
        recorded_checksum: impl Into<String>,
    ) {
        let mut state = self.state.lock().await;
        state.files.insert(
            path,
            StoredFile {
                content: content.into(),
                checksum_sha256: recorded_checksum.into(),
            },
        );
    }

    /// Make every later `save` to `path` fail with [`Error::WriteRejected`].
    pub async fn fail_writes_to(&self, path: ArchivePath) {
        self.state.lock().await.rejected_writes.insert(path);
    }

    /// Current contents keyed by path
    pub async fn contents(&self) -> BTreeMap<ArchivePath, Vec<u8>> {
        self.state
            .lock()
            .await
            .files
            .iter()
            .map(|(path, file)| (path.clone(), file.content.clone()))
            .collect()
    }

    pub async fn contains(&self, path: &ArchivePath) -> bool {
        self.state.lock().await.files.contains_key(path)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn index(&self) -> Result<ContentCatalog> {
        let state = self.state.lock().await;
        ContentCatalog::new(state.files.iter().map(|(path, file)| {
            CatalogEntry::new(
                path.clone(),
                file.checksum_sha256.clone(),
                file.content.len() as u64,
            )
        }))
    }

    async fn open(&self, path: &ArchivePath) -> Result<(FileInfo, FileReader)> {
        let state = self.state.lock().await;
        let file = state
            .files
            .get(path)
            .ok_or_else(|| Error::NotFound { path: path.clone() })?;

        let info = FileInfo {
            size: file.content.len() as u64,
            checksum_sha256: file.checksum_sha256.clone(),
        };
        let reader: FileReader = Box::new(std::io::Cursor::new(file.content.clone()));
        Ok((info, reader))
    }

    async fn save(&self, path: &ArchivePath, info: &FileInfo, mut reader: FileReader) -> Result<()> {
        {
            let state = self.state.lock().await;
            if state.rejected_writes.contains(path) {
                return Err(Error::WriteRejected {
                    path: path.clone(),
                    reason: "writes to this path are disabled".into(),
                });
            }
            if state.files.contains_key(path) {
                return Err(Error::DestinationOccupied { path: path.clone() });
            }
        }

        let mut content = Vec::with_capacity(info.size as usize);
        reader.read_to_end(&mut content).await?;

        let actual = compute_bytes_checksum(&content);
        if actual != info.checksum_sha256 {
            return Err(Error::ChecksumMismatch {
                path: path.clone(),
                expected: info.checksum_sha256.clone(),
                actual,
            });
        }

        let mut state = self.state.lock().await;
        if state.files.contains_key(path) {
            return Err(Error::DestinationOccupied { path: path.clone() });
        }
        state.files.insert(
            path.clone(),
            StoredFile {
                content,
                checksum_sha256: actual,
            },
        );
        Ok(())
    }

    async fn move_file(&self, from: &ArchivePath, to: &ArchivePath) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.files.contains_key(to) {
            return Err(Error::DestinationOccupied { path: to.clone() });
        }
        let file = state
            .files
            .remove(from)
            .ok_or_else(|| Error::NotFound { path: from.clone() })?;
        state.files.insert(to.clone(), file);
        Ok(())
    }

    async fn delete(&self, path: &ArchivePath) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound { path: path.clone() })
    }

    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> ArchivePath {
        ArchivePath::new(p).unwrap()
    }

    fn repo() -> MemoryRepository {
        MemoryRepository::with_files("test", vec![(path("a.txt"), b"alpha".to_vec())])
    }

    #[tokio::test]
    async fn index_reports_checksum_and_size() {
        let catalog = repo().index().await.unwrap();
        let entry = catalog.get(&path("a.txt")).unwrap();

        assert_eq!(entry.size, 5);
        assert_eq!(entry.checksum_sha256, compute_bytes_checksum(b"alpha"));
    }

    #[tokio::test]
    async fn save_refuses_occupied_destination() {
        let repo = repo();
        let info = FileInfo {
            size: 1,
            checksum_sha256: compute_bytes_checksum(b"b"),
        };
        let err = repo
            .save(&path("a.txt"), &info, Box::new(std::io::Cursor::new(b"b".to_vec())))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DestinationOccupied { .. }));
    }

    #[tokio::test]
    async fn save_verifies_checksum() {
        let repo = repo();
        let info = FileInfo {
            size: 1,
            checksum_sha256: compute_bytes_checksum(b"expected"),
        };
        let err = repo
            .save(&path("b.txt"), &info, Box::new(std::io::Cursor::new(b"b".to_vec())))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ChecksumMismatch { .. }));
        assert!(!repo.contains(&path("b.txt")).await);
    }

    #[tokio::test]
    async fn move_fails_when_destination_exists() {
        let repo = repo();
        repo.insert(path("b.txt"), "beta").await;

        let err = repo.move_file(&path("a.txt"), &path("b.txt")).await.unwrap_err();
        assert!(matches!(err, Error::DestinationOccupied { .. }));
        assert!(repo.contains(&path("a.txt")).await);
    }

    #[tokio::test]
    async fn move_missing_source_is_not_found() {
        let err = repo()
            .move_file(&path("missing"), &path("b.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn rejected_writes_fail() {
        let repo = MemoryRepository::new("empty");
        repo.fail_writes_to(path("x")).await;
        let info = FileInfo {
            size: 1,
            checksum_sha256: compute_bytes_checksum(b"x"),
        };
        let err = repo
            .save(&path("x"), &info, Box::new(std::io::Cursor::new(b"x".to_vec())))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::WriteRejected { .. }));
    }
}
