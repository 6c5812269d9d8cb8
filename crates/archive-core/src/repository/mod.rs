//! Repository contract and reference drivers

mod files;
mod memory;

pub use files::{FilesRepository, METADATA_DIR};
pub use memory::MemoryRepository;

use archive_fs::ArchivePath;
use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::Result;
use crate::catalog::ContentCatalog;

/// Streaming file content handed between repositories
pub type FileReader = Box<dyn AsyncRead + Send + Unpin>;

/// Metadata accompanying file content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
    pub checksum_sha256: String,
}

/// A storage location holding one copy of the archive.
///
/// Implementations handle their own internal locking. Writes never replace
/// existing files: `save` and `move_file` fail when the destination is
/// occupied.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Snapshot of every file with its checksum and size
    async fn index(&self) -> Result<ContentCatalog>;

    /// Open a file for reading
    async fn open(&self, path: &ArchivePath) -> Result<(FileInfo, FileReader)>;

    /// Store new content at `path`, consuming `reader` to its end
    async fn save(&self, path: &ArchivePath, info: &FileInfo, reader: FileReader) -> Result<()>;

    /// Rename a file inside this repository
    async fn move_file(&self, from: &ArchivePath, to: &ArchivePath) -> Result<()>;

    /// Remove a file. The sync engine never calls this.
    async fn delete(&self, path: &ArchivePath) -> Result<()>;

    /// Human-readable label used in logs and output
    fn describe(&self) -> String;
}
