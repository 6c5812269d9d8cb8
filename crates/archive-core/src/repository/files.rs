//! Local directory repository driver
//!
//! Files live directly under the root directory. Metadata lives in
//! `.archive/` next to them:
//!
//! ```text
//! <root>/.archive/checksums/<path>.sha256   checksum sidecars
//! <root>/.archive/staging/                  in-flight writes
//! <root>/.archive/lock                      commit lock
//! ```
//!
//! Writes stream into the staging area and are committed with a create-new
//! rename while holding the exclusive lock.

use std::fs;
use std::path::{Path, PathBuf};

use archive_fs::io::{self, LockGuard};
use archive_fs::{ArchivePath, compute_file_checksum, is_valid_checksum};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{FileInfo, FileReader, Repository};
use crate::catalog::{CatalogEntry, ContentCatalog};
use crate::{Error, Result};

/// Name of the metadata directory inside a repository root
pub const METADATA_DIR: &str = ".archive";

const CHECKSUMS_DIR: &str = "checksums";
const STAGING_DIR: &str = "staging";
const LOCK_FILE: &str = "lock";
const SIDECAR_EXTENSION: &str = ".sha256";
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Repository backed by a plain local directory
#[derive(Debug, Clone)]
pub struct FilesRepository {
    root: PathBuf,
}

impl FilesRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open `root`, creating the metadata directory if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a directory or the metadata
    /// directory cannot be created.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let repo = Self::new(root);
        if !repo.root.is_dir() {
            return Err(archive_fs::Error::io(
                &repo.root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "repository root is not a directory"),
            )
            .into());
        }
        let metadata = repo.metadata_dir();
        fs::create_dir_all(&metadata).map_err(|e| archive_fs::Error::io(&metadata, e))?;
        Ok(repo)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR)
    }

    fn layout(&self) -> Layout {
        Layout {
            root: self.root.clone(),
            metadata: self.metadata_dir(),
        }
    }
}

/// Owned copy of the directory layout for use on blocking threads
#[derive(Debug, Clone)]
struct Layout {
    root: PathBuf,
    metadata: PathBuf,
}

impl Layout {
    fn checksums_root(&self) -> PathBuf {
        self.metadata.join(CHECKSUMS_DIR)
    }

    fn sidecar(&self, path: &ArchivePath) -> PathBuf {
        let mut sidecar = path.to_native(&self.checksums_root()).into_os_string();
        sidecar.push(SIDECAR_EXTENSION);
        PathBuf::from(sidecar)
    }

    fn lock(&self) -> Result<LockGuard> {
        Ok(LockGuard::acquire(&self.metadata.join(LOCK_FILE))?)
    }

    /// Checksum recorded in the sidecar, if it is present and not older than the file.
    fn recorded_checksum(&self, path: &ArchivePath, file: &fs::Metadata) -> Option<String> {
        let sidecar = self.sidecar(path);
        let sidecar_meta = fs::metadata(&sidecar).ok()?;
        if let (Ok(recorded_at), Ok(modified_at)) = (sidecar_meta.modified(), file.modified())
            && recorded_at < modified_at
        {
            tracing::debug!("Ignoring stale checksum sidecar for {}", path);
            return None;
        }

        let value = io::read_text(&sidecar).ok()?;
        let value = value.trim();
        is_valid_checksum(value).then(|| value.to_string())
    }

    fn checksum_of(&self, path: &ArchivePath, native: &Path, meta: &fs::Metadata) -> Result<String> {
        match self.recorded_checksum(path, meta) {
            Some(checksum) => Ok(checksum),
            None => Ok(compute_file_checksum(native)?),
        }
    }

    fn scan(&self) -> Result<ContentCatalog> {
        let mut entries = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let listing = fs::read_dir(&dir).map_err(|e| archive_fs::Error::io(&dir, e))?;
            for item in listing {
                let item = item.map_err(|e| archive_fs::Error::io(&dir, e))?;
                let native = item.path();
                if dir == self.root && item.file_name() == METADATA_DIR {
                    continue;
                }

                let file_type = item
                    .file_type()
                    .map_err(|e| archive_fs::Error::io(&native, e))?;
                if file_type.is_dir() {
                    pending.push(native);
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }

                let relative = native.strip_prefix(&self.root).unwrap_or(&native);
                let path = match ArchivePath::from_relative(relative) {
                    Ok(path) => path,
                    Err(e) => {
                        tracing::warn!("Skipping {}: {}", native.display(), e);
                        continue;
                    }
                };
                let meta = item
                    .metadata()
                    .map_err(|e| archive_fs::Error::io(&native, e))?;
                let checksum = self.checksum_of(&path, &native, &meta)?;
                entries.push(CatalogEntry::new(path, checksum, meta.len()));
            }
        }

        tracing::debug!("Indexed {} files under {}", entries.len(), self.root.display());
        ContentCatalog::new(entries)
    }

    fn describe_file(&self, path: &ArchivePath) -> Result<FileInfo> {
        let native = path.to_native(&self.root);
        let meta = match fs::metadata(&native) {
            Ok(meta) if meta.is_file() => meta,
            _ => return Err(Error::NotFound { path: path.clone() }),
        };
        Ok(FileInfo {
            size: meta.len(),
            checksum_sha256: self.checksum_of(path, &native, &meta)?,
        })
    }

    fn commit(&self, staging: &Path, path: &ArchivePath, checksum: &str) -> Result<()> {
        let _lock = self.lock()?;
        let dest = path.to_native(&self.root);

        if let Err(e) = io::rename_new(staging, &dest) {
            let _ = fs::remove_file(staging);
            return Err(match e {
                archive_fs::Error::AlreadyExists { .. } => {
                    Error::DestinationOccupied { path: path.clone() }
                }
                other => other.into(),
            });
        }

        io::write_atomic(&self.sidecar(path), checksum.as_bytes())?;
        Ok(())
    }

    fn relocate(&self, from: &ArchivePath, to: &ArchivePath) -> Result<()> {
        let _lock = self.lock()?;
        let source = from.to_native(&self.root);
        let dest = to.to_native(&self.root);

        if !source.is_file() {
            return Err(Error::NotFound { path: from.clone() });
        }
        if dest.exists() {
            return Err(Error::DestinationOccupied { path: to.clone() });
        }

        io::rename_new(&source, &dest)?;

        let source_sidecar = self.sidecar(from);
        let dest_sidecar = self.sidecar(to);
        if source_sidecar.exists() {
            io::ensure_parent(&dest_sidecar)?;
            fs::rename(&source_sidecar, &dest_sidecar)
                .map_err(|e| archive_fs::Error::io(&dest_sidecar, e))?;
            io::prune_empty_parents(&source_sidecar, &self.checksums_root());
        } else if dest_sidecar.exists() {
            fs::remove_file(&dest_sidecar).map_err(|e| archive_fs::Error::io(&dest_sidecar, e))?;
        }

        io::prune_empty_parents(&source, &self.root);
        Ok(())
    }

    fn remove(&self, path: &ArchivePath) -> Result<()> {
        let _lock = self.lock()?;
        let native = path.to_native(&self.root);
        if !native.is_file() {
            return Err(Error::NotFound { path: path.clone() });
        }

        fs::remove_file(&native).map_err(|e| archive_fs::Error::io(&native, e))?;
        let sidecar = self.sidecar(path);
        if sidecar.exists() {
            fs::remove_file(&sidecar).map_err(|e| archive_fs::Error::io(&sidecar, e))?;
            io::prune_empty_parents(&sidecar, &self.checksums_root());
        }
        io::prune_empty_parents(&native, &self.root);
        Ok(())
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Stream `reader` into `staging`, returning the checksum of what was written.
async fn stage(staging: &Path, reader: &mut FileReader) -> Result<String> {
    let mut file = tokio::fs::File::create(staging)
        .await
        .map_err(|e| archive_fs::Error::io(staging, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        file.write_all(&buffer[..read])
            .await
            .map_err(|e| archive_fs::Error::io(staging, e))?;
    }

    file.sync_all()
        .await
        .map_err(|e| archive_fs::Error::io(staging, e))?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[async_trait]
impl Repository for FilesRepository {
    async fn index(&self) -> Result<ContentCatalog> {
        let layout = self.layout();
        blocking(move || layout.scan()).await
    }

    async fn open(&self, path: &ArchivePath) -> Result<(FileInfo, FileReader)> {
        let layout = self.layout();
        let target = path.clone();
        let info = blocking(move || layout.describe_file(&target)).await?;

        let native = path.to_native(&self.root);
        let file = tokio::fs::File::open(&native)
            .await
            .map_err(|e| archive_fs::Error::io(&native, e))?;
        let reader: FileReader = Box::new(file);
        Ok((info, reader))
    }

    async fn save(&self, path: &ArchivePath, info: &FileInfo, mut reader: FileReader) -> Result<()> {
        if path.to_native(&self.root).exists() {
            return Err(Error::DestinationOccupied { path: path.clone() });
        }

        let staging = self
            .metadata_dir()
            .join(STAGING_DIR)
            .join(format!("{}.part", uuid::Uuid::new_v4()));
        io::ensure_parent(&staging)?;

        let actual = match stage(&staging, &mut reader).await {
            Ok(actual) => actual,
            Err(e) => {
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(e);
            }
        };
        if actual != info.checksum_sha256 {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(Error::ChecksumMismatch {
                path: path.clone(),
                expected: info.checksum_sha256.clone(),
                actual,
            });
        }

        let layout = self.layout();
        let target = path.clone();
        blocking(move || layout.commit(&staging, &target, &actual)).await
    }

    async fn move_file(&self, from: &ArchivePath, to: &ArchivePath) -> Result<()> {
        let layout = self.layout();
        let (from, to) = (from.clone(), to.clone());
        blocking(move || layout.relocate(&from, &to)).await
    }

    async fn delete(&self, path: &ArchivePath) -> Result<()> {
        let layout = self.layout();
        let target = path.clone();
        blocking(move || layout.remove(&target)).await
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_mirrors_archive_path() {
        let repo = FilesRepository::new("/archive");
        let sidecar = repo
            .layout()
            .sidecar(&ArchivePath::new("photos/2024/a.jpg").unwrap());

        assert_eq!(
            sidecar,
            Path::new("/archive/.archive/checksums/photos/2024/a.jpg.sha256")
        );
    }

    #[test]
    fn init_requires_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FilesRepository::init(dir.path().join("missing")).is_err());

        let repo = FilesRepository::init(dir.path()).unwrap();
        assert!(repo.metadata_dir().is_dir());
    }
}
