//! Store and Move suboperations
//!
//! A `Store` copies one file from the base into the other repository. The
//! content is streamed through a [`ChecksumReader`] that hashes bytes as they
//! pass and fails the stream at EOF when the digest is wrong, so a driver that
//! consumes the stream never commits corrupt content.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll, ready};
use std::time::Instant;

use archive_fs::ArchivePath;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, ReadBuf};

use super::observer::SyncObserver;
use super::progress::CopyOperationProgress;
use crate::catalog::CatalogEntry;
use crate::repository::{FileInfo, FileReader, Repository};
use crate::{Error, Result};

/// Outcome of applying one suboperation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    Success,
    Fail,
}

/// Smallest unit of work in a sync plan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SyncSubOperation {
    /// Copy the base file at `path` to the same path in the other repository
    Store {
        path: ArchivePath,
        checksum_sha256: String,
        size: u64,
    },
    /// Rename a file inside the other repository
    Move { from: ArchivePath, to: ArchivePath },
}

impl SyncSubOperation {
    pub fn store(entry: &CatalogEntry) -> Self {
        Self::Store {
            path: entry.path.clone(),
            checksum_sha256: entry.checksum_sha256.clone(),
            size: entry.size,
        }
    }

    /// Path this suboperation writes in the other repository
    pub fn destination(&self) -> &ArchivePath {
        match self {
            Self::Store { path, .. } => path,
            Self::Move { to, .. } => to,
        }
    }

    /// Bytes transferred between repositories
    pub fn bytes_to_copy(&self) -> u64 {
        match self {
            Self::Store { size, .. } => *size,
            Self::Move { .. } => 0,
        }
    }

    /// Execute against the repositories, reporting the outcome to `observer`.
    ///
    /// Failures are reported, never propagated.
    pub async fn apply(
        &self,
        context: &OperationContext,
        base: &dyn Repository,
        other: &dyn Repository,
        observer: &dyn SyncObserver,
    ) -> ExecutionResult {
        match self {
            Self::Store {
                path,
                checksum_sha256,
                ..
            } => match store(context, base, other, path, checksum_sha256).await {
                Ok(()) => {
                    observer.on_file_stored(path);
                    ExecutionResult::Success
                }
                Err(e) => {
                    observer.on_file_store_failed(path, &e);
                    ExecutionResult::Fail
                }
            },
            Self::Move { from, to } => match other.move_file(from, to).await {
                Ok(()) => {
                    observer.on_file_moved(from, to);
                    ExecutionResult::Success
                }
                Err(e) => {
                    observer.on_file_move_failed(from, to, &e);
                    ExecutionResult::Fail
                }
            },
        }
    }
}

impl fmt::Display for SyncSubOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store { path, .. } => write!(f, "store {}", path),
            Self::Move { from, to } => write!(f, "move {} -> {}", from, to),
        }
    }
}

type ProgressCallback = dyn Fn(CopyOperationProgress) + Send + Sync;

/// Per-operation execution context carrying the progress callback
#[derive(Clone)]
pub struct OperationContext {
    report: Arc<ProgressCallback>,
}

impl OperationContext {
    pub fn new(report: impl Fn(CopyOperationProgress) + Send + Sync + 'static) -> Self {
        Self {
            report: Arc::new(report),
        }
    }

    /// Context that discards progress
    pub fn silent() -> Self {
        Self::new(|_| {})
    }

    pub fn report(&self, progress: CopyOperationProgress) {
        (self.report)(progress)
    }
}

impl fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext").finish_non_exhaustive()
    }
}

async fn store(
    context: &OperationContext,
    base: &dyn Repository,
    other: &dyn Repository,
    path: &ArchivePath,
    expected: &str,
) -> Result<()> {
    let (info, source) = base.open(path).await?;
    let info = FileInfo {
        size: info.size,
        checksum_sha256: expected.to_string(),
    };

    let (reader, verification) = ChecksumReader::new(source, path.clone(), &info, context.clone());
    context.report(CopyOperationProgress::started(path.clone(), info.size));

    let saved = other.save(path, &info, Box::new(reader)).await;

    match verification.outcome() {
        Some(Verification::Mismatch { actual }) => Err(Error::ChecksumMismatch {
            path: path.clone(),
            expected: expected.to_string(),
            actual: actual.clone(),
        }),
        None if saved.is_ok() => Err(Error::IncompleteTransfer { path: path.clone() }),
        _ => saved,
    }
}

/// Result of hashing a stream to its end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified,
    Mismatch { actual: String },
}

/// Read side of a [`ChecksumReader`]'s outcome, available once the stream hit EOF
#[derive(Debug, Clone, Default)]
pub struct VerificationHandle {
    outcome: Arc<OnceLock<Verification>>,
}

impl VerificationHandle {
    /// `None` while the stream has not been read to its end
    pub fn outcome(&self) -> Option<&Verification> {
        self.outcome.get()
    }
}

/// Reader that hashes content as it streams and rejects a wrong digest at EOF
pub struct ChecksumReader {
    inner: FileReader,
    hasher: Option<Sha256>,
    expected: String,
    outcome: Arc<OnceLock<Verification>>,
    context: OperationContext,
    filename: ArchivePath,
    total: u64,
    copied: u64,
    started: Instant,
}

impl ChecksumReader {
    pub fn new(
        inner: FileReader,
        filename: ArchivePath,
        info: &FileInfo,
        context: OperationContext,
    ) -> (Self, VerificationHandle) {
        let handle = VerificationHandle::default();
        let reader = Self {
            inner,
            hasher: Some(Sha256::new()),
            expected: info.checksum_sha256.clone(),
            outcome: Arc::clone(&handle.outcome),
            context,
            filename,
            total: info.size,
            copied: 0,
            started: Instant::now(),
        };
        (reader, handle)
    }

    fn finish(&mut self) -> io::Result<()> {
        if let Some(hasher) = self.hasher.take() {
            let actual = format!("{:x}", hasher.finalize());
            let verification = if actual == self.expected {
                Verification::Verified
            } else {
                Verification::Mismatch { actual }
            };
            let _ = self.outcome.set(verification);
        }

        match self.outcome.get() {
            Some(Verification::Mismatch { actual }) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "checksum mismatch for {}: expected {}, got {}",
                    self.filename, self.expected, actual
                ),
            )),
            _ => Ok(()),
        }
    }
}

impl AsyncRead for ChecksumReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        let chunk = &buf.filled()[before..];
        if chunk.is_empty() {
            return Poll::Ready(this.finish());
        }

        if let Some(hasher) = this.hasher.as_mut() {
            hasher.update(chunk);
        }
        this.copied += chunk.len() as u64;
        this.context.report(CopyOperationProgress {
            filename: this.filename.clone(),
            time_consumed: this.started.elapsed(),
            copied: this.copied,
            total: Some(this.total),
        });

        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archive_fs::compute_bytes_checksum;
    use std::sync::Mutex;
    use tokio::io::AsyncReadExt;

    fn reader_for(content: &[u8], expected: &str) -> (ChecksumReader, VerificationHandle) {
        let info = FileInfo {
            size: content.len() as u64,
            checksum_sha256: expected.to_string(),
        };
        ChecksumReader::new(
            Box::new(std::io::Cursor::new(content.to_vec())),
            ArchivePath::new("f.bin").unwrap(),
            &info,
            OperationContext::silent(),
        )
    }

    #[tokio::test]
    async fn matching_content_verifies() {
        let (mut reader, handle) = reader_for(b"payload", &compute_bytes_checksum(b"payload"));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();

        assert_eq!(out, b"payload");
        assert_eq!(handle.outcome(), Some(&Verification::Verified));
    }

    #[tokio::test]
    async fn mismatch_fails_stream_at_eof() {
        let (mut reader, handle) = reader_for(b"payload", &compute_bytes_checksum(b"other"));
        let err = reader.read_to_end(&mut Vec::new()).await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(matches!(handle.outcome(), Some(Verification::Mismatch { .. })));
    }

    #[tokio::test]
    async fn unread_stream_has_no_outcome() {
        let (_reader, handle) = reader_for(b"payload", "x");
        assert!(handle.outcome().is_none());
    }

    #[tokio::test]
    async fn reports_progress_per_chunk() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let info = FileInfo {
            size: 4,
            checksum_sha256: compute_bytes_checksum(b"abcd"),
        };
        let (mut reader, _) = ChecksumReader::new(
            Box::new(std::io::Cursor::new(b"abcd".to_vec())),
            ArchivePath::new("f").unwrap(),
            &info,
            OperationContext::new(move |p| sink.lock().unwrap().push(p.copied)),
        );

        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).await.unwrap();
        reader.read_exact(&mut buf).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![2, 4]);
    }

    #[test]
    fn bytes_to_copy_counts_stores_only() {
        let store = SyncSubOperation::Store {
            path: ArchivePath::new("a").unwrap(),
            checksum_sha256: "c".into(),
            size: 10,
        };
        let mv = SyncSubOperation::Move {
            from: ArchivePath::new("a").unwrap(),
            to: ArchivePath::new("b").unwrap(),
        };

        assert_eq!(store.bytes_to_copy(), 10);
        assert_eq!(mv.bytes_to_copy(), 0);
        assert_eq!(mv.destination().as_str(), "b");
    }
}
