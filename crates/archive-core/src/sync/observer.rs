//! Observation of suboperation outcomes

use std::sync::Arc;

use archive_fs::ArchivePath;

use crate::Error;

/// Receives the outcome of every suboperation a job executes.
///
/// All methods have default no-op implementations.
pub trait SyncObserver: Send + Sync {
    fn on_file_stored(&self, _path: &ArchivePath) {}
    fn on_file_store_failed(&self, _path: &ArchivePath, _error: &Error) {}
    fn on_file_moved(&self, _from: &ArchivePath, _to: &ArchivePath) {}
    fn on_file_move_failed(&self, _from: &ArchivePath, _to: &ArchivePath, _error: &Error) {}
    fn on_file_deleted(&self, _path: &ArchivePath) {}
    fn on_file_delete_failed(&self, _path: &ArchivePath, _error: &Error) {}
}

/// Observer that ignores everything.
pub struct SilentObserver;

impl SyncObserver for SilentObserver {}

/// Observer that forwards outcomes to `tracing`.
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn on_file_stored(&self, path: &ArchivePath) {
        tracing::info!("Stored {}", path);
    }

    fn on_file_store_failed(&self, path: &ArchivePath, error: &Error) {
        tracing::warn!("Failed to store {}: {}", path, error);
    }

    fn on_file_moved(&self, from: &ArchivePath, to: &ArchivePath) {
        tracing::info!("Moved {} -> {}", from, to);
    }

    fn on_file_move_failed(&self, from: &ArchivePath, to: &ArchivePath, error: &Error) {
        tracing::warn!("Failed to move {} -> {}: {}", from, to, error);
    }

    fn on_file_deleted(&self, path: &ArchivePath) {
        tracing::info!("Deleted {}", path);
    }

    fn on_file_delete_failed(&self, path: &ArchivePath, error: &Error) {
        tracing::warn!("Failed to delete {}: {}", path, error);
    }
}

impl<T: SyncObserver + ?Sized> SyncObserver for Arc<T> {
    fn on_file_stored(&self, path: &ArchivePath) {
        (**self).on_file_stored(path)
    }

    fn on_file_store_failed(&self, path: &ArchivePath, error: &Error) {
        (**self).on_file_store_failed(path, error)
    }

    fn on_file_moved(&self, from: &ArchivePath, to: &ArchivePath) {
        (**self).on_file_moved(from, to)
    }

    fn on_file_move_failed(&self, from: &ArchivePath, to: &ArchivePath, error: &Error) {
        (**self).on_file_move_failed(from, to, error)
    }

    fn on_file_deleted(&self, path: &ArchivePath) {
        (**self).on_file_deleted(path)
    }

    fn on_file_delete_failed(&self, path: &ArchivePath, error: &Error) {
        (**self).on_file_delete_failed(path, error)
    }
}
