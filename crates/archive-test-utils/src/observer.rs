//! Observers for asserting on sync outcomes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use archive_core::sync::CancelHandle;
use archive_core::{Error, SyncObserver};
use archive_fs::ArchivePath;

/// One observer callback, with paths rendered as strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedEvent {
    Stored(String),
    StoreFailed(String, String),
    Moved(String, String),
    MoveFailed(String, String, String),
    Deleted(String),
    DeleteFailed(String, String),
}

/// Records every callback in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn stored(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::Stored(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn store_failures(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::StoreFailed(path, error) => Some((path, error)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ObservedEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl SyncObserver for RecordingObserver {
    fn on_file_stored(&self, path: &ArchivePath) {
        self.push(ObservedEvent::Stored(path.to_string()));
    }

    fn on_file_store_failed(&self, path: &ArchivePath, error: &Error) {
        self.push(ObservedEvent::StoreFailed(path.to_string(), error.to_string()));
    }

    fn on_file_moved(&self, from: &ArchivePath, to: &ArchivePath) {
        self.push(ObservedEvent::Moved(from.to_string(), to.to_string()));
    }

    fn on_file_move_failed(&self, from: &ArchivePath, to: &ArchivePath, error: &Error) {
        self.push(ObservedEvent::MoveFailed(
            from.to_string(),
            to.to_string(),
            error.to_string(),
        ));
    }

    fn on_file_deleted(&self, path: &ArchivePath) {
        self.push(ObservedEvent::Deleted(path.to_string()));
    }

    fn on_file_delete_failed(&self, path: &ArchivePath, error: &Error) {
        self.push(ObservedEvent::DeleteFailed(path.to_string(), error.to_string()));
    }
}

/// Cancels a job once a given number of files have been stored.
///
/// Arm it with the job's [`CancelHandle`] after the job is created.
#[derive(Debug)]
pub struct CancellingObserver {
    after_stores: usize,
    stored: AtomicUsize,
    handle: OnceLock<CancelHandle>,
}

impl CancellingObserver {
    pub fn after_stores(count: usize) -> Self {
        Self {
            after_stores: count,
            stored: AtomicUsize::new(0),
            handle: OnceLock::new(),
        }
    }

    pub fn arm(&self, handle: CancelHandle) {
        let _ = self.handle.set(handle);
    }
}

impl SyncObserver for CancellingObserver {
    fn on_file_stored(&self, _path: &ArchivePath) {
        let stored = self.stored.fetch_add(1, Ordering::SeqCst) + 1;
        if stored >= self.after_stores
            && let Some(handle) = self.handle.get()
        {
            handle.cancel();
        }
    }
}
