//! Content-addressed comparison and synchronization of archive repositories
//!
//! Files are identified by their SHA-256 checksum. Given two repositories,
//! this crate works out what differs, plans the minimal set of stores and
//! moves that brings the destination in line with the base under a
//! relocation policy, and executes that plan with progress, confirmation,
//! cancellation and per-key exclusivity.
//!
//! # Pipeline
//!
//! 1. [`Repository::index`] produces a [`ContentCatalog`]
//! 2. [`compare`] classifies differences into a [`ComparisonResult`]
//! 3. [`discover`] turns the result into a [`SyncPlan`]
//! 4. [`SyncPlan::create_job`] yields a [`SyncJob`], optionally launched
//!    through a [`UniqueJobGuard`]
//!
//! The engine never deletes files from the destination.

pub mod catalog;
pub mod compare;
pub mod config;
pub mod error;
pub mod guard;
pub mod repository;
pub mod sync;

pub use catalog::{CatalogEntry, ContentCatalog};
pub use compare::{ComparisonResult, RelocationCandidate, compare, compare_repositories};
pub use config::Settings;
pub use error::{Error, Result};
pub use guard::{RepositoryPair, RunnableJob, UniqueJobGuard};
pub use repository::{FileInfo, FileReader, FilesRepository, MemoryRepository, Repository};
pub use sync::{
    AutoConfirm, BlockReason, BlockedRelocation, FnPrompter, JobError, JobProgress, JobState,
    RelocationSyncMode, SyncGroup, SyncJob, SyncObserver, SyncPlan, SyncPrompter,
    SilentObserver, SyncSubOperation, TracingObserver, discover,
};

pub use archive_fs::ArchivePath;
