//! Shared test fixtures for the archive workspace.
//!
//! Dev-dependency only, never published. Use it from `tests/` directories;
//! unit tests inside `archive-core` would link a second copy of the crate.
//!
//! # Modules
//!
//! - [`fixture`]: [`FixtureRepoBuilder`] for in-memory and on-disk repositories
//! - [`observer`]: observers that record or react to sync outcomes
//! - [`archive`]: [`TestArchive`] temporary directory with assertions

pub mod archive;
pub mod fixture;
pub mod observer;

pub use archive::TestArchive;
pub use fixture::{FixtureRepoBuilder, path};
pub use observer::{CancellingObserver, ObservedEvent, RecordingObserver};
