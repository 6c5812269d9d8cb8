//! Filesystem layer for the archive sync engine
//!
//! Provides validated archive-relative paths, SHA-256 checksums, atomic
//! create-new commits and a format-detecting configuration store.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use checksum::{compute_bytes_checksum, compute_file_checksum, is_valid_checksum};
pub use config::ConfigStore;
pub use error::{Error, Result};
pub use path::ArchivePath;
