//! Command implementations for archive-cli

pub mod compare;
pub mod sync;

use std::path::Path;

use archive_core::FilesRepository;

use crate::error::{CliError, Result};

pub use compare::run_compare;
pub use sync::run_sync;

/// Open a repository directory for reading.
///
/// Read access never creates the metadata directory.
pub fn open_base(path: &Path) -> Result<FilesRepository> {
    if !path.is_dir() {
        return Err(CliError::user(format!(
            "Repository not found: {}",
            path.display()
        )));
    }
    Ok(FilesRepository::new(path))
}

/// Open a repository directory that will be written to.
pub fn open_destination(path: &Path) -> Result<FilesRepository> {
    if !path.is_dir() {
        return Err(CliError::user(format!(
            "Repository not found: {}",
            path.display()
        )));
    }
    Ok(FilesRepository::init(path)?)
}
