//! [`TestArchive`] temporary directory for filesystem-backed scenarios.

use std::fs;
use std::path::Path;

use archive_core::FilesRepository;
use tempfile::TempDir;

/// A temporary archive directory with helper methods for setup and
/// assertion.
///
/// # Example
///
/// ```rust,no_run
/// use archive_test_utils::TestArchive;
///
/// let archive = TestArchive::new();
/// archive.write("photos/a.jpg", "jpeg");
/// archive.assert_file_exists("photos/a.jpg");
/// ```
pub struct TestArchive {
    temp_dir: TempDir,
}

impl Default for TestArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl TestArchive {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Open the directory as a repository, creating `.archive/`.
    pub fn repository(&self) -> FilesRepository {
        FilesRepository::init(self.root()).unwrap()
    }

    /// Write `content` at `path` (relative to root), creating parents.
    pub fn write(&self, path: &str, content: &str) {
        let full_path = self.root().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full_path, content).unwrap();
    }

    /// Read the file at `path` (relative to root).
    ///
    /// # Panics
    /// Panics if the file cannot be read.
    pub fn read(&self, path: &str) -> String {
        let full_path = self.root().join(path);
        fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()))
    }

    /// Assert that `path` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the root) does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the file at `path` holds exactly `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or its content differs.
    pub fn assert_file_content(&self, path: &str, content: &str) {
        let actual = self.read(path);
        assert_eq!(
            actual,
            content,
            "File {} has unexpected content",
            self.root().join(path).display()
        );
    }
}
