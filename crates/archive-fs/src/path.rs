//! Archive-relative path handling
//!
//! Every file inside an archive is addressed by an [`ArchivePath`]: a
//! relative path that always uses forward slashes and can never escape the
//! repository root. Paths are converted to platform-native form only at I/O
//! boundaries via [`ArchivePath::to_native`].

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A validated, normalized path relative to an archive root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArchivePath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl ArchivePath {
    /// Validate and normalize a path.
    ///
    /// Backslashes become forward slashes and empty or `.` segments are
    /// dropped. Absolute paths, drive prefixes, `..` segments and NUL bytes
    /// are rejected.
    pub fn new(path: impl AsRef<str>) -> Result<Self> {
        let raw = path.as_ref();
        let unified = raw.replace('\\', "/");

        if unified.contains('\0') {
            return Err(Error::invalid_path(raw, "contains a NUL byte"));
        }
        if unified.starts_with('/') {
            return Err(Error::invalid_path(raw, "absolute paths are not allowed"));
        }
        if has_drive_prefix(&unified) {
            return Err(Error::invalid_path(raw, "drive prefixes are not allowed"));
        }

        let mut segments = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(Error::invalid_path(raw, "parent segments are not allowed"));
                }
                other => segments.push(other),
            }
        }

        if segments.is_empty() {
            return Err(Error::invalid_path(raw, "path is empty"));
        }

        Ok(Self {
            inner: segments.join("/"),
        })
    }

    /// Build an archive path from a native path relative to an archive root.
    ///
    /// Every component must be valid UTF-8 and free of backslashes, since
    /// either would change the name once normalized.
    pub fn from_relative(path: &Path) -> Result<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            let segment = component
                .as_os_str()
                .to_str()
                .filter(|segment| !segment.contains('\\'))
                .ok_or_else(|| {
                    Error::invalid_path(path.to_string_lossy(), "name is not portable")
                })?;
            segments.push(segment);
        }
        Self::new(segments.join("/"))
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Resolve this path below `root` as a platform-native path.
    pub fn to_native(&self, root: &Path) -> PathBuf {
        self.inner
            .split('/')
            .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
    }

    /// Get the parent path, if this path has more than one segment.
    pub fn parent(&self) -> Option<Self> {
        self.inner.rfind('/').map(|idx| Self {
            inner: self.inner[..idx].to_string(),
        })
    }

    /// Get the last segment.
    pub fn file_name(&self) -> &str {
        self.inner.rsplit('/').next().unwrap_or(&self.inner)
    }

    /// Number of bytes in the normalized representation.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Always false; an archive path has at least one segment.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Join a further relative segment onto this path.
    pub fn join(&self, segment: &str) -> Result<Self> {
        Self::new(format!("{}/{}", self.inner, segment))
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl AsRef<str> for ArchivePath {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl TryFrom<String> for ArchivePath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ArchivePath {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ArchivePath> for String {
    fn from(path: ArchivePath) -> Self {
        path.inner
    }
}

impl std::str::FromStr for ArchivePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}
