//! Content-addressed comparison of two catalogs
//!
//! Files are identified by checksum, not by path. An entry present at the same
//! path with the same checksum on both sides is matched and takes no further
//! part. Whatever remains is either a relocation (the content exists on both
//! sides, only at different paths or in different numbers) or an unmatched
//! extra (the content exists on one side only).

use std::collections::{BTreeMap, BTreeSet};

use archive_fs::ArchivePath;
use serde::Serialize;

use crate::Result;
use crate::catalog::{CatalogEntry, ContentCatalog};
use crate::repository::Repository;

/// Content present on both sides whose paths disagree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocationCandidate {
    pub checksum: String,
    pub size: u64,
    /// Paths holding this content only in the base, sorted
    pub base_paths: Vec<ArchivePath>,
    /// Paths holding this content only in the other, sorted
    pub other_paths: Vec<ArchivePath>,
}

impl RelocationCandidate {
    /// Applying the relocation would create more copies than the other holds.
    pub fn is_increasing_duplicates(&self) -> bool {
        self.base_paths.len() > self.other_paths.len()
    }

    /// Applying the relocation would leave fewer copies than the other holds.
    pub fn is_decreasing_duplicates(&self) -> bool {
        self.base_paths.len() < self.other_paths.len()
    }
}

/// Outcome of [`compare`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    pub all_base_files: BTreeSet<CatalogEntry>,
    pub all_other_files: BTreeSet<CatalogEntry>,
    /// Same path and checksum on both sides
    pub matched: BTreeSet<CatalogEntry>,
    /// Base entries whose content the other does not hold anywhere
    pub unmatched_base_extras: BTreeSet<CatalogEntry>,
    /// Other entries whose content the base does not hold anywhere
    pub unmatched_other_extras: BTreeSet<CatalogEntry>,
    pub relocations: Vec<RelocationCandidate>,
    /// Other-side relocation sources that the base fills with different content
    pub new_content_after_move: Vec<ArchivePath>,
    /// Unmatched other paths that the base fills with different content
    pub new_content_to_overwrite: Vec<ArchivePath>,
}

impl ComparisonResult {
    /// Nothing differs between the two catalogs.
    pub fn is_identical(&self) -> bool {
        self.relocations.is_empty()
            && self.unmatched_base_extras.is_empty()
            && self.unmatched_other_extras.is_empty()
    }

    /// Unmatched extras grouped by checksum, as `(checksum, entries)`.
    pub fn base_extra_groups(&self) -> Vec<(String, Vec<&CatalogEntry>)> {
        group_by_checksum(&self.unmatched_base_extras)
    }

    /// Unmatched extras of the other side grouped by checksum.
    pub fn other_extra_groups(&self) -> Vec<(String, Vec<&CatalogEntry>)> {
        group_by_checksum(&self.unmatched_other_extras)
    }
}

fn group_by_checksum(entries: &BTreeSet<CatalogEntry>) -> Vec<(String, Vec<&CatalogEntry>)> {
    let mut groups: BTreeMap<&str, Vec<&CatalogEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(&entry.checksum_sha256).or_default().push(entry);
    }

    let mut groups: Vec<(String, Vec<&CatalogEntry>)> = groups
        .into_iter()
        .map(|(checksum, entries)| (checksum.to_string(), entries))
        .collect();
    groups.sort_by(|a, b| a.1[0].path.cmp(&b.1[0].path));
    groups
}

/// Compare two catalogs by content.
///
/// Pure and deterministic: the same inputs always produce the same result,
/// including the order of relocations.
pub fn compare(base: &ContentCatalog, other: &ContentCatalog) -> ComparisonResult {
    let mut matched = BTreeSet::new();
    let mut base_remaining: BTreeMap<&str, Vec<&CatalogEntry>> = BTreeMap::new();
    let mut other_remaining: BTreeMap<&str, Vec<&CatalogEntry>> = BTreeMap::new();

    for entry in base.entries() {
        match other.get(&entry.path) {
            Some(o) if o.checksum_sha256 == entry.checksum_sha256 => {
                matched.insert(entry.clone());
            }
            _ => base_remaining
                .entry(&entry.checksum_sha256)
                .or_default()
                .push(entry),
        }
    }

    for entry in other.entries() {
        if !matched.contains(entry) {
            other_remaining
                .entry(&entry.checksum_sha256)
                .or_default()
                .push(entry);
        }
    }

    let mut unmatched_base_extras = BTreeSet::new();
    let mut relocations = Vec::new();

    for (checksum, entries) in &base_remaining {
        if other.contains_checksum(checksum) {
            let other_paths: Vec<ArchivePath> = other_remaining
                .get(checksum)
                .into_iter()
                .flatten()
                .map(|e| e.path.clone())
                .collect();
            relocations.push(RelocationCandidate {
                checksum: checksum.to_string(),
                size: entries[0].size,
                base_paths: entries.iter().map(|e| e.path.clone()).collect(),
                other_paths,
            });
        } else {
            unmatched_base_extras.extend(entries.iter().map(|&e| e.clone()));
        }
    }

    let mut unmatched_other_extras = BTreeSet::new();

    for (checksum, entries) in &other_remaining {
        if !base.contains_checksum(checksum) {
            unmatched_other_extras.extend(entries.iter().map(|&e| e.clone()));
        } else if !base_remaining.contains_key(checksum) {
            // Every base copy is matched; the other holds surplus copies.
            relocations.push(RelocationCandidate {
                checksum: checksum.to_string(),
                size: entries[0].size,
                base_paths: Vec::new(),
                other_paths: entries.iter().map(|e| e.path.clone()).collect(),
            });
        }
    }

    for relocation in &mut relocations {
        relocation.base_paths.sort();
        relocation.other_paths.sort();
    }
    relocations.sort_by(|a, b| {
        a.base_paths
            .first()
            .cmp(&b.base_paths.first())
            .then_with(|| a.other_paths.first().cmp(&b.other_paths.first()))
    });

    let differs_in_base = |path: &ArchivePath, checksum: &str| {
        base.get(path)
            .is_some_and(|b| b.checksum_sha256 != checksum)
    };

    let new_content_after_move = relocations
        .iter()
        .flat_map(|r| r.other_paths.iter().map(move |p| (p, r.checksum.as_str())))
        .filter(|(path, checksum)| differs_in_base(path, checksum))
        .map(|(path, _)| path.clone())
        .collect();

    let new_content_to_overwrite = unmatched_other_extras
        .iter()
        .filter(|e| differs_in_base(&e.path, &e.checksum_sha256))
        .map(|e| e.path.clone())
        .collect();

    tracing::debug!(
        matched = matched.len(),
        relocations = relocations.len(),
        base_extras = unmatched_base_extras.len(),
        other_extras = unmatched_other_extras.len(),
        "Compared catalogs"
    );

    ComparisonResult {
        all_base_files: base.entries().iter().cloned().collect(),
        all_other_files: other.entries().iter().cloned().collect(),
        matched,
        unmatched_base_extras,
        unmatched_other_extras,
        relocations,
        new_content_after_move,
        new_content_to_overwrite,
    }
}

/// Index both repositories and compare their catalogs.
pub async fn compare_repositories(
    base: &dyn Repository,
    other: &dyn Repository,
) -> Result<ComparisonResult> {
    let base_catalog = base.index().await?;
    let other_catalog = other.index().await?;
    Ok(compare(&base_catalog, &other_catalog))
}
