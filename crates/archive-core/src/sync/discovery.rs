//! Turning a comparison into an executable sync plan

use std::collections::BTreeSet;

use serde::Serialize;

use super::mode::RelocationSyncMode;
use super::operation::SyncSubOperation;
use super::progress::GroupKind;
use crate::compare::{ComparisonResult, RelocationCandidate};
use archive_fs::ArchivePath;
use crate::{Error, Result};

/// Why a relocation was left out of the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    RelocationsDisabled,
    DuplicateIncreaseNotAllowed,
    DuplicateReductionNotAllowed,
}

/// A relocation the policy refused to apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedRelocation {
    pub relocation: RelocationCandidate,
    pub reason: BlockReason,
}

/// One confirmable step of a sync plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "group", rename_all = "snake_case")]
pub enum SyncGroup {
    /// Renames in the destination plus stores for unpaired base paths
    RelocationsMoveApply {
        to_apply: Vec<SyncSubOperation>,
        to_ignore: Vec<BlockedRelocation>,
    },
    /// Fresh copies at every relocated base path
    AdditiveRelocations { operations: Vec<SyncSubOperation> },
    /// Content the destination does not hold at all
    NewFiles { operations: Vec<SyncSubOperation> },
}

impl SyncGroup {
    pub fn kind(&self) -> GroupKind {
        match self {
            Self::RelocationsMoveApply { .. } => GroupKind::Relocations,
            Self::AdditiveRelocations { .. } => GroupKind::AdditiveRelocations,
            Self::NewFiles { .. } => GroupKind::NewFiles,
        }
    }

    /// Suboperations that will run if the group is confirmed
    pub fn operations(&self) -> &[SyncSubOperation] {
        match self {
            Self::RelocationsMoveApply { to_apply, .. } => to_apply,
            Self::AdditiveRelocations { operations } | Self::NewFiles { operations } => operations,
        }
    }

    pub fn ignored(&self) -> &[BlockedRelocation] {
        match self {
            Self::RelocationsMoveApply { to_ignore, .. } => to_ignore,
            _ => &[],
        }
    }

    /// Phrase completing "Do you want to sync ...?"
    pub fn action_phrase(&self) -> &'static str {
        match self {
            Self::RelocationsMoveApply { .. } => "moves",
            Self::AdditiveRelocations { .. } => "in additive duplicating mode",
            Self::NewFiles { .. } => "new files",
        }
    }

    fn retain(&mut self, keep: impl Fn(&SyncSubOperation) -> bool) {
        match self {
            Self::RelocationsMoveApply { to_apply, .. } => to_apply.retain(|op| keep(op)),
            Self::AdditiveRelocations { operations } | Self::NewFiles { operations } => {
                operations.retain(|op| keep(op))
            }
        }
    }
}

/// Ordered list of sync groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    pub groups: Vec<SyncGroup>,
}

impl SyncPlan {
    /// No group has anything to apply
    pub fn is_no_op(&self) -> bool {
        self.groups.iter().all(|g| g.operations().is_empty())
    }

    /// Every relocation blocked by the policy
    pub fn ignored(&self) -> Vec<&BlockedRelocation> {
        self.groups.iter().flat_map(SyncGroup::ignored).collect()
    }

    pub fn has_ignored(&self) -> bool {
        self.groups.iter().any(|g| !g.ignored().is_empty())
    }

    /// Total number of applicable suboperations
    pub fn operation_count(&self) -> usize {
        self.groups.iter().map(|g| g.operations().len()).sum()
    }

    /// Keep only suboperations contained in `subset`
    pub fn limit_to(&mut self, subset: &[SyncSubOperation]) {
        for group in &mut self.groups {
            group.retain(|op| subset.contains(op));
        }
    }
}

/// Build a sync plan from a comparison under the given relocation policy.
///
/// Relocations come first so that paths they vacate are free before new
/// files are stored. Groups with nothing to apply or ignore are omitted.
/// No suboperation ever deletes from the destination.
///
/// # Errors
///
/// Returns [`Error::DestinationCollision`] if two suboperations would write
/// the same path.
pub fn discover(result: &ComparisonResult, mode: RelocationSyncMode) -> Result<SyncPlan> {
    let mut groups = Vec::new();

    if !result.relocations.is_empty() {
        groups.push(relocation_group(result, mode)?);
    }

    if !result.unmatched_base_extras.is_empty() {
        groups.push(SyncGroup::NewFiles {
            operations: result
                .unmatched_base_extras
                .iter()
                .map(SyncSubOperation::store)
                .collect(),
        });
    }

    let plan = SyncPlan { groups };
    check_destinations(&plan)?;

    tracing::debug!(
        mode = %mode,
        groups = plan.groups.len(),
        operations = plan.operation_count(),
        ignored = plan.ignored().len(),
        "Discovered sync plan"
    );
    Ok(plan)
}

fn relocation_group(result: &ComparisonResult, mode: RelocationSyncMode) -> Result<SyncGroup> {
    let relocations = &result.relocations;
    let group = match mode {
        RelocationSyncMode::Disabled => SyncGroup::RelocationsMoveApply {
            to_apply: Vec::new(),
            to_ignore: relocations
                .iter()
                .map(|r| BlockedRelocation {
                    relocation: r.clone(),
                    reason: BlockReason::RelocationsDisabled,
                })
                .collect(),
        },
        RelocationSyncMode::AdditiveDuplicating => SyncGroup::AdditiveRelocations {
            operations: relocations
                .iter()
                .flat_map(|r| r.base_paths.iter().map(move |path| store_for(r, path)))
                .collect(),
        },
        RelocationSyncMode::Move {
            allow_duplicate_increase,
            allow_duplicate_reduction,
        } => {
            let mut moves = Vec::new();
            let mut stores = Vec::new();
            let mut to_ignore = Vec::new();

            for relocation in relocations {
                let blocked = if relocation.is_increasing_duplicates() && !allow_duplicate_increase {
                    Some(BlockReason::DuplicateIncreaseNotAllowed)
                } else if relocation.is_decreasing_duplicates() && !allow_duplicate_reduction {
                    Some(BlockReason::DuplicateReductionNotAllowed)
                } else {
                    None
                };

                match blocked {
                    Some(reason) => to_ignore.push(BlockedRelocation {
                        relocation: relocation.clone(),
                        reason,
                    }),
                    None => pair_paths(relocation, &mut moves, &mut stores),
                }
            }

            let occupied: BTreeSet<&ArchivePath> = result
                .all_base_files
                .iter()
                .chain(&result.all_other_files)
                .map(|entry| &entry.path)
                .collect();
            let mut to_apply = order_moves(moves, &occupied)?;
            to_apply.extend(stores);
            SyncGroup::RelocationsMoveApply {
                to_apply,
                to_ignore,
            }
        }
    };
    Ok(group)
}

fn store_for(relocation: &RelocationCandidate, path: &archive_fs::ArchivePath) -> SyncSubOperation {
    SyncSubOperation::Store {
        path: path.clone(),
        checksum_sha256: relocation.checksum.clone(),
        size: relocation.size,
    }
}

/// Pair other-side paths with base-side paths, shortest first.
///
/// Unpaired base paths become stores. Unpaired other paths stay untouched.
fn pair_paths(
    relocation: &RelocationCandidate,
    moves: &mut Vec<SyncSubOperation>,
    stores: &mut Vec<SyncSubOperation>,
) {
    let by_length = |a: &&archive_fs::ArchivePath, b: &&archive_fs::ArchivePath| {
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    };

    let mut base: Vec<_> = relocation.base_paths.iter().collect();
    let mut other: Vec<_> = relocation.other_paths.iter().collect();
    base.sort_by(by_length);
    other.sort_by(by_length);

    for (idx, to) in base.iter().enumerate() {
        match other.get(idx) {
            Some(from) => moves.push(SyncSubOperation::Move {
                from: (*from).clone(),
                to: (*to).clone(),
            }),
            None => stores.push(store_for(relocation, to)),
        }
    }
}

/// Order moves so that a move vacating a path runs before the move filling it.
///
/// A cycle (such as a swap) is broken by parking one file at a free path
/// first and moving it to its destination once that is vacated.
fn order_moves(
    mut pending: Vec<SyncSubOperation>,
    occupied: &BTreeSet<&ArchivePath>,
) -> Result<Vec<SyncSubOperation>> {
    let mut ordered = Vec::with_capacity(pending.len());
    let mut parked = BTreeSet::new();

    while !pending.is_empty() {
        let sources: BTreeSet<_> = pending
            .iter()
            .filter_map(|op| match op {
                SyncSubOperation::Move { from, .. } => Some(from.clone()),
                SyncSubOperation::Store { .. } => None,
            })
            .collect();

        let ready = pending
            .iter()
            .position(|op| !sources.contains(op.destination()));

        match ready {
            Some(idx) => ordered.push(pending.remove(idx)),
            None => {
                let SyncSubOperation::Move { from, to } = pending.remove(0) else {
                    continue;
                };
                let parking = free_path(&from, occupied, &parked)?;
                tracing::debug!("Breaking move cycle at {} via {}", from, parking);
                parked.insert(parking.clone());
                ordered.push(SyncSubOperation::Move {
                    from,
                    to: parking.clone(),
                });
                pending.push(SyncSubOperation::Move { from: parking, to });
            }
        }
    }

    Ok(ordered)
}

/// First `<path>.relocating[-N]` not used by either side or by another parked file
fn free_path(
    path: &ArchivePath,
    occupied: &BTreeSet<&ArchivePath>,
    parked: &BTreeSet<ArchivePath>,
) -> Result<ArchivePath> {
    let mut attempt = 0usize;
    loop {
        let candidate = match attempt {
            0 => ArchivePath::new(format!("{}.relocating", path))?,
            n => ArchivePath::new(format!("{}.relocating-{}", path, n))?,
        };
        if !occupied.contains(&candidate) && !parked.contains(&candidate) {
            return Ok(candidate);
        }
        attempt += 1;
    }
}

fn check_destinations(plan: &SyncPlan) -> Result<()> {
    let mut seen = BTreeSet::new();
    for op in plan.groups.iter().flat_map(SyncGroup::operations) {
        if !seen.insert(op.destination()) {
            return Err(Error::DestinationCollision {
                path: op.destination().clone(),
            });
        }
    }
    Ok(())
}
