//! Progress reporting for sync jobs
//!
//! Progress is a tree: a job summarizes its groups, a group summarizes its
//! suboperations. [`ProgressSummary`] folds the tree into a single completion
//! value and an optional time estimate.

use std::fmt;
use std::time::Duration;

use archive_fs::ArchivePath;

/// Progress of one file copy
#[derive(Debug, Clone, PartialEq)]
pub struct CopyOperationProgress {
    pub filename: ArchivePath,
    pub time_consumed: Duration,
    pub copied: u64,
    pub total: Option<u64>,
}

impl CopyOperationProgress {
    pub fn started(filename: ArchivePath, total: u64) -> Self {
        Self {
            filename,
            time_consumed: Duration::ZERO,
            copied: 0,
            total: Some(total),
        }
    }

    /// Fraction copied; 0 when the total is unknown, 1 for an empty file
    pub fn completion(&self) -> f32 {
        match self.total {
            None => 0.0,
            Some(0) => 1.0,
            Some(total) => (self.copied as f64 / total as f64).min(1.0) as f32,
        }
    }

    /// Remaining time extrapolated from the rate so far
    pub fn time_estimated(&self) -> Option<Duration> {
        let total = self.total?;
        if self.copied == 0 {
            return None;
        }
        let remaining = total.saturating_sub(self.copied);
        Some(
            self.time_consumed
                .mul_f64(remaining as f64 / self.copied as f64),
        )
    }

    /// Bytes per second so far
    pub fn velocity(&self) -> Option<f64> {
        let seconds = self.time_consumed.as_secs_f64();
        (seconds > 0.0).then(|| self.copied as f64 / seconds)
    }
}

/// Which kind of sync group a progress entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    Relocations,
    AdditiveRelocations,
    NewFiles,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relocations => write!(f, "relocations"),
            Self::AdditiveRelocations => write!(f, "additive relocations"),
            Self::NewFiles => write!(f, "new files"),
        }
    }
}

/// Progress of one sync group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupProgress {
    pub kind: GroupKind,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub time_estimated: Option<Duration>,
}

impl GroupProgress {
    pub fn new(kind: GroupKind, total: usize) -> Self {
        Self {
            kind,
            total,
            completed: 0,
            failed: 0,
            time_estimated: None,
        }
    }

    /// Completed suboperations over all suboperations; 0 for an empty group
    pub fn completion(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f32 / self.total as f32
        }
    }

    /// Every suboperation ran, successfully or not
    pub fn is_finished(&self) -> bool {
        self.completed + self.failed >= self.total
    }

    pub fn summary_text(&self) -> String {
        match self.kind {
            GroupKind::Relocations => format!("moved {} of {}", self.completed, self.total),
            GroupKind::AdditiveRelocations => {
                format!("replicated {} of {}", self.completed, self.total)
            }
            GroupKind::NewFiles => format!("copied {} of {} files", self.completed, self.total),
        }
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary::Leaf {
            completion: self.completion(),
            time_estimated: self.time_estimated,
        }
    }
}

/// Progress of a whole job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobProgress {
    pub groups: Vec<GroupProgress>,
    /// File copy currently streaming, if any
    pub in_flight: Option<CopyOperationProgress>,
}

impl JobProgress {
    /// Groups with nothing to apply are skipped at execution and left out here.
    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary::Group {
            children: self
                .groups
                .iter()
                .filter(|g| g.total > 0)
                .map(GroupProgress::summary)
                .collect(),
        }
    }

    pub fn completed(&self) -> usize {
        self.groups.iter().map(|g| g.completed).sum()
    }

    pub fn failed(&self) -> usize {
        self.groups.iter().map(|g| g.failed).sum()
    }

    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.total).sum()
    }
}

/// Folded view of a progress tree
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressSummary {
    Leaf {
        completion: f32,
        time_estimated: Option<Duration>,
    },
    Group {
        children: Vec<ProgressSummary>,
    },
}

impl ProgressSummary {
    /// Leaf value, or the mean of children (1.0 for a group without children)
    pub fn completion(&self) -> f32 {
        match self {
            Self::Leaf { completion, .. } => *completion,
            Self::Group { children } if children.is_empty() => 1.0,
            Self::Group { children } => {
                children.iter().map(Self::completion).sum::<f32>() / children.len() as f32
            }
        }
    }

    /// Sum of child estimates; `None` if any child has none
    pub fn time_estimated(&self) -> Option<Duration> {
        match self {
            Self::Leaf { time_estimated, .. } => *time_estimated,
            Self::Group { children } => children
                .iter()
                .map(Self::time_estimated)
                .try_fold(Duration::ZERO, |acc, t| t.map(|t| acc + t)),
        }
    }
}

/// Throughput estimate over finished copies.
///
/// Later copies weigh more: the n-th recorded velocity has weight n.
#[derive(Debug, Clone, Default)]
pub struct VelocityTracker {
    velocities: Vec<f64>,
}

impl VelocityTracker {
    pub fn record(&mut self, progress: &CopyOperationProgress) {
        if let Some(velocity) = progress.velocity() {
            self.velocities.push(velocity);
        }
    }

    /// Weighted mean in bytes per second
    pub fn velocity(&self) -> Option<f64> {
        let (weights, values) = self
            .velocities
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(w, v), (idx, velocity)| {
                let weight = (idx + 1) as f64;
                (w + weight, v + weight * velocity)
            });
        (weights > 0.0).then(|| values / weights)
    }

    /// Time to transfer `remaining_bytes` at the tracked velocity
    pub fn estimate(&self, remaining_bytes: u64) -> Option<Duration> {
        let velocity = self.velocity()?;
        (velocity > 0.0).then(|| Duration::from_secs_f64(remaining_bytes as f64 / velocity))
    }
}
