//! Execution of a sync plan
//!
//! A [`SyncJob`] runs the groups of a [`SyncPlan`] in order. Before each
//! group it checks for cancellation and asks the prompter for confirmation.
//! Suboperations run one at a time; a failed suboperation is reported and
//! execution continues with the next one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

use super::discovery::{SyncGroup, SyncPlan};
use super::observer::SyncObserver;
use super::operation::{ExecutionResult, OperationContext, SyncSubOperation};
use super::progress::{GroupKind, GroupProgress, JobProgress, VelocityTracker};
use super::prompter::SyncPrompter;
use crate::guard::RunnableJob;
use crate::repository::Repository;

/// Why a job did not finish successfully
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("Sync was cancelled")]
    Cancelled,

    #[error("Sync of {group} was abandoned")]
    Abandoned { group: GroupKind },

    #[error("{failed} of {total} operations failed")]
    OperationsFailed { failed: usize, total: usize },

    #[error("Sync aborted: {message}")]
    Aborted { message: String },
}

/// Lifecycle of a job
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    NotStarted,
    Running,
    Finished(Option<JobError>),
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Finished(None))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Finished(Some(JobError::Cancelled)))
    }

    pub fn error(&self) -> Option<&JobError> {
        match self {
            Self::Finished(error) => error.as_ref(),
            _ => None,
        }
    }
}

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Stateful execution of a sync plan
pub struct SyncJob {
    id: Uuid,
    groups: Vec<SyncGroup>,
    base: Arc<dyn Repository>,
    other: Arc<dyn Repository>,
    prompter: Arc<dyn SyncPrompter>,
    observer: Arc<dyn SyncObserver>,
    cancel: CancelHandle,
    started: AtomicBool,
    state: watch::Sender<JobState>,
    progress: Arc<watch::Sender<JobProgress>>,
}

impl SyncPlan {
    /// Create a job that executes this plan from `base` into `other`.
    pub fn create_job(
        &self,
        base: Arc<dyn Repository>,
        other: Arc<dyn Repository>,
        prompter: Arc<dyn SyncPrompter>,
        observer: Arc<dyn SyncObserver>,
    ) -> SyncJob {
        SyncJob::new(self.clone(), base, other, prompter, observer)
    }
}

impl SyncJob {
    pub fn new(
        plan: SyncPlan,
        base: Arc<dyn Repository>,
        other: Arc<dyn Repository>,
        prompter: Arc<dyn SyncPrompter>,
        observer: Arc<dyn SyncObserver>,
    ) -> Self {
        let progress = JobProgress {
            groups: plan
                .groups
                .iter()
                .map(|g| GroupProgress::new(g.kind(), g.operations().len()))
                .collect(),
            in_flight: None,
        };

        Self {
            id: Uuid::new_v4(),
            groups: plan.groups,
            base,
            other,
            prompter,
            observer,
            cancel: CancelHandle::default(),
            started: AtomicBool::new(false),
            state: watch::Sender::new(JobState::NotStarted),
            progress: Arc::new(watch::Sender::new(progress)),
        }
    }

    /// Restrict execution to the given suboperations.
    pub fn limit_to(mut self, subset: &[SyncSubOperation]) -> Self {
        let mut plan = SyncPlan {
            groups: std::mem::take(&mut self.groups),
        };
        plan.limit_to(subset);

        self.progress.send_modify(|progress| {
            for (group, entry) in plan.groups.iter().zip(progress.groups.iter_mut()) {
                entry.total = group.operations().len();
            }
        });
        self.groups = plan.groups;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn groups(&self) -> &[SyncGroup] {
        &self.groups
    }

    pub fn state(&self) -> watch::Receiver<JobState> {
        self.state.subscribe()
    }

    pub fn progress(&self) -> watch::Receiver<JobProgress> {
        self.progress.subscribe()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Request cancellation. Takes effect at the next group or suboperation boundary.
    pub fn cancel(&self) {
        tracing::debug!(job_id = %self.id, "Cancellation requested");
        self.cancel.cancel();
    }

    /// Execute the plan. Runs at most once; later calls return immediately.
    pub async fn run(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let span = tracing::info_span!("sync_job", job_id = %self.id);
        let outcome = self.execute().instrument(span).await;

        self.progress.send_modify(|p| p.in_flight = None);
        self.state.send_replace(JobState::Finished(outcome.err()));
    }

    async fn execute(&self) -> Result<(), JobError> {
        self.state.send_replace(JobState::Running);
        tracing::info!(
            base = %self.base.describe(),
            other = %self.other.describe(),
            "Starting sync"
        );
        if self.base.describe() == self.other.describe() {
            return Err(JobError::Aborted {
                message: format!("{} cannot be synced into itself", self.base.describe()),
            });
        }

        let mut failed = 0;
        let mut total = 0;

        for (index, group) in self.groups.iter().enumerate() {
            let operations = group.operations();
            if operations.is_empty() {
                continue;
            }
            if self.cancel.is_cancelled() {
                return Err(JobError::Cancelled);
            }
            if !self.prompter.confirm(group).await {
                tracing::info!(group = %group.kind(), "Group declined");
                return Err(JobError::Abandoned { group: group.kind() });
            }

            tracing::info!(group = %group.kind(), operations = operations.len(), "Executing group");
            failed += self.execute_group(index, operations).await?;
            total += operations.len();
            tracing::info!(group = %group.kind(), "Finished group");
        }

        if failed > 0 {
            Err(JobError::OperationsFailed { failed, total })
        } else {
            Ok(())
        }
    }

    /// Run one group's suboperations, returning how many failed.
    async fn execute_group(
        &self,
        index: usize,
        operations: &[SyncSubOperation],
    ) -> Result<usize, JobError> {
        let mut velocity = VelocityTracker::default();
        let mut failed = 0;

        for (position, operation) in operations.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(JobError::Cancelled);
            }

            let sender = Arc::clone(&self.progress);
            let context = OperationContext::new(move |copy| {
                sender.send_modify(|p| p.in_flight = Some(copy));
            });

            let result = operation
                .apply(&context, &*self.base, &*self.other, &*self.observer)
                .await;
            if result == ExecutionResult::Fail {
                tracing::warn!(operation = %operation, "Suboperation failed");
                failed += 1;
            }

            let remaining: u64 = operations[position + 1..]
                .iter()
                .map(SyncSubOperation::bytes_to_copy)
                .sum();

            self.progress.send_modify(|progress| {
                if let Some(copy) = progress.in_flight.take() {
                    velocity.record(&copy);
                }
                if let Some(group) = progress.groups.get_mut(index) {
                    match result {
                        ExecutionResult::Success => group.completed += 1,
                        ExecutionResult::Fail => group.failed += 1,
                    }
                    group.time_estimated = if remaining == 0 {
                        Some(std::time::Duration::ZERO)
                    } else {
                        velocity.estimate(remaining)
                    };
                }
            });
        }

        Ok(failed)
    }
}

#[async_trait]
impl RunnableJob for SyncJob {
    async fn run(&self) {
        SyncJob::run(self).await
    }

    fn cancel(&self) {
        SyncJob::cancel(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_helpers() {
        assert!(JobState::Finished(None).is_success());
        assert!(JobState::Finished(Some(JobError::Cancelled)).is_cancelled());
        assert!(!JobState::Running.is_finished());
        assert_eq!(
            JobState::Finished(Some(JobError::OperationsFailed { failed: 1, total: 2 }))
                .error()
                .map(ToString::to_string),
            Some("1 of 2 operations failed".to_string())
        );
    }

    #[test]
    fn cancel_handle_is_shared() {
        let handle = CancelHandle::default();
        let clone = handle.clone();
        clone.cancel();
        assert!(handle.is_cancelled());
    }
}
