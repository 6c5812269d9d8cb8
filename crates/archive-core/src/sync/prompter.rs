//! Confirmation gates run before each sync group

use async_trait::async_trait;

use super::discovery::SyncGroup;

/// Decides whether a group may be executed.
#[async_trait]
pub trait SyncPrompter: Send + Sync {
    async fn confirm(&self, group: &SyncGroup) -> bool;
}

/// Confirms every group.
pub struct AutoConfirm;

#[async_trait]
impl SyncPrompter for AutoConfirm {
    async fn confirm(&self, _group: &SyncGroup) -> bool {
        true
    }
}

/// Prompter backed by a synchronous closure.
pub struct FnPrompter<F>(pub F);

#[async_trait]
impl<F> SyncPrompter for FnPrompter<F>
where
    F: Fn(&SyncGroup) -> bool + Send + Sync,
{
    async fn confirm(&self, group: &SyncGroup) -> bool {
        (self.0)(group)
    }
}
