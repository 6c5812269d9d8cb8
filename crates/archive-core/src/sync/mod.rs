//! Sync planning and execution
//!
//! - [`discovery`] turns a comparison into a [`SyncPlan`]
//! - [`operation`] holds the Store and Move suboperations
//! - [`job`] executes a plan with confirmation, cancellation and progress

pub mod discovery;
pub mod job;
pub mod mode;
pub mod observer;
pub mod operation;
pub mod progress;
pub mod prompter;

pub use discovery::{BlockReason, BlockedRelocation, SyncGroup, SyncPlan, discover};
pub use job::{CancelHandle, JobError, JobState, SyncJob};
pub use mode::RelocationSyncMode;
pub use observer::{SilentObserver, SyncObserver, TracingObserver};
pub use operation::{
    ChecksumReader, ExecutionResult, OperationContext, SyncSubOperation, Verification,
    VerificationHandle,
};
pub use progress::{
    CopyOperationProgress, GroupKind, GroupProgress, JobProgress, ProgressSummary, VelocityTracker,
};
pub use prompter::{AutoConfirm, FnPrompter, SyncPrompter};
