//! At most one running job per key
//!
//! [`UniqueJobGuard`] keeps a registry of keys to the job currently running
//! for them. Launching while a key is occupied fails with
//! [`Error::AlreadyRunning`]. The key is released when the job's task ends,
//! however it ends.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::repository::Repository;
use crate::{Error, Result};

/// A job the guard can run and cancel
#[async_trait]
pub trait RunnableJob: Send + Sync + 'static {
    async fn run(&self);
    fn cancel(&self);
}

/// Key identifying a base/destination repository pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryPair {
    pub base: String,
    pub other: String,
}

impl RepositoryPair {
    pub fn new(base: &dyn Repository, other: &dyn Repository) -> Self {
        Self {
            base: base.describe(),
            other: other.describe(),
        }
    }
}

impl fmt::Display for RepositoryPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.base, self.other)
    }
}

type Slot<J> = watch::Sender<Option<Arc<J>>>;

struct Registry<K, J> {
    slots: Mutex<HashMap<K, Slot<J>>>,
}

impl<K: Eq + Hash, J> Registry<K, J> {
    /// Lock the map, dropping slots with no job and no watchers.
    fn lock(&self) -> MutexGuard<'_, HashMap<K, Slot<J>>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.retain(|_, slot| slot.borrow().is_some() || slot.receiver_count() > 0);
        slots
    }

    fn release(&self, key: &K) {
        let mut slots = self.lock();
        if let Some(slot) = slots.get(key) {
            slot.send_replace(None);
            if slot.receiver_count() == 0 {
                slots.remove(key);
            }
        }
    }
}

/// Frees the key when the job's task finishes, panics or is aborted
struct Release<K: Eq + Hash, J> {
    registry: Arc<Registry<K, J>>,
    key: Option<K>,
}

impl<K: Eq + Hash, J> Drop for Release<K, J> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.registry.release(&key);
        }
    }
}

/// Registry ensuring a single running job per key
pub struct UniqueJobGuard<K, J> {
    registry: Arc<Registry<K, J>>,
    runtime: Handle,
}

impl<K, J> UniqueJobGuard<K, J>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
    J: RunnableJob,
{
    /// Guard spawning jobs on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new() -> Self {
        Self::with_runtime(Handle::current())
    }

    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            registry: Arc::new(Registry {
                slots: Mutex::new(HashMap::new()),
            }),
            runtime,
        }
    }

    /// Start `job` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`] if a job already holds `key`.
    pub fn launch(&self, key: K, job: Arc<J>) -> Result<JoinHandle<()>> {
        {
            let mut slots = self.registry.lock();
            let slot = slots
                .entry(key.clone())
                .or_insert_with(|| watch::Sender::new(None));
            if slot.borrow().is_some() {
                return Err(Error::AlreadyRunning {
                    key: key.to_string(),
                });
            }
            slot.send_replace(Some(Arc::clone(&job)));
        }

        tracing::debug!("Launching job for {}", key);
        let release = Release {
            registry: Arc::clone(&self.registry),
            key: Some(key),
        };

        Ok(self.runtime.spawn(async move {
            let _release = release;
            job.run().await;
        }))
    }

    /// Watch which job holds `key`.
    pub fn state_for(&self, key: &K) -> watch::Receiver<Option<Arc<J>>> {
        self.registry
            .lock()
            .entry(key.clone())
            .or_insert_with(|| watch::Sender::new(None))
            .subscribe()
    }

    /// Job currently holding `key`
    pub fn current(&self, key: &K) -> Option<Arc<J>> {
        self.registry
            .lock()
            .get(key)
            .and_then(|slot| slot.borrow().clone())
    }

    /// Cancel the job holding `key`. Returns `false` if none is running.
    pub fn cancel(&self, key: &K) -> bool {
        match self.current(key) {
            Some(job) => {
                job.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of keys tracked, running or observed
    pub fn tracked_keys(&self) -> usize {
        self.registry.lock().len()
    }
}

impl<K, J> Default for UniqueJobGuard<K, J>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
    J: RunnableJob,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, J> Clone for UniqueJobGuard<K, J> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            runtime: self.runtime.clone(),
        }
    }
}
