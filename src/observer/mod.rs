//! Observer Registry Module
//!
//! Each repository owns a `Subject` that buffers every entity it saves. When the
//! dispatcher finishes a batch, `notify` hands the buffered entities to every attached
//! observer, waits for all of them, and only then drops the delivered entities.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error};

use crate::error::RepositoryError;

/// Reacts to a batch of updated entities.
///
/// Implementations must be idempotent: the same batch may be delivered more than once.
#[async_trait]
pub trait Observer<T: Send + Sync>: Send + Sync {
    /// Name used when logging observer failures.
    fn name(&self) -> &str;

    async fn update(&self, entities: &[T]) -> anyhow::Result<()>;
}

/// Observer registry plus the buffer of entities updated since the last notification.
pub struct Subject<T: Send + Sync> {
    observers: RwLock<Vec<Arc<dyn Observer<T>>>>,
    updated: Mutex<Vec<T>>,
    /// Held for a whole notification so overlapping calls cannot drain each other's entities
    notifying: Mutex<()>,
}

impl<T: Clone + Send + Sync + 'static> Subject<T> {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            notifying: Mutex::new(()),
        }
    }

    /// Attaches an observer.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Observer attached
    /// * `Err(RepositoryError::ObserverAlreadyAttached)` - The same instance is already registered
    pub async fn attach(&self, observer: Arc<dyn Observer<T>>) -> Result<(), RepositoryError> {
        let mut observers = self.observers.write().await;
        if observers.iter().any(|o| same_instance(o, &observer)) {
            return Err(RepositoryError::ObserverAlreadyAttached);
        }
        observers.push(observer);
        Ok(())
    }

    /// Detaches an observer. Detaching an observer that is not attached does nothing.
    pub async fn detach(&self, observer: &Arc<dyn Observer<T>>) {
        self.observers.write().await.retain(|o| !same_instance(o, observer));
    }

    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Appends a saved entity to the pending notification buffer.
    pub async fn record(&self, entity: T) {
        self.updated.lock().await.push(entity);
    }

    /// Snapshot of the entities waiting to be delivered.
    pub async fn updated_entities(&self) -> Vec<T> {
        self.updated.lock().await.clone()
    }

    /// Delivers the buffered entities to every observer.
    ///
    /// Observers run concurrently and are all awaited. A failing observer is logged and
    /// does not prevent delivery to the others. Entities recorded while the observers
    /// run stay buffered for the next notification. Concurrent calls run one after
    /// the other.
    pub async fn notify(&self) {
        let _notifying = self.notifying.lock().await;
        let batch = self.updated.lock().await.clone();
        if batch.is_empty() {
            return;
        }

        let observers = self.observers.read().await.clone();
        debug!("Notifying {} observers of {} updated entities", observers.len(), batch.len());

        let results = join_all(observers.iter().map(|o| o.update(&batch))).await;
        for (observer, result) in observers.iter().zip(results) {
            if let Err(e) = result {
                error!("Observer {} failed to process update: {:#}", observer.name(), e);
            }
        }

        let mut updated = self.updated.lock().await;
        let delivered = batch.len().min(updated.len());
        updated.drain(..delivered);
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn same_instance<T: Send + Sync>(a: &Arc<dyn Observer<T>>, b: &Arc<dyn Observer<T>>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
