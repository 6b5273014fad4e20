//! Generic Entity Store
//!
//! In-memory keyed storage shared by every repository. Each store owns the `Subject`
//! that observers attach to, and records every saved entity in it.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::entities::Entity;
use crate::error::RepositoryError;
use crate::observer::{Observer, Subject};

// ============================================================================
// STORE IMPLEMENTATION
// ============================================================================

/// Thread-safe keyed store for one entity type.
pub struct Repository<E: Entity> {
    /// Map of key -> entity
    rows: RwLock<HashMap<E::Key, E>>,
    /// Serializes read-compare-write updates
    update_lock: Mutex<()>,
    subject: Subject<E>,
}

impl<E: Entity> Repository<E> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            update_lock: Mutex::new(()),
            subject: Subject::new(),
        }
    }

    pub async fn get(&self, key: &E::Key) -> Option<E> {
        self.rows.read().await.get(key).cloned()
    }

    /// Inserts or replaces an entity.
    ///
    /// The entity's update rule is checked against the stored row inside the same write
    /// lock. On success the timestamps are stamped, the post-save entity is recorded in
    /// the subject, and it is returned.
    ///
    /// # Returns
    ///
    /// * `Ok(E)` - The entity as stored
    /// * `Err(RepositoryError)` - The update violates the entity's rule; nothing was written
    pub async fn save(&self, mut entity: E) -> Result<E, RepositoryError> {
        let now = Utc::now();
        let saved = {
            let mut rows = self.rows.write().await;
            let key = entity.key();
            let created_at = match rows.get(&key) {
                Some(stored) => {
                    entity.validate_update(stored)?;
                    stored.created_at()
                }
                None => now,
            };
            entity.touch(created_at, now);
            rows.insert(key, entity.clone());
            entity
        };
        self.subject.record(saved.clone()).await;
        Ok(saved)
    }

    /// Atomically derives an updated entity from the stored one and saves it.
    ///
    /// `next` returns `None` to leave the entity untouched.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(E))` - The entity was updated
    /// * `Ok(None)` - The key is unknown or `next` declined the update
    pub async fn compare_and_save<F>(&self, key: &E::Key, next: F) -> Result<Option<E>, RepositoryError>
    where
        F: FnOnce(&E) -> Option<E> + Send,
    {
        let _guard = self.update_lock.lock().await;
        let Some(current) = self.get(key).await else {
            return Ok(None);
        };
        match next(&current) {
            Some(updated) => self.save(updated).await.map(Some),
            None => Ok(None),
        }
    }

    /// Returns every entity matching `predicate`.
    pub async fn find<P>(&self, predicate: P) -> Vec<E>
    where
        P: Fn(&E) -> bool,
    {
        self.rows.read().await.values().filter(|e| predicate(e)).cloned().collect()
    }

    pub async fn all(&self) -> Vec<E> {
        self.rows.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    pub fn subject(&self) -> &Subject<E> {
        &self.subject
    }

    pub async fn attach(&self, observer: Arc<dyn Observer<E>>) -> Result<(), RepositoryError> {
        self.subject.attach(observer).await
    }

    pub async fn notify(&self) {
        self.subject.notify().await
    }
}

impl<E: Entity> Default for Repository<E> {
    fn default() -> Self {
        Self::new()
    }
}
