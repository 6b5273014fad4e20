//! Unit tests for the observer registry
//!
//! These tests verify attach/detach rules and notification delivery of `Subject`.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

use facilitator::error::RepositoryError;
use facilitator::observer::{Observer, Subject};

// ============================================================================
// HELPER OBSERVERS
// ============================================================================

/// Records every batch it receives
struct RecordingObserver {
    name: String,
    batches: Mutex<Vec<Vec<u32>>>,
    fail: AtomicBool,
}

impl RecordingObserver {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            batches: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    fn batches(&self) -> Vec<Vec<u32>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Observer<u32> for RecordingObserver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn update(&self, entities: &[u32]) -> Result<()> {
        self.batches.lock().unwrap().push(entities.to_vec());
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("observer {} failed", self.name);
        }
        Ok(())
    }
}

/// Records each batch, then waits for a permit before returning
struct GatedObserver {
    batches: Mutex<Vec<Vec<u32>>>,
    started: Notify,
    permits: Semaphore,
}

impl GatedObserver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(Vec::new()),
            started: Notify::new(),
            permits: Semaphore::new(0),
        })
    }
}

#[async_trait]
impl Observer<u32> for GatedObserver {
    fn name(&self) -> &str {
        "gated"
    }

    async fn update(&self, entities: &[u32]) -> Result<()> {
        self.batches.lock().unwrap().push(entities.to_vec());
        self.started.notify_one();
        self.permits.acquire().await?.forget();
        Ok(())
    }
}

// ============================================================================
// ATTACH / DETACH
// ============================================================================

/// Test that attaching the same observer twice fails
/// What is tested: Duplicate attach detection by instance identity
/// Why: A doubly attached service would submit every transaction twice
#[tokio::test]
async fn test_attach_twice_fails() {
    let subject: Subject<u32> = Subject::new();
    let observer = RecordingObserver::new("a");

    subject.attach(observer.clone()).await.unwrap();
    let result = subject.attach(observer.clone()).await;

    assert_eq!(result, Err(RepositoryError::ObserverAlreadyAttached));
    assert_eq!(subject.observer_count().await, 1);
}

/// Test that two distinct observers can both attach
/// What is tested: Identity is per instance, not per type or name
/// Why: Services of the same type for different gateways must coexist
#[tokio::test]
async fn test_attach_distinct_observers() {
    let subject: Subject<u32> = Subject::new();
    subject.attach(RecordingObserver::new("a")).await.unwrap();
    subject.attach(RecordingObserver::new("a")).await.unwrap();
    assert_eq!(subject.observer_count().await, 2);
}

/// Test that detaching removes the observer and detaching again is a no-op
/// What is tested: detach semantics
/// Why: Detaching an unknown observer must not panic or remove others
#[tokio::test]
async fn test_detach() {
    let subject: Subject<u32> = Subject::new();
    let kept = RecordingObserver::new("kept");
    let removed: Arc<dyn Observer<u32>> = RecordingObserver::new("removed");

    subject.attach(kept.clone()).await.unwrap();
    subject.attach(removed.clone()).await.unwrap();

    subject.detach(&removed).await;
    subject.detach(&removed).await;
    assert_eq!(subject.observer_count().await, 1);

    subject.record(1).await;
    subject.notify().await;
    assert_eq!(kept.batches(), vec![vec![1]]);
}

// ============================================================================
// NOTIFY
// ============================================================================

/// Test that notify delivers the buffer to every observer and then clears it
/// What is tested: One delivery per notify, buffer drained afterwards
/// Why: Observers must see each update exactly once per cycle
#[tokio::test]
async fn test_notify_delivers_and_clears() {
    let subject: Subject<u32> = Subject::new();
    let first = RecordingObserver::new("first");
    let second = RecordingObserver::new("second");
    subject.attach(first.clone()).await.unwrap();
    subject.attach(second.clone()).await.unwrap();

    subject.record(1).await;
    subject.record(2).await;
    subject.notify().await;

    assert_eq!(first.batches(), vec![vec![1, 2]]);
    assert_eq!(second.batches(), vec![vec![1, 2]]);
    assert!(subject.updated_entities().await.is_empty());

    // Nothing buffered: no delivery
    subject.notify().await;
    assert_eq!(first.batches().len(), 1);
}

/// Test that a failing observer does not block the others
/// What is tested: Error isolation between observers
/// Why: One service failing (e.g. RPC down) must not starve the other services
#[tokio::test]
async fn test_failing_observer_does_not_block_others() {
    let subject: Subject<u32> = Subject::new();
    let failing = RecordingObserver::new("failing");
    failing.fail.store(true, Ordering::SeqCst);
    let healthy = RecordingObserver::new("healthy");
    subject.attach(failing.clone()).await.unwrap();
    subject.attach(healthy.clone()).await.unwrap();

    subject.record(7).await;
    subject.notify().await;

    assert_eq!(failing.batches(), vec![vec![7]]);
    assert_eq!(healthy.batches(), vec![vec![7]]);
    assert!(subject.updated_entities().await.is_empty());
}

/// Test that entities recorded without observers are still drained
/// What is tested: notify with no observers attached
/// Why: The buffer must not grow without bound
#[tokio::test]
async fn test_notify_without_observers_drains() {
    let subject: Subject<u32> = Subject::default();
    subject.record(3).await;
    subject.notify().await;
    assert!(subject.updated_entities().await.is_empty());
}

/// Test that overlapping notifications deliver every recorded entity
/// What is tested: A save made while a slow observer runs, with a second notify already waiting
/// Why: An anchor saved during a slow proof request must still reach ProveGateway
#[tokio::test]
async fn test_overlapping_notify_keeps_later_saves() {
    let subject: Arc<Subject<u32>> = Arc::new(Subject::new());
    let observer = GatedObserver::new();
    subject.attach(observer.clone()).await.unwrap();

    subject.record(1).await;
    let first = tokio::spawn({
        let subject = subject.clone();
        async move { subject.notify().await }
    });
    observer.started.notified().await;

    let second = tokio::spawn({
        let subject = subject.clone();
        async move { subject.notify().await }
    });
    tokio::task::yield_now().await;
    subject.record(2).await;

    observer.permits.add_permits(10);
    first.await.unwrap();
    second.await.unwrap();
    subject.notify().await;

    let delivered: Vec<u32> = observer.batches.lock().unwrap().iter().flatten().copied().collect();
    assert_eq!(delivered, vec![1, 2]);
    assert!(subject.updated_entities().await.is_empty());
}
