//! Live facility set: transport snapshots in, normalized snapshots out.

use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use tokio::task::JoinHandle;
use wayfind_core::{Facility, LongitudePolicy};

use crate::normalize::normalize_snapshot;
use crate::record::RawSnapshot;

/// A source of full raw snapshots.
///
/// `next_snapshot` resolves with the whole current collection each time it
/// changes, and with `None` once the transport has shut down for good.
pub trait FacilityFeed: Send + 'static {
    fn next_snapshot(&mut self) -> impl Future<Output = Option<RawSnapshot>> + Send;
}

/// One delivered facility set. Each snapshot replaces the previous one
/// wholesale; `revision` increases by one per delivery.
#[derive(Debug, Clone, Default)]
pub struct FacilitySnapshot {
    pub revision: u64,
    pub facilities: Arc<Vec<Facility>>,
}

impl Deref for FacilitySnapshot {
    type Target = [Facility];

    fn deref(&self) -> &Self::Target {
        &self.facilities
    }
}

/// Normalizes a [`FacilityFeed`] for one subscriber.
pub struct FacilityRepository<F> {
    feed: F,
    policy: LongitudePolicy,
}

impl<F: FacilityFeed> FacilityRepository<F> {
    #[must_use]
    pub fn new(feed: F, policy: LongitudePolicy) -> Self {
        Self { feed, policy }
    }

    /// Start delivering snapshots to `on_snapshot`.
    ///
    /// Malformed records are dropped from each snapshot; the subscription
    /// itself keeps running. Must be called from within a Tokio runtime.
    pub fn subscribe<C>(self, on_snapshot: C) -> FeedSubscription
    where
        C: FnMut(FacilitySnapshot) + Send + 'static,
    {
        let task = tokio::spawn(run_feed(self.feed, self.policy, on_snapshot));
        FeedSubscription { task: Some(task) }
    }
}

async fn run_feed<F, C>(mut feed: F, policy: LongitudePolicy, mut on_snapshot: C)
where
    F: FacilityFeed,
    C: FnMut(FacilitySnapshot) + Send + 'static,
{
    let mut revision = 0u64;
    tracing::info!(policy = %policy, "facility feed subscribed");

    while let Some(raw) = feed.next_snapshot().await {
        revision += 1;
        let facilities = normalize_snapshot(&raw, policy);
        tracing::debug!(
            revision,
            received = raw.len(),
            kept = facilities.len(),
            "facility snapshot delivered"
        );
        on_snapshot(FacilitySnapshot {
            revision,
            facilities: Arc::new(facilities),
        });
    }

    tracing::info!(revision, "facility feed closed");
}

/// Handle to a running feed subscription. Dropping it cancels the
/// subscription.
pub struct FeedSubscription {
    task: Option<JoinHandle<()>>,
}

impl FeedSubscription {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the subscription and wait for the delivery task to end.
    ///
    /// No callback runs after this returns. Calling it again is a no-op.
    pub async fn unsubscribe(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        task.abort();
        match task.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => tracing::warn!(error = %e, "facility feed task ended abnormally"),
        }
        tracing::debug!("facility feed unsubscribed");
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
