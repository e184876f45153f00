//! In-process feed transport, for tests and anywhere a local mock of the
//! upstream store is enough.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;
use wayfind_core::FacilityId;

use crate::error::FeedError;
use crate::record::{RawRecord, RawSnapshot};
use crate::repository::FacilityFeed;
use crate::writer::{FacilityWriter, NewFacility};

/// Receiving side; hand this to a [`crate::FacilityRepository`].
pub struct MemoryFeed {
    rx: mpsc::UnboundedReceiver<RawSnapshot>,
}

impl MemoryFeed {
    /// A connected feed and the handle that drives it.
    #[must_use]
    pub fn new() -> (Self, MemoryFeedHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = MemoryFeedHandle {
            tx,
            state: Arc::new(Mutex::new(StoreState::default())),
        };
        (Self { rx }, handle)
    }
}

impl FacilityFeed for MemoryFeed {
    async fn next_snapshot(&mut self) -> Option<RawSnapshot> {
        self.rx.recv().await
    }
}

#[derive(Debug, Default)]
struct StoreState {
    records: Vec<RawRecord>,
    appended: u64,
}

/// Writes to the in-memory store. Every mutation re-emits the full
/// snapshot. Dropping every handle closes the feed.
#[derive(Clone)]
pub struct MemoryFeedHandle {
    tx: mpsc::UnboundedSender<RawSnapshot>,
    state: Arc<Mutex<StoreState>>,
}

impl MemoryFeedHandle {
    /// Replace the whole collection.
    pub async fn replace(&self, snapshot: RawSnapshot) {
        let mut state = self.state.lock().await;
        state.records = snapshot.records;
        self.emit(&state);
    }

    /// Remove one record; returns whether it existed.
    pub async fn remove(&self, key: &str) -> bool {
        let mut state = self.state.lock().await;
        let before = state.records.len();
        state.records.retain(|r| r.key != key);
        let removed = state.records.len() != before;
        if removed {
            self.emit(&state);
        }
        removed
    }

    /// Number of records currently stored.
    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn emit(&self, state: &StoreState) {
        let snapshot = RawSnapshot::new(state.records.clone());
        if self.tx.send(snapshot).is_err() {
            tracing::debug!("memory feed has no subscriber; snapshot discarded");
        }
    }
}

impl FacilityWriter for MemoryFeedHandle {
    async fn append(&self, facility: NewFacility) -> Result<FacilityId, FeedError> {
        facility.validate()?;
        let mut state = self.state.lock().await;
        state.appended += 1;
        // Sequence prefix keeps keys sorted by creation, like push ids.
        let suffix = Uuid::new_v4().simple().to_string();
        let key = format!("m{:010}-{}", state.appended, &suffix[..12]);
        state.records.push(RawRecord {
            key: key.clone(),
            value: facility.to_record(Utc::now()),
        });
        self.emit(&state);
        tracing::info!(facility_id = %key, "facility appended to memory feed");
        Ok(FacilityId::new(key))
    }
}
