//! Wire shape of a feed snapshot.
//!
//! The upstream store is a key-value collection: each key is an opaque
//! facility id and each value a flat JSON object. An empty collection is
//! delivered as `null`.

use serde_json::Value;

use crate::error::FeedError;

/// One keyed record, exactly as it arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub key: String,
    pub value: Value,
}

/// The full current contents of the collection, in delivery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSnapshot {
    pub records: Vec<RawRecord>,
}

impl RawSnapshot {
    #[must_use]
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    /// Interpret a collection payload.
    ///
    /// Objects become one record per key, in key order (push-style ids
    /// sort in creation order). `null` is the empty collection. Arrays are
    /// accepted with their index as key, since the realtime-database REST
    /// API returns arrays for integer-keyed data.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UnexpectedShape`] for any other JSON value.
    pub fn from_json(payload: Value) -> Result<Self, FeedError> {
        match payload {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self::new(
                map.into_iter()
                    .map(|(key, value)| RawRecord { key, value })
                    .collect(),
            )),
            Value::Array(items) => Ok(Self::new(
                items
                    .into_iter()
                    .enumerate()
                    .filter(|(_, value)| !value.is_null())
                    .map(|(idx, value)| RawRecord {
                        key: idx.to_string(),
                        value,
                    })
                    .collect(),
            )),
            other => Err(FeedError::UnexpectedShape(format!(
                "expected an object keyed by facility id, got {other}"
            ))),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
