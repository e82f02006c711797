use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use steward_core::RecordId;

/// Immutable entry of an [`AppendOnlyLog`](crate::AppendOnlyLog).
///
/// Notes:
/// - **Append-only**: `sequence` is 1-based and strictly increasing per log.
/// - `recorded_at` comes from the clock handed to `append`, never from the
///   record itself.
/// - There is no `&mut` accessor; a record cannot change once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record<E> {
    id: RecordId,
    sequence: u64,
    recorded_at: DateTime<Utc>,
    payload: E,
}

impl<E> Record<E> {
    pub(crate) fn new(id: RecordId, sequence: u64, recorded_at: DateTime<Utc>, payload: E) -> Self {
        Self {
            id,
            sequence,
            recorded_at,
            payload,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}
