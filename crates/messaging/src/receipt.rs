//! Read receipts: append-only record of who read which message.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use steward_core::{Clock, IdGenerator, RecordId};
use steward_events::{AppendOnlyLog, Event, Record};
use steward_identity::UserId;

use crate::message::MessageId;

/// Event: a user read a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRead {
    pub message: MessageId,
    pub reader: UserId,
}

impl Event for MessageRead {
    fn event_type(&self) -> &'static str {
        "messaging.message.read"
    }
}

/// Immutable proof that `reader` read `message` at `read_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    id: RecordId,
    sequence: u64,
    message: MessageId,
    reader: UserId,
    read_at: DateTime<Utc>,
}

impl ReadReceipt {
    fn from_record(record: &Record<MessageRead>) -> Self {
        Self {
            id: record.id(),
            sequence: record.sequence(),
            message: record.payload().message,
            reader: record.payload().reader,
            read_at: record.recorded_at(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn message(&self) -> MessageId {
        self.message
    }

    pub fn reader(&self) -> UserId {
        self.reader
    }

    pub fn read_at(&self) -> DateTime<Utc> {
        self.read_at
    }
}

/// Append-only history of message reads.
///
/// Appending happens through [`Message::record_read`](crate::Message::record_read).
/// Reading the same message twice records two receipts; [`read_count`]
/// counts distinct readers.
///
/// [`read_count`]: ReadLog::read_count
#[derive(Debug, Clone, Default)]
pub struct ReadLog {
    log: AppendOnlyLog<MessageRead>,
}

impl ReadLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(
        &mut self,
        event: MessageRead,
        ids: &dyn IdGenerator,
        clock: &dyn Clock,
    ) -> ReadReceipt {
        ReadReceipt::from_record(self.log.append(event, ids, clock))
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// All receipts in the order they were recorded.
    pub fn receipts(&self) -> impl Iterator<Item = ReadReceipt> + '_ {
        self.log.iter().map(ReadReceipt::from_record)
    }

    /// Receipts for one message, in the order they were recorded.
    pub fn receipts_for(&self, message: MessageId) -> impl Iterator<Item = ReadReceipt> + '_ {
        self.receipts().filter(move |r| r.message == message)
    }

    pub fn has_read(&self, message: MessageId, reader: UserId) -> bool {
        self.log
            .iter()
            .any(|r| r.payload().message == message && r.payload().reader == reader)
    }

    /// Number of distinct users who read `message`.
    pub fn read_count(&self, message: MessageId) -> usize {
        self.log
            .iter()
            .filter(|r| r.payload().message == message)
            .map(|r| r.payload().reader)
            .collect::<HashSet<_>>()
            .len()
    }
}
