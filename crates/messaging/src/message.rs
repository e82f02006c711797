//! Message entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use steward_core::{
    Clock, DomainError, DomainResult, Entity, FieldReader, IdGenerator, RawInput,
    ValidatedEntity, ValidationError, config::env_or, typed_id,
};
use steward_identity::{GroupId, UserId};

use crate::receipt::{MessageRead, ReadLog, ReadReceipt};

typed_id!(
    /// Identifier of a message.
    MessageId,
    "MessageId"
);

/// Rules for composing and editing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagePolicy {
    pub max_body_length: usize,
}

impl Default for MessagePolicy {
    fn default() -> Self {
        Self {
            max_body_length: 4000,
        }
    }
}

impl MessagePolicy {
    /// Defaults overridden by `STEWARD_MESSAGE_MAX_LEN`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_body_length: env_or("STEWARD_MESSAGE_MAX_LEN", d.max_body_length),
        }
    }

    pub fn with_max_body_length(mut self, max: usize) -> Self {
        self.max_body_length = max;
        self
    }

    fn body(&self, raw: &str) -> Result<String, String> {
        let body = raw.trim();
        if body.is_empty() {
            return Err("must not be empty".to_string());
        }
        if body.chars().count() > self.max_body_length {
            return Err(format!("must be at most {} characters", self.max_body_length));
        }
        Ok(body.to_string())
    }
}

/// A message posted by a user into a group.
///
/// # Invariants
/// - The body is never empty.
/// - An edit is never dated before the message was posted.
///
/// Reading a message never changes it; reads are appended to a [`ReadLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    author: UserId,
    channel: GroupId,
    body: String,
    posted_at: DateTime<Utc>,
    edited_at: Option<DateTime<Utc>>,
}

impl Entity for Message {
    type Id = MessageId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl ValidatedEntity for Message {
    const KIND: &'static str = "message";

    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.id.identifier().is_nil() {
            out.push("identifier must not be nil".to_string());
        }
        if self.body.trim().is_empty() {
            out.push("a message needs a body".to_string());
        }
        if self.edited_at.is_some_and(|edited| edited < self.posted_at) {
            out.push("a message cannot be edited before it was posted".to_string());
        }
        out
    }
}

impl Message {
    /// Compose a new message. Whether `author` may post into `channel` is
    /// decided by the caller, which owns both boundaries.
    pub fn compose(
        author: UserId,
        channel: GroupId,
        body: &str,
        policy: &MessagePolicy,
        ids: &dyn IdGenerator,
        clock: &dyn Clock,
    ) -> Result<Message, ValidationError> {
        let body = policy
            .body(body)
            .map_err(|e| ValidationError::single("body", e))?;
        let message = Message::construct(Message {
            id: MessageId::generate(ids),
            author,
            channel,
            body,
            posted_at: clock.now(),
            edited_at: None,
        })?;
        debug!(message_id = %message.id, author = %author, channel = %channel, "message composed");
        Ok(message)
    }

    /// Rebuild a message from a stored record.
    pub fn from_import_record(
        record: &RawInput,
        policy: &MessagePolicy,
    ) -> Result<Message, ValidationError> {
        let mut r = FieldReader::new(record);
        let id = r
            .required_str("id")
            .and_then(|raw| r.check("id", raw.parse::<MessageId>()));
        let author = r
            .required_str("author")
            .and_then(|raw| r.check("author", raw.parse::<UserId>()));
        let channel = r
            .required_str("channel")
            .and_then(|raw| r.check("channel", raw.parse::<GroupId>()));
        let body = r
            .required_str("body")
            .and_then(|raw| r.check("body", policy.body(&raw)));
        let posted_at = r.required_as::<DateTime<Utc>>("posted_at");
        let edited_at = r.optional_as::<DateTime<Utc>>("edited_at");

        r.finish()?;
        let (Some(id), Some(author), Some(channel), Some(body), Some(posted_at)) =
            (id, author, channel, body, posted_at)
        else {
            return Err(ValidationError::single("input", "incomplete message record"));
        };

        Ok(Message::construct(Message {
            id,
            author,
            channel,
            body,
            posted_at,
            edited_at,
        })?)
    }

    /// Export in the shape [`Message::from_import_record`] accepts.
    pub fn to_import_record(&self) -> RawInput {
        let mut record = RawInput::new();
        record.insert("id".into(), json!(self.id.to_string()));
        record.insert("author".into(), json!(self.author.to_string()));
        record.insert("channel".into(), json!(self.channel.to_string()));
        record.insert("body".into(), json!(self.body));
        record.insert("posted_at".into(), json!(self.posted_at));
        if let Some(edited_at) = self.edited_at {
            record.insert("edited_at".into(), json!(edited_at));
        }
        record
    }

    pub fn message_id(&self) -> MessageId {
        self.id
    }

    pub fn author(&self) -> UserId {
        self.author
    }

    pub fn channel(&self) -> GroupId {
        self.channel
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn posted_at(&self) -> DateTime<Utc> {
        self.posted_at
    }

    pub fn edited_at(&self) -> Option<DateTime<Utc>> {
        self.edited_at
    }

    pub fn is_edited(&self) -> bool {
        self.edited_at.is_some()
    }

    /// Replace the body. Only the author may edit.
    pub fn edit(
        &mut self,
        editor: UserId,
        body: &str,
        policy: &MessagePolicy,
        clock: &dyn Clock,
    ) -> DomainResult<()> {
        if editor != self.author {
            return Err(DomainError::unauthorized(format!(
                "{editor} is not the author of {}",
                self.id
            )));
        }
        let body = policy
            .body(body)
            .map_err(|e| DomainError::invariant(format!("body: {e}")))?;
        self.commit(Self {
            body,
            edited_at: Some(clock.now()),
            ..self.clone()
        })?;
        info!(message_id = %self.id, "message edited");
        Ok(())
    }

    /// Record that `reader` read this message.
    ///
    /// The message itself is not touched; a new receipt is appended to `log`.
    pub fn record_read(
        &self,
        reader: UserId,
        log: &mut ReadLog,
        ids: &dyn IdGenerator,
        clock: &dyn Clock,
    ) -> ReadReceipt {
        log.record(
            MessageRead {
                message: self.id,
                reader,
            },
            ids,
            clock,
        )
    }
}
