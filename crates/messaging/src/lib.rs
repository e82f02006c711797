//! Messaging boundary (messages and their read history).
//!
//! This boundary refers to users and groups by identifier only
//! ([`UserId`](steward_identity::UserId), [`GroupId`](steward_identity::GroupId));
//! it never holds a `User` or a `Group`.

pub mod message;
pub mod receipt;

pub use message::{Message, MessageId, MessagePolicy};
pub use receipt::{MessageRead, ReadLog, ReadReceipt};
