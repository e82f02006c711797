//! Immutable, append-only history.
//!
//! Events describe things that happened; an [`AppendOnlyLog`] stamps them
//! with an identifier, a sequence number and a timestamp and never lets them
//! change afterwards.

pub mod event;
pub mod log;
pub mod record;

pub use event::Event;
pub use log::{AppendOnlyLog, Records};
pub use record::Record;
