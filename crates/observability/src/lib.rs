//! Shared tracing setup for binaries and test harnesses.
//!
//! Library crates only emit `tracing` events; installing a subscriber is left
//! to whoever owns the process, usually by calling [`init`] once at start-up.

pub mod tracing;

pub use self::tracing::{LogFormat, init, try_init};
