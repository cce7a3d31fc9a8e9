//! Storage is organized through [event_log::EventLog].
//!  - Events are kept in memory in the order they were recorded.
//!  - The whole sequence is rewritten into a single JSON file after every change.

pub mod entities;
pub mod event_log;
