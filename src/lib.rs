//! Minimal personal time tracker. Clients post trigger events that mark where one activity ends
//! and the next one starts, and ask for the time spent on every activity so far.
//!

pub mod analysis;
pub mod config;
pub mod error;
pub mod server;
pub mod storage;
pub mod utils;
