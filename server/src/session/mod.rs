//! Session management for inbound envelope streams
//!
//! This module handles:
//! - Reassembling envelopes from each connection
//! - Validating every envelope received
//! - Tracking open sessions and sink-wide totals

mod connection;
mod manager;

pub use connection::SinkSession;
pub use manager::SessionManager;
