//! Domain events
//!
//! Snapshots published after a committed state change, consumed by the
//! export / notification side.

pub mod types;

pub use types::*;
