//! Core data structures for the cooperation ring protocol.

pub mod coin;
pub mod ring;
pub mod snapshot;
pub mod trader;
