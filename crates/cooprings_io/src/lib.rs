//! # Cooprings IO
//!
//! Persistence for the cooperation ring simulator: typed I/O errors and
//! snapshot save/load with optional gzip compression.

/// Error types and result aliases for I/O operations
pub mod error;
/// Snapshot files
pub mod snapshot;

pub use error::{IoError, Result};
pub use snapshot::{load_snapshot, save_snapshot};
