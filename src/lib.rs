//! # Cooprings
//!
//! Orchestration for the cooperation ring simulator: the [`model::system::System`]
//! that owns the canonical registries and every trader replica, and the
//! [`app::App`] that drives a timed run from the command line.

pub mod app;
pub mod model;
