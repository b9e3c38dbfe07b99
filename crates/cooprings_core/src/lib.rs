//! # Cooprings Core
//!
//! The protocol engine for the cooperation ring simulator.
//!
//! Traders mint signed, typed coins and broadcast them. Every trader keeps a
//! replica of what it has seen and deterministically binds one coin of each
//! type into a cooperation ring. Once enough rings pile up, a trader groups a
//! batch of them into a fractal ring and names a verification team, which
//! re-derives the fractal from its own replicas and votes on it.
//!
//! Everything here is synchronous and deterministic given its inputs; the
//! orchestrator in the root crate adds locking, timing, and fan-out.
//!
//! ## Example
//!
//! ```
//! use cooprings_core::cooperation::derive_ring;
//! use cooprings_core::ledger::CoinLedger;
//! use cooprings_data::Coin;
//!
//! let mut ledger = CoinLedger::new(2);
//! for (id, coin_type, amount) in [("a", 0, 5.0), ("b", 1, 10.0)] {
//!     ledger
//!         .insert_run(Coin {
//!             id: id.into(),
//!             amount,
//!             coin_type,
//!             owner: "o".into(),
//!             bound_to: "o".into(),
//!             ..Coin::default()
//!         })
//!         .unwrap();
//! }
//! let ring = derive_ring(&ledger).unwrap().unwrap();
//! assert_eq!(ring.weight, 15.0);
//! ```

/// Protocol and simulation configuration
pub mod config;
/// Cooperation ring selection and binding
pub mod cooperation;
/// Typed protocol errors
pub mod error;
/// Fractal ring aggregation and team selection
pub mod fractal;
/// The fixed hashing contract behind all selection
pub mod hashing;
/// Per-replica coin store
pub mod ledger;
/// Metrics collection and structured logging
pub mod metrics;
/// Run statistics
pub mod report;
/// Payout computation
pub mod settlement;
/// Keys, coin signatures, trader IDs
pub mod signing;
/// The trader replica
pub mod trader;
/// Vote casting and quorum
pub mod voting;
