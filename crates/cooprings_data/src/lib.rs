//! Plain, serializable records shared by every cooprings crate.
//!
//! Nothing in here knows how a ring is selected or validated; these are the
//! shapes that travel between traders and land in snapshots.

pub mod data;

pub use data::coin::{Coin, CoinStatus};
pub use data::ring::{CooperationRing, FractalRing};
pub use data::snapshot::{SystemSnapshot, TraderRecord, SNAPSHOT_FORMAT_VERSION};
pub use data::trader::{TraderKind, TraderProfile};
