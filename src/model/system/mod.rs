//! The orchestrator that stands in for the network.
//!
//! `System` holds the canonical coin and fractal registries, every trader's
//! replica, and the submission counters. All of it sits behind one lock
//! while a run is in progress, so every coin event is processed to
//! completion before the next one starts.

mod init;
mod process;
mod run;
mod settle;
mod snapshot;

pub use process::{FractalOutcome, MintOutcome};
pub use run::{RoundStats, SharedSystem};

use std::collections::BTreeMap;
use std::sync::Arc;

use cooprings_core::config::AppConfig;
use cooprings_core::metrics::Metrics;
use cooprings_core::trader::Trader;
use cooprings_data::{Coin, FractalRing};
use rand_chacha::ChaCha8Rng;

#[derive(Debug)]
pub struct System {
    pub config: AppConfig,
    pub(crate) traders: BTreeMap<String, Trader>,
    pub(crate) coins: BTreeMap<String, Coin>,
    pub(crate) fractals: BTreeMap<String, FractalRing>,
    pub(crate) submit_count: BTreeMap<String, u64>,
    pub(crate) accepted_count: BTreeMap<String, u64>,
    pub(crate) bad_accept_count: u64,
    pub(crate) bad_reject_count: u64,
    pub(crate) rng: ChaCha8Rng,
    pub metrics: Arc<Metrics>,
}

impl System {
    pub fn trader(&self, id: &str) -> Option<&Trader> {
        self.traders.get(id)
    }

    pub fn trader_mut(&mut self, id: &str) -> Option<&mut Trader> {
        self.traders.get_mut(id)
    }

    /// Trader IDs in sorted order.
    pub fn trader_ids(&self) -> impl Iterator<Item = &str> {
        self.traders.keys().map(String::as_str)
    }

    pub fn traders(&self) -> impl Iterator<Item = &Trader> {
        self.traders.values()
    }

    pub fn coin(&self, id: &str) -> Option<&Coin> {
        self.coins.get(id)
    }

    pub fn coins(&self) -> impl Iterator<Item = &Coin> {
        self.coins.values()
    }

    pub fn fractal(&self, id: &str) -> Option<&FractalRing> {
        self.fractals.get(id)
    }

    pub fn fractals(&self) -> impl Iterator<Item = &FractalRing> {
        self.fractals.values()
    }

    #[must_use]
    pub fn submit_count(&self, trader_id: &str) -> u64 {
        self.submit_count.get(trader_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn accepted_count(&self, trader_id: &str) -> u64 {
        self.accepted_count.get(trader_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn bad_accept_count(&self) -> u64 {
        self.bad_accept_count
    }

    #[must_use]
    pub fn bad_reject_count(&self) -> u64 {
        self.bad_reject_count
    }

    #[must_use]
    pub fn coin_type_count(&self) -> u32 {
        self.config.simulation.coin_type_count
    }
}
