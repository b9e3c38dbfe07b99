use std::collections::BTreeMap;
use std::sync::Arc;

use cooprings_core::config::AppConfig;
use cooprings_core::error::{ProtocolError, Result};
use cooprings_core::metrics::Metrics;
use cooprings_core::trader::Trader;
use cooprings_data::{TraderKind, TraderProfile};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use super::System;

/// The first `random` traders vote randomly, the next `bad` always
/// disagree, and the rest are honest.
fn kind_for(index: usize, random: usize, bad: usize) -> TraderKind {
    if index < random {
        TraderKind::RandomVoter
    } else if index < random + bad {
        TraderKind::BadVoter
    } else {
        TraderKind::Normal
    }
}

impl System {
    /// An empty system. Call [`System::init`] to create traders.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let rng = if let Some(seed) = config.simulation.seed {
            ChaCha8Rng::seed_from_u64(seed)
        } else {
            ChaCha8Rng::from_entropy()
        };
        Ok(Self {
            config,
            traders: BTreeMap::new(),
            coins: BTreeMap::new(),
            fractals: BTreeMap::new(),
            submit_count: BTreeMap::new(),
            accepted_count: BTreeMap::new(),
            bad_accept_count: 0,
            bad_reject_count: 0,
            rng,
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// Creates `num_traders` traders and registers every trader with every
    /// other, itself included.
    pub fn init(&mut self) -> Result<()> {
        let sim = &self.config.simulation;
        let (random, bad) = (sim.num_random_voters, sim.num_bad_voters);
        let type_count = sim.coin_type_count;
        let max_account = sim.max_initial_account;
        let protocol = self.config.protocol.clone();

        // Seeds are drawn in order so a seeded run creates the same traders.
        let seeds: Vec<(TraderKind, u64)> = (0..sim.num_traders)
            .map(|i| (kind_for(i, random, bad), self.rng.gen()))
            .collect();
        let created: Vec<Trader> = seeds
            .into_par_iter()
            .map(|(kind, seed)| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                Trader::generate(kind, type_count, max_account, protocol.clone(), &mut rng)
            })
            .collect();

        for trader in created {
            let id = trader.id().to_string();
            if self.traders.contains_key(&id) {
                return Err(ProtocolError::TraderAlreadyExists(id));
            }
            self.traders.insert(id, trader);
        }
        tracing::info!(
            traders = self.traders.len(),
            random_voters = random,
            bad_voters = bad,
            "Traders created"
        );

        self.register_all()
    }

    /// Sends every trader's profile to every replica. The first failure in
    /// trader order is returned.
    pub(crate) fn register_all(&mut self) -> Result<()> {
        let profiles: Vec<TraderProfile> =
            self.traders.values().map(|t| t.profile().clone()).collect();
        let results: Vec<Result<()>> = self
            .traders
            .par_iter_mut()
            .map(|(_, trader)| {
                profiles
                    .iter()
                    .try_for_each(|p| trader.save_trader(p.clone()))
            })
            .collect();
        results.into_iter().collect()
    }
}
