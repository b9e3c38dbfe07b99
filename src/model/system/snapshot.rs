use std::collections::BTreeMap;

use cooprings_core::config::AppConfig;
use cooprings_core::signing::TraderKeys;
use cooprings_core::trader::Trader;
use cooprings_data::{SystemSnapshot, TraderProfile, SNAPSHOT_FORMAT_VERSION};
use rayon::prelude::*;

use super::System;

impl System {
    /// Captures the canonical state. Replicas are not saved; they are
    /// rebuilt from the canonical registries on restore.
    #[must_use]
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            saved_at: chrono::Utc::now().to_rfc3339(),
            coin_type_count: self.coin_type_count(),
            traders: self.traders.values().map(Trader::record).collect(),
            coins: self.coins.clone(),
            fractals: self.fractals.clone(),
            submit_count: self.submit_count.clone(),
            accepted_count: self.accepted_count.clone(),
            bad_accept_count: self.bad_accept_count,
            bad_reject_count: self.bad_reject_count,
        }
    }

    /// Rebuilds a system from a snapshot. Private keys are never saved, so
    /// every trader comes back under a fresh key pair; the coin type count
    /// always follows the snapshot.
    pub fn restore(snapshot: &SystemSnapshot, mut config: AppConfig) -> anyhow::Result<Self> {
        snapshot.check_invariants()?;
        config.simulation.coin_type_count = snapshot.coin_type_count;
        let mut system = Self::new(config)?;
        let type_count = snapshot.coin_type_count;

        let mut traders = BTreeMap::new();
        for record in &snapshot.traders {
            let keys = TraderKeys::generate(&mut system.rng);
            let trader = Trader::restore(record, type_count, keys, system.config.protocol.clone());
            if trader.id() != record.profile.id {
                anyhow::bail!(
                    "Trader {} does not match its wallet under {} coin types",
                    record.profile.id,
                    type_count
                );
            }
            traders.insert(trader.id().to_string(), trader);
        }

        let profiles: Vec<TraderProfile> = traders.values().map(|t| t.profile().clone()).collect();
        let results: Vec<cooprings_core::error::Result<()>> = traders
            .par_iter_mut()
            .map(|(_, trader)| {
                trader.restore_replica(&profiles, snapshot.coins.values(), snapshot.fractals.values())
            })
            .collect();
        results
            .into_iter()
            .collect::<cooprings_core::error::Result<()>>()?;

        system.traders = traders;
        system.coins = snapshot.coins.clone();
        system.fractals = snapshot.fractals.clone();
        system.submit_count = snapshot.submit_count.clone();
        system.accepted_count = snapshot.accepted_count.clone();
        system.bad_accept_count = snapshot.bad_accept_count;
        system.bad_reject_count = snapshot.bad_reject_count;
        tracing::info!(
            traders = system.traders.len(),
            coins = system.coins.len(),
            fractals = system.fractals.len(),
            "System restored"
        );
        Ok(system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config(seed: u64) -> AppConfig {
        let mut config = AppConfig::default();
        config.simulation.num_traders = 4;
        config.simulation.num_random_voters = 0;
        config.simulation.num_bad_voters = 0;
        config.simulation.coin_type_count = 2;
        config.simulation.seed = Some(seed);
        config
    }

    #[test]
    fn test_snapshot_of_fresh_system() {
        let mut system = System::new(tiny_config(1)).unwrap();
        system.init().unwrap();
        let snapshot = system.snapshot();
        assert_eq!(snapshot.traders.len(), 4);
        assert!(snapshot.coins.is_empty());
        assert!(snapshot.check_invariants().is_ok());
    }

    #[test]
    fn test_restore_rotates_keys() {
        let mut system = System::new(tiny_config(2)).unwrap();
        system.init().unwrap();
        let before = system.snapshot();

        let restored = System::restore(&before, tiny_config(3)).unwrap();
        let after = restored.snapshot();
        assert_eq!(before.traders.len(), after.traders.len());
        for (old, new) in before.traders.iter().zip(&after.traders) {
            assert_eq!(old.profile.id, new.profile.id);
            assert_eq!(old.profile.wallet, new.profile.wallet);
            assert_ne!(old.profile.public_key, new.profile.public_key);
        }
    }

    #[test]
    fn test_restore_follows_snapshot_type_count() {
        let mut system = System::new(tiny_config(4)).unwrap();
        system.init().unwrap();
        let snapshot = system.snapshot();

        let mut other = tiny_config(5);
        other.simulation.coin_type_count = 7;
        let restored = System::restore(&snapshot, other).unwrap();
        assert_eq!(restored.coin_type_count(), 2);
    }
}
