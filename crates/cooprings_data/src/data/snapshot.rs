use super::coin::{Coin, CoinStatus};
use super::ring::FractalRing;
use super::trader::{TraderKind, TraderProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraderRecord {
    pub profile: TraderProfile,
    pub kind: TraderKind,
    /// Next mint counter, so restored traders never reuse a nonce.
    pub next_nonce: u64,
}

/// Canonical registries and counters of a system. Private keys are never part
/// of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub format_version: u32,
    pub saved_at: String,
    pub coin_type_count: u32,
    pub traders: Vec<TraderRecord>,
    pub coins: BTreeMap<String, Coin>,
    pub fractals: BTreeMap<String, FractalRing>,
    pub submit_count: BTreeMap<String, u64>,
    pub accepted_count: BTreeMap<String, u64>,
    pub bad_accept_count: u64,
    pub bad_reject_count: u64,
}

impl SystemSnapshot {
    #[must_use]
    pub fn new(coin_type_count: u32) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            saved_at: String::new(),
            coin_type_count,
            traders: Vec::new(),
            coins: BTreeMap::new(),
            fractals: BTreeMap::new(),
            submit_count: BTreeMap::new(),
            accepted_count: BTreeMap::new(),
            bad_accept_count: 0,
            bad_reject_count: 0,
        }
    }

    /// Looks up a trader record by ID.
    #[must_use]
    pub fn trader(&self, id: &str) -> Option<&TraderRecord> {
        self.traders.iter().find(|t| t.profile.id == id)
    }

    /// Checks the structural invariants a loaded document must satisfy before
    /// it is turned back into a running system.
    pub fn check_invariants(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.format_version == SNAPSHOT_FORMAT_VERSION,
            "Unsupported snapshot format version {}",
            self.format_version
        );
        for (id, coin) in &self.coins {
            anyhow::ensure!(id == &coin.id, "Coin keyed under {} has id {}", id, coin.id);
            anyhow::ensure!(
                coin.coin_type < self.coin_type_count,
                "Coin {} has out-of-range type {}",
                coin.id,
                coin.coin_type
            );
            anyhow::ensure!(
                self.trader(&coin.owner).is_some(),
                "Coin {} owned by unknown trader {}",
                coin.id,
                coin.owner
            );
            if coin.next.is_some() || coin.prev.is_some() {
                anyhow::ensure!(
                    coin.cooperation_id.is_some(),
                    "Linked coin {} has no cooperation ring",
                    coin.id
                );
                anyhow::ensure!(
                    coin.status == CoinStatus::Blocked,
                    "Linked coin {} is {:?}",
                    coin.id,
                    coin.status
                );
            }
        }
        for (id, fractal) in &self.fractals {
            anyhow::ensure!(id == &fractal.id, "Fractal keyed under {} has id {}", id, fractal.id);
            for ring in &fractal.cooperation_rings {
                anyhow::ensure!(
                    ring.members.len() == self.coin_type_count as usize,
                    "Ring {} has {} members, expected {}",
                    ring.id,
                    ring.members.len(),
                    self.coin_type_count
                );
                let mut weight = 0.0;
                for member in &ring.members {
                    let coin = self
                        .coins
                        .get(member)
                        .ok_or_else(|| anyhow::anyhow!("Ring {} references unknown coin {}", ring.id, member))?;
                    weight += coin.amount;
                }
                anyhow::ensure!(
                    weight == ring.weight,
                    "Ring {} weight {} does not match members {}",
                    ring.id,
                    ring.weight,
                    weight
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> SystemSnapshot {
        SystemSnapshot::new(2)
    }

    #[test]
    fn test_empty_snapshot_is_consistent() {
        assert!(empty().check_invariants().is_ok());
    }

    #[test]
    fn test_wrong_version_rejected() {
        let mut snap = empty();
        snap.format_version = 99;
        assert!(snap.check_invariants().is_err());
    }

    #[test]
    fn test_orphan_coin_rejected() {
        let mut snap = empty();
        snap.coins.insert(
            "c1".into(),
            Coin {
                id: "c1".into(),
                amount: 1.0,
                status: crate::CoinStatus::Run,
                coin_type: 0,
                owner: "ghost".into(),
                bound_to: "ghost".into(),
                nonce: 0,
                next: None,
                prev: None,
                cooperation_id: None,
            },
        );
        assert!(snap.check_invariants().is_err());
    }

    #[test]
    fn test_settled_coin_with_neighbors_rejected() {
        let mut snap = empty();
        snap.traders.push(TraderRecord {
            profile: TraderProfile {
                id: "t1".into(),
                account: 0.0,
                wallet: "w1".into(),
                public_key: "00".into(),
            },
            kind: TraderKind::Normal,
            next_nonce: 1,
        });
        let mut coin = Coin {
            id: "c1".into(),
            amount: 1.0,
            status: CoinStatus::Paid,
            owner: "t1".into(),
            bound_to: "t1".into(),
            cooperation_id: Some("r1".into()),
            ..Coin::default()
        };
        snap.coins.insert("c1".into(), coin.clone());
        assert!(snap.check_invariants().is_ok());

        coin.next = Some("c2".into());
        snap.coins.insert("c1".into(), coin);
        assert!(snap.check_invariants().is_err());
    }
}
