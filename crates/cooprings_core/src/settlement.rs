//! Payouts for a cooperation ring once its fractal has been voted on.

use cooprings_data::{Coin, CoinStatus, CooperationRing};

use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Payout {
    pub coin_id: String,
    pub owner: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub ring_id: String,
    pub rounds: u32,
    /// `Expired` for a partial run, `Paid` for a full one.
    pub status: CoinStatus,
    pub payouts: Vec<Payout>,
}

impl Settlement {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.payouts.iter().map(|p| p.amount).sum()
    }
}

/// Splits `investor_amount * rounds / rounds_count` across the members in
/// proportion to their coin amounts. A ring that survives every round also
/// pays `fractal_prize` per member.
///
/// `lookup` resolves coin IDs against whichever store holds the ring.
pub fn settle_ring<'a, F>(
    ring: &CooperationRing,
    lookup: F,
    rounds: u32,
    config: &ProtocolConfig,
) -> Result<Settlement>
where
    F: Fn(&str) -> Option<&'a Coin>,
{
    let coin = |id: &str| lookup(id).ok_or_else(|| ProtocolError::UnknownCoin(id.to_string()));
    let rounds = rounds.min(config.rounds_count);
    let reference = coin(&ring.investor)?.amount;
    let money = reference * f64::from(rounds) / f64::from(config.rounds_count);
    let complete = rounds == config.rounds_count;

    let payouts = ring
        .members
        .iter()
        .map(|member| -> Result<Payout> {
            let coin = coin(member)?;
            let mut amount = money * coin.amount / ring.weight;
            if complete {
                amount += config.fractal_prize;
            }
            Ok(Payout {
                coin_id: coin.id.clone(),
                owner: coin.owner.clone(),
                amount,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Settlement {
        ring_id: ring.id.clone(),
        rounds,
        status: if complete {
            CoinStatus::Paid
        } else {
            CoinStatus::Expired
        },
        payouts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooperation::derive_ring;
    use crate::ledger::CoinLedger;

    fn setup(a: f64, b: f64) -> (CoinLedger, CooperationRing) {
        let mut ledger = CoinLedger::new(2);
        for (id, coin_type, amount, owner) in [("a", 0, a, "alice"), ("b", 1, b, "bob")] {
            ledger
                .insert_run(Coin {
                    id: id.into(),
                    amount,
                    coin_type,
                    owner: owner.into(),
                    bound_to: owner.into(),
                    ..Coin::default()
                })
                .unwrap();
        }
        let ring = derive_ring(&ledger).unwrap().unwrap();
        (ledger, ring)
    }

    #[test]
    fn test_partial_run_expires() {
        let (ledger, ring) = setup(5.0, 10.0);
        let config = ProtocolConfig::default();
        let s = settle_ring(&ring, |id| ledger.get(id), 4, &config).unwrap();
        assert_eq!(s.status, CoinStatus::Expired);
        // money = 5 * 4 / 10 = 2
        assert!((s.payouts[0].amount - 2.0 * 5.0 / 15.0).abs() < 1e-12);
        assert!((s.payouts[1].amount - 2.0 * 10.0 / 15.0).abs() < 1e-12);
        assert!((s.total() - 2.0).abs() < 1e-12);
        assert_eq!(s.payouts[1].owner, "bob");
    }

    #[test]
    fn test_full_run_pays_prize() {
        let (ledger, ring) = setup(5.0, 10.0);
        let config = ProtocolConfig::default();
        let s = settle_ring(&ring, |id| ledger.get(id), 10, &config).unwrap();
        assert_eq!(s.status, CoinStatus::Paid);
        assert!((s.total() - (5.0 + 2.0 * config.fractal_prize)).abs() < 1e-12);
    }

    #[test]
    fn test_zero_rounds_pays_nothing() {
        let (ledger, ring) = setup(5.0, 10.0);
        let s = settle_ring(&ring, |id| ledger.get(id), 0, &ProtocolConfig::default()).unwrap();
        assert_eq!(s.status, CoinStatus::Expired);
        assert_eq!(s.total(), 0.0);
    }
}
