use cooprings_core::error::{ProtocolError, Result};
use cooprings_core::settlement::{settle_ring, Settlement};
use cooprings_core::voting::{completed_rounds, Tally, Vote};
use cooprings_data::CoinStatus;

use super::System;

impl System {
    /// Puts an accepted fractal through its voting rounds and settles every
    /// ring. Returns the rounds completed and the total paid out.
    pub(crate) fn run_fractal(&mut self, fractal_id: &str) -> Result<(u32, f64)> {
        let fractal = self
            .fractals
            .get(fractal_id)
            .ok_or_else(|| ProtocolError::fractal_mismatch(fractal_id, "not committed"))?;
        let team = fractal.verification_team.clone();
        let ring_ids: Vec<String> = fractal.ring_ids().map(str::to_string).collect();
        let rounds_count = self.config.protocol.rounds_count;

        let traders = &self.traders;
        let rng = &mut self.rng;
        let rounds = completed_rounds(rounds_count, |_| {
            team.iter()
                .map(|member| traders.get(member).map_or(Vote::Disagree, |t| t.vote(&mut *rng)))
                .collect::<Tally>()
        });

        let mut paid = 0.0;
        for ring_id in &ring_ids {
            paid += self.apply_ring(fractal_id, ring_id, rounds)?;
        }
        if let Some(fractal) = self.fractals.get_mut(fractal_id) {
            fractal.successful_rounds = Some(rounds);
        }
        self.metrics.record_settlement(rounds, rounds_count, paid);
        tracing::debug!(fractal = %fractal_id, rounds, paid, "Fractal settled");
        Ok((rounds, paid))
    }

    /// Pays out one ring, closes its coins canonically, and tells every
    /// replica.
    fn apply_ring(&mut self, fractal_id: &str, ring_id: &str, rounds: u32) -> Result<f64> {
        let settlement = self.compute_settlement(fractal_id, ring_id, rounds)?;

        for payout in &settlement.payouts {
            let coin = self
                .coins
                .get_mut(&payout.coin_id)
                .ok_or_else(|| ProtocolError::UnknownCoin(payout.coin_id.clone()))?;
            if !coin.status.can_transition_to(settlement.status) {
                return Err(ProtocolError::InvalidTransition {
                    id: coin.id.clone(),
                    from: coin.status,
                    to: settlement.status,
                });
            }
            coin.status = settlement.status;
            coin.drop_neighbors();
            for trader in self.traders.values_mut() {
                trader.update_balance(&payout.owner, payout.amount)?;
            }
        }

        for trader in self.traders.values_mut() {
            match settlement.status {
                CoinStatus::Paid => trader.pay_ring(ring_id, rounds)?,
                _ => trader.expire_ring(ring_id, rounds)?,
            }
        }

        if let Some(ring) = self
            .fractals
            .get_mut(fractal_id)
            .and_then(|f| f.cooperation_rings.iter_mut().find(|r| r.id == ring_id))
        {
            ring.rounds = Some(rounds);
        }
        Ok(settlement.total())
    }

    fn compute_settlement(&self, fractal_id: &str, ring_id: &str, rounds: u32) -> Result<Settlement> {
        let ring = self
            .fractals
            .get(fractal_id)
            .and_then(|f| f.cooperation_rings.iter().find(|r| r.id == ring_id))
            .ok_or_else(|| ProtocolError::UnknownRing(ring_id.to_string()))?;
        settle_ring(ring, |id| self.coins.get(id), rounds, &self.config.protocol)
    }
}
