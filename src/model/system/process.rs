use std::time::Instant;

use cooprings_core::error::{ProtocolError, Result};
use cooprings_core::trader::validate_incoming;
use cooprings_core::voting::{Tally, Vote};
use cooprings_data::{Coin, CoinStatus, FractalRing};
use rand::seq::SliceRandom;
use rayon::prelude::*;

use super::System;

/// What became of a fractal that was put to its verification team.
#[derive(Debug, Clone, PartialEq)]
pub enum FractalOutcome {
    Rejected {
        fractal_id: String,
        dissent: usize,
        team_size: usize,
    },
    Accepted {
        fractal_id: String,
        rounds: u32,
        paid: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MintOutcome {
    /// The trader's account no longer covers the drawn amount.
    Exhausted,
    Processed(Option<FractalOutcome>),
}

impl System {
    /// Has `trader_id` mint a coin and runs the full coin event for it.
    pub fn mint_and_process(
        &mut self,
        trader_id: &str,
        amount: f64,
        coin_type: u32,
    ) -> Result<MintOutcome> {
        let trader = self
            .traders
            .get_mut(trader_id)
            .ok_or_else(|| ProtocolError::UnknownTrader(trader_id.to_string()))?;
        if trader.account() < amount {
            return Ok(MintOutcome::Exhausted);
        }
        let coin = trader.create_coin(amount, coin_type)?;

        let started = Instant::now();
        let outcome = self.process_coin(coin);
        self.metrics.record_coin(started.elapsed());
        outcome.map(MintOutcome::Processed)
    }

    /// The coin event: record the coin, broadcast it to every replica, then
    /// let traders (owner first, the rest shuffled) try to form a fractal.
    /// The first trader that produces one submits it; no one else is asked.
    pub fn process_coin(&mut self, coin: Coin) -> Result<Option<FractalOutcome>> {
        if self.coins.contains_key(&coin.id) {
            return Err(ProtocolError::CoinAlreadyExists(coin.id));
        }
        let owner = self.traders.get(&coin.owner).map(|t| t.profile());
        validate_incoming(&coin, self.coin_type_count(), owner)?;

        self.coins.insert(coin.id.clone(), coin.clone());
        self.broadcast_coin(&coin)?;

        for trader_id in self.proposal_order(&coin.owner) {
            let Some(trader) = self.traders.get_mut(&trader_id) else {
                continue;
            };
            if let Some(fractal) = trader.check_for_rings()? {
                *self.submit_count.entry(trader_id.clone()).or_insert(0) += 1;
                return self.handle_fractal(&trader_id, fractal).map(Some);
            }
        }
        Ok(None)
    }

    /// `SaveCoin` on every replica in parallel. The first failure in trader
    /// order is returned.
    fn broadcast_coin(&mut self, coin: &Coin) -> Result<()> {
        let results: Vec<Result<()>> = self
            .traders
            .par_iter_mut()
            .map(|(_, trader)| trader.save_coin(coin.clone()).map(|_| ()))
            .collect();
        results.into_iter().collect()
    }

    fn proposal_order(&mut self, owner: &str) -> Vec<String> {
        let mut others: Vec<String> = self
            .traders
            .keys()
            .filter(|id| id.as_str() != owner)
            .cloned()
            .collect();
        others.shuffle(&mut self.rng);
        let mut order = Vec::with_capacity(others.len() + 1);
        if self.traders.contains_key(owner) {
            order.push(owner.to_string());
        }
        order.extend(others);
        order
    }

    fn handle_fractal(&mut self, proposer: &str, fractal: FractalRing) -> Result<FractalOutcome> {
        let tally = self.collect_votes(&fractal)?;

        if tally.rejected() {
            self.rollback(proposer, &fractal.id)?;
            if fractal.is_valid {
                self.bad_reject_count += 1;
            }
            self.metrics.record_submission(false);
            tracing::debug!(
                proposer = %proposer,
                fractal = %fractal.id,
                dissent = tally.disagree,
                team = tally.team_size(),
                "Fractal rejected"
            );
            return Ok(FractalOutcome::Rejected {
                fractal_id: fractal.id,
                dissent: tally.disagree,
                team_size: tally.team_size(),
            });
        }

        if let Err(e) = self.check_coins(&fractal) {
            self.rollback(proposer, &fractal.id)?;
            self.metrics.record_submission(false);
            self.metrics.increment_counter("conflicting_fractals");
            return Err(e);
        }
        self.inform_others(&fractal)?;

        *self.accepted_count.entry(proposer.to_string()).or_insert(0) += 1;
        if !fractal.is_valid {
            self.bad_accept_count += 1;
        }
        self.metrics.record_submission(true);
        self.metrics.record_committed_rings(fractal.cooperation_rings.len());
        tracing::debug!(
            proposer = %proposer,
            fractal = %fractal.id,
            rings = fractal.cooperation_rings.len(),
            team = fractal.verification_team.len(),
            "Fractal accepted"
        );

        let fractal_id = fractal.id.clone();
        self.fractals.insert(fractal_id.clone(), fractal);
        let (rounds, paid) = self.run_fractal(&fractal_id)?;
        Ok(FractalOutcome::Accepted {
            fractal_id,
            rounds,
            paid,
        })
    }

    /// Every team member validates the claim against its own replica and
    /// votes. A failed validation counts as dissent.
    fn collect_votes(&mut self, fractal: &FractalRing) -> Result<Tally> {
        let mut tally = Tally::default();
        for member in &fractal.verification_team {
            let trader = self
                .traders
                .get(member)
                .ok_or(ProtocolError::QuorumUnavailable {
                    needed: fractal.verification_team.len(),
                    known: self.traders.len(),
                })?;
            let vote = match trader.submit_ring(fractal, &mut self.rng) {
                Ok(vote) => vote,
                Err(e) => {
                    tracing::debug!(member = %member, error = %e, "Verification failed");
                    Vote::Disagree
                }
            };
            tally.record(vote);
        }
        Ok(tally)
    }

    fn rollback(&mut self, proposer: &str, fractal_id: &str) -> Result<()> {
        let trader = self
            .traders
            .get_mut(proposer)
            .ok_or_else(|| ProtocolError::UnknownTrader(proposer.to_string()))?;
        trader.remove_fractal_ring(fractal_id)?;
        Ok(())
    }

    /// Every coin of the fractal must still be running canonically.
    fn check_coins(&self, fractal: &FractalRing) -> Result<()> {
        for coin_id in fractal.coin_ids() {
            let coin = self
                .coins
                .get(coin_id)
                .ok_or_else(|| ProtocolError::UnknownCoin(coin_id.to_string()))?;
            if coin.status != CoinStatus::Run {
                return Err(ProtocolError::CoinNotRunning(coin_id.to_string()));
            }
        }
        Ok(())
    }

    /// Blocks the fractal's coins canonically, then tells every replica.
    fn inform_others(&mut self, fractal: &FractalRing) -> Result<()> {
        for ring in &fractal.cooperation_rings {
            let links = cooprings_core::cooperation::cycle_links(&ring.members);
            for (member, (next, prev)) in ring.members.iter().zip(links) {
                let coin = self
                    .coins
                    .get_mut(member)
                    .ok_or_else(|| ProtocolError::UnknownCoin(member.clone()))?;
                coin.status = CoinStatus::Blocked;
                coin.cooperation_id = Some(ring.id.clone());
                coin.next = Some(next);
                coin.prev = Some(prev);
            }
        }
        for trader in self.traders.values_mut() {
            trader.inform_fractal_ring(fractal)?;
        }
        Ok(())
    }
}
