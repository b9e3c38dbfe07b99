use std::sync::{Arc, Mutex};
use std::time::Duration;

use cooprings_core::error::{ProtocolError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::{mpsc, watch};

use super::{MintOutcome, System};

pub type SharedSystem = Arc<Mutex<System>>;

/// Counts from one synchronous round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundStats {
    pub minted: usize,
    pub exhausted: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub errors: usize,
}

/// Logs a coin-event error. Returns true when the run should halt.
fn triage(err: &ProtocolError, strict: bool) -> bool {
    if err.is_fatal() {
        tracing::error!(error = %err, class = ?err.class(), "Protocol error");
        strict
    } else {
        tracing::debug!(error = %err, class = ?err.class(), "Coin event rejected");
        false
    }
}

impl System {
    #[must_use]
    pub fn into_shared(self) -> SharedSystem {
        Arc::new(Mutex::new(self))
    }

    /// One tick for every trader, in ID order, drawing amounts and types
    /// from the system RNG. A seeded system replays the same run.
    pub fn run_round(&mut self) -> Result<RoundStats> {
        let mut stats = RoundStats::default();
        let ids: Vec<String> = self.traders.keys().cloned().collect();
        let max_amount = self.config.simulation.max_coin_amount;
        let type_count = self.coin_type_count();
        let strict = self.config.simulation.strict;

        for id in ids {
            let amount = self.rng.gen_range(f64::EPSILON..max_amount);
            let coin_type = self.rng.gen_range(0..type_count);
            match self.mint_and_process(&id, amount, coin_type) {
                Ok(MintOutcome::Exhausted) => stats.exhausted += 1,
                Ok(MintOutcome::Processed(outcome)) => {
                    stats.minted += 1;
                    match outcome {
                        Some(super::FractalOutcome::Accepted { .. }) => stats.accepted += 1,
                        Some(super::FractalOutcome::Rejected { .. }) => stats.rejected += 1,
                        None => {}
                    }
                }
                Err(e) => {
                    stats.errors += 1;
                    if triage(&e, strict) {
                        return Err(e);
                    }
                }
            }
        }
        Ok(stats)
    }

    /// Runs every trader as its own task until `finish` flips to true, every
    /// trader runs out of funds, or a strict run hits a fatal error.
    ///
    /// Each tick mints one coin and processes it on the blocking pool while
    /// holding the system lock. Once stopped, tasks get `shutdown_grace_ms`
    /// to wind down.
    pub async fn start(shared: SharedSystem, mut finish: watch::Receiver<bool>) -> Result<()> {
        let (ids, seeds, sim) = {
            let mut system = shared.lock().unwrap_or_else(|e| e.into_inner());
            let ids: Vec<String> = system.traders.keys().cloned().collect();
            let seeds: Vec<u64> = ids.iter().map(|_| system.rng.gen()).collect();
            (ids, seeds, system.config.simulation.clone())
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let (err_tx, mut err_rx) = mpsc::unbounded_channel::<ProtocolError>();
        let round_length = Duration::from_millis(sim.round_length_ms);

        let handles: Vec<_> = ids
            .into_iter()
            .zip(seeds)
            .map(|(id, seed)| {
                tokio::spawn(mint_loop(
                    shared.clone(),
                    id,
                    ChaCha8Rng::seed_from_u64(seed),
                    round_length,
                    sim.max_coin_amount,
                    sim.coin_type_count,
                    stop_rx.clone(),
                    err_tx.clone(),
                ))
            })
            .collect();
        drop(err_tx);
        tracing::info!(traders = handles.len(), "Run started");

        let mut halted = None;
        if !*finish.borrow_and_update() {
            loop {
                tokio::select! {
                    received = err_rx.recv() => match received {
                        Some(err) => {
                            if triage(&err, sim.strict) {
                                halted = Some(err);
                                break;
                            }
                        }
                        // Every task has exited.
                        None => break,
                    },
                    changed = finish.changed() => {
                        if changed.is_err() || *finish.borrow() {
                            break;
                        }
                    }
                }
            }
        }

        stop_tx.send(true).ok();
        tracing::info!("Waiting for traders to finish...");
        let grace = Duration::from_millis(sim.shutdown_grace_ms);
        if tokio::time::timeout(grace, futures::future::join_all(handles))
            .await
            .is_err()
        {
            tracing::warn!(grace_ms = sim.shutdown_grace_ms, "Traders still busy after grace period");
        }

        match halted {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn mint_loop(
    shared: SharedSystem,
    trader_id: String,
    mut rng: ChaCha8Rng,
    round_length: Duration,
    max_amount: f64,
    type_count: u32,
    mut stop: watch::Receiver<bool>,
    errors: mpsc::UnboundedSender<ProtocolError>,
) {
    let mut ticker = tokio::time::interval(round_length);
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = ticker.tick() => {
                if *stop.borrow() {
                    break;
                }
                let amount = rng.gen_range(f64::EPSILON..max_amount);
                let coin_type = rng.gen_range(0..type_count);
                let system = shared.clone();
                let id = trader_id.clone();
                let result = tokio::task::spawn_blocking(move || {
                    let mut system = system.lock().unwrap_or_else(|e| e.into_inner());
                    system.mint_and_process(&id, amount, coin_type)
                })
                .await;
                match result {
                    Ok(Ok(MintOutcome::Exhausted)) => {
                        tracing::debug!(trader = %trader_id, "Trader out of funds");
                        break;
                    }
                    Ok(Ok(MintOutcome::Processed(_))) => {}
                    Ok(Err(err)) => {
                        if errors.send(err).is_err() {
                            break;
                        }
                    }
                    Err(join_err) => {
                        tracing::error!(trader = %trader_id, error = %join_err, "Coin event panicked");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triage_policy() {
        let fatal = ProtocolError::RingCollision("r".into());
        let benign = ProtocolError::InvalidSignature("c".into());
        assert!(triage(&fatal, true));
        assert!(!triage(&fatal, false));
        assert!(!triage(&benign, true));
    }
}
