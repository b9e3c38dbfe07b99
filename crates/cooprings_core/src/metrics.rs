//! Run metrics and logging setup.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use atomic_float::AtomicF64;

/// Counters shared by the orchestrator and the trader tasks.
pub struct Metrics {
    coins_processed: AtomicU64,
    rings_committed: AtomicU64,
    fractals_submitted: AtomicU64,
    fractals_accepted: AtomicU64,
    fractals_rejected: AtomicU64,
    rounds_failed: AtomicU64,
    total_paid: AtomicF64,
    pub counters: Mutex<HashMap<String, AtomicU64>>,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("coins_processed", &self.coins_processed())
            .field("fractals_accepted", &self.fractals_accepted())
            .field("total_paid", &self.total_paid())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            coins_processed: AtomicU64::new(0),
            rings_committed: AtomicU64::new(0),
            fractals_submitted: AtomicU64::new(0),
            fractals_accepted: AtomicU64::new(0),
            fractals_rejected: AtomicU64::new(0),
            rounds_failed: AtomicU64::new(0),
            total_paid: AtomicF64::new(0.0),
            counters: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    pub fn record_coin(&self, duration: Duration) {
        let coins = self.coins_processed.fetch_add(1, Ordering::Relaxed) + 1;

        // Log at info level every 1000 coins
        if coins.is_multiple_of(1000) {
            tracing::info!(
                coins = coins,
                fractals = self.fractals_accepted(),
                duration_us = duration.as_micros() as u64,
                "Coins processed"
            );
        }
    }

    /// Counts cooperation rings committed by an accepted fractal.
    pub fn record_committed_rings(&self, count: usize) {
        self.rings_committed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_submission(&self, accepted: bool) {
        self.fractals_submitted.fetch_add(1, Ordering::Relaxed);
        if accepted {
            self.fractals_accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.fractals_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a settled fractal: rounds it completed and what it paid out.
    pub fn record_settlement(&self, rounds: u32, rounds_count: u32, paid: f64) {
        if rounds < rounds_count {
            self.rounds_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_paid.fetch_add(paid, Ordering::Relaxed);
    }

    /// Increments a named counter.
    pub fn increment_counter(&self, name: &str) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn coins_processed(&self) -> u64 {
        self.coins_processed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn rings_committed(&self) -> u64 {
        self.rings_committed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn fractals_submitted(&self) -> u64 {
        self.fractals_submitted.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn fractals_accepted(&self) -> u64 {
        self.fractals_accepted.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn fractals_rejected(&self) -> u64 {
        self.fractals_rejected.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn rounds_failed(&self) -> u64 {
        self.rounds_failed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total_paid(&self) -> f64 {
        self.total_paid.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn log_summary(&self) {
        tracing::info!(
            coins = self.coins_processed(),
            rings_committed = self.rings_committed(),
            submitted = self.fractals_submitted(),
            accepted = self.fractals_accepted(),
            rejected = self.fractals_rejected(),
            rounds_failed = self.rounds_failed(),
            total_paid = self.total_paid(),
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Run summary"
        );
    }
}

/// Installs the fmt subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .finish(),
    )
    .ok();
}
