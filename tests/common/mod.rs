pub mod macros;

use cooprings_lib::model::config::AppConfig;
use cooprings_lib::model::system::System;

#[allow(dead_code)]
pub struct SystemBuilder {
    config: AppConfig,
}

#[allow(dead_code)]
impl SystemBuilder {
    /// Six honest traders, two coin types, and fractals small enough to
    /// form after a handful of coins.
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.protocol.fractal_min = 1;
        config.protocol.fractal_max = 2;
        config.protocol.verification_min = 2;
        config.protocol.verification_max = 3;
        config.simulation.coin_type_count = 2;
        config.simulation.num_traders = 6;
        config.simulation.num_random_voters = 0;
        config.simulation.num_bad_voters = 0;
        config.simulation.max_coin_amount = 1.0;
        config.simulation.round_length_ms = 5;
        config.simulation.shutdown_grace_ms = 2_000;
        config.simulation.seed = Some(42);
        Self { config }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.simulation.seed = Some(seed);
        self
    }

    pub fn with_traders(mut self, normal: usize, random: usize, bad: usize) -> Self {
        self.config.simulation.num_traders = normal + random + bad;
        self.config.simulation.num_random_voters = random;
        self.config.simulation.num_bad_voters = bad;
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        modifier(&mut self.config);
        self
    }

    pub fn config(&self) -> AppConfig {
        self.config.clone()
    }

    pub fn build(self) -> System {
        let mut system = System::new(self.config).expect("valid test config");
        system.init().expect("trader registration");
        system
    }
}

/// Compares two snapshots, ignoring when they were taken.
#[allow(dead_code)]
pub fn same_state(
    a: &cooprings_lib::model::data::SystemSnapshot,
    b: &cooprings_lib::model::data::SystemSnapshot,
) -> bool {
    let mut b = b.clone();
    b.saved_at = a.saved_at.clone();
    *a == b
}
