//! Configuration for the protocol and the simulation that drives it.
//!
//! Values come from the `Default` impls, then an optional `config.toml`, then
//! command-line flags. Protocol parameters must agree across every replica; the
//! simulation parameters only shape the workload.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [protocol]
//! rounds_count = 10
//! fractal_min = 500
//! fractal_max = 2000
//!
//! [simulation]
//! coin_type_count = 3
//! num_traders = 100
//! seed = 42
//! ```

use serde::{Deserialize, Serialize};

/// Parameters every replica must share to derive the same rings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Voting rounds per fractal; also the denominator of the payout.
    pub rounds_count: u32,
    /// Bounds on cooperation rings per fractal, inclusive.
    pub fractal_min: usize,
    pub fractal_max: usize,
    /// Bounds on verification team size, inclusive.
    pub verification_min: usize,
    pub verification_max: usize,
    /// Bonus paid per coin when a ring survives every round.
    pub fractal_prize: f64,
    /// Disagree probability for random adversarial voters.
    pub bad_behavior: f64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            rounds_count: 10,
            fractal_min: 500,
            fractal_max: 2000,
            verification_min: 20,
            verification_max: 50,
            fractal_prize: 1.0,
            bad_behavior: 0.2,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub coin_type_count: u32,
    pub num_traders: usize,
    /// The first `num_random_voters` traders vote randomly.
    pub num_random_voters: usize,
    /// The next `num_bad_voters` always disagree.
    pub num_bad_voters: usize,
    pub run_seconds: u64,
    pub round_length_ms: u64,
    pub max_coin_amount: f64,
    pub max_initial_account: f64,
    pub shutdown_grace_ms: u64,
    pub seed: Option<u64>,
    /// Halt on the first fatal protocol error instead of logging it.
    pub strict: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            coin_type_count: 3,
            num_traders: 100,
            num_random_voters: 30,
            num_bad_voters: 30,
            run_seconds: 90,
            round_length_ms: 100,
            max_coin_amount: 10.0,
            max_initial_account: 1000.0,
            shutdown_grace_ms: 10_000,
            seed: None,
            strict: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub protocol: ProtocolConfig,
    pub simulation: SimulationConfig,
}

impl AppConfig {
    /// Validates all configuration parameters.
    pub fn validate(&self) -> anyhow::Result<()> {
        let p = &self.protocol;
        anyhow::ensure!(p.rounds_count > 0, "Rounds count must be positive");
        anyhow::ensure!(p.fractal_min > 0, "Fractal minimum must be positive");
        anyhow::ensure!(
            p.fractal_min <= p.fractal_max,
            "Fractal minimum must not exceed fractal maximum"
        );
        anyhow::ensure!(
            p.verification_min > 0,
            "Verification minimum must be positive"
        );
        anyhow::ensure!(
            p.verification_min <= p.verification_max,
            "Verification minimum must not exceed verification maximum"
        );
        anyhow::ensure!(
            p.fractal_prize >= 0.0,
            "Fractal prize must be non-negative"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&p.bad_behavior),
            "Bad behavior probability must be in [0.0, 1.0]"
        );

        let s = &self.simulation;
        anyhow::ensure!(s.coin_type_count > 0, "Coin type count must be positive");
        anyhow::ensure!(s.num_traders > 0, "Trader count must be positive");
        anyhow::ensure!(
            s.num_random_voters + s.num_bad_voters <= s.num_traders,
            "Adversarial voters cannot outnumber traders"
        );
        anyhow::ensure!(s.round_length_ms > 0, "Round length must be positive");
        anyhow::ensure!(
            s.max_coin_amount.is_finite() && s.max_coin_amount > f64::EPSILON,
            "Maximum coin amount must be finite and above {}",
            f64::EPSILON
        );
        anyhow::ensure!(
            s.max_initial_account > 0.0,
            "Maximum initial account must be positive"
        );

        Ok(())
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Hash of the protocol section. Replicas with different fingerprints
    /// will never agree on a fractal.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.protocol).as_bytes());
        hex::encode(hasher.finalize())
    }
}
