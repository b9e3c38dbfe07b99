use serde::{Deserialize, Serialize};

/// How a trader votes when it sits on a verification team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TraderKind {
    #[default]
    Normal,
    RandomVoter,
    BadVoter,
}

/// The public half of a trader, as every other replica sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraderProfile {
    pub id: String,
    pub account: f64,
    pub wallet: String,
    /// Hex ed25519 verifying key.
    pub public_key: String,
}
