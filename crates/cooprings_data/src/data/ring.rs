use serde::{Deserialize, Serialize};

/// One coin of every type bound together under a reproducible ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooperationRing {
    pub id: String,
    /// Coin IDs indexed by coin type.
    pub members: Vec<String>,
    pub weight: f64,
    /// The type-0 member.
    pub investor: String,
    /// Rounds completed at settlement; `None` while pending.
    pub rounds: Option<u32>,
    pub next: Option<String>,
    pub prev: Option<String>,
    pub fractal_id: Option<String>,
}

impl CooperationRing {
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_solo(&self) -> bool {
        self.fractal_id.is_none()
    }
}

/// A batch of cooperation rings plus the team that verifies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalRing {
    pub id: String,
    pub cooperation_rings: Vec<CooperationRing>,
    pub verification_team: Vec<String>,
    /// Proposer who derived the claim.
    pub proposer: String,
    /// Ground truth for metrics only. Never consulted by the protocol.
    pub is_valid: bool,
    pub successful_rounds: Option<u32>,
}

impl FractalRing {
    pub fn ring_ids(&self) -> impl Iterator<Item = &str> {
        self.cooperation_rings.iter().map(|r| r.id.as_str())
    }

    pub fn coin_ids(&self) -> impl Iterator<Item = &str> {
        self.cooperation_rings
            .iter()
            .flat_map(|r| r.members.iter().map(String::as_str))
    }
}
