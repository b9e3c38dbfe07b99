use serde::{Deserialize, Serialize};

/// Lifecycle state of a coin.
///
/// `Expired` and `Paid` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CoinStatus {
    #[default]
    Run,
    Blocked,
    Expired,
    Paid,
}

impl CoinStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, CoinStatus::Expired | CoinStatus::Paid)
    }

    /// Whether a replica may move a coin from `self` to `next`.
    ///
    /// `Blocked -> Run` is the release of a ring that was never committed.
    /// The canonical registry never uses it.
    #[must_use]
    pub fn can_transition_to(self, next: CoinStatus) -> bool {
        matches!(
            (self, next),
            (CoinStatus::Run, CoinStatus::Blocked)
                | (CoinStatus::Blocked, CoinStatus::Run)
                | (CoinStatus::Blocked, CoinStatus::Expired)
                | (CoinStatus::Blocked, CoinStatus::Paid)
        )
    }
}

/// A signed, typed unit of value minted by one trader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Coin {
    /// Hex ed25519 signature over `owner-type-nonce`.
    pub id: String,
    pub amount: f64,
    pub status: CoinStatus,
    pub coin_type: u32,
    pub owner: String,
    /// Trader the coin was minted for. Always equal to `owner` today.
    pub bound_to: String,
    /// Per-owner mint counter covered by the signature.
    pub nonce: u64,
    pub next: Option<String>,
    pub prev: Option<String>,
    pub cooperation_id: Option<String>,
}

impl Coin {
    /// True when the coin carries any ring linkage.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.next.is_some() || self.prev.is_some() || self.cooperation_id.is_some()
    }

    /// Clears `next`/`prev` but keeps the ring the coin settled in.
    pub fn drop_neighbors(&mut self) {
        self.next = None;
        self.prev = None;
    }

    /// Clears ring linkage without touching status.
    pub fn unlink(&mut self) {
        self.next = None;
        self.prev = None;
        self.cooperation_id = None;
    }
}
