use cooprings_data::CoinStatus;
use thiserror::Error;

/// Coarse grouping of protocol failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected input: bad signature, unknown owner, duplicate record.
    Malformed,
    /// A replica derived a different fractal than the one it was asked to verify.
    Disagreement,
    /// Two proposals competed for the same coins.
    Conflict,
    /// State that should be impossible, or a step that could not run at all.
    Infrastructure,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Coin already exists: {0}")]
    CoinAlreadyExists(String),

    #[error("Invalid coin type {coin_type} (type count {type_count})")]
    InvalidCoinType { coin_type: u32, type_count: u32 },

    #[error("Invalid coin amount: {0}")]
    InvalidAmount(f64),

    #[error("Coin {0} is bound to a trader other than its owner")]
    BindingMismatch(String),

    #[error("Unknown trader: {0}")]
    UnknownTrader(String),

    #[error("Invalid signature on coin {0}")]
    InvalidSignature(String),

    #[error("Coin {0} arrived already linked into a ring")]
    CoinAlreadyLinked(String),

    #[error("Coin {0} is not running")]
    CoinNotRunning(String),

    #[error("Unknown coin: {0}")]
    UnknownCoin(String),

    #[error("Unknown cooperation ring: {0}")]
    UnknownRing(String),

    #[error("Cooperation ring ID collision: {0}")]
    RingCollision(String),

    #[error("Trader already exists: {0}")]
    TraderAlreadyExists(String),

    #[error("Trader ID {0} does not match its wallet")]
    InvalidTraderId(String),

    #[error("Invalid public key for trader {0}")]
    InvalidPublicKey(String),

    #[error("Fractal ring {id} rejected: {reason}")]
    FractalMismatch { id: String, reason: String },

    #[error("Coin {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: String,
        from: CoinStatus,
        to: CoinStatus,
    },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Verification team unavailable: need {needed} traders, {known} known")]
    QuorumUnavailable { needed: usize, known: usize },
}

impl ProtocolError {
    pub fn fractal_mismatch(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FractalMismatch {
            id: id.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::CoinAlreadyExists(_)
            | Self::InvalidCoinType { .. }
            | Self::InvalidAmount(_)
            | Self::BindingMismatch(_)
            | Self::UnknownTrader(_)
            | Self::InvalidSignature(_)
            | Self::CoinAlreadyLinked(_)
            | Self::TraderAlreadyExists(_)
            | Self::InvalidTraderId(_)
            | Self::InvalidPublicKey(_) => ErrorClass::Malformed,
            Self::FractalMismatch { .. } => ErrorClass::Disagreement,
            Self::CoinNotRunning(_) => ErrorClass::Conflict,
            Self::UnknownCoin(_)
            | Self::UnknownRing(_)
            | Self::RingCollision(_)
            | Self::InvalidTransition { .. }
            | Self::Signing(_)
            | Self::QuorumUnavailable { .. } => ErrorClass::Infrastructure,
        }
    }

    /// Fatal errors halt a strict run; the rest are logged and skipped.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Infrastructure
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
