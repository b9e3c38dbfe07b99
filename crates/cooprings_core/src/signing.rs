//! Trader identity: ed25519 keys, coin signatures, and wallet-derived IDs.

use cooprings_data::Coin;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{ProtocolError, Result};

/// A trader's signing key. Never serialized.
#[derive(Clone)]
pub struct TraderKeys {
    signing: SigningKey,
}

impl std::fmt::Debug for TraderKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraderKeys")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}

impl TraderKeys {
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(&seed),
        }
    }

    pub fn generate<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    #[must_use]
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing.verifying_key().to_bytes())
    }

    /// Signs `owner-type-nonce`; the hex signature becomes the coin ID.
    pub fn sign_coin(&self, owner: &str, coin_type: u32, nonce: u64) -> Result<String> {
        let signature = self
            .signing
            .try_sign(&coin_message(owner, coin_type, nonce))
            .map_err(|e| ProtocolError::Signing(e.to_string()))?;
        Ok(hex::encode(signature.to_bytes()))
    }
}

#[must_use]
pub fn coin_message(owner: &str, coin_type: u32, nonce: u64) -> Vec<u8> {
    format!("{owner}-{coin_type}-{nonce}").into_bytes()
}

pub fn parse_public_key(trader_id: &str, public_key_hex: &str) -> Result<VerifyingKey> {
    let invalid = || ProtocolError::InvalidPublicKey(trader_id.to_string());
    let bytes = hex::decode(public_key_hex).map_err(|_| invalid())?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|_| invalid())?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| invalid())
}

/// Checks that `coin.id` is the owner's signature over the coin's claim.
pub fn verify_coin(public_key_hex: &str, coin: &Coin) -> Result<()> {
    let key = parse_public_key(&coin.owner, public_key_hex)?;
    let invalid = || ProtocolError::InvalidSignature(coin.id.clone());
    let raw = hex::decode(&coin.id).map_err(|_| invalid())?;
    let signature = Signature::from_slice(&raw).map_err(|_| invalid())?;
    key.verify(
        &coin_message(&coin.owner, coin.coin_type, coin.nonce),
        &signature,
    )
    .map_err(|_| invalid())
}

/// `hex(SHA-256("{wallet}-{type_count}"))`
#[must_use]
pub fn trader_id(wallet: &str, type_count: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{wallet}-{type_count}").as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn coin_for(keys: &TraderKeys, owner: &str, coin_type: u32, nonce: u64) -> Coin {
        Coin {
            id: keys.sign_coin(owner, coin_type, nonce).unwrap(),
            amount: 5.0,
            coin_type,
            owner: owner.to_string(),
            bound_to: owner.to_string(),
            nonce,
            ..Coin::default()
        }
    }

    #[test]
    fn test_signature_round_trip() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let keys = TraderKeys::generate(&mut rng);
        let coin = coin_for(&keys, "alice", 1, 0);
        assert!(verify_coin(&keys.public_key_hex(), &coin).is_ok());
    }

    #[test]
    fn test_tampered_coin_fails() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let keys = TraderKeys::generate(&mut rng);
        let mut coin = coin_for(&keys, "alice", 1, 0);
        coin.coin_type = 2;
        assert_eq!(
            verify_coin(&keys.public_key_hex(), &coin),
            Err(ProtocolError::InvalidSignature(coin.id.clone()))
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let alice = TraderKeys::generate(&mut rng);
        let mallory = TraderKeys::generate(&mut rng);
        let coin = coin_for(&mallory, "alice", 0, 3);
        assert!(verify_coin(&alice.public_key_hex(), &coin).is_err());
    }

    #[test]
    fn test_bad_public_key() {
        assert_eq!(
            parse_public_key("t1", "zz").unwrap_err(),
            ProtocolError::InvalidPublicKey("t1".into())
        );
    }

    #[test]
    fn test_trader_id_depends_on_type_count() {
        assert_eq!(trader_id("w", 3), trader_id("w", 3));
        assert_ne!(trader_id("w", 3), trader_id("w", 4));
        assert_eq!(trader_id("w", 3).len(), 64);
    }

    #[test]
    fn test_same_seed_same_keys() {
        let a = TraderKeys::from_seed([9; 32]);
        let b = TraderKeys::from_seed([9; 32]);
        assert_eq!(a.public_key_hex(), b.public_key_hex());
    }
}
