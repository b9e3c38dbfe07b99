//! Deterministic selection of cooperation rings from a replica's coin queues.

use cooprings_data::CooperationRing;

use crate::error::{ProtocolError, Result};
use crate::hashing::{digest_word, hash_id, pick_index};
use crate::ledger::CoinLedger;

/// `(next, prev)` for each position of a cycle over `ids`.
#[must_use]
pub fn cycle_links<S: AsRef<str>>(ids: &[S]) -> Vec<(String, String)> {
    let n = ids.len();
    (0..n)
        .map(|i| {
            (
                ids[(i + 1) % n].as_ref().to_string(),
                ids[(i + n - 1) % n].as_ref().to_string(),
            )
        })
        .collect()
}

/// Picks one queued coin per type, or `None` if any type has nothing queued.
///
/// Type `t` is chosen by hashing the members picked so far together with
/// the sorted queue of type `t`.
#[must_use]
pub fn select_members(ledger: &CoinLedger) -> Option<Vec<String>> {
    if !ledger.buckets_ready() {
        return None;
    }
    let mut members: Vec<String> = Vec::with_capacity(ledger.type_count() as usize);
    for coin_type in 0..ledger.type_count() {
        let bucket = ledger.bucket(coin_type)?;
        let candidates: Vec<&String> = bucket.iter().collect();
        let word = digest_word(members.iter().chain(candidates.iter().copied()));
        members.push(candidates[pick_index(word, candidates.len())].clone());
    }
    Some(members)
}

pub fn ring_weight(ledger: &CoinLedger, members: &[String]) -> Result<f64> {
    members.iter().try_fold(0.0, |acc, id| {
        ledger
            .get(id)
            .map(|coin| acc + coin.amount)
            .ok_or_else(|| ProtocolError::UnknownCoin(id.clone()))
    })
}

/// Derives the next ring without touching the ledger.
pub fn derive_ring(ledger: &CoinLedger) -> Result<Option<CooperationRing>> {
    let Some(members) = select_members(ledger) else {
        return Ok(None);
    };
    let weight = ring_weight(ledger, &members)?;
    Ok(Some(CooperationRing {
        id: hash_id(&members),
        investor: members[0].clone(),
        weight,
        members,
        rounds: None,
        next: None,
        prev: None,
        fractal_id: None,
    }))
}

/// Links the ring's coins into a cycle and blocks them.
pub fn bind_ring(ledger: &mut CoinLedger, ring: &CooperationRing) -> Result<()> {
    for (member, (next, prev)) in ring.members.iter().zip(cycle_links(&ring.members)) {
        ledger.bind(member, &ring.id, &next, &prev)?;
    }
    Ok(())
}

/// Checks a claimed ring against the local ledger. Returns the reason on
/// mismatch.
pub fn verify_ring(ledger: &CoinLedger, ring: &CooperationRing) -> std::result::Result<(), String> {
    if ring.members.len() != ledger.type_count() as usize {
        return Err(format!(
            "ring {} has {} members, expected {}",
            ring.id,
            ring.members.len(),
            ledger.type_count()
        ));
    }
    for (coin_type, member) in ring.members.iter().enumerate() {
        let coin = ledger
            .get(member)
            .ok_or_else(|| format!("ring {} references unknown coin {member}", ring.id))?;
        if coin.coin_type as usize != coin_type {
            return Err(format!("coin {member} sits in the wrong slot of ring {}", ring.id));
        }
    }
    if ring.id != hash_id(&ring.members) {
        return Err(format!("ring {} does not hash to its members", ring.id));
    }
    if ring.investor != ring.members[0] {
        return Err(format!("ring {} names the wrong investor", ring.id));
    }
    let weight = ring_weight(ledger, &ring.members).map_err(|e| e.to_string())?;
    if weight != ring.weight {
        return Err(format!(
            "ring {} claims weight {}, local weight is {weight}",
            ring.id, ring.weight
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cooprings_data::{Coin, CoinStatus};

    fn ledger_with(coins: &[(&str, u32, f64)]) -> CoinLedger {
        let mut ledger = CoinLedger::new(2);
        for (id, coin_type, amount) in coins {
            ledger
                .insert_run(Coin {
                    id: (*id).to_string(),
                    amount: *amount,
                    coin_type: *coin_type,
                    owner: "o".into(),
                    bound_to: "o".into(),
                    ..Coin::default()
                })
                .unwrap();
        }
        ledger
    }

    #[test]
    fn test_cycle_links() {
        let links = cycle_links(&["a", "b", "c"]);
        assert_eq!(links[0], ("b".to_string(), "c".to_string()));
        assert_eq!(links[2], ("a".to_string(), "b".to_string()));
        let single = cycle_links(&["x"]);
        assert_eq!(single[0], ("x".to_string(), "x".to_string()));
    }

    #[test]
    fn test_no_ring_until_every_type_present() {
        let ledger = ledger_with(&[("a", 0, 5.0)]);
        assert!(derive_ring(&ledger).unwrap().is_none());
    }

    #[test]
    fn test_two_type_ring() {
        let mut ledger = ledger_with(&[("a", 0, 5.0), ("b", 1, 10.0)]);
        let ring = derive_ring(&ledger).unwrap().unwrap();
        assert_eq!(ring.members, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(ring.weight, 15.0);
        assert_eq!(ring.investor, "a");
        assert_eq!(ring.id, hash_id(["a", "b"]));
        assert!(verify_ring(&ledger, &ring).is_ok());

        bind_ring(&mut ledger, &ring).unwrap();
        let a = ledger.get("a").unwrap();
        assert_eq!(a.status, CoinStatus::Blocked);
        assert_eq!(a.next.as_deref(), Some("b"));
        assert_eq!(a.prev.as_deref(), Some("b"));
        assert_eq!(a.cooperation_id.as_deref(), Some(ring.id.as_str()));
        assert!(derive_ring(&ledger).unwrap().is_none());
    }

    #[test]
    fn test_selection_ignores_insertion_order() {
        let coins = [("a", 0, 1.0), ("c", 0, 2.0), ("b", 1, 3.0), ("d", 1, 4.0)];
        let mut reversed = coins;
        reversed.reverse();
        let x = derive_ring(&ledger_with(&coins)).unwrap().unwrap();
        let y = derive_ring(&ledger_with(&reversed)).unwrap().unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn test_verify_detects_tampering() {
        let ledger = ledger_with(&[("a", 0, 5.0), ("b", 1, 10.0)]);
        let ring = derive_ring(&ledger).unwrap().unwrap();

        let mut heavy = ring.clone();
        heavy.weight = 16.0;
        assert!(verify_ring(&ledger, &heavy).is_err());

        let mut swapped = ring.clone();
        swapped.members.reverse();
        assert!(verify_ring(&ledger, &swapped).is_err());

        let mut renamed = ring;
        renamed.id = hash_id(["other"]);
        assert!(verify_ring(&ledger, &renamed).is_err());
    }
}
