//! A replica's coin store with per-type queues of unbound coins.

use std::collections::{BTreeSet, HashMap};

use cooprings_data::{Coin, CoinStatus};

use crate::error::{ProtocolError, Result};

#[derive(Debug, Clone, Default)]
pub struct CoinLedger {
    type_count: u32,
    coins: HashMap<String, Coin>,
    /// IDs of `Run` coins per type, kept sorted for hashing.
    run_buckets: Vec<BTreeSet<String>>,
}

impl CoinLedger {
    #[must_use]
    pub fn new(type_count: u32) -> Self {
        Self {
            type_count,
            coins: HashMap::new(),
            run_buckets: vec![BTreeSet::new(); type_count as usize],
        }
    }

    #[must_use]
    pub fn type_count(&self) -> u32 {
        self.type_count
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Coin> {
        self.coins.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.coins.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.coins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.coins.values()
    }

    pub fn bucket(&self, coin_type: u32) -> Option<&BTreeSet<String>> {
        self.run_buckets.get(coin_type as usize)
    }

    /// True when every type has at least one `Run` coin waiting.
    #[must_use]
    pub fn buckets_ready(&self) -> bool {
        !self.run_buckets.is_empty() && self.run_buckets.iter().all(|b| !b.is_empty())
    }

    /// Stores a fresh, unlinked `Run` coin.
    pub fn insert_run(&mut self, coin: Coin) -> Result<()> {
        if coin.status != CoinStatus::Run {
            return Err(ProtocolError::CoinNotRunning(coin.id));
        }
        if coin.is_linked() {
            return Err(ProtocolError::CoinAlreadyLinked(coin.id));
        }
        self.import(coin)
    }

    /// Stores a coin as-is. Only unlinked `Run` coins are queued.
    pub fn import(&mut self, coin: Coin) -> Result<()> {
        if coin.coin_type >= self.type_count {
            return Err(ProtocolError::InvalidCoinType {
                coin_type: coin.coin_type,
                type_count: self.type_count,
            });
        }
        if self.coins.contains_key(&coin.id) {
            return Err(ProtocolError::CoinAlreadyExists(coin.id));
        }
        if coin.status == CoinStatus::Run && !coin.is_linked() {
            self.run_buckets[coin.coin_type as usize].insert(coin.id.clone());
        }
        self.coins.insert(coin.id.clone(), coin);
        Ok(())
    }

    /// Links a coin into `ring_id` and blocks it.
    ///
    /// A coin already blocked in the same ring is just relinked.
    pub fn bind(&mut self, id: &str, ring_id: &str, next: &str, prev: &str) -> Result<()> {
        let coin = self
            .coins
            .get_mut(id)
            .ok_or_else(|| ProtocolError::UnknownCoin(id.to_string()))?;
        match coin.status {
            CoinStatus::Run => {
                coin.status = CoinStatus::Blocked;
                self.run_buckets[coin.coin_type as usize].remove(id);
            }
            CoinStatus::Blocked if coin.cooperation_id.as_deref() == Some(ring_id) => {}
            from => {
                return Err(ProtocolError::InvalidTransition {
                    id: id.to_string(),
                    from,
                    to: CoinStatus::Blocked,
                })
            }
        }
        coin.cooperation_id = Some(ring_id.to_string());
        coin.next = Some(next.to_string());
        coin.prev = Some(prev.to_string());
        Ok(())
    }

    /// Unlinks a blocked coin and queues it again.
    pub fn release(&mut self, id: &str) -> Result<()> {
        let coin = self.transition(id, CoinStatus::Run)?;
        coin.unlink();
        let coin_type = coin.coin_type as usize;
        self.run_buckets[coin_type].insert(id.to_string());
        Ok(())
    }

    /// Moves a blocked coin to `Expired` or `Paid`. Only `cooperation_id`
    /// survives; neighbors are dropped.
    pub fn settle(&mut self, id: &str, status: CoinStatus) -> Result<()> {
        if !status.is_terminal() {
            let from = self.coins.get(id).map(|c| c.status).unwrap_or_default();
            return Err(ProtocolError::InvalidTransition {
                id: id.to_string(),
                from,
                to: status,
            });
        }
        self.transition(id, status)?.drop_neighbors();
        Ok(())
    }

    fn transition(&mut self, id: &str, to: CoinStatus) -> Result<&mut Coin> {
        let coin = self
            .coins
            .get_mut(id)
            .ok_or_else(|| ProtocolError::UnknownCoin(id.to_string()))?;
        if !coin.status.can_transition_to(to) {
            return Err(ProtocolError::InvalidTransition {
                id: id.to_string(),
                from: coin.status,
                to,
            });
        }
        coin.status = to;
        Ok(coin)
    }
}
