//! A trader and the protocol replica it keeps.
//!
//! Every trader holds its own copy of the known traders, the coins it has
//! been sent, and the cooperation rings it has formed or been informed of.
//! All ring derivation runs against that local copy, so two honest traders
//! that have seen the same coins derive the same rings.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use cooprings_data::{
    Coin, CoinStatus, CooperationRing, FractalRing, TraderKind, TraderProfile, TraderRecord,
};
use rand::Rng;

use crate::config::ProtocolConfig;
use crate::cooperation::{self, cycle_links};
use crate::error::{ProtocolError, Result};
use crate::fractal::{self, FractalPlan};
use crate::ledger::CoinLedger;
use crate::settlement::{self, Settlement};
use crate::signing::{self, TraderKeys};
use crate::voting::{Vote, VotingPolicy};

#[derive(Debug, Clone)]
pub struct Trader {
    profile: TraderProfile,
    kind: TraderKind,
    policy: VotingPolicy,
    keys: TraderKeys,
    next_nonce: u64,
    config: ProtocolConfig,
    traders: BTreeMap<String, TraderProfile>,
    ledger: CoinLedger,
    rings: HashMap<String, CooperationRing>,
    /// Formed rings not yet aggregated into a fractal.
    solo: BTreeSet<String>,
}

impl Trader {
    #[must_use]
    pub fn new(
        kind: TraderKind,
        account: f64,
        wallet: String,
        type_count: u32,
        keys: TraderKeys,
        config: ProtocolConfig,
    ) -> Self {
        let profile = TraderProfile {
            id: signing::trader_id(&wallet, type_count),
            account,
            wallet,
            public_key: keys.public_key_hex(),
        };
        Self {
            policy: VotingPolicy::for_kind(kind, &config),
            profile,
            kind,
            keys,
            next_nonce: 0,
            config,
            traders: BTreeMap::new(),
            ledger: CoinLedger::new(type_count),
            rings: HashMap::new(),
            solo: BTreeSet::new(),
        }
    }

    /// A trader with a random wallet, key pair, and starting account in
    /// `[0, max_account)`.
    pub fn generate<R: Rng + ?Sized>(
        kind: TraderKind,
        type_count: u32,
        max_account: f64,
        config: ProtocolConfig,
        rng: &mut R,
    ) -> Self {
        let wallet = uuid::Builder::from_random_bytes(rng.gen())
            .into_uuid()
            .to_string();
        let account = rng.gen::<f64>() * max_account;
        let keys = TraderKeys::generate(rng);
        Self::new(kind, account, wallet, type_count, keys, config)
    }

    /// Rebuilds a trader from a saved record under a fresh key pair. The
    /// replica starts empty; see [`Trader::restore_replica`].
    #[must_use]
    pub fn restore(
        record: &TraderRecord,
        type_count: u32,
        keys: TraderKeys,
        config: ProtocolConfig,
    ) -> Self {
        let mut trader = Self::new(
            record.kind,
            record.profile.account,
            record.profile.wallet.clone(),
            type_count,
            keys,
            config,
        );
        trader.next_nonce = record.next_nonce;
        trader
    }

    #[must_use]
    pub fn record(&self) -> TraderRecord {
        TraderRecord {
            profile: self.profile.clone(),
            kind: self.kind,
            next_nonce: self.next_nonce,
        }
    }

    pub fn id(&self) -> &str {
        &self.profile.id
    }

    pub fn profile(&self) -> &TraderProfile {
        &self.profile
    }

    pub fn kind(&self) -> TraderKind {
        self.kind
    }

    pub fn account(&self) -> f64 {
        self.profile.account
    }

    pub fn ledger(&self) -> &CoinLedger {
        &self.ledger
    }

    pub fn known_traders(&self) -> impl Iterator<Item = &TraderProfile> {
        self.traders.values()
    }

    pub fn ring(&self, id: &str) -> Option<&CooperationRing> {
        self.rings.get(id)
    }

    pub fn rings(&self) -> impl Iterator<Item = &CooperationRing> {
        self.rings.values()
    }

    pub fn solo_rings(&self) -> impl Iterator<Item = &str> {
        self.solo.iter().map(String::as_str)
    }

    /// Mints and signs a coin. The coin is not stored anywhere until it is
    /// broadcast with [`Trader::save_coin`].
    pub fn create_coin(&mut self, amount: f64, coin_type: u32) -> Result<Coin> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(ProtocolError::InvalidAmount(amount));
        }
        if coin_type >= self.ledger.type_count() {
            return Err(ProtocolError::InvalidCoinType {
                coin_type,
                type_count: self.ledger.type_count(),
            });
        }
        let nonce = self.next_nonce;
        let id = self.keys.sign_coin(&self.profile.id, coin_type, nonce)?;
        self.next_nonce += 1;
        Ok(Coin {
            id,
            amount,
            status: CoinStatus::Run,
            coin_type,
            owner: self.profile.id.clone(),
            bound_to: self.profile.id.clone(),
            nonce,
            next: None,
            prev: None,
            cooperation_id: None,
        })
    }

    /// Registers another trader's public profile.
    pub fn save_trader(&mut self, profile: TraderProfile) -> Result<()> {
        if self.traders.contains_key(&profile.id) {
            return Err(ProtocolError::TraderAlreadyExists(profile.id));
        }
        if profile.id != signing::trader_id(&profile.wallet, self.ledger.type_count()) {
            return Err(ProtocolError::InvalidTraderId(profile.id));
        }
        signing::parse_public_key(&profile.id, &profile.public_key)?;
        self.traders.insert(profile.id.clone(), profile);
        Ok(())
    }

    /// Validates and stores a broadcast coin, then forms every cooperation
    /// ring the queues now allow.
    pub fn save_coin(&mut self, coin: Coin) -> Result<Vec<CooperationRing>> {
        if self.ledger.contains(&coin.id) {
            return Err(ProtocolError::CoinAlreadyExists(coin.id));
        }
        validate_incoming(&coin, self.ledger.type_count(), self.traders.get(&coin.owner))?;
        self.ledger.insert_run(coin)?;
        self.form_rings()
    }

    /// Forms any pending cooperation rings, then tries to aggregate a
    /// fractal.
    pub fn check_for_rings(&mut self) -> Result<Option<FractalRing>> {
        self.form_rings()?;
        Ok(self.check_for_fractal_ring())
    }

    fn form_rings(&mut self) -> Result<Vec<CooperationRing>> {
        let mut formed = Vec::new();
        while let Some(ring) = self.check_for_cooperation_ring()? {
            formed.push(ring);
        }
        Ok(formed)
    }

    fn check_for_cooperation_ring(&mut self) -> Result<Option<CooperationRing>> {
        let Some(ring) = cooperation::derive_ring(&self.ledger)? else {
            return Ok(None);
        };
        if self.rings.contains_key(&ring.id) {
            return Err(ProtocolError::RingCollision(ring.id));
        }
        cooperation::bind_ring(&mut self.ledger, &ring)?;
        tracing::debug!(
            trader = %self.profile.id,
            ring = %ring.id,
            weight = ring.weight,
            "Cooperation ring formed"
        );
        self.solo.insert(ring.id.clone());
        self.rings.insert(ring.id.clone(), ring.clone());
        Ok(Some(ring))
    }

    fn check_for_fractal_ring(&mut self) -> Option<FractalRing> {
        if self.solo.len() < self.config.fractal_min {
            return None;
        }
        let pool: Vec<String> = self.solo.iter().cloned().collect();
        let traders: Vec<String> = self.traders.keys().cloned().collect();
        let plan = fractal::derive_plan(&pool, &traders, &self.config)?;
        Some(self.commit_plan(plan))
    }

    fn commit_plan(&mut self, plan: FractalPlan) -> FractalRing {
        let mut cooperation_rings = Vec::with_capacity(plan.ring_ids.len());
        for (ring_id, (next, prev)) in plan.ring_ids.iter().zip(cycle_links(&plan.ring_ids)) {
            self.solo.remove(ring_id);
            if let Some(ring) = self.rings.get_mut(ring_id) {
                ring.next = Some(next);
                ring.prev = Some(prev);
                ring.fractal_id = Some(plan.id.clone());
                cooperation_rings.push(ring.clone());
            }
        }
        tracing::debug!(
            trader = %self.profile.id,
            fractal = %plan.id,
            rings = cooperation_rings.len(),
            team = plan.team.len(),
            "Fractal ring formed"
        );
        FractalRing {
            id: plan.id,
            cooperation_rings,
            verification_team: plan.team,
            proposer: self.profile.id.clone(),
            is_valid: true,
            successful_rounds: None,
        }
    }

    /// Re-derives `claim` from this replica and checks it matches exactly.
    pub fn validate_fractal_ring(&self, claim: &FractalRing) -> Result<()> {
        let mismatch = |reason: String| ProtocolError::fractal_mismatch(&claim.id, reason);

        let count = claim.cooperation_rings.len();
        if count < self.config.fractal_min || count > self.config.fractal_max {
            return Err(mismatch(format!("{count} rings is out of bounds")));
        }
        for claimed in &claim.cooperation_rings {
            let local = self
                .rings
                .get(&claimed.id)
                .ok_or_else(|| mismatch(format!("unknown cooperation ring {}", claimed.id)))?;
            if local.members != claimed.members {
                return Err(mismatch(format!("members of ring {} differ", claimed.id)));
            }
            if let Some(other) = local.fractal_id.as_deref() {
                if other != claim.id {
                    return Err(mismatch(format!(
                        "ring {} already belongs to fractal {other}",
                        claimed.id
                    )));
                }
            }
            cooperation::verify_ring(&self.ledger, claimed).map_err(mismatch)?;
        }

        let pool: Vec<String> = self
            .rings
            .values()
            .filter(|r| r.is_solo() || r.fractal_id.as_deref() == Some(claim.id.as_str()))
            .map(|r| r.id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let traders: Vec<String> = self.traders.keys().cloned().collect();
        let plan = fractal::derive_plan(&pool, &traders, &self.config)
            .ok_or_else(|| mismatch("no fractal derivable from local rings".to_string()))?;

        let claimed_ids: Vec<&str> = claim.ring_ids().collect();
        if plan.id != claim.id || plan.ring_ids != claimed_ids {
            return Err(mismatch(format!("local derivation gives {}", plan.id)));
        }
        if plan.team != claim.verification_team {
            return Err(mismatch("verification team differs".to_string()));
        }
        Ok(())
    }

    /// Validates the claim, then votes on it.
    pub fn submit_ring<R: Rng + ?Sized>(&self, claim: &FractalRing, rng: &mut R) -> Result<Vote> {
        self.validate_fractal_ring(claim)?;
        Ok(self.vote(rng))
    }

    pub fn vote<R: Rng + ?Sized>(&self, rng: &mut R) -> Vote {
        self.policy.cast(rng)
    }

    /// Applies an accepted fractal. Pending rings holding any of its coins
    /// are ejected first, together with their whole fractal if they were
    /// already aggregated.
    pub fn inform_fractal_ring(&mut self, fractal: &FractalRing) -> Result<()> {
        let mut collisions = BTreeSet::new();
        for ring in &fractal.cooperation_rings {
            for coin_id in &ring.members {
                let coin = self
                    .ledger
                    .get(coin_id)
                    .ok_or_else(|| ProtocolError::UnknownCoin(coin_id.clone()))?;
                if coin.status.is_terminal() {
                    return Err(ProtocolError::CoinNotRunning(coin_id.clone()));
                }
                match coin.cooperation_id.as_deref() {
                    Some(bound) if bound != ring.id => {
                        collisions.insert(bound.to_string());
                    }
                    _ => {}
                }
            }
        }

        for ring_id in collisions {
            // A cascade may have taken it out already.
            let Some(ring) = self.rings.get(&ring_id) else {
                continue;
            };
            match ring.fractal_id.clone() {
                Some(fractal_id) => {
                    let ejected = self.remove_fractal_ring(&fractal_id)?;
                    tracing::debug!(
                        trader = %self.profile.id,
                        fractal = %fractal_id,
                        rings = ejected,
                        "Ejected colliding fractal"
                    );
                }
                None => {
                    self.remove_cooperation_ring(&ring_id)?;
                    tracing::debug!(trader = %self.profile.id, ring = %ring_id, "Ejected colliding ring");
                }
            }
        }

        self.save_fractal_ring(fractal)
    }

    fn save_fractal_ring(&mut self, fractal: &FractalRing) -> Result<()> {
        let ring_ids: Vec<&str> = fractal.ring_ids().collect();
        for (ring, (next, prev)) in fractal.cooperation_rings.iter().zip(cycle_links(&ring_ids)) {
            let mut ring = ring.clone();
            ring.fractal_id = Some(fractal.id.clone());
            ring.next = Some(next);
            ring.prev = Some(prev);
            cooperation::bind_ring(&mut self.ledger, &ring)?;
            self.solo.remove(&ring.id);
            self.rings.insert(ring.id.clone(), ring);
        }
        Ok(())
    }

    /// Drops every ring stamped with `fractal_id` and frees their coins.
    /// Returns how many rings were removed.
    pub fn remove_fractal_ring(&mut self, fractal_id: &str) -> Result<usize> {
        let ids: Vec<String> = self
            .rings
            .values()
            .filter(|r| r.fractal_id.as_deref() == Some(fractal_id))
            .map(|r| r.id.clone())
            .collect();
        for id in &ids {
            self.remove_cooperation_ring(id)?;
        }
        Ok(ids.len())
    }

    fn remove_cooperation_ring(&mut self, ring_id: &str) -> Result<()> {
        let ring = self
            .rings
            .remove(ring_id)
            .ok_or_else(|| ProtocolError::UnknownRing(ring_id.to_string()))?;
        self.solo.remove(ring_id);
        for member in &ring.members {
            let bound_here = self.ledger.get(member).is_some_and(|c| {
                c.status == CoinStatus::Blocked && c.cooperation_id.as_deref() == Some(ring_id)
            });
            if bound_here {
                self.ledger.release(member)?;
            }
        }
        Ok(())
    }

    pub fn update_balance(&mut self, trader_id: &str, amount: f64) -> Result<()> {
        let known = self
            .traders
            .get_mut(trader_id)
            .ok_or_else(|| ProtocolError::UnknownTrader(trader_id.to_string()))?;
        known.account += amount;
        if trader_id == self.profile.id {
            self.profile.account += amount;
        }
        Ok(())
    }

    /// Closes a ring that ran short of `rounds_count`.
    pub fn expire_ring(&mut self, ring_id: &str, rounds: u32) -> Result<()> {
        self.close_ring(ring_id, rounds, CoinStatus::Expired)
    }

    /// Closes a ring that completed every round.
    pub fn pay_ring(&mut self, ring_id: &str, rounds: u32) -> Result<()> {
        self.close_ring(ring_id, rounds, CoinStatus::Paid)
    }

    fn close_ring(&mut self, ring_id: &str, rounds: u32, status: CoinStatus) -> Result<()> {
        let ring = self
            .rings
            .get_mut(ring_id)
            .ok_or_else(|| ProtocolError::UnknownRing(ring_id.to_string()))?;
        ring.rounds = Some(rounds);
        for member in &ring.members {
            self.ledger.settle(member, status)?;
        }
        Ok(())
    }

    /// Computes the payouts for one of this replica's rings.
    pub fn settle(&self, ring_id: &str, rounds: u32) -> Result<Settlement> {
        let ring = self
            .rings
            .get(ring_id)
            .ok_or_else(|| ProtocolError::UnknownRing(ring_id.to_string()))?;
        settlement::settle_ring(ring, |id| self.ledger.get(id), rounds, &self.config)
    }

    /// Replaces the replica with the given canonical state.
    pub fn restore_replica<'a>(
        &mut self,
        profiles: impl IntoIterator<Item = &'a TraderProfile>,
        coins: impl IntoIterator<Item = &'a Coin>,
        fractals: impl IntoIterator<Item = &'a FractalRing>,
    ) -> Result<()> {
        self.traders.clear();
        self.ledger = CoinLedger::new(self.ledger.type_count());
        self.rings.clear();
        self.solo.clear();
        for profile in profiles {
            self.save_trader(profile.clone())?;
        }
        for coin in coins {
            self.ledger.import(coin.clone())?;
        }
        for fractal in fractals {
            for ring in &fractal.cooperation_rings {
                self.rings.insert(ring.id.clone(), ring.clone());
            }
        }
        Ok(())
    }
}

/// Checks a broadcast coin against its owner's profile: type range, amount,
/// binding, signature, and that it arrives unlinked and running.
pub fn validate_incoming(
    coin: &Coin,
    type_count: u32,
    owner: Option<&TraderProfile>,
) -> Result<()> {
    if coin.coin_type >= type_count {
        return Err(ProtocolError::InvalidCoinType {
            coin_type: coin.coin_type,
            type_count,
        });
    }
    if !(coin.amount.is_finite() && coin.amount > 0.0) {
        return Err(ProtocolError::InvalidAmount(coin.amount));
    }
    if coin.bound_to != coin.owner {
        return Err(ProtocolError::BindingMismatch(coin.id.clone()));
    }
    let owner = owner.ok_or_else(|| ProtocolError::UnknownTrader(coin.owner.clone()))?;
    signing::verify_coin(&owner.public_key, coin)?;
    if coin.is_linked() {
        return Err(ProtocolError::CoinAlreadyLinked(coin.id.clone()));
    }
    if coin.status != CoinStatus::Run {
        return Err(ProtocolError::CoinNotRunning(coin.id.clone()));
    }
    Ok(())
}
