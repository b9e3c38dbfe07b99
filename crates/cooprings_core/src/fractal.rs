//! Aggregation of solo cooperation rings into fractal rings.
//!
//! A fractal is a pure function of the sorted candidate pool and the sorted
//! set of known traders:
//!
//! 1. `k = fractal_min + digest_word(pool) mod (fractal_max - fractal_min + 1)`
//! 2. the rings are `sample(pool, k, digest(pool))`
//! 3. `m = verification_min + digest_word(rings) mod (verification_max - verification_min + 1)`
//! 4. the team is `sample(traders, m, digest(rings))`
//!
//! so any replica holding the same pool re-derives the same fractal.

use crate::config::ProtocolConfig;
use crate::hashing::{digest, digest_word, hash_id, pick_index, sample};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FractalPlan {
    pub id: String,
    pub ring_ids: Vec<String>,
    pub team: Vec<String>,
}

fn span(min: usize, max: usize) -> usize {
    max.saturating_sub(min) + 1
}

#[must_use]
pub fn batch_size(pool: &[String], config: &ProtocolConfig) -> usize {
    config.fractal_min
        + pick_index(
            digest_word(pool),
            span(config.fractal_min, config.fractal_max),
        )
}

#[must_use]
pub fn team_size(ring_ids: &[String], config: &ProtocolConfig) -> usize {
    config.verification_min
        + pick_index(
            digest_word(ring_ids),
            span(config.verification_min, config.verification_max),
        )
}

/// Derives a fractal from sorted `pool` and sorted `traders`.
///
/// Returns `None` when the pool is below `fractal_min`, when the drawn batch
/// size exceeds the pool, or when too few traders are known for the team.
#[must_use]
pub fn derive_plan(
    pool: &[String],
    traders: &[String],
    config: &ProtocolConfig,
) -> Option<FractalPlan> {
    if pool.len() < config.fractal_min {
        return None;
    }
    let k = batch_size(pool, config);
    let (ring_ids, _) = sample(pool, k, digest(pool))?;
    let m = team_size(&ring_ids, config);
    let (team, _) = sample(traders, m, digest(&ring_ids))?;
    Some(FractalPlan {
        id: hash_id(&ring_ids),
        ring_ids,
        team,
    })
}
