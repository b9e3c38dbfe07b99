//! Vote casting and the dissent threshold.

use cooprings_data::TraderKind;
use rand::Rng;

use crate::config::ProtocolConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Agree,
    Disagree,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VotingPolicy {
    Honest,
    /// Disagrees with the given probability.
    RandomAdversarial { probability: f64 },
    AlwaysAdversarial,
}

impl VotingPolicy {
    #[must_use]
    pub fn for_kind(kind: TraderKind, config: &ProtocolConfig) -> Self {
        match kind {
            TraderKind::Normal => Self::Honest,
            TraderKind::RandomVoter => Self::RandomAdversarial {
                probability: config.bad_behavior,
            },
            TraderKind::BadVoter => Self::AlwaysAdversarial,
        }
    }

    pub fn cast<R: Rng + ?Sized>(&self, rng: &mut R) -> Vote {
        match *self {
            Self::Honest => Vote::Agree,
            Self::AlwaysAdversarial => Vote::Disagree,
            Self::RandomAdversarial { probability } => {
                if rng.gen::<f64>() < probability {
                    Vote::Disagree
                } else {
                    Vote::Agree
                }
            }
        }
    }
}

/// Dissent of `2d >= n` rejects. Ties reject.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quorum;

impl Quorum {
    #[must_use]
    pub fn rejects(dissent: usize, team_size: usize) -> bool {
        2 * dissent >= team_size
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub agree: usize,
    pub disagree: usize,
}

impl Tally {
    pub fn record(&mut self, vote: Vote) {
        match vote {
            Vote::Agree => self.agree += 1,
            Vote::Disagree => self.disagree += 1,
        }
    }

    #[must_use]
    pub fn team_size(&self) -> usize {
        self.agree + self.disagree
    }

    #[must_use]
    pub fn rejected(&self) -> bool {
        Quorum::rejects(self.disagree, self.team_size())
    }
}

impl FromIterator<Vote> for Tally {
    fn from_iter<I: IntoIterator<Item = Vote>>(iter: I) -> Self {
        let mut tally = Tally::default();
        for vote in iter {
            tally.record(vote);
        }
        tally
    }
}

/// Runs up to `rounds_count` rounds; returns the first failing round, or
/// `rounds_count` if none fails.
///
/// `round_tally(r)` collects round `r`'s votes from the whole team.
pub fn completed_rounds<F>(rounds_count: u32, mut round_tally: F) -> u32
where
    F: FnMut(u32) -> Tally,
{
    (0..rounds_count)
        .find(|&round| round_tally(round).rejected())
        .unwrap_or(rounds_count)
}
