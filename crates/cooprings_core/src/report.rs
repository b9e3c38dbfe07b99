//! Summary statistics over a finished or saved run.

use std::fmt;

use cooprings_data::{CoinStatus, SystemSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub traders: usize,
    pub coins: usize,
    pub fractals: usize,
    pub blocked: usize,
    pub expired: usize,
    pub paid: usize,
    /// Mean submissions over traders that submitted at least once.
    pub avg_submitted: f64,
    /// Mean of accepted/submitted over the same traders.
    pub avg_acceptance: f64,
    pub bad_accept: u64,
    pub bad_reject: u64,
    pub total_balance: f64,
}

impl RunReport {
    #[must_use]
    pub fn from_snapshot(snapshot: &SystemSnapshot) -> Self {
        let count = |status: CoinStatus| {
            snapshot
                .coins
                .values()
                .filter(|c| c.status == status)
                .count()
        };

        let mut submitters = 0usize;
        let mut submitted = 0u64;
        let mut acceptance = 0.0;
        for record in &snapshot.traders {
            let id = &record.profile.id;
            let subs = snapshot.submit_count.get(id).copied().unwrap_or(0);
            if subs > 0 {
                let accepted = snapshot.accepted_count.get(id).copied().unwrap_or(0);
                submitters += 1;
                submitted += subs;
                acceptance += accepted as f64 / subs as f64;
            }
        }
        let per_submitter = |total: f64| {
            if submitters == 0 {
                0.0
            } else {
                total / submitters as f64
            }
        };

        Self {
            traders: snapshot.traders.len(),
            coins: snapshot.coins.len(),
            fractals: snapshot.fractals.len(),
            blocked: count(CoinStatus::Blocked),
            expired: count(CoinStatus::Expired),
            paid: count(CoinStatus::Paid),
            avg_submitted: per_submitter(submitted as f64),
            avg_acceptance: per_submitter(acceptance),
            bad_accept: snapshot.bad_accept_count,
            bad_reject: snapshot.bad_reject_count,
            total_balance: snapshot.traders.iter().map(|t| t.profile.account).sum(),
        }
    }

    #[must_use]
    pub fn blocked_pct(&self) -> f64 {
        if self.coins == 0 {
            0.0
        } else {
            self.blocked as f64 / self.coins as f64 * 100.0
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of traders: {}", self.traders)?;
        writeln!(f, "Number of coins: {}", self.coins)?;
        writeln!(f, "Number of fractal rings: {}", self.fractals)?;
        writeln!(f, "Percentage of blocked coins: {:.2}%", self.blocked_pct())?;
        writeln!(f, "Expired coins: {}", self.expired)?;
        writeln!(f, "Paid coins: {}", self.paid)?;
        writeln!(
            f,
            "Average number of submitted rings per trader: {:.2}",
            self.avg_submitted
        )?;
        writeln!(
            f,
            "Average acceptance rate per trader: {:.2}%",
            self.avg_acceptance * 100.0
        )?;
        writeln!(f, "Bad accepts: {}", self.bad_accept)?;
        writeln!(f, "Bad rejects: {}", self.bad_reject)?;
        write!(f, "Total balance: {:.2}", self.total_balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cooprings_data::{Coin, TraderKind, TraderProfile, TraderRecord};

    fn record(id: &str, account: f64) -> TraderRecord {
        TraderRecord {
            profile: TraderProfile {
                id: id.into(),
                account,
                wallet: String::new(),
                public_key: String::new(),
            },
            kind: TraderKind::Normal,
            next_nonce: 0,
        }
    }

    #[test]
    fn test_empty_run() {
        let report = RunReport::from_snapshot(&SystemSnapshot::new(3));
        assert_eq!(report.coins, 0);
        assert_eq!(report.blocked_pct(), 0.0);
        assert_eq!(report.avg_submitted, 0.0);
    }

    #[test]
    fn test_averages_skip_idle_traders() {
        let mut snapshot = SystemSnapshot::new(1);
        snapshot.traders = vec![record("a", 10.0), record("b", 5.0), record("c", 1.0)];
        snapshot.submit_count.insert("a".into(), 4);
        snapshot.accepted_count.insert("a".into(), 1);
        snapshot.submit_count.insert("b".into(), 2);
        snapshot.accepted_count.insert("b".into(), 2);
        for (i, status) in [CoinStatus::Blocked, CoinStatus::Run, CoinStatus::Paid, CoinStatus::Blocked]
            .into_iter()
            .enumerate()
        {
            let id = format!("c{i}");
            snapshot.coins.insert(
                id.clone(),
                Coin {
                    id,
                    amount: 1.0,
                    status,
                    owner: "a".into(),
                    bound_to: "a".into(),
                    ..Coin::default()
                },
            );
        }

        let report = RunReport::from_snapshot(&snapshot);
        assert_eq!(report.avg_submitted, 3.0);
        assert!((report.avg_acceptance - 0.625).abs() < 1e-12);
        assert_eq!(report.blocked_pct(), 50.0);
        assert_eq!(report.paid, 1);
        assert_eq!(report.total_balance, 16.0);
        assert!(report.to_string().contains("Average acceptance rate per trader: 62.50%"));
    }
}
