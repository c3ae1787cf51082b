use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{RecoveryPeriod, RiskBand, Tier, UserId};
use super::policy::ScorePolicy;
use super::store::{ScoreStore, StoreError};
use super::tenure::month_key;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub total_score: u8,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtRiskEntry {
    pub user_id: UserId,
    pub inactive_days: u32,
    pub band: RiskBand,
    pub total_score: u8,
}

/// Read-only aggregation over the score store for dashboards and
/// operational tooling. Never mutates a record.
pub struct AnalyticsReporter<S> {
    store: Arc<S>,
    policy: Arc<ScorePolicy>,
}

impl<S: ScoreStore + 'static> AnalyticsReporter<S> {
    pub fn new(store: Arc<S>, policy: Arc<ScorePolicy>) -> Self {
        Self { store, policy }
    }

    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let mut entries = Vec::new();
        for user in self.store.all_users()? {
            if let Some(versioned) = self.store.load(&user)? {
                entries.push(LeaderboardEntry {
                    user_id: versioned.record.user_id,
                    total_score: versioned.record.total_score,
                    tier: versioned.record.tier,
                });
            }
        }
        entries.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        entries.truncate(limit);
        Ok(entries)
    }

    pub fn tier_distribution(&self) -> Result<BTreeMap<Tier, usize>, StoreError> {
        let mut distribution = BTreeMap::new();
        for user in self.store.all_users()? {
            if let Some(versioned) = self.store.load(&user)? {
                *distribution.entry(versioned.record.tier).or_insert(0) += 1;
            }
        }
        Ok(distribution)
    }

    /// Accounts whose inactivity has crossed at least the warning band.
    pub fn decay_at_risk_users(&self, now: DateTime<Utc>) -> Result<Vec<AtRiskEntry>, StoreError> {
        let mut entries = Vec::new();
        for user in self.store.all_users()? {
            if let Some(versioned) = self.store.load(&user)? {
                let record = versioned.record;
                let inactive_days =
                    (now - record.last_financial_activity_at).num_days().max(0) as u32;
                let (band, _) = self.policy.decay.band_for(inactive_days);
                if band >= RiskBand::Warning {
                    entries.push(AtRiskEntry {
                        user_id: record.user_id,
                        inactive_days,
                        band,
                        total_score: record.total_score,
                    });
                }
            }
        }
        entries.sort_by(|a, b| b.inactive_days.cmp(&a.inactive_days));
        Ok(entries)
    }

    /// Accounts active this month that still have tenure headroom and no
    /// accrual recorded for the month yet.
    pub fn tenure_eligible_users(&self, now: DateTime<Utc>) -> Result<Vec<UserId>, StoreError> {
        let month = month_key(now);
        let mut users = Vec::new();
        for user in self.store.all_users()? {
            if let Some(versioned) = self.store.load(&user)? {
                let record = versioned.record;
                if month_key(record.last_financial_activity_at) == month
                    && record.tenure_bonus < self.policy.tenure.max_bonus
                    && !self.store.tenure_event_exists(&user, &month)?
                {
                    users.push(user);
                }
            }
        }
        users.sort();
        Ok(users)
    }

    pub fn recovery_period_users(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<RecoveryPeriod>, StoreError> {
        let mut periods: Vec<RecoveryPeriod> = self
            .store
            .recovery_periods()?
            .into_iter()
            .filter(|period| period.active_at(now))
            .collect();
        periods.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(periods)
    }
}
