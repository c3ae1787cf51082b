use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::domain::{RecoveryPeriod, UserId};
use super::policy::ScorePolicy;
use super::store::{ScoreStore, StoreError};

/// Error enumeration for recovery-window management.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("no active recovery period for user {0}")]
    NotActive(UserId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Opens and closes the time-boxed windows that multiply score regain after
/// a negative event. One window per user: restarting replaces the remaining
/// window rather than stacking multipliers.
pub struct RecoveryManager<S> {
    store: Arc<S>,
    policy: Arc<ScorePolicy>,
}

impl<S: ScoreStore + 'static> RecoveryManager<S> {
    pub fn new(store: Arc<S>, policy: Arc<ScorePolicy>) -> Self {
        Self { store, policy }
    }

    pub fn start_recovery(
        &self,
        user: &UserId,
        trigger: &str,
        now: DateTime<Utc>,
    ) -> Result<RecoveryPeriod, RecoveryError> {
        let period = RecoveryPeriod {
            user_id: user.clone(),
            starts_at: now,
            ends_at: now + Duration::days(self.policy.recovery.window_days),
            multiplier: self.policy.recovery.multiplier,
            trigger: trigger.to_string(),
            is_active: true,
        };
        self.store.put_recovery_period(period.clone())?;
        info!(user = %user, trigger, until = %period.ends_at, "recovery period opened");
        Ok(period)
    }

    /// Close a window before `ends_at`. Lapsed windows need no explicit
    /// close; they stop matching `active_at` on their own.
    pub fn end_recovery(&self, user: &UserId, now: DateTime<Utc>) -> Result<(), RecoveryError> {
        let period = self
            .store
            .recovery_period(user)?
            .filter(|period| period.active_at(now))
            .ok_or_else(|| RecoveryError::NotActive(user.clone()))?;

        let closed = RecoveryPeriod {
            ends_at: now,
            is_active: false,
            ..period
        };
        self.store.put_recovery_period(closed)?;
        info!(user = %user, "recovery period ended early");
        Ok(())
    }

    pub fn active_period(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<RecoveryPeriod>, RecoveryError> {
        Ok(self
            .store
            .recovery_period(user)?
            .filter(|period| period.active_at(now)))
    }
}
