use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::adjustments::{AdjustmentError, AdjustmentProcessor};
use super::domain::{ActivityType, DecayEvent, RiskBand, ScoreRecord, TriggerKind, UserId};
use super::policy::ScorePolicy;
use super::store::{ScoreEventPublisher, ScoreStore, StoreError, SweepEvent};

/// Outcome of one scheduled sweep over the account population. A failure on
/// one account never halts the batch; it is recorded and retried on the
/// next scheduled run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchResult {
    pub processed: usize,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<(UserId, String)>,
    pub cancelled: bool,
}

/// Error enumeration for sweep scheduling itself (per-user failures are
/// folded into `BatchResult` instead).
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Adjustment(#[from] AdjustmentError),
}

/// Sweeps accounts for financial inactivity and applies bounded, floored
/// penalties. Decay is punitive, so it bypasses the weekly velocity cap but
/// never drives a score below the configured floor.
pub struct DecayEngine<S, P> {
    store: Arc<S>,
    adjustments: Arc<AdjustmentProcessor<S, P>>,
    policy: Arc<ScorePolicy>,
}

impl<S, P> DecayEngine<S, P>
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    pub fn new(
        store: Arc<S>,
        adjustments: Arc<AdjustmentProcessor<S, P>>,
        policy: Arc<ScorePolicy>,
    ) -> Self {
        Self {
            store,
            adjustments,
            policy,
        }
    }

    /// Risk band for a record given the sweep time.
    pub fn risk_band(&self, record: &ScoreRecord, now: DateTime<Utc>) -> (RiskBand, u8) {
        let inactive_days = (now - record.last_financial_activity_at).num_days().max(0) as u32;
        self.policy.decay.band_for(inactive_days)
    }

    /// Run the inactivity sweep for the calendar day of `now`. Keyed
    /// (user, date): re-running the same day is a no-op per user.
    /// Cooperatively cancellable between users.
    pub fn sweep_inactive(&self, now: DateTime<Utc>, cancel: &AtomicBool) -> Result<BatchResult, SweepError> {
        let date = now.date_naive();
        let mut result = BatchResult::default();

        for user in self.store.all_users()? {
            if cancel.load(Ordering::Relaxed) {
                result.cancelled = true;
                break;
            }
            result.processed += 1;

            match self.sweep_user(&user, now) {
                Ok(true) => result.applied += 1,
                Ok(false) => result.skipped += 1,
                Err(err) => {
                    warn!(user = %user, error = %err, "decay sweep failed for user");
                    result.failed += 1;
                    result.failures.push((user, err.to_string()));
                }
            }
        }

        info!(
            date = %date,
            processed = result.processed,
            applied = result.applied,
            skipped = result.skipped,
            failed = result.failed,
            cancelled = result.cancelled,
            "decay sweep finished"
        );
        Ok(result)
    }

    /// Reset the inactivity clock on a qualifying wallet/payment signal.
    /// Clears the floor latch so future decay can apply again after renewed
    /// inactivity.
    pub fn update_financial_activity(
        &self,
        user: &UserId,
        activity: ActivityType,
        event_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ScoreRecord, AdjustmentError> {
        let record = self.adjustments.commit_quiet(user, now, |record| {
            record.last_financial_activity_at = now;
            record.financial_inactive_days = 0;
            record.decay_floor_reached = false;
        })?;
        info!(user = %user, activity = ?activity, event = event_id, "financial activity recorded");
        Ok(record)
    }

    fn sweep_user(&self, user: &UserId, now: DateTime<Utc>) -> Result<bool, SweepError> {
        let date = now.date_naive();
        if self.store.decay_event_exists(user, date)? {
            return Ok(false);
        }

        let record = self
            .store
            .load(user)?
            .ok_or(StoreError::NotFound)?
            .record;
        if record.decay_floor_reached {
            return Ok(false);
        }

        let (band, penalty) = self.risk_band(&record, now);
        if penalty == 0 {
            return Ok(false);
        }

        // The day key commits with the penalty, so a failure here leaves the
        // user clean for the next scheduled run.
        self.adjustments.apply_keyed(
            user,
            -i16::from(penalty),
            TriggerKind::InactivityDecay,
            &format!("decay-{date}"),
            now,
            |applied, _| {
                Some(SweepEvent::Decay(DecayEvent {
                    user_id: user.clone(),
                    date,
                    decay_amount: applied.unsigned_abs() as u8,
                    decay_reason: band,
                }))
            },
        )?;

        Ok(true)
    }
}
