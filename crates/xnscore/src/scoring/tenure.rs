use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use tracing::{info, warn};

use super::adjustments::AdjustmentProcessor;
use super::decay::{BatchResult, SweepError};
use super::domain::{TenureEvent, TriggerKind, UserId};
use super::policy::ScorePolicy;
use super::store::{ScoreEventPublisher, ScoreStore, StoreError, SweepEvent};

/// Month key in "YYYY-MM" form, the idempotence key for tenure accrual.
pub fn month_key(at: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", at.year(), at.month())
}

/// Grants the monthly loyalty bonus, capped at the policy ceiling. Runs
/// once per calendar month per account that showed financial activity that
/// month; keyed (user, month), so re-runs are no-ops.
pub struct TenureAccrual<S, P> {
    store: Arc<S>,
    adjustments: Arc<AdjustmentProcessor<S, P>>,
    policy: Arc<ScorePolicy>,
}

impl<S, P> TenureAccrual<S, P>
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

    pub fn accrue_monthly(
        &self,
        month: &str,
        now: DateTime<Utc>,
        cancel: &AtomicBool,
    ) -> Result<BatchResult, SweepError> {
        let mut result = BatchResult::default();

        for user in self.store.all_users()? {
            if cancel.load(Ordering::Relaxed) {
                result.cancelled = true;
                break;
            }
            result.processed += 1;

            match self.accrue_user(&user, month, now) {
                Ok(true) => result.applied += 1,
                Ok(false) => result.skipped += 1,
                Err(err) => {
                    warn!(user = %user, error = %err, "tenure accrual failed for user");
                    result.failed += 1;
                    result.failures.push((user, err.to_string()));
                }
            }
        }

        info!(
            month,
            processed = result.processed,
            applied = result.applied,
            skipped = result.skipped,
            failed = result.failed,
            cancelled = result.cancelled,
            "tenure accrual finished"
        );
        Ok(result)
    }

    fn accrue_user(&self, user: &UserId, month: &str, now: DateTime<Utc>) -> Result<bool, SweepError> {
        if self.store.tenure_event_exists(user, month)? {
            return Ok(false);
        }

        let record = self
            .store
            .load(user)?
            .ok_or(StoreError::NotFound)?
            .record;

        // Only accounts financially active in the accrual month earn tenure.
        if month_key(record.last_financial_activity_at) != month {
            return Ok(false);
        }

        let grant = self
            .policy
            .tenure
            .bonus_per_month
            .min(self.policy.tenure.max_bonus.saturating_sub(record.tenure_bonus));

        if grant == 0 {
            // At the ceiling accrual is a no-op, but the month is still
            // recorded for the audit trail.
            self.store.record_tenure_event(TenureEvent {
                user_id: user.clone(),
                month: month.to_string(),
                bonus_amount: 0,
                tenure_month: record.tenure_months_earned,
            })?;
            return Ok(false);
        }

        // The month key commits with the bonus; a failed user stays eligible
        // for the next run without risking a double grant.
        let outcome = self.adjustments.apply_keyed(
            user,
            i16::from(grant),
            TriggerKind::TenureBonus,
            &format!("tenure-{month}"),
            now,
            |applied, committed| {
                Some(SweepEvent::Tenure(TenureEvent {
                    user_id: user.clone(),
                    month: month.to_string(),
                    bonus_amount: applied.max(0) as u8,
                    tenure_month: committed.tenure_months_earned,
                }))
            },
        )?;

        Ok(outcome.applied > 0)
    }
}
