use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::calculator::{self, IntegrityError};
use super::caps;
use super::domain::{
    AdjustmentEvent, ComponentScores, ScoreRecord, Tier, TriggerKind, UserId,
};
use super::policy::ScorePolicy;
use super::store::{
    ScoreEventPublisher, ScoreStore, ScoreUpdate, StoreError, SweepEvent, VersionedRecord,
};

/// Bounded optimistic retry before surfacing a transient busy condition.
const MAX_COMMIT_RETRIES: usize = 3;

static ADJUSTMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_adjustment_id() -> u64 {
    ADJUSTMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

/// Error enumeration for the adjustment entry point.
#[derive(Debug, thiserror::Error)]
pub enum AdjustmentError {
    #[error("no score record for user {0}")]
    UnknownUser(UserId),
    #[error("invalid adjustment request: {reason}")]
    Validation { reason: String },
    #[error("record busy: concurrent writers exhausted the retry budget")]
    Busy,
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a committed (or capped-to-zero) adjustment.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AdjustmentResult {
    pub user_id: UserId,
    pub requested: i16,
    pub applied: i16,
    pub age_capped: bool,
    pub velocity_capped: bool,
    pub total_score: u8,
    pub tier: Tier,
}

/// Entry point for every score-changing event. Loads the record under the
/// per-user compare-and-set boundary, scales by any active recovery window,
/// clamps through the cap enforcer, materialises the delta into components,
/// and commits record plus audit row atomically.
pub struct AdjustmentProcessor<S, P> {
    store: Arc<S>,
    publisher: Arc<P>,
    policy: Arc<ScorePolicy>,
}

impl<S, P> AdjustmentProcessor<S, P>
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    pub fn new(store: Arc<S>, publisher: Arc<P>, policy: Arc<ScorePolicy>) -> Self {
        Self {
            store,
            publisher,
            policy,
        }
    }

    pub fn policy(&self) -> &ScorePolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create a score record from seed components. The seed is drained down
    /// to the day-0 age ceiling so the cap invariant holds from the first
    /// committed state.
    pub fn enroll(
        &self,
        user_id: UserId,
        mut seed: ComponentScores,
        now: DateTime<Utc>,
    ) -> Result<ScoreRecord, AdjustmentError> {
        let (total, _) = calculator::recompute(&seed, &self.policy)?;
        let cap = self.policy.age_cap.cap_for(0);
        if total > cap {
            let excess = i16::from(total) - i16::from(cap);
            seed.apply_delta(-excess, TriggerKind::Manual.preferred_component());
        }
        let (total, tier) = calculator::recompute(&seed, &self.policy)?;

        let record = ScoreRecord {
            user_id,
            components: seed,
            total_score: total,
            tier,
            created_at: now,
            account_age_days: 0,
            max_allowed_score: cap,
            age_cap_applied: total == cap,
            points_gained_this_week: 0,
            week_window_start: now,
            tenure_bonus: 0,
            tenure_months_earned: 0,
            last_financial_activity_at: now,
            financial_inactive_days: 0,
            total_inactivity_penalty: 0,
            decay_floor_reached: false,
        };

        let committed = self.store.create(record)?;
        Ok(committed.record)
    }

    /// Apply a caller-computed delta attributed to `trigger`.
    pub fn apply(
        &self,
        user: &UserId,
        delta: i16,
        trigger: TriggerKind,
        trigger_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AdjustmentResult, AdjustmentError> {
        self.apply_keyed(user, delta, trigger, trigger_id, now, |_, _| None)
    }

    /// Sweep-facing variant of [`apply`](Self::apply). The `sweep` builder
    /// turns the absorbed delta and the post-bookkeeping record into the
    /// run's idempotence row, which the store commits in the same
    /// transaction as the record and history row. A failed commit leaves
    /// neither the score change nor the key, so the next scheduled run
    /// retries the user without double-applying.
    pub fn apply_keyed<F>(
        &self,
        user: &UserId,
        delta: i16,
        trigger: TriggerKind,
        trigger_id: &str,
        now: DateTime<Utc>,
        sweep: F,
    ) -> Result<AdjustmentResult, AdjustmentError>
    where
        F: Fn(i16, &ScoreRecord) -> Option<SweepEvent>,
    {
        if delta == 0 {
            return Err(AdjustmentError::Validation {
                reason: "zero delta cannot be attributed to a scoring cause".to_string(),
            });
        }

        for attempt in 0..MAX_COMMIT_RETRIES {
            let VersionedRecord {
                version,
                mut record,
            } = self
                .store
                .load(user)?
                .ok_or_else(|| AdjustmentError::UnknownUser(user.clone()))?;

            caps::refresh(&mut record, &self.policy, now);

            let mut proposed = delta;
            if proposed > 0 {
                if let Some(multiplier) = self.active_recovery_multiplier(user, now)? {
                    proposed = ((f32::from(proposed)) * multiplier).round() as i16;
                }
            }
            if trigger == TriggerKind::InactivityDecay {
                // Decay is floored, never velocity-capped.
                let floor = i16::from(self.policy.decay.floor);
                let headroom = (i16::from(record.total_score) - floor).max(0);
                proposed = proposed.max(-headroom);
            }

            let outcome = caps::clamp(&record, proposed, trigger.velocity_exempt(), &self.policy);
            let absorbed = record
                .components
                .apply_delta(outcome.applied, trigger.preferred_component());

            let (total, tier) = calculator::recompute(&record.components, &self.policy)?;
            record.total_score = total;
            record.tier = tier;
            record.age_cap_applied = outcome.age_capped || total >= record.max_allowed_score;
            if absorbed > 0 && !trigger.velocity_exempt() {
                record.points_gained_this_week =
                    record.points_gained_this_week.saturating_add(absorbed as u8);
            }
            self.apply_trigger_bookkeeping(&mut record, trigger, absorbed);

            let event = AdjustmentEvent {
                at: now,
                score_change: absorbed,
                trigger,
                trigger_id: trigger_id.to_string(),
                resulting_total: total,
                velocity_capped: outcome.velocity_capped,
            };

            let sweep_row = sweep(absorbed, &record);
            match self.store.commit(version, record, Some(event), sweep_row) {
                Ok(committed) => {
                    self.publish(&committed.record, absorbed, trigger, now);
                    debug!(
                        user = %user,
                        requested = delta,
                        applied = absorbed,
                        trigger = trigger.label(),
                        total = committed.record.total_score,
                        "adjustment committed"
                    );
                    return Ok(AdjustmentResult {
                        user_id: user.clone(),
                        requested: delta,
                        applied: absorbed,
                        age_capped: outcome.age_capped,
                        velocity_capped: outcome.velocity_capped,
                        total_score: committed.record.total_score,
                        tier: committed.record.tier,
                    });
                }
                Err(StoreError::VersionConflict) if attempt + 1 < MAX_COMMIT_RETRIES => {
                    debug!(user = %user, attempt, "commit conflict, retrying");
                    continue;
                }
                Err(StoreError::VersionConflict) => return Err(AdjustmentError::Busy),
                Err(err) => return Err(err.into()),
            }
        }

        Err(AdjustmentError::Busy)
    }

    /// Apply a named delta from the policy's predefined table. Triggers
    /// without a fixed magnitude are rejected outright.
    pub fn apply_predefined(
        &self,
        user: &UserId,
        trigger: TriggerKind,
        trigger_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AdjustmentResult, AdjustmentError> {
        let delta = self.policy.predefined.delta_for(trigger).ok_or_else(|| {
            AdjustmentError::Validation {
                reason: format!(
                    "trigger '{}' carries no predefined magnitude",
                    trigger.label()
                ),
            }
        })?;
        self.apply(user, delta, trigger, trigger_id, now)
    }

    /// Commit a record mutation that does not move the score and therefore
    /// writes no history row (activity-clock resets). Same compare-and-set
    /// boundary, same bounded retry.
    pub fn commit_quiet<F>(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
        mutate: F,
    ) -> Result<ScoreRecord, AdjustmentError>
    where
        F: Fn(&mut ScoreRecord),
    {
        for attempt in 0..MAX_COMMIT_RETRIES {
            let VersionedRecord {
                version,
                mut record,
            } = self
                .store
                .load(user)?
                .ok_or_else(|| AdjustmentError::UnknownUser(user.clone()))?;

            caps::refresh(&mut record, &self.policy, now);
            mutate(&mut record);

            match self.store.commit(version, record, None, None) {
                Ok(committed) => return Ok(committed.record),
                Err(StoreError::VersionConflict) if attempt + 1 < MAX_COMMIT_RETRIES => continue,
                Err(StoreError::VersionConflict) => return Err(AdjustmentError::Busy),
                Err(err) => return Err(err.into()),
            }
        }

        Err(AdjustmentError::Busy)
    }

    /// External trigger ids are optional for some callers; fall back to a
    /// process-local sequence so every audit row stays attributable.
    pub fn synthesize_trigger_id(prefix: &str) -> String {
        format!("{prefix}-{:06}", next_adjustment_id())
    }

    fn active_recovery_multiplier(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<f32>, AdjustmentError> {
        let period = self.store.recovery_period(user)?;
        Ok(period
            .filter(|period| period.active_at(now))
            .map(|period| period.multiplier))
    }

    fn apply_trigger_bookkeeping(&self, record: &mut ScoreRecord, trigger: TriggerKind, absorbed: i16) {
        match trigger {
            TriggerKind::InactivityDecay => {
                record.total_inactivity_penalty = record
                    .total_inactivity_penalty
                    .saturating_add(absorbed.unsigned_abs());
                if record.total_score <= self.policy.decay.floor {
                    record.decay_floor_reached = true;
                }
            }
            TriggerKind::TenureBonus => {
                if absorbed > 0 {
                    record.tenure_bonus = record
                        .tenure_bonus
                        .saturating_add(absorbed as u8)
                        .min(self.policy.tenure.max_bonus);
                    record.tenure_months_earned = record.tenure_months_earned.saturating_add(1);
                }
            }
            _ => {}
        }
    }

    fn publish(&self, record: &ScoreRecord, change: i16, trigger: TriggerKind, at: DateTime<Utc>) {
        let update = ScoreUpdate {
            user_id: record.user_id.clone(),
            score_change: change,
            total_score: record.total_score,
            tier: record.tier,
            trigger,
            at,
        };
        if let Err(err) = self.publisher.publish(update) {
            warn!(user = %record.user_id, error = %err, "post-commit publish failed");
        }
    }
}
