use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::adjustments::{AdjustmentError, AdjustmentProcessor};
use super::domain::{TriggerKind, UserId, Vouch, VouchId, VouchStatus};
use super::policy::ScorePolicy;
use super::store::{ScoreEventPublisher, ScoreStore, StoreError};

static VOUCH_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_vouch_id() -> VouchId {
    let id = VOUCH_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    VouchId(format!("vouch-{id:06}"))
}

/// Error enumeration for vouch lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum VouchError {
    #[error("vouch capacity exceeded: {used} of {max} points in use, {available} available")]
    CapacityExceeded { used: u8, available: u8, max: u8 },
    #[error("no score record for user {0}")]
    UnknownUser(UserId),
    #[error("vouch {0} not found")]
    NotFound(VouchId),
    #[error("vouch {vouch_id} is {status}, expected active")]
    InvalidState {
        vouch_id: VouchId,
        status: &'static str,
    },
    #[error("a member cannot vouch for themselves")]
    SelfVouch,
    #[error(transparent)]
    Adjustment(#[from] AdjustmentError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Capacity snapshot returned alongside rejections so callers can present a
/// precise reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VouchCapacity {
    pub max: u8,
    pub used: u8,
    pub available: u8,
}

/// Manages peer vouches: capacity accounting per voucher, value
/// computation, and the active → revoked/defaulted/expired lifecycle.
/// Vouching is a genuine risk transfer: a vouchee default penalizes the
/// voucher, not the vouchee.
pub struct VouchLedger<S, P> {
    store: Arc<S>,
    adjustments: Arc<AdjustmentProcessor<S, P>>,
    policy: Arc<ScorePolicy>,
}

impl<S, P> VouchLedger<S, P>
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

    /// Outstanding capacity for a voucher, derived from their tier.
    pub fn capacity(&self, voucher: &UserId) -> Result<VouchCapacity, VouchError> {
        let record = self
            .store
            .load(voucher)?
            .ok_or_else(|| VouchError::UnknownUser(voucher.clone()))?
            .record;
        let max = self.policy.vouching.strength_for(record.tier);
        let used = self.active_points(voucher)?;
        Ok(VouchCapacity {
            max,
            used,
            available: max.saturating_sub(used),
        })
    }

    /// Points a new vouch from `voucher` to `vouchee` would carry: the
    /// tier's base strength, plus one for a previously completed vouch
    /// between the pair, clamped to the voucher's remaining capacity.
    pub fn vouch_value(&self, voucher: &UserId, vouchee: &UserId) -> Result<u8, VouchError> {
        let capacity = self.capacity(voucher)?;
        let base = self.policy.vouching.strength_for(
            self.store
                .load(voucher)?
                .ok_or_else(|| VouchError::UnknownUser(voucher.clone()))?
                .record
                .tier,
        );

        let prior_success = self
            .store
            .vouches_by_voucher(voucher)?
            .iter()
            .any(|vouch| vouch.vouchee_id == *vouchee && vouch.status == VouchStatus::Expired);
        let relationship_bonus = u8::from(prior_success);

        Ok(base
            .saturating_add(relationship_bonus)
            .min(capacity.available))
    }

    /// Atomically check capacity and insert an active vouch, then grant the
    /// vouchee the vouch's points. `requested` pins the vouch strength; a
    /// request beyond the remaining capacity is rejected rather than
    /// silently shrunk. With no request, the computed vouch value applies.
    pub fn create_vouch(
        &self,
        voucher: &UserId,
        vouchee: &UserId,
        reason: &str,
        requested: Option<u8>,
        now: DateTime<Utc>,
    ) -> Result<Vouch, VouchError> {
        if voucher == vouchee {
            return Err(VouchError::SelfVouch);
        }
        if self.store.load(vouchee)?.is_none() {
            return Err(VouchError::UnknownUser(vouchee.clone()));
        }

        let capacity = self.capacity(voucher)?;
        let points = match requested {
            Some(points) => points,
            None => self.vouch_value(voucher, vouchee)?,
        };
        if points == 0 || points > capacity.available {
            return Err(VouchError::CapacityExceeded {
                used: capacity.used,
                available: capacity.available,
                max: capacity.max,
            });
        }

        let vouch = Vouch {
            vouch_id: next_vouch_id(),
            voucher_id: voucher.clone(),
            vouchee_id: vouchee.clone(),
            status: VouchStatus::Active,
            vouch_points: points,
            reason: reason.to_string(),
            created_at: now,
            expires_at: now + Duration::days(self.policy.vouching.expiry_days),
        };

        // The store re-checks outstanding points under its own lock; a
        // concurrent vouch that won the race surfaces as an overdraw here.
        match self.store.reserve_vouch(vouch.clone(), capacity.max) {
            Ok(()) => {}
            Err(StoreError::VouchOverdrawn { used }) => {
                return Err(VouchError::CapacityExceeded {
                    used,
                    available: capacity.max.saturating_sub(used),
                    max: capacity.max,
                });
            }
            Err(err) => return Err(err.into()),
        }

        match self.adjustments.apply(
            vouchee,
            i16::from(points),
            TriggerKind::VouchReceived,
            &vouch.vouch_id.0,
            now,
        ) {
            Ok(_) => {}
            Err(err) => {
                // Release the reservation; a vouch whose grant never landed
                // must not consume capacity.
                warn!(vouch = %vouch.vouch_id, error = %err, "vouch grant failed, releasing");
                let mut released = vouch.clone();
                released.status = VouchStatus::Revoked;
                self.store.update_vouch(released)?;
                return Err(err.into());
            }
        }

        info!(
            voucher = %voucher,
            vouchee = %vouchee,
            points,
            vouch = %vouch.vouch_id,
            "vouch created"
        );
        Ok(vouch)
    }

    /// Active → Revoked. No score change for either party.
    pub fn revoke_vouch(&self, vouch_id: &VouchId, reason: &str) -> Result<Vouch, VouchError> {
        let mut vouch = self.active_vouch(vouch_id)?;
        vouch.status = VouchStatus::Revoked;
        vouch.reason = reason.to_string();
        self.store.update_vouch(vouch.clone())?;
        info!(vouch = %vouch_id, "vouch revoked");
        Ok(vouch)
    }

    /// Active → Defaulted: the vouchee failed an obligation, so the voucher
    /// absorbs a penalty proportional to the points they staked. The
    /// vouchee's score is untouched by this event.
    pub fn mark_defaulted(
        &self,
        vouch_id: &VouchId,
        trigger_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vouch, VouchError> {
        let mut vouch = self.active_vouch(vouch_id)?;
        vouch.status = VouchStatus::Defaulted;
        self.store.update_vouch(vouch.clone())?;

        let penalty = i16::from(vouch.vouch_points)
            * i16::from(self.policy.vouching.default_penalty_multiplier);
        self.adjustments.apply(
            &vouch.voucher_id,
            -penalty,
            TriggerKind::VouchDefaulted,
            trigger_id,
            now,
        )?;

        info!(vouch = %vouch_id, voucher = %vouch.voucher_id, penalty, "vouch defaulted");
        Ok(vouch)
    }

    /// Active → Expired for vouches past their term. An expiry is the
    /// successful outcome: the voucher earns the predefined bonus for a
    /// vouch that ran its course without default.
    pub fn expire_due(&self, now: DateTime<Utc>) -> Result<usize, VouchError> {
        let mut expired = 0;
        for vouch in self.store.active_vouches()? {
            if vouch.expires_at > now {
                continue;
            }
            let mut done = vouch.clone();
            done.status = VouchStatus::Expired;
            self.store.update_vouch(done)?;
            expired += 1;

            if let Err(err) = self.adjustments.apply_predefined(
                &vouch.voucher_id,
                TriggerKind::VouchSuccess,
                &vouch.vouch_id.0,
                now,
            ) {
                warn!(vouch = %vouch.vouch_id, error = %err, "vouch success bonus failed");
            }
        }
        Ok(expired)
    }

    fn active_vouch(&self, vouch_id: &VouchId) -> Result<Vouch, VouchError> {
        let vouch = self
            .store
            .vouch(vouch_id)?
            .ok_or_else(|| VouchError::NotFound(vouch_id.clone()))?;
        if vouch.status != VouchStatus::Active {
            return Err(VouchError::InvalidState {
                vouch_id: vouch_id.clone(),
                status: vouch.status.label(),
            });
        }
        Ok(vouch)
    }

    fn active_points(&self, voucher: &UserId) -> Result<u8, VouchError> {
        Ok(self
            .store
            .vouches_by_voucher(voucher)?
            .iter()
            .filter(|vouch| vouch.status == VouchStatus::Active)
            .map(|vouch| vouch.vouch_points)
            .sum())
    }
}
