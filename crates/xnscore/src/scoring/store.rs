use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    AdjustmentEvent, DecayEvent, RecoveryPeriod, ScoreRecord, TenureEvent, Tier, TriggerKind,
    UserId, Vouch, VouchId,
};

/// A score record together with its optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedRecord {
    pub version: u64,
    pub record: ScoreRecord,
}

/// Sweep bookkeeping committed alongside a record mutation. Carrying the
/// row through `commit` keeps the idempotence key and the score change in
/// one transaction; a failed commit leaves neither behind.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepEvent {
    Decay(DecayEvent),
    Tenure(TenureEvent),
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record version changed underneath the writer")]
    VersionConflict,
    #[error("vouch capacity exhausted: {used} points already active")]
    VouchOverdrawn { used: u8 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence boundary for score records, audit history, vouches, recovery
/// windows, and sweep bookkeeping. All per-user mutations are linearized
/// through `commit`'s compare-and-set; implementations must persist the
/// record and the history row atomically.
pub trait ScoreStore: Send + Sync {
    fn create(&self, record: ScoreRecord) -> Result<VersionedRecord, StoreError>;
    fn load(&self, user: &UserId) -> Result<Option<VersionedRecord>, StoreError>;
    /// Commit a record at `expected_version`, appending `event` and the
    /// `sweep` bookkeeping row (when present) in the same transaction.
    /// Fails with `VersionConflict` if a concurrent writer got there first.
    fn commit(
        &self,
        expected_version: u64,
        record: ScoreRecord,
        event: Option<AdjustmentEvent>,
        sweep: Option<SweepEvent>,
    ) -> Result<VersionedRecord, StoreError>;
    fn history(&self, user: &UserId, limit: usize) -> Result<Vec<AdjustmentEvent>, StoreError>;
    fn all_users(&self) -> Result<Vec<UserId>, StoreError>;

    /// Atomically check the voucher's outstanding active points against
    /// `capacity_max` and insert the vouch, failing with `VouchOverdrawn`
    /// when the new vouch would exceed capacity. This is the voucher-scoped
    /// serialization boundary that keeps two near-capacity requests from
    /// both succeeding.
    fn reserve_vouch(&self, vouch: Vouch, capacity_max: u8) -> Result<(), StoreError>;
    fn vouch(&self, id: &VouchId) -> Result<Option<Vouch>, StoreError>;
    fn update_vouch(&self, vouch: Vouch) -> Result<(), StoreError>;
    fn vouches_by_voucher(&self, voucher: &UserId) -> Result<Vec<Vouch>, StoreError>;
    fn vouches_for_vouchee(&self, vouchee: &UserId) -> Result<Vec<Vouch>, StoreError>;
    fn active_vouches(&self) -> Result<Vec<Vouch>, StoreError>;

    fn recovery_period(&self, user: &UserId) -> Result<Option<RecoveryPeriod>, StoreError>;
    fn put_recovery_period(&self, period: RecoveryPeriod) -> Result<(), StoreError>;
    fn recovery_periods(&self) -> Result<Vec<RecoveryPeriod>, StoreError>;

    fn decay_event_exists(&self, user: &UserId, date: NaiveDate) -> Result<bool, StoreError>;
    fn tenure_event_exists(&self, user: &UserId, month: &str) -> Result<bool, StoreError>;
    /// Record an accrual month that moved no score (ceiling already reached).
    /// Months that do move the score travel through `commit` instead.
    fn record_tenure_event(&self, event: TenureEvent) -> Result<(), StoreError>;
}

/// Post-commit notification consumed by presentation and notification
/// collaborators. The core keeps no subscriber state; it only emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub user_id: UserId,
    pub score_change: i16,
    pub total_score: u8,
    pub tier: Tier,
    pub trigger: TriggerKind,
    pub at: DateTime<Utc>,
}

/// Publish error.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("publish transport unavailable: {0}")]
    Transport(String),
}

/// Trait describing the outbound post-commit hook. Failures are logged and
/// never roll back a committed adjustment.
pub trait ScoreEventPublisher: Send + Sync {
    fn publish(&self, update: ScoreUpdate) -> Result<(), PublishError>;
}
