use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::scoring::domain::{
    ActivityType, AdjustmentEvent, ComponentScores, RecoveryPeriod, ScoreRecord, TenureEvent,
    UserId, Vouch, VouchId,
};
use crate::scoring::memory::{InMemoryScorePublisher, InMemoryScoreStore};
use crate::scoring::policy::ScorePolicy;
use crate::scoring::service::ScoreService;
use crate::scoring::store::{ScoreStore, StoreError, SweepEvent, VersionedRecord};

pub(super) type MemoryService = ScoreService<InMemoryScoreStore, InMemoryScorePublisher>;

pub(super) struct Harness {
    pub service: Arc<MemoryService>,
    pub store: Arc<InMemoryScoreStore>,
    pub publisher: Arc<InMemoryScorePublisher>,
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(InMemoryScoreStore::default());
    let publisher = Arc::new(InMemoryScorePublisher::default());
    let service = Arc::new(ScoreService::new(
        store.clone(),
        publisher.clone(),
        ScorePolicy::default(),
    ));
    Harness {
        service,
        store,
        publisher,
    }
}

/// Fixed reference instant so window arithmetic stays deterministic.
pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).single().expect("valid instant")
}

pub(super) fn user(id: &str) -> UserId {
    UserId(id.to_string())
}

pub(super) fn seed(
    payment: u8,
    completion: u8,
    time: u8,
    deposit: u8,
    diversity: u8,
    engagement: u8,
) -> ComponentScores {
    ComponentScores {
        payment_history: payment,
        completion,
        time_reliability: time,
        deposit,
        diversity_social: diversity,
        engagement,
    }
}

/// Seed a member whose account is `age_days` old at `now()` and whose last
/// financial activity was `inactive_days` ago, bypassing the enrollment
/// clamp so fixtures can sit anywhere on the scale.
pub(super) fn seed_member(
    harness: &Harness,
    id: &str,
    components: ComponentScores,
    age_days: i64,
    inactive_days: i64,
) -> UserId {
    let user_id = user(id);
    let policy = ScorePolicy::default();
    let total = components.total() as u8;
    let created_at = now() - Duration::days(age_days);
    let last_activity = now() - Duration::days(inactive_days);

    let record = ScoreRecord {
        user_id: user_id.clone(),
        components,
        total_score: total,
        tier: policy.tier_for(total),
        created_at,
        account_age_days: age_days.max(0) as u32,
        max_allowed_score: policy.age_cap.cap_for(age_days.max(0) as u32),
        age_cap_applied: false,
        points_gained_this_week: 0,
        week_window_start: created_at,
        tenure_bonus: 0,
        tenure_months_earned: 0,
        last_financial_activity_at: last_activity,
        financial_inactive_days: inactive_days.max(0) as u32,
        total_inactivity_penalty: 0,
        decay_floor_reached: false,
    };
    harness.store.create(record).expect("fixture record stored");
    user_id
}

/// A member old enough to be uncapped, seeded into the Trusted band and
/// financially active today.
pub(super) fn trusted_member(harness: &Harness, id: &str) -> UserId {
    seed_member(harness, id, seed(30, 20, 15, 5, 0, 0), 365, 0)
}

/// Record a qualifying wallet signal so the member counts as financially
/// active at `at`.
pub(super) fn touch_activity(harness: &Harness, user_id: &UserId, at: DateTime<Utc>) {
    harness
        .service
        .decay()
        .update_financial_activity(user_id, ActivityType::Contribution, "evt-test", at)
        .expect("activity update succeeds");
}

/// Store wrapper that fails every `load` for one designated user, for
/// batch-isolation coverage.
pub(super) struct FailingStore {
    pub inner: Arc<InMemoryScoreStore>,
    pub fail_user: UserId,
}

impl ScoreStore for FailingStore {
    fn create(&self, record: ScoreRecord) -> Result<VersionedRecord, StoreError> {
        self.inner.create(record)
    }

    fn load(&self, user: &UserId) -> Result<Option<VersionedRecord>, StoreError> {
        if *user == self.fail_user {
            return Err(StoreError::Unavailable("injected outage".to_string()));
        }
        self.inner.load(user)
    }

    fn commit(
        &self,
        expected_version: u64,
        record: ScoreRecord,
        event: Option<AdjustmentEvent>,
        sweep: Option<SweepEvent>,
    ) -> Result<VersionedRecord, StoreError> {
        self.inner.commit(expected_version, record, event, sweep)
    }

    fn history(&self, user: &UserId, limit: usize) -> Result<Vec<AdjustmentEvent>, StoreError> {
        self.inner.history(user, limit)
    }

    fn all_users(&self) -> Result<Vec<UserId>, StoreError> {
        self.inner.all_users()
    }

    fn reserve_vouch(&self, vouch: Vouch, capacity_max: u8) -> Result<(), StoreError> {
        self.inner.reserve_vouch(vouch, capacity_max)
    }

    fn vouch(&self, id: &VouchId) -> Result<Option<Vouch>, StoreError> {
        self.inner.vouch(id)
    }

    fn update_vouch(&self, vouch: Vouch) -> Result<(), StoreError> {
        self.inner.update_vouch(vouch)
    }

    fn vouches_by_voucher(&self, voucher: &UserId) -> Result<Vec<Vouch>, StoreError> {
        self.inner.vouches_by_voucher(voucher)
    }

    fn vouches_for_vouchee(&self, vouchee: &UserId) -> Result<Vec<Vouch>, StoreError> {
        self.inner.vouches_for_vouchee(vouchee)
    }

    fn active_vouches(&self) -> Result<Vec<Vouch>, StoreError> {
        self.inner.active_vouches()
    }

    fn recovery_period(&self, user: &UserId) -> Result<Option<RecoveryPeriod>, StoreError> {
        self.inner.recovery_period(user)
    }

    fn put_recovery_period(&self, period: RecoveryPeriod) -> Result<(), StoreError> {
        self.inner.put_recovery_period(period)
    }

    fn recovery_periods(&self) -> Result<Vec<RecoveryPeriod>, StoreError> {
        self.inner.recovery_periods()
    }

    fn decay_event_exists(&self, user: &UserId, date: NaiveDate) -> Result<bool, StoreError> {
        self.inner.decay_event_exists(user, date)
    }

    fn tenure_event_exists(&self, user: &UserId, month: &str) -> Result<bool, StoreError> {
        self.inner.tenure_event_exists(user, month)
    }

    fn record_tenure_event(&self, event: TenureEvent) -> Result<(), StoreError> {
        self.inner.record_tenure_event(event)
    }
}

/// Store wrapper that fails the first commit carrying a sweep bookkeeping
/// row, for retry-after-partial-failure coverage.
pub(super) struct FlakySweepStore {
    pub inner: Arc<InMemoryScoreStore>,
    tripped: AtomicBool,
}

impl FlakySweepStore {
    pub fn new(inner: Arc<InMemoryScoreStore>) -> Self {
        Self {
            inner,
            tripped: AtomicBool::new(false),
        }
    }
}

impl ScoreStore for FlakySweepStore {
    fn create(&self, record: ScoreRecord) -> Result<VersionedRecord, StoreError> {
        self.inner.create(record)
    }

    fn load(&self, user: &UserId) -> Result<Option<VersionedRecord>, StoreError> {
        self.inner.load(user)
    }

    fn commit(
        &self,
        expected_version: u64,
        record: ScoreRecord,
        event: Option<AdjustmentEvent>,
        sweep: Option<SweepEvent>,
    ) -> Result<VersionedRecord, StoreError> {
        if sweep.is_some() && !self.tripped.swap(true, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected outage".to_string()));
        }
        self.inner.commit(expected_version, record, event, sweep)
    }

    fn history(&self, user: &UserId, limit: usize) -> Result<Vec<AdjustmentEvent>, StoreError> {
        self.inner.history(user, limit)
    }

    fn all_users(&self) -> Result<Vec<UserId>, StoreError> {
        self.inner.all_users()
    }

    fn reserve_vouch(&self, vouch: Vouch, capacity_max: u8) -> Result<(), StoreError> {
        self.inner.reserve_vouch(vouch, capacity_max)
    }

    fn vouch(&self, id: &VouchId) -> Result<Option<Vouch>, StoreError> {
        self.inner.vouch(id)
    }

    fn update_vouch(&self, vouch: Vouch) -> Result<(), StoreError> {
        self.inner.update_vouch(vouch)
    }

    fn vouches_by_voucher(&self, voucher: &UserId) -> Result<Vec<Vouch>, StoreError> {
        self.inner.vouches_by_voucher(voucher)
    }

    fn vouches_for_vouchee(&self, vouchee: &UserId) -> Result<Vec<Vouch>, StoreError> {
        self.inner.vouches_for_vouchee(vouchee)
    }

    fn active_vouches(&self) -> Result<Vec<Vouch>, StoreError> {
        self.inner.active_vouches()
    }

    fn recovery_period(&self, user: &UserId) -> Result<Option<RecoveryPeriod>, StoreError> {
        self.inner.recovery_period(user)
    }

    fn put_recovery_period(&self, period: RecoveryPeriod) -> Result<(), StoreError> {
        self.inner.put_recovery_period(period)
    }

    fn recovery_periods(&self) -> Result<Vec<RecoveryPeriod>, StoreError> {
        self.inner.recovery_periods()
    }

    fn decay_event_exists(&self, user: &UserId, date: NaiveDate) -> Result<bool, StoreError> {
        self.inner.decay_event_exists(user, date)
    }

    fn tenure_event_exists(&self, user: &UserId, month: &str) -> Result<bool, StoreError> {
        self.inner.tenure_event_exists(user, month)
    }

    fn record_tenure_event(&self, event: TenureEvent) -> Result<(), StoreError> {
        self.inner.record_tenure_event(event)
    }
}
