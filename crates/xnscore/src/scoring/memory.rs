use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;

use super::domain::{
    AdjustmentEvent, DecayEvent, RecoveryPeriod, ScoreRecord, TenureEvent, UserId, Vouch, VouchId,
    VouchStatus,
};
use super::store::{
    PublishError, ScoreEventPublisher, ScoreStore, ScoreUpdate, StoreError, SweepEvent,
    VersionedRecord,
};

#[derive(Default)]
struct Tables {
    records: HashMap<UserId, VersionedRecord>,
    history: HashMap<UserId, Vec<AdjustmentEvent>>,
    vouches: HashMap<VouchId, Vouch>,
    recovery: HashMap<UserId, RecoveryPeriod>,
    decay_events: HashMap<(UserId, NaiveDate), DecayEvent>,
    tenure_events: HashMap<(UserId, String), TenureEvent>,
}

/// Mutex-backed store for tests, demos, and single-node deployments. One
/// lock over all tables keeps `commit` and `reserve_vouch` atomic, which is
/// the contract a relational backend would meet with transactions.
#[derive(Default)]
pub struct InMemoryScoreStore {
    tables: Mutex<Tables>,
}

impl InMemoryScoreStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("score store mutex poisoned")
    }
}

impl ScoreStore for InMemoryScoreStore {
    fn create(&self, record: ScoreRecord) -> Result<VersionedRecord, StoreError> {
        let mut tables = self.lock();
        if tables.records.contains_key(&record.user_id) {
            return Err(StoreError::Conflict);
        }
        let versioned = VersionedRecord { version: 1, record };
        tables
            .records
            .insert(versioned.record.user_id.clone(), versioned.clone());
        Ok(versioned)
    }

    fn load(&self, user: &UserId) -> Result<Option<VersionedRecord>, StoreError> {
        Ok(self.lock().records.get(user).cloned())
    }

    fn commit(
        &self,
        expected_version: u64,
        record: ScoreRecord,
        event: Option<AdjustmentEvent>,
        sweep: Option<SweepEvent>,
    ) -> Result<VersionedRecord, StoreError> {
        let mut tables = self.lock();
        let current = tables
            .records
            .get(&record.user_id)
            .ok_or(StoreError::NotFound)?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict);
        }

        let user = record.user_id.clone();
        let versioned = VersionedRecord {
            version: expected_version + 1,
            record,
        };
        tables.records.insert(user.clone(), versioned.clone());
        if let Some(event) = event {
            tables.history.entry(user).or_default().push(event);
        }
        match sweep {
            Some(SweepEvent::Decay(event)) => {
                tables
                    .decay_events
                    .insert((event.user_id.clone(), event.date), event);
            }
            Some(SweepEvent::Tenure(event)) => {
                tables
                    .tenure_events
                    .insert((event.user_id.clone(), event.month.clone()), event);
            }
            None => {}
        }
        Ok(versioned)
    }

    fn history(&self, user: &UserId, limit: usize) -> Result<Vec<AdjustmentEvent>, StoreError> {
        let tables = self.lock();
        let events = tables.history.get(user).cloned().unwrap_or_default();
        Ok(events.into_iter().rev().take(limit).collect())
    }

    fn all_users(&self) -> Result<Vec<UserId>, StoreError> {
        let mut users: Vec<UserId> = self.lock().records.keys().cloned().collect();
        users.sort();
        Ok(users)
    }

    fn reserve_vouch(&self, vouch: Vouch, capacity_max: u8) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let used: u8 = tables
            .vouches
            .values()
            .filter(|existing| {
                existing.voucher_id == vouch.voucher_id && existing.status == VouchStatus::Active
            })
            .map(|existing| existing.vouch_points)
            .sum();
        if used.saturating_add(vouch.vouch_points) > capacity_max {
            return Err(StoreError::VouchOverdrawn { used });
        }
        tables.vouches.insert(vouch.vouch_id.clone(), vouch);
        Ok(())
    }

    fn vouch(&self, id: &VouchId) -> Result<Option<Vouch>, StoreError> {
        Ok(self.lock().vouches.get(id).cloned())
    }

    fn update_vouch(&self, vouch: Vouch) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if !tables.vouches.contains_key(&vouch.vouch_id) {
            return Err(StoreError::NotFound);
        }
        tables.vouches.insert(vouch.vouch_id.clone(), vouch);
        Ok(())
    }

    fn vouches_by_voucher(&self, voucher: &UserId) -> Result<Vec<Vouch>, StoreError> {
        Ok(self
            .lock()
            .vouches
            .values()
            .filter(|vouch| vouch.voucher_id == *voucher)
            .cloned()
            .collect())
    }

    fn vouches_for_vouchee(&self, vouchee: &UserId) -> Result<Vec<Vouch>, StoreError> {
        Ok(self
            .lock()
            .vouches
            .values()
            .filter(|vouch| vouch.vouchee_id == *vouchee)
            .cloned()
            .collect())
    }

    fn active_vouches(&self) -> Result<Vec<Vouch>, StoreError> {
        Ok(self
            .lock()
            .vouches
            .values()
            .filter(|vouch| vouch.status == VouchStatus::Active)
            .cloned()
            .collect())
    }

    fn recovery_period(&self, user: &UserId) -> Result<Option<RecoveryPeriod>, StoreError> {
        Ok(self.lock().recovery.get(user).cloned())
    }

    fn put_recovery_period(&self, period: RecoveryPeriod) -> Result<(), StoreError> {
        self.lock().recovery.insert(period.user_id.clone(), period);
        Ok(())
    }

    fn recovery_periods(&self) -> Result<Vec<RecoveryPeriod>, StoreError> {
        Ok(self.lock().recovery.values().cloned().collect())
    }

    fn decay_event_exists(&self, user: &UserId, date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .decay_events
            .contains_key(&(user.clone(), date)))
    }

    fn tenure_event_exists(&self, user: &UserId, month: &str) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .tenure_events
            .contains_key(&(user.clone(), month.to_string())))
    }

    fn record_tenure_event(&self, event: TenureEvent) -> Result<(), StoreError> {
        self.lock()
            .tenure_events
            .insert((event.user_id.clone(), event.month.clone()), event);
        Ok(())
    }
}

/// Collects post-commit updates so tests and demos can assert on them.
#[derive(Default)]
pub struct InMemoryScorePublisher {
    events: Mutex<Vec<ScoreUpdate>>,
}

impl InMemoryScorePublisher {
    pub fn events(&self) -> Vec<ScoreUpdate> {
        self.events.lock().expect("publisher mutex poisoned").clone()
    }
}

impl ScoreEventPublisher for InMemoryScorePublisher {
    fn publish(&self, update: ScoreUpdate) -> Result<(), PublishError> {
        self.events
            .lock()
            .expect("publisher mutex poisoned")
            .push(update);
        Ok(())
    }
}
