use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Duration;

use super::common::*;
use crate::scoring::domain::{ActivityType, RiskBand, TriggerKind};
use crate::scoring::memory::{InMemoryScorePublisher, InMemoryScoreStore};
use crate::scoring::policy::ScorePolicy;
use crate::scoring::service::ScoreService;
use crate::scoring::store::ScoreStore;

fn no_cancel() -> AtomicBool {
    AtomicBool::new(false)
}

#[test]
fn risk_bands_follow_the_policy_thresholds() {
    let policy = ScorePolicy::default();
    assert_eq!(policy.decay.band_for(0), (RiskBand::Low, 0));
    assert_eq!(policy.decay.band_for(29), (RiskBand::Low, 0));
    assert_eq!(policy.decay.band_for(30), (RiskBand::Warning, 0));
    assert_eq!(policy.decay.band_for(45), (RiskBand::Moderate, 1));
    assert_eq!(policy.decay.band_for(60), (RiskBand::High, 2));
    assert_eq!(policy.decay.band_for(95), (RiskBand::Severe, 3));
    assert_eq!(policy.decay.band_for(400), (RiskBand::Critical, 5));
}

#[test]
fn severe_inactivity_decays_once_per_day() {
    // Scenario: 95 days of inactivity crosses the severe threshold.
    let harness = harness();
    let user_id = seed_member(&harness, "dormant", seed(30, 20, 15, 5, 0, 0), 365, 95);

    let first = harness
        .service
        .decay()
        .sweep_inactive(now(), &no_cancel())
        .expect("sweep runs");
    assert_eq!(first.applied, 1);
    assert_eq!(first.failed, 0);

    let record = harness.service.get_score(&user_id).expect("record verifies");
    assert_eq!(record.total_score, 67);
    assert_eq!(record.total_inactivity_penalty, 3);

    // Immediate re-run the same day is a no-op.
    let second = harness
        .service
        .decay()
        .sweep_inactive(now(), &no_cancel())
        .expect("sweep runs");
    assert_eq!(second.applied, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(
        harness.service.get_score(&user_id).expect("record verifies").total_score,
        67
    );
    assert_eq!(harness.store.history(&user_id, 10).expect("history loads").len(), 1);
}

#[test]
fn decay_bypasses_the_velocity_cap_but_marks_history() {
    let harness = harness();
    let user_id = seed_member(&harness, "inactive", seed(30, 20, 15, 5, 0, 0), 365, 130);

    harness
        .service
        .decay()
        .sweep_inactive(now(), &no_cancel())
        .expect("sweep runs");

    let latest = &harness.store.history(&user_id, 1).expect("history loads")[0];
    assert_eq!(latest.trigger, TriggerKind::InactivityDecay);
    assert_eq!(latest.score_change, -5);
    assert!(!latest.velocity_capped);
}

#[test]
fn decay_stops_at_the_floor() {
    // 18 points, two sweeps of critical decay: 15 is the floor.
    let harness = harness();
    let user_id = seed_member(&harness, "floored", seed(10, 8, 0, 0, 0, 0), 365, 130);

    harness
        .service
        .decay()
        .sweep_inactive(now(), &no_cancel())
        .expect("sweep runs");
    let record = harness.service.get_score(&user_id).expect("record verifies");
    assert_eq!(record.total_score, 15);
    assert!(record.decay_floor_reached);

    let next_day = now() + Duration::days(1);
    let result = harness
        .service
        .decay()
        .sweep_inactive(next_day, &no_cancel())
        .expect("sweep runs");
    assert_eq!(result.applied, 0);
    assert_eq!(
        harness.service.get_score(&user_id).expect("record verifies").total_score,
        15
    );
}

#[test]
fn activity_resets_the_clock_and_the_floor_latch() {
    let harness = harness();
    let user_id = seed_member(&harness, "returning", seed(10, 8, 0, 0, 0, 0), 365, 130);

    harness
        .service
        .decay()
        .sweep_inactive(now(), &no_cancel())
        .expect("sweep runs");
    assert!(
        harness.service.get_score(&user_id).expect("record verifies").decay_floor_reached
    );

    let record = harness
        .service
        .decay()
        .update_financial_activity(&user_id, ActivityType::Deposit, "wallet-55", now())
        .expect("activity recorded");
    assert_eq!(record.financial_inactive_days, 0);
    assert!(!record.decay_floor_reached);
    assert_eq!(record.last_financial_activity_at, now());

    // Fresh activity means no decay tomorrow.
    let result = harness
        .service
        .decay()
        .sweep_inactive(now() + Duration::days(1), &no_cancel())
        .expect("sweep runs");
    assert_eq!(result.applied, 0);
}

#[test]
fn one_failing_user_does_not_abort_the_batch() {
    let inner = Arc::new(InMemoryScoreStore::default());
    let publisher = Arc::new(InMemoryScorePublisher::default());
    let seeded = ScoreService::new(inner.clone(), publisher.clone(), ScorePolicy::default());

    let fixture = Harness {
        service: Arc::new(seeded),
        store: inner.clone(),
        publisher: publisher.clone(),
    };
    seed_member(&fixture, "healthy", seed(30, 20, 15, 5, 0, 0), 365, 95);
    let broken = seed_member(&fixture, "broken", seed(30, 20, 15, 5, 0, 0), 365, 95);

    let failing = Arc::new(FailingStore {
        inner,
        fail_user: broken.clone(),
    });
    let service = ScoreService::new(failing, publisher, ScorePolicy::default());

    let result = service
        .decay()
        .sweep_inactive(now(), &no_cancel())
        .expect("sweep runs");

    assert_eq!(result.processed, 2);
    assert_eq!(result.applied, 1);
    assert_eq!(result.failed, 1);
    assert_eq!(result.failures[0].0, broken);
    assert!(!result.cancelled);
}

#[test]
fn failed_commit_leaves_the_user_retryable_without_double_decay() {
    let inner = Arc::new(InMemoryScoreStore::default());
    let publisher = Arc::new(InMemoryScorePublisher::default());
    let seeded = ScoreService::new(inner.clone(), publisher.clone(), ScorePolicy::default());

    let fixture = Harness {
        service: Arc::new(seeded),
        store: inner.clone(),
        publisher: publisher.clone(),
    };
    let user_id = seed_member(&fixture, "flaky", seed(30, 20, 15, 5, 0, 0), 365, 95);

    let flaky = Arc::new(FlakySweepStore::new(inner.clone()));
    let service = ScoreService::new(flaky, publisher, ScorePolicy::default());

    let first = service
        .decay()
        .sweep_inactive(now(), &no_cancel())
        .expect("sweep runs");
    assert_eq!(first.failed, 1);
    assert_eq!(first.applied, 0);

    // The failed commit left neither the penalty nor the day key behind.
    let record = fixture.service.get_score(&user_id).expect("record verifies");
    assert_eq!(record.total_score, 70);
    assert!(!inner
        .decay_event_exists(&user_id, now().date_naive())
        .expect("lookup succeeds"));

    // The next scheduled run lands the day's penalty exactly once.
    let retry = service
        .decay()
        .sweep_inactive(now(), &no_cancel())
        .expect("sweep runs");
    assert_eq!(retry.applied, 1);
    assert_eq!(
        fixture.service.get_score(&user_id).expect("record verifies").total_score,
        67
    );

    let third = service
        .decay()
        .sweep_inactive(now(), &no_cancel())
        .expect("sweep runs");
    assert_eq!(third.applied, 0);
    assert_eq!(third.skipped, 1);
    assert_eq!(
        fixture.service.get_score(&user_id).expect("record verifies").total_score,
        67
    );
}

#[test]
fn sweep_cancels_between_users() {
    let harness = harness();
    seed_member(&harness, "one", seed(30, 20, 15, 5, 0, 0), 365, 95);
    seed_member(&harness, "two", seed(30, 20, 15, 5, 0, 0), 365, 95);

    let cancel = AtomicBool::new(true);
    let result = harness
        .service
        .decay()
        .sweep_inactive(now(), &cancel)
        .expect("sweep runs");

    assert!(result.cancelled);
    assert_eq!(result.processed, 0);
}
