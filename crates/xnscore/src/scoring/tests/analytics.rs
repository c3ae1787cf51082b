use super::common::*;
use crate::scoring::domain::{RiskBand, Tier};

#[test]
fn leaderboard_orders_by_score_then_user() {
    let harness = harness();
    seed_member(&harness, "bronze", seed(20, 10, 0, 0, 0, 0), 365, 0);
    seed_member(&harness, "silver", seed(30, 20, 5, 0, 0, 0), 365, 0);
    seed_member(&harness, "gold", seed(35, 25, 20, 5, 0, 0), 365, 0);
    seed_member(&harness, "silver-too", seed(30, 20, 5, 0, 0, 0), 365, 0);

    let entries = harness.service.analytics().leaderboard(3).expect("leaderboard loads");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].user_id, user("gold"));
    assert_eq!(entries[0].total_score, 85);
    assert_eq!(entries[1].user_id, user("silver"));
    assert_eq!(entries[2].user_id, user("silver-too"));
}

#[test]
fn tier_distribution_counts_members_per_band() {
    let harness = harness();
    seed_member(&harness, "a", seed(35, 25, 20, 5, 0, 0), 365, 0);
    seed_member(&harness, "b", seed(30, 20, 15, 5, 0, 0), 365, 0);
    seed_member(&harness, "c", seed(30, 20, 15, 5, 0, 0), 365, 0);
    seed_member(&harness, "d", seed(10, 5, 0, 0, 0, 0), 365, 0);

    let distribution = harness
        .service
        .analytics()
        .tier_distribution()
        .expect("distribution loads");
    assert_eq!(distribution.get(&Tier::Excellent), Some(&1));
    assert_eq!(distribution.get(&Tier::Trusted), Some(&2));
    assert_eq!(distribution.get(&Tier::Restricted), Some(&1));
    assert_eq!(distribution.get(&Tier::Building), None);
}

#[test]
fn at_risk_listing_starts_at_the_warning_band() {
    let harness = harness();
    seed_member(&harness, "fresh", seed(30, 20, 15, 5, 0, 0), 365, 5);
    seed_member(&harness, "warned", seed(30, 20, 15, 5, 0, 0), 365, 35);
    seed_member(&harness, "critical", seed(30, 20, 15, 5, 0, 0), 365, 130);

    let entries = harness
        .service
        .analytics()
        .decay_at_risk_users(now())
        .expect("listing loads");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].user_id, user("critical"));
    assert_eq!(entries[0].band, RiskBand::Critical);
    assert_eq!(entries[1].user_id, user("warned"));
    assert_eq!(entries[1].band, RiskBand::Warning);
}

#[test]
fn tenure_eligibles_are_active_with_headroom_and_no_accrual_yet() {
    let harness = harness();
    let eligible = trusted_member(&harness, "eligible");
    seed_member(&harness, "idle", seed(30, 20, 15, 5, 0, 0), 365, 70);

    let users = harness
        .service
        .analytics()
        .tenure_eligible_users(now())
        .expect("listing loads");
    assert_eq!(users, vec![eligible.clone()]);

    // Once the month is accrued the member drops off.
    let cancel = std::sync::atomic::AtomicBool::new(false);
    harness
        .service
        .tenure()
        .accrue_monthly("2026-08", now(), &cancel)
        .expect("accrual runs");
    assert!(harness
        .service
        .analytics()
        .tenure_eligible_users(now())
        .expect("listing loads")
        .is_empty());
}

#[test]
fn recovery_listing_shows_only_active_windows() {
    let harness = harness();
    let active = trusted_member(&harness, "active");
    let lapsed = trusted_member(&harness, "lapsed");

    harness
        .service
        .recovery()
        .start_recovery(&active, "case", now())
        .expect("window opens");
    harness
        .service
        .recovery()
        .start_recovery(&lapsed, "case", now() - chrono::Duration::days(30))
        .expect("window opens");

    let periods = harness
        .service
        .analytics()
        .recovery_period_users(now())
        .expect("listing loads");
    assert_eq!(periods.len(), 1);
    assert_eq!(periods[0].user_id, active);
}
