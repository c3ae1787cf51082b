//! Integration scenarios for the peer-vouching lifecycle: capacity
//! accounting, grants, revocation, default risk transfer, and expiry
//! rewards, driven through the public service facade.

mod common {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use xnscore::scoring::domain::{ComponentScores, ScoreRecord, UserId};
    use xnscore::scoring::{
        InMemoryScorePublisher, InMemoryScoreStore, ScorePolicy, ScoreService, ScoreStore,
    };

    pub(super) type MemoryService = ScoreService<InMemoryScoreStore, InMemoryScorePublisher>;

    pub(super) fn build_service() -> (Arc<MemoryService>, Arc<InMemoryScoreStore>) {
        let store = Arc::new(InMemoryScoreStore::default());
        let publisher = Arc::new(InMemoryScorePublisher::default());
        let service = Arc::new(ScoreService::new(
            store.clone(),
            publisher,
            ScorePolicy::default(),
        ));
        (service, store)
    }

    pub(super) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 15, 9, 0, 0)
            .single()
            .expect("valid instant")
    }

    pub(super) fn seed_member(
        store: &InMemoryScoreStore,
        id: &str,
        payment: u8,
        completion: u8,
        time: u8,
        deposit: u8,
        age_days: i64,
    ) -> UserId {
        let policy = ScorePolicy::default();
        let user_id = UserId(id.to_string());
        let scores = ComponentScores {
            payment_history: payment,
            completion,
            time_reliability: time,
            deposit,
            diversity_social: 0,
            engagement: 0,
        };
        let total = scores.total() as u8;
        let at = now();

        let record = ScoreRecord {
            user_id: user_id.clone(),
            components: scores,
            total_score: total,
            tier: policy.tier_for(total),
            created_at: at - Duration::days(age_days),
            account_age_days: age_days.max(0) as u32,
            max_allowed_score: policy.age_cap.cap_for(age_days.max(0) as u32),
            age_cap_applied: false,
            points_gained_this_week: 0,
            week_window_start: at,
            tenure_bonus: 0,
            tenure_months_earned: 0,
            last_financial_activity_at: at,
            financial_inactive_days: 0,
            total_inactivity_penalty: 0,
            decay_floor_reached: false,
        };
        store.create(record).expect("fixture record stored");
        user_id
    }

    /// A Trusted-tier member (vouch strength 5) with a long-settled account.
    pub(super) fn trusted_voucher(store: &InMemoryScoreStore, id: &str) -> UserId {
        seed_member(store, id, 30, 20, 15, 5, 365)
    }

    pub(super) fn young_vouchee(store: &InMemoryScoreStore, id: &str) -> UserId {
        seed_member(store, id, 20, 10, 0, 0, 200)
    }
}

mod grants {
    use super::common::*;
    use xnscore::scoring::{VouchError, VouchStatus};

    #[test]
    fn grant_moves_the_vouchee_and_consumes_capacity() {
        let (service, store) = build_service();
        let fatima = trusted_voucher(&store, "fatima");
        let yusuf = young_vouchee(&store, "yusuf");

        let vouch = service
            .vouching()
            .create_vouch(&fatima, &yusuf, "circle cofounder", None, now())
            .expect("vouch created");
        assert_eq!(vouch.status, VouchStatus::Active);
        assert_eq!(vouch.vouch_points, 5);

        let vouchee = service.get_score(&yusuf).expect("vouchee loads");
        assert_eq!(vouchee.total_score, 35);

        let capacity = service.vouching().capacity(&fatima).expect("capacity");
        assert_eq!(capacity.used, 5);
        assert_eq!(capacity.available, 0);

        // No capacity left for a second stake, however small.
        let zara = young_vouchee(&store, "zara");
        match service
            .vouching()
            .create_vouch(&fatima, &zara, "", Some(1), now())
        {
            Err(VouchError::CapacityExceeded { used, available, max }) => {
                assert_eq!((used, available, max), (5, 0, 5));
            }
            other => panic!("expected capacity rejection, got {other:?}"),
        }
    }

    #[test]
    fn oversized_request_is_rejected_not_shrunk() {
        let (service, store) = build_service();
        let fatima = trusted_voucher(&store, "fatima");
        let yusuf = young_vouchee(&store, "yusuf");

        match service
            .vouching()
            .create_vouch(&fatima, &yusuf, "", Some(9), now())
        {
            Err(VouchError::CapacityExceeded { used, available, max }) => {
                assert_eq!((used, available, max), (0, 5, 5));
            }
            other => panic!("expected capacity rejection, got {other:?}"),
        }

        // The rejection left no trace on either side.
        assert_eq!(service.get_score(&yusuf).expect("load").total_score, 30);
        assert_eq!(service.vouching().capacity(&fatima).expect("capacity").used, 0);
    }
}

mod revocation {
    use super::common::*;
    use xnscore::scoring::{VouchError, VouchStatus};

    #[test]
    fn revoke_frees_capacity_without_touching_scores() {
        let (service, store) = build_service();
        let fatima = trusted_voucher(&store, "fatima");
        let yusuf = young_vouchee(&store, "yusuf");

        let vouch = service
            .vouching()
            .create_vouch(&fatima, &yusuf, "", None, now())
            .expect("vouch created");
        let revoked = service
            .vouching()
            .revoke_vouch(&vouch.vouch_id, "left the circle")
            .expect("vouch revoked");
        assert_eq!(revoked.status, VouchStatus::Revoked);

        assert_eq!(service.vouching().capacity(&fatima).expect("capacity").used, 0);
        assert_eq!(service.get_score(&yusuf).expect("load").total_score, 35);

        // A settled vouch cannot be defaulted afterwards.
        match service
            .vouching()
            .mark_defaulted(&vouch.vouch_id, "loan-9", now())
        {
            Err(VouchError::InvalidState { status, .. }) => assert_eq!(status, "revoked"),
            other => panic!("expected invalid-state rejection, got {other:?}"),
        }
    }
}

mod defaults {
    use super::common::*;
    use xnscore::scoring::{Tier, VouchStatus};

    #[test]
    fn vouchee_default_penalizes_the_voucher_only() {
        let (service, store) = build_service();
        let fatima = trusted_voucher(&store, "fatima");
        let yusuf = young_vouchee(&store, "yusuf");

        let vouch = service
            .vouching()
            .create_vouch(&fatima, &yusuf, "", None, now())
            .expect("vouch created");
        let defaulted = service
            .vouching()
            .mark_defaulted(&vouch.vouch_id, "loan-9", now())
            .expect("default recorded");
        assert_eq!(defaulted.status, VouchStatus::Defaulted);

        // Double the staked points comes off the voucher.
        let voucher = service.get_score(&fatima).expect("voucher loads");
        assert_eq!(voucher.total_score, 60);
        assert_eq!(voucher.tier, Tier::Building);

        // The vouchee keeps the points that were granted.
        assert_eq!(service.get_score(&yusuf).expect("load").total_score, 35);
    }
}

mod expiry {
    use super::common::*;
    use chrono::Duration;
    use xnscore::scoring::{ScoreStore, VouchStatus};

    #[test]
    fn vouch_running_its_term_rewards_the_voucher() {
        let (service, store) = build_service();
        let fatima = trusted_voucher(&store, "fatima");
        let yusuf = young_vouchee(&store, "yusuf");

        let staked_at = now() - Duration::days(181);
        let vouch = service
            .vouching()
            .create_vouch(&fatima, &yusuf, "", None, staked_at)
            .expect("vouch created");

        let expired = service.vouching().expire_due(now()).expect("expiry sweep");
        assert_eq!(expired, 1);

        let settled = store
            .vouch(&vouch.vouch_id)
            .expect("store read")
            .expect("vouch present");
        assert_eq!(settled.status, VouchStatus::Expired);

        // Capacity is back, and the completed stake earned its bonus.
        let capacity = service.vouching().capacity(&fatima).expect("capacity");
        assert_eq!(capacity.available, 5);
        assert_eq!(service.get_score(&fatima).expect("load").total_score, 73);

        // Settled vouches are not expired twice.
        assert_eq!(service.vouching().expire_due(now()).expect("sweep"), 0);
    }
}
