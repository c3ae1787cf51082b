use chrono::{DateTime, Duration, Utc};

use super::domain::ScoreRecord;
use super::policy::ScorePolicy;

/// Result of composing the age cap and the weekly velocity cap over a
/// proposed delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampOutcome {
    pub applied: i16,
    pub age_capped: bool,
    pub velocity_capped: bool,
}

/// Bring the record's derived cap fields up to date: account age, the
/// age-based ceiling, and the rolling 7-day velocity window.
pub fn refresh(record: &mut ScoreRecord, policy: &ScorePolicy, now: DateTime<Utc>) {
    let age_days = (now - record.created_at).num_days().max(0) as u32;
    record.account_age_days = age_days;
    record.max_allowed_score = policy.age_cap.cap_for(age_days);
    record.financial_inactive_days =
        (now - record.last_financial_activity_at).num_days().max(0) as u32;

    if now - record.week_window_start >= Duration::days(7) {
        record.week_window_start = now;
        record.points_gained_this_week = 0;
    }
}

/// Clamp a proposed delta to the age ceiling and, unless exempt, the weekly
/// velocity allowance. Only positive deltas are ever reduced; penalties and
/// decay pass through untouched. The smaller of the two allowed deltas wins.
pub fn clamp(
    record: &ScoreRecord,
    proposed: i16,
    velocity_exempt: bool,
    policy: &ScorePolicy,
) -> ClampOutcome {
    if proposed <= 0 {
        return ClampOutcome {
            applied: proposed,
            age_capped: false,
            velocity_capped: false,
        };
    }

    let headroom = i16::from(record.max_allowed_score.saturating_sub(record.total_score));
    let age_allowed = proposed.min(headroom);

    let velocity_allowed = if velocity_exempt {
        proposed
    } else {
        let remaining = policy
            .weekly_velocity_limit
            .saturating_sub(record.points_gained_this_week);
        proposed.min(i16::from(remaining))
    };

    let applied = age_allowed.min(velocity_allowed).max(0);
    ClampOutcome {
        applied,
        age_capped: applied < proposed && age_allowed <= velocity_allowed,
        velocity_capped: !velocity_exempt && velocity_allowed < proposed,
    }
}
