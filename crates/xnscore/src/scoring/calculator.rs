use tracing::error;

use super::domain::{Component, ComponentScores, ScoreRecord, Tier};
use super::policy::ScorePolicy;

/// Data-integrity failure detected while recomputing or verifying a record.
/// Never auto-corrected: silently rewriting a trust score is itself a
/// risk-relevant event, so the record is flagged for manual reconciliation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrityError {
    #[error("component {component} holds {value}, exceeding its bound {max}")]
    ComponentOutOfBounds {
        component: &'static str,
        value: u8,
        max: u8,
    },
    #[error("component sum {computed} exceeds 100")]
    SumOutOfRange { computed: u16 },
    #[error("stored total {stored} does not match component sum {computed}")]
    TotalMismatch { stored: u8, computed: u16 },
    #[error("total {total} exceeds age cap {cap}")]
    AgeCapBreached { total: u8, cap: u8 },
}

/// Sum the six bounded components and map the total onto a tier. Bounds are
/// re-checked on every recompute; a failure means the record was corrupted
/// upstream.
pub fn recompute(
    components: &ComponentScores,
    policy: &ScorePolicy,
) -> Result<(u8, Tier), IntegrityError> {
    for component in Component::ALL {
        let value = components.get(component);
        if value > component.max() {
            let err = IntegrityError::ComponentOutOfBounds {
                component: component.label(),
                value,
                max: component.max(),
            };
            error!(component = component.label(), value, "score integrity violation");
            return Err(err);
        }
    }

    let total = components.total();
    if total > 100 {
        error!(total, "score integrity violation: component sum out of range");
        return Err(IntegrityError::SumOutOfRange { computed: total });
    }

    let total = total as u8;
    Ok((total, policy.tier_for(total)))
}

/// Verify the stored invariants of a record on read. Used before trusting a
/// record for capacity or eligibility decisions.
pub fn verify_record(record: &ScoreRecord, policy: &ScorePolicy) -> Result<(), IntegrityError> {
    let (computed, _) = recompute(&record.components, policy)?;
    if record.total_score != computed {
        error!(
            user = %record.user_id,
            stored = record.total_score,
            computed,
            "score integrity violation: stored total mismatch"
        );
        return Err(IntegrityError::TotalMismatch {
            stored: record.total_score,
            computed: u16::from(computed),
        });
    }
    if record.total_score > record.max_allowed_score {
        error!(
            user = %record.user_id,
            total = record.total_score,
            cap = record.max_allowed_score,
            "score integrity violation: age cap breached"
        );
        return Err(IntegrityError::AgeCapBreached {
            total: record.total_score,
            cap: record.max_allowed_score,
        });
    }
    Ok(())
}
