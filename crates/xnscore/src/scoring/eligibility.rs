use std::sync::Arc;

use serde::Serialize;

use super::domain::{Tier, UserId};
use super::policy::ScorePolicy;
use super::store::{ScoreStore, StoreError};

/// Error enumeration for eligibility queries.
#[derive(Debug, thiserror::Error)]
pub enum EligibilityError {
    #[error("no score record for user {0}")]
    UnknownUser(UserId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a circle-join check, with enough detail for the caller to
/// present a precise reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityReport {
    pub user_id: UserId,
    pub circle_id: String,
    pub contribution_amount: u32,
    pub eligible: bool,
    pub score_ok: bool,
    pub age_ok: bool,
    pub total_score: u8,
    pub tier: Tier,
    pub required_score: u8,
    pub required_age_days: u32,
    pub account_age_days: u32,
}

/// Circle-join gates: a contribution amount implies a minimum score and a
/// minimum account age, both read from the policy's gate table.
pub struct EligibilityChecker<S> {
    store: Arc<S>,
    policy: Arc<ScorePolicy>,
}

impl<S: ScoreStore + 'static> EligibilityChecker<S> {
    pub fn new(store: Arc<S>, policy: Arc<ScorePolicy>) -> Self {
        Self { store, policy }
    }

    pub fn min_score_for_amount(&self, amount: u32) -> u8 {
        self.policy.eligibility.gate_for(amount).min_score
    }

    pub fn min_account_age_for_amount(&self, amount: u32) -> u32 {
        self.policy.eligibility.gate_for(amount).min_age_days
    }

    pub fn check_circle_eligibility(
        &self,
        user: &UserId,
        circle_id: &str,
        contribution_amount: u32,
    ) -> Result<EligibilityReport, EligibilityError> {
        let record = self
            .store
            .load(user)?
            .ok_or_else(|| EligibilityError::UnknownUser(user.clone()))?
            .record;

        let gate = self.policy.eligibility.gate_for(contribution_amount);
        let score_ok = record.total_score >= gate.min_score;
        let age_ok = record.account_age_days >= gate.min_age_days;

        Ok(EligibilityReport {
            user_id: user.clone(),
            circle_id: circle_id.to_string(),
            contribution_amount,
            eligible: score_ok && age_ok,
            score_ok,
            age_ok,
            total_score: record.total_score,
            tier: record.tier,
            required_score: gate.min_score,
            required_age_days: gate.min_age_days,
            account_age_days: record.account_age_days,
        })
    }
}
