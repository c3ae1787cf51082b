use std::sync::Arc;

use super::adjustments::{AdjustmentError, AdjustmentProcessor};
use super::analytics::AnalyticsReporter;
use super::calculator;
use super::decay::DecayEngine;
use super::domain::{AdjustmentEvent, ScoreRecord, UserId};
use super::eligibility::EligibilityChecker;
use super::policy::ScorePolicy;
use super::recovery::RecoveryManager;
use super::store::{ScoreEventPublisher, ScoreStore};
use super::tenure::TenureAccrual;
use super::vouching::VouchLedger;

/// Facade composing the scoring engines over one store handle. Holds no
/// state of its own beyond the injected dependencies, so tests can run many
/// isolated instances in parallel.
pub struct ScoreService<S, P> {
    store: Arc<S>,
    policy: Arc<ScorePolicy>,
    adjustments: Arc<AdjustmentProcessor<S, P>>,
    vouching: VouchLedger<S, P>,
    decay: DecayEngine<S, P>,
    recovery: RecoveryManager<S>,
    tenure: TenureAccrual<S, P>,
    analytics: AnalyticsReporter<S>,
    eligibility: EligibilityChecker<S>,
}

impl<S, P> ScoreService<S, P>
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    pub fn new(store: Arc<S>, publisher: Arc<P>, policy: ScorePolicy) -> Self {
        let policy = Arc::new(policy);
        let adjustments = Arc::new(AdjustmentProcessor::new(
            store.clone(),
            publisher,
            policy.clone(),
        ));

        Self {
            vouching: VouchLedger::new(store.clone(), adjustments.clone(), policy.clone()),
            decay: DecayEngine::new(store.clone(), adjustments.clone(), policy.clone()),
            recovery: RecoveryManager::new(store.clone(), policy.clone()),
            tenure: TenureAccrual::new(store.clone(), adjustments.clone(), policy.clone()),
            analytics: AnalyticsReporter::new(store.clone(), policy.clone()),
            eligibility: EligibilityChecker::new(store.clone(), policy.clone()),
            adjustments,
            store,
            policy,
        }
    }

    pub fn policy(&self) -> &ScorePolicy {
        &self.policy
    }

    pub fn adjustments(&self) -> &AdjustmentProcessor<S, P> {
        &self.adjustments
    }

    pub fn vouching(&self) -> &VouchLedger<S, P> {
        &self.vouching
    }

    pub fn decay(&self) -> &DecayEngine<S, P> {
        &self.decay
    }

    pub fn recovery(&self) -> &RecoveryManager<S> {
        &self.recovery
    }

    pub fn tenure(&self) -> &TenureAccrual<S, P> {
        &self.tenure
    }

    pub fn analytics(&self) -> &AnalyticsReporter<S> {
        &self.analytics
    }

    pub fn eligibility(&self) -> &EligibilityChecker<S> {
        &self.eligibility
    }

    /// Current score record, verified against the stored invariants before
    /// anyone trusts it for a lending decision.
    pub fn get_score(&self, user: &UserId) -> Result<ScoreRecord, AdjustmentError> {
        let record = self
            .store
            .load(user)?
            .ok_or_else(|| AdjustmentError::UnknownUser(user.clone()))?
            .record;
        calculator::verify_record(&record, &self.policy)?;
        Ok(record)
    }

    pub fn get_history(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<AdjustmentEvent>, AdjustmentError> {
        if self.store.load(user)?.is_none() {
            return Err(AdjustmentError::UnknownUser(user.clone()));
        }
        Ok(self.store.history(user, limit)?)
    }

    /// Risk-grade input for the lending subsystem: the committed score and
    /// tier. Lending derives its own credit score from this; it is not
    /// computed here.
    pub fn risk_inputs(&self, user: &UserId) -> Result<(u8, super::domain::Tier), AdjustmentError> {
        let record = self.get_score(user)?;
        Ok((record.total_score, record.tier))
    }
}
