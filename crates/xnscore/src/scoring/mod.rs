//! The XnScore trust/reputation core: composite scoring, growth caps, peer
//! vouching, inactivity decay, recovery windows, tenure accrual, and
//! read-only analytics, all over one store abstraction.

pub mod adjustments;
pub mod analytics;
pub mod calculator;
pub mod caps;
pub mod decay;
pub mod domain;
pub mod eligibility;
pub mod memory;
pub mod policy;
pub mod recovery;
pub mod router;
pub mod service;
pub mod store;
pub mod tenure;
pub mod vouching;

#[cfg(test)]
mod tests;

pub use adjustments::{AdjustmentError, AdjustmentProcessor, AdjustmentResult};
pub use analytics::{AnalyticsReporter, AtRiskEntry, LeaderboardEntry};
pub use calculator::IntegrityError;
pub use decay::{BatchResult, DecayEngine, SweepError};
pub use domain::{
    ActivityType, AdjustmentEvent, Component, ComponentScores, DecayEvent, RecoveryPeriod,
    RiskBand, ScoreRecord, TenureEvent, Tier, TriggerKind, UserId, Vouch, VouchId, VouchStatus,
};
pub use eligibility::{EligibilityChecker, EligibilityError, EligibilityReport};
pub use memory::{InMemoryScorePublisher, InMemoryScoreStore};
pub use policy::ScorePolicy;
pub use recovery::{RecoveryError, RecoveryManager};
pub use router::score_router;
pub use service::ScoreService;
pub use store::{
    PublishError, ScoreEventPublisher, ScoreStore, ScoreUpdate, StoreError, SweepEvent,
    VersionedRecord,
};
pub use tenure::{month_key, TenureAccrual};
pub use vouching::{VouchCapacity, VouchError, VouchLedger};
