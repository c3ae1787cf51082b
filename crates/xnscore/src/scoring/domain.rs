use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for community members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for peer vouches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VouchId(pub String);

impl std::fmt::Display for VouchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The six weighted score components. Declared in fill order: positive
/// deltas spill left to right, negative deltas drain right to left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    PaymentHistory,
    Completion,
    TimeReliability,
    Deposit,
    DiversitySocial,
    Engagement,
}

impl Component {
    pub const ALL: [Component; 6] = [
        Component::PaymentHistory,
        Component::Completion,
        Component::TimeReliability,
        Component::Deposit,
        Component::DiversitySocial,
        Component::Engagement,
    ];

    /// Upper bound of the component. The bounds sum to 100.
    pub fn max(self) -> u8 {
        match self {
            Component::PaymentHistory => 35,
            Component::Completion => 25,
            Component::TimeReliability => 20,
            Component::Deposit => 10,
            Component::DiversitySocial => 7,
            Component::Engagement => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Component::PaymentHistory => "payment_history",
            Component::Completion => "completion",
            Component::TimeReliability => "time_reliability",
            Component::Deposit => "deposit",
            Component::DiversitySocial => "diversity_social",
            Component::Engagement => "engagement",
        }
    }
}

/// Bounded component values backing the composite score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub payment_history: u8,
    pub completion: u8,
    pub time_reliability: u8,
    pub deposit: u8,
    pub diversity_social: u8,
    pub engagement: u8,
}

impl ComponentScores {
    pub fn get(&self, component: Component) -> u8 {
        match component {
            Component::PaymentHistory => self.payment_history,
            Component::Completion => self.completion,
            Component::TimeReliability => self.time_reliability,
            Component::Deposit => self.deposit,
            Component::DiversitySocial => self.diversity_social,
            Component::Engagement => self.engagement,
        }
    }

    pub fn set(&mut self, component: Component, value: u8) {
        let slot = match component {
            Component::PaymentHistory => &mut self.payment_history,
            Component::Completion => &mut self.completion,
            Component::TimeReliability => &mut self.time_reliability,
            Component::Deposit => &mut self.deposit,
            Component::DiversitySocial => &mut self.diversity_social,
            Component::Engagement => &mut self.engagement,
        };
        *slot = value;
    }

    pub fn total(&self) -> u16 {
        Component::ALL
            .iter()
            .map(|component| u16::from(self.get(*component)))
            .sum()
    }

    /// Materialise a signed delta into the bounded components, preferring
    /// `preferred` and spilling deterministically. Returns the portion
    /// actually absorbed; residue beyond the bounds is dropped.
    pub fn apply_delta(&mut self, delta: i16, preferred: Component) -> i16 {
        if delta == 0 {
            return 0;
        }

        let mut remaining = delta.unsigned_abs();
        let order: Vec<Component> = if delta > 0 {
            std::iter::once(preferred)
                .chain(Component::ALL.iter().copied().filter(|c| *c != preferred))
                .collect()
        } else {
            std::iter::once(preferred)
                .chain(
                    Component::ALL
                        .iter()
                        .rev()
                        .copied()
                        .filter(|c| *c != preferred),
                )
                .collect()
        };

        for component in order {
            if remaining == 0 {
                break;
            }
            let current = self.get(component);
            let room = if delta > 0 {
                u16::from(component.max() - current)
            } else {
                u16::from(current)
            };
            let take = room.min(remaining) as u8;
            if delta > 0 {
                self.set(component, current + take);
            } else {
                self.set(component, current - take);
            }
            remaining -= u16::from(take);
        }

        let absorbed = (delta.unsigned_abs() - remaining) as i16;
        if delta > 0 {
            absorbed
        } else {
            -absorbed
        }
    }
}

/// Named score band used for coarse eligibility decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Excellent,
    Trusted,
    Building,
    Developing,
    Restricted,
}

impl Tier {
    pub fn label(self) -> &'static str {
        match self {
            Tier::Excellent => "excellent",
            Tier::Trusted => "trusted",
            Tier::Building => "building",
            Tier::Developing => "developing",
            Tier::Restricted => "restricted",
        }
    }
}

/// Per-user score record. Created at enrollment, never deleted; mutated
/// exclusively through the adjustment processor and the scheduled sweeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub user_id: UserId,
    pub components: ComponentScores,
    pub total_score: u8,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
    pub account_age_days: u32,
    pub max_allowed_score: u8,
    pub age_cap_applied: bool,
    pub points_gained_this_week: u8,
    pub week_window_start: DateTime<Utc>,
    pub tenure_bonus: u8,
    pub tenure_months_earned: u8,
    pub last_financial_activity_at: DateTime<Utc>,
    pub financial_inactive_days: u32,
    pub total_inactivity_penalty: u16,
    pub decay_floor_reached: bool,
}

/// Cause attributed to a score change. Anything outside this enum is
/// rejected at the boundary: an unexplained delta cannot be risk-assessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    CirclePayment,
    CircleCompletion,
    CourseCompleted,
    CaseResolved,
    VouchReceived,
    VouchSuccess,
    VouchDefaulted,
    PaymentDefault,
    InactivityDecay,
    TenureBonus,
    Manual,
}

impl TriggerKind {
    /// Component that absorbs this trigger's delta before spill-over.
    pub fn preferred_component(self) -> Component {
        match self {
            TriggerKind::CirclePayment | TriggerKind::PaymentDefault => Component::PaymentHistory,
            TriggerKind::CircleCompletion => Component::Completion,
            TriggerKind::CourseCompleted => Component::Engagement,
            TriggerKind::CaseResolved => Component::TimeReliability,
            TriggerKind::VouchReceived | TriggerKind::VouchSuccess | TriggerKind::VouchDefaulted => {
                Component::DiversitySocial
            }
            TriggerKind::InactivityDecay => Component::Engagement,
            TriggerKind::TenureBonus => Component::Completion,
            TriggerKind::Manual => Component::PaymentHistory,
        }
    }

    /// Punitive and loyalty adjustments do not consume weekly growth
    /// allowance.
    pub fn velocity_exempt(self) -> bool {
        matches!(self, TriggerKind::InactivityDecay | TriggerKind::TenureBonus)
    }

    pub fn label(self) -> &'static str {
        match self {
            TriggerKind::CirclePayment => "circle_payment",
            TriggerKind::CircleCompletion => "circle_completion",
            TriggerKind::CourseCompleted => "course_completed",
            TriggerKind::CaseResolved => "case_resolved",
            TriggerKind::VouchReceived => "vouch_received",
            TriggerKind::VouchSuccess => "vouch_success",
            TriggerKind::VouchDefaulted => "vouch_defaulted",
            TriggerKind::PaymentDefault => "payment_default",
            TriggerKind::InactivityDecay => "inactivity_decay",
            TriggerKind::TenureBonus => "tenure_bonus",
            TriggerKind::Manual => "manual",
        }
    }
}

/// Append-only audit row written in the same commit as the record update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentEvent {
    pub at: DateTime<Utc>,
    pub score_change: i16,
    pub trigger: TriggerKind,
    pub trigger_id: String,
    pub resulting_total: u8,
    pub velocity_capped: bool,
}

/// Lifecycle of a peer vouch. `Active` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VouchStatus {
    Active,
    Revoked,
    Defaulted,
    Expired,
}

impl VouchStatus {
    pub fn label(self) -> &'static str {
        match self {
            VouchStatus::Active => "active",
            VouchStatus::Revoked => "revoked",
            VouchStatus::Defaulted => "defaulted",
            VouchStatus::Expired => "expired",
        }
    }
}

/// Capacity-limited trust transfer from voucher to vouchee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vouch {
    pub vouch_id: VouchId,
    pub voucher_id: UserId,
    pub vouchee_id: UserId,
    pub status: VouchStatus,
    pub vouch_points: u8,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Time-boxed window multiplying positive score regain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryPeriod {
    pub user_id: UserId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub multiplier: f32,
    pub trigger: String,
    pub is_active: bool,
}

impl RecoveryPeriod {
    pub fn active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now >= self.starts_at && now < self.ends_at
    }
}

/// Inactivity risk band derived from days since the last qualifying
/// financial activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Warning,
    Moderate,
    High,
    Severe,
    Critical,
}

impl RiskBand {
    pub fn label(self) -> &'static str {
        match self {
            RiskBand::Low => "low",
            RiskBand::Warning => "warning",
            RiskBand::Moderate => "moderate",
            RiskBand::High => "high",
            RiskBand::Severe => "severe",
            RiskBand::Critical => "critical",
        }
    }
}

/// Per-sweep decay history row, keyed (user, date) for idempotence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayEvent {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub decay_amount: u8,
    pub decay_reason: RiskBand,
}

/// Per-sweep tenure history row, keyed (user, month) for idempotence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenureEvent {
    pub user_id: UserId,
    pub month: String,
    pub bonus_amount: u8,
    pub tenure_month: u8,
}

/// Qualifying financial activity reported by the wallet collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Contribution,
    Payout,
    Deposit,
    Savings,
    Remittance,
}
