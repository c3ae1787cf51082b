use serde::{Deserialize, Serialize};

use super::domain::{RiskBand, Tier, TriggerKind};

/// Tier band with an inclusive lower edge. Bands are checked highest edge
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBand {
    pub tier: Tier,
    pub min_total: u8,
}

/// Age-cap milestone: accounts at most `max_age_days` old are capped at
/// `cap` total points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeCapMilestone {
    pub max_age_days: u32,
    pub cap: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeCapPolicy {
    /// Milestones in ascending age order; accounts older than every
    /// milestone are uncapped (100).
    pub milestones: Vec<AgeCapMilestone>,
}

impl AgeCapPolicy {
    pub fn cap_for(&self, age_days: u32) -> u8 {
        for milestone in &self.milestones {
            if age_days <= milestone.max_age_days {
                return milestone.cap;
            }
        }
        100
    }
}

/// Fixed magnitudes for named triggers. Triggers absent from this table
/// carry caller-computed deltas and cannot be applied as predefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredefinedAdjustments {
    pub circle_payment: i16,
    pub circle_completion: i16,
    pub course_completed: i16,
    pub case_resolved: i16,
    pub vouch_success: i16,
    pub payment_default: i16,
}

impl PredefinedAdjustments {
    pub fn delta_for(&self, trigger: TriggerKind) -> Option<i16> {
        match trigger {
            TriggerKind::CirclePayment => Some(self.circle_payment),
            TriggerKind::CircleCompletion => Some(self.circle_completion),
            TriggerKind::CourseCompleted => Some(self.course_completed),
            TriggerKind::CaseResolved => Some(self.case_resolved),
            TriggerKind::VouchSuccess => Some(self.vouch_success),
            TriggerKind::PaymentDefault => Some(self.payment_default),
            _ => None,
        }
    }
}

/// Vouch strength ladder and default risk-transfer terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VouchPolicy {
    pub excellent_strength: u8,
    pub trusted_strength: u8,
    pub building_strength: u8,
    /// Multiplier applied to vouch points when the vouchee defaults; the
    /// product is deducted from the voucher.
    pub default_penalty_multiplier: u8,
    pub expiry_days: i64,
}

impl VouchPolicy {
    /// Maximum outstanding vouch points by the voucher's tier. Three
    /// discrete strengths; the bottom tiers cannot vouch.
    pub fn strength_for(&self, tier: Tier) -> u8 {
        match tier {
            Tier::Excellent => self.excellent_strength,
            Tier::Trusted => self.trusted_strength,
            Tier::Building => self.building_strength,
            Tier::Developing | Tier::Restricted => 0,
        }
    }
}

/// Decay band with an inclusive minimum of inactive days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayBand {
    pub min_days: u32,
    pub band: RiskBand,
    pub penalty: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayPolicy {
    /// Bands in ascending `min_days` order; the last band whose threshold
    /// is met applies.
    pub bands: Vec<DecayBand>,
    /// Decay never drives the total below this floor.
    pub floor: u8,
}

impl DecayPolicy {
    pub fn band_for(&self, inactive_days: u32) -> (RiskBand, u8) {
        let mut current = (RiskBand::Low, 0);
        for band in &self.bands {
            if inactive_days >= band.min_days {
                current = (band.band, band.penalty);
            }
        }
        current
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryPolicy {
    pub window_days: i64,
    pub multiplier: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenurePolicy {
    pub bonus_per_month: u8,
    pub max_bonus: u8,
}

/// Contribution gate: joining a circle at or above `min_amount` requires
/// the listed score and account age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContributionGate {
    pub min_amount: u32,
    pub min_score: u8,
    pub min_age_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    /// Gates in ascending `min_amount` order; the last gate whose amount
    /// threshold is met applies.
    pub gates: Vec<ContributionGate>,
}

impl EligibilityPolicy {
    pub fn gate_for(&self, amount: u32) -> ContributionGate {
        let mut current = ContributionGate {
            min_amount: 0,
            min_score: 0,
            min_age_days: 0,
        };
        for gate in &self.gates {
            if amount >= gate.min_amount {
                current = *gate;
            }
        }
        current
    }
}

/// Versioned risk-policy parameters. These are tuning knobs, not logic:
/// band edges, milestones, and magnitudes live here so they can change
/// without touching the engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorePolicy {
    pub version: String,
    pub tier_bands: Vec<TierBand>,
    pub age_cap: AgeCapPolicy,
    pub weekly_velocity_limit: u8,
    pub predefined: PredefinedAdjustments,
    pub vouching: VouchPolicy,
    pub decay: DecayPolicy,
    pub recovery: RecoveryPolicy,
    pub tenure: TenurePolicy,
    pub eligibility: EligibilityPolicy,
}

impl ScorePolicy {
    pub fn tier_for(&self, total: u8) -> Tier {
        let mut best: Option<TierBand> = None;
        for band in &self.tier_bands {
            if total >= band.min_total {
                match best {
                    Some(current) if current.min_total >= band.min_total => {}
                    _ => best = Some(*band),
                }
            }
        }
        best.map(|band| band.tier).unwrap_or(Tier::Restricted)
    }
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            version: "2026-08".to_string(),
            tier_bands: vec![
                TierBand {
                    tier: Tier::Excellent,
                    min_total: 85,
                },
                TierBand {
                    tier: Tier::Trusted,
                    min_total: 70,
                },
                TierBand {
                    tier: Tier::Building,
                    min_total: 55,
                },
                TierBand {
                    tier: Tier::Developing,
                    min_total: 40,
                },
                TierBand {
                    tier: Tier::Restricted,
                    min_total: 0,
                },
            ],
            age_cap: AgeCapPolicy {
                milestones: vec![
                    AgeCapMilestone {
                        max_age_days: 30,
                        cap: 40,
                    },
                    AgeCapMilestone {
                        max_age_days: 90,
                        cap: 60,
                    },
                    AgeCapMilestone {
                        max_age_days: 180,
                        cap: 80,
                    },
                ],
            },
            weekly_velocity_limit: 5,
            predefined: PredefinedAdjustments {
                circle_payment: 2,
                circle_completion: 8,
                course_completed: 5,
                case_resolved: 15,
                vouch_success: 3,
                payment_default: -25,
            },
            vouching: VouchPolicy {
                excellent_strength: 10,
                trusted_strength: 5,
                building_strength: 2,
                default_penalty_multiplier: 2,
                expiry_days: 180,
            },
            decay: DecayPolicy {
                bands: vec![
                    DecayBand {
                        min_days: 30,
                        band: RiskBand::Warning,
                        penalty: 0,
                    },
                    DecayBand {
                        min_days: 45,
                        band: RiskBand::Moderate,
                        penalty: 1,
                    },
                    DecayBand {
                        min_days: 60,
                        band: RiskBand::High,
                        penalty: 2,
                    },
                    DecayBand {
                        min_days: 90,
                        band: RiskBand::Severe,
                        penalty: 3,
                    },
                    DecayBand {
                        min_days: 120,
                        band: RiskBand::Critical,
                        penalty: 5,
                    },
                ],
                floor: 15,
            },
            recovery: RecoveryPolicy {
                window_days: 14,
                multiplier: 1.5,
            },
            tenure: TenurePolicy {
                bonus_per_month: 2,
                max_bonus: 20,
            },
            eligibility: EligibilityPolicy {
                gates: vec![
                    ContributionGate {
                        min_amount: 0,
                        min_score: 0,
                        min_age_days: 0,
                    },
                    ContributionGate {
                        min_amount: 50,
                        min_score: 40,
                        min_age_days: 30,
                    },
                    ContributionGate {
                        min_amount: 200,
                        min_score: 55,
                        min_age_days: 90,
                    },
                    ContributionGate {
                        min_amount: 500,
                        min_score: 70,
                        min_age_days: 180,
                    },
                ],
            },
        }
    }
}
