//! Condition classification and durability-based penalties
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::equipment::clamp_durability;

/// Qualitative condition bucket for a durability percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionStatus {
    Perfect,
    Excellent,
    Good,
    Worn,
    Damaged,
    VeryDamaged,
    Broken,
}

/// Statuses ordered by descending threshold; the first threshold not
/// exceeding the durability wins.
const STATUS_ORDER: [ConditionStatus; 7] = [
    ConditionStatus::Perfect,
    ConditionStatus::Excellent,
    ConditionStatus::Good,
    ConditionStatus::Worn,
    ConditionStatus::Damaged,
    ConditionStatus::VeryDamaged,
    ConditionStatus::Broken,
];

impl ConditionStatus {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Worn => "worn",
            Self::Damaged => "damaged",
            Self::VeryDamaged => "very_damaged",
            Self::Broken => "broken",
        }
    }

    /// Minimum durability for this status.
    #[must_use]
    pub const fn threshold(self) -> f64 {
        match self {
            Self::Perfect => 100.0,
            Self::Excellent => 90.0,
            Self::Good => 75.0,
            Self::Worn => 50.0,
            Self::Damaged => 25.0,
            Self::VeryDamaged => 10.0,
            Self::Broken => 0.0,
        }
    }

    /// Fraction stripped from positive stats while in this condition.
    #[must_use]
    pub const fn stat_penalty_multiplier(self) -> f64 {
        match self {
            Self::Perfect | Self::Excellent | Self::Good => 0.0,
            Self::Worn => 0.10,
            Self::Damaged => 0.25,
            Self::VeryDamaged => 0.50,
            Self::Broken => 1.0,
        }
    }

    /// Translation key for the condition description.
    #[must_use]
    pub const fn description_key(self) -> &'static str {
        match self {
            Self::Perfect => "condition.desc.perfect",
            Self::Excellent => "condition.desc.excellent",
            Self::Good => "condition.desc.good",
            Self::Worn => "condition.desc.worn",
            Self::Damaged => "condition.desc.damaged",
            Self::VeryDamaged => "condition.desc.very_damaged",
            Self::Broken => "condition.desc.broken",
        }
    }
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// How soon a repair should happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairUrgency {
    None,
    Minor,
    Recommended,
    Urgent,
    Critical,
}

impl RepairUrgency {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Minor => "minor",
            Self::Recommended => "recommended",
            Self::Urgent => "urgent",
            Self::Critical => "critical",
        }
    }

    /// Whether the item needs attention before its next outing.
    #[must_use]
    pub const fn is_immediate(self) -> bool {
        matches!(self, Self::Urgent | Self::Critical)
    }
}

/// Map a durability percentage to its condition status.
#[must_use]
pub fn classify(durability: f64) -> ConditionStatus {
    let durability = clamp_durability(durability);
    for status in STATUS_ORDER {
        if durability >= status.threshold() {
            return status;
        }
    }
    ConditionStatus::Broken
}

/// Repair urgency from fixed durability cutoffs.
#[must_use]
pub fn urgency(durability: f64) -> RepairUrgency {
    let durability = clamp_durability(durability);
    if durability < 10.0 {
        RepairUrgency::Critical
    } else if durability < 25.0 {
        RepairUrgency::Urgent
    } else if durability < 50.0 {
        RepairUrgency::Recommended
    } else if durability < 75.0 {
        RepairUrgency::Minor
    } else {
        RepairUrgency::None
    }
}

/// Full condition picture for a durability value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionReport {
    pub status: ConditionStatus,
    pub durability: f64,
    pub stat_penalty_multiplier: f64,
    /// `(1 - penalty) * 100`; how much of the item's power remains
    pub effectiveness_percentage: f64,
    pub repair_urgency: RepairUrgency,
    /// Success-chance adjustment for repairing in this state
    pub repair_difficulty_modifier: f64,
    pub needs_repair: bool,
    pub is_broken: bool,
    pub can_be_equipped: bool,
    pub description_key: &'static str,
}

/// Classify a durability value into a complete condition report.
#[must_use]
pub fn classify_condition(durability: f64) -> ConditionReport {
    let durability = clamp_durability(durability);
    let status = classify(durability);
    let penalty = status.stat_penalty_multiplier();

    // Heavily damaged items are harder to repair.
    let repair_difficulty_modifier = if durability < 10.0 {
        -0.2
    } else if durability < 25.0 {
        -0.1
    } else {
        0.0
    };

    ConditionReport {
        status,
        durability,
        stat_penalty_multiplier: penalty,
        effectiveness_percentage: (1.0 - penalty) * 100.0,
        repair_urgency: urgency(durability),
        repair_difficulty_modifier,
        needs_repair: durability < 75.0,
        is_broken: durability < 10.0,
        can_be_equipped: durability >= 10.0,
        description_key: status.description_key(),
    }
}

/// Apply condition penalties to a set of numeric equipment stats.
///
/// Below 10 durability the item provides no benefits at all; otherwise
/// positive stats scale by `(1 - penalty)`. Non-positive stats (e.g. curse
/// maluses) are left untouched.
#[must_use]
pub fn apply_stat_penalties(base_stats: &HashMap<String, f64>, durability: f64) -> HashMap<String, f64> {
    let durability = clamp_durability(durability);
    if durability < 10.0 {
        return base_stats.keys().map(|k| (k.clone(), 0.0)).collect();
    }
    let penalty = classify(durability).stat_penalty_multiplier();
    base_stats
        .iter()
        .map(|(k, &v)| {
            let adjusted = if penalty > 0.0 && v > 0.0 {
                v * (1.0 - penalty)
            } else {
                v
            };
            (k.clone(), adjusted)
        })
        .collect()
}

/// Actions gated on equipment condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseKind {
    Equip,
    ActiveUse,
    Enhance,
}

/// Result of a usability gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCheck {
    pub allowed: bool,
    pub reason_key: &'static str,
}

/// Check whether equipment condition permits an action.
#[must_use]
pub fn usability(durability: f64, action: UseKind) -> UseCheck {
    let durability = clamp_durability(durability);
    match action {
        UseKind::Equip => {
            if durability < 10.0 {
                UseCheck {
                    allowed: false,
                    reason_key: "use.blocked.broken-equip",
                }
            } else {
                UseCheck {
                    allowed: true,
                    reason_key: "use.ok.equip",
                }
            }
        }
        UseKind::ActiveUse => {
            if durability <= 0.0 {
                UseCheck {
                    allowed: false,
                    reason_key: "use.blocked.destroyed",
                }
            } else if durability < 5.0 {
                UseCheck {
                    allowed: false,
                    reason_key: "use.blocked.unsafe",
                }
            } else {
                UseCheck {
                    allowed: true,
                    reason_key: "use.ok.active",
                }
            }
        }
        UseKind::Enhance => {
            if durability < 50.0 {
                UseCheck {
                    allowed: false,
                    reason_key: "use.blocked.poor-condition",
                }
            } else {
                UseCheck {
                    allowed: true,
                    reason_key: "use.ok.enhance",
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_total_and_monotonic() {
        let mut last = classify(100.0);
        for d in (0..=100).rev() {
            let status = classify(f64::from(d));
            // Moving down the scale may only worsen the status.
            assert!(
                status.threshold() <= last.threshold(),
                "status regressed at durability {d}"
            );
            last = status;
        }
        assert_eq!(classify(10.0), ConditionStatus::VeryDamaged);
        assert_eq!(classify(9.9), ConditionStatus::Broken);
        assert_eq!(classify(75.0), ConditionStatus::Good);
        assert_eq!(classify(74.9), ConditionStatus::Worn);
        assert_eq!(classify(100.0), ConditionStatus::Perfect);
    }

    #[test]
    fn urgency_cutoffs_match_thresholds() {
        assert_eq!(urgency(5.0), RepairUrgency::Critical);
        assert_eq!(urgency(10.0), RepairUrgency::Urgent);
        assert_eq!(urgency(25.0), RepairUrgency::Recommended);
        assert_eq!(urgency(50.0), RepairUrgency::Minor);
        assert_eq!(urgency(75.0), RepairUrgency::None);
        assert!(urgency(8.0).is_immediate());
        assert!(!urgency(30.0).is_immediate());
    }

    #[test]
    fn report_effectiveness_complements_penalty() {
        let report = classify_condition(40.0);
        assert_eq!(report.status, ConditionStatus::Damaged);
        assert!((report.stat_penalty_multiplier - 0.25).abs() < f64::EPSILON);
        assert!((report.effectiveness_percentage - 75.0).abs() < f64::EPSILON);
        assert!(report.needs_repair);
        assert!(report.can_be_equipped);
        assert!((report.repair_difficulty_modifier - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn broken_items_zero_all_stats() {
        let stats = HashMap::from([
            ("attack".to_string(), 12.0),
            ("weight".to_string(), -3.0),
        ]);
        let adjusted = apply_stat_penalties(&stats, 9.0);
        assert!((adjusted["attack"] - 0.0).abs() < f64::EPSILON);
        assert!((adjusted["weight"] - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn worn_items_scale_only_positive_stats() {
        let stats = HashMap::from([
            ("attack".to_string(), 10.0),
            ("weight".to_string(), -3.0),
        ]);
        let adjusted = apply_stat_penalties(&stats, 60.0);
        assert!((adjusted["attack"] - 9.0).abs() < 1e-9);
        assert!((adjusted["weight"] + 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn usability_gates_follow_cutoffs() {
        assert!(!usability(9.0, UseKind::Equip).allowed);
        assert!(usability(10.0, UseKind::Equip).allowed);
        assert!(!usability(0.0, UseKind::ActiveUse).allowed);
        assert!(!usability(4.0, UseKind::ActiveUse).allowed);
        assert!(usability(5.0, UseKind::ActiveUse).allowed);
        assert!(!usability(49.0, UseKind::Enhance).allowed);
        assert!(usability(50.0, UseKind::Enhance).allowed);
    }
}
