//! Quality tiers and their static balance constants
use serde::{Deserialize, Serialize};

/// Fixed quality grades controlling decay speed, repair cost, and value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    #[default]
    Basic,
    Military,
    Superior,
    Elite,
    Masterwork,
}

impl QualityTier {
    pub const ALL: [Self; 5] = [
        Self::Basic,
        Self::Military,
        Self::Superior,
        Self::Elite,
        Self::Masterwork,
    ];

    /// Stable string key used in config tables and audit records.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Military => "military",
            Self::Superior => "superior",
            Self::Elite => "elite",
            Self::Masterwork => "masterwork",
        }
    }

    /// Per-tier balance constants.
    #[must_use]
    pub const fn spec(self) -> QualitySpec {
        match self {
            Self::Basic => QualitySpec {
                durability_period_days: 30.0,
                repair_cost_multiplier: 0.8,
                value_multiplier: 1.0,
                base_repair_hours: 4.0,
            },
            Self::Military => QualitySpec {
                durability_period_days: 60.0,
                repair_cost_multiplier: 1.2,
                value_multiplier: 1.5,
                base_repair_hours: 6.0,
            },
            Self::Superior => QualitySpec {
                durability_period_days: 90.0,
                repair_cost_multiplier: 1.5,
                value_multiplier: 2.0,
                base_repair_hours: 8.0,
            },
            Self::Elite => QualitySpec {
                durability_period_days: 120.0,
                repair_cost_multiplier: 2.0,
                value_multiplier: 3.0,
                base_repair_hours: 10.0,
            },
            Self::Masterwork => QualitySpec {
                durability_period_days: 180.0,
                repair_cost_multiplier: 3.0,
                value_multiplier: 5.0,
                base_repair_hours: 12.0,
            },
        }
    }

    /// Durability percentage lost per day under baseline use.
    #[must_use]
    pub fn daily_decay_rate(self) -> f64 {
        100.0 / self.spec().durability_period_days
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Static balance constants for a quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualitySpec {
    /// Days to fully decay under baseline use
    pub durability_period_days: f64,
    pub repair_cost_multiplier: f64,
    pub value_multiplier: f64,
    /// Hours for a full 0-100 repair at efficiency 1.0
    pub base_repair_hours: f64,
}
