//! Engine configuration loaded once and injected into every component.
//!
//! Balance data ships as embedded JSON under `assets/data/`. The parsed
//! [`EngineConfig`] is an explicit value passed by reference; the engine
//! keeps no hidden process-wide caches.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::equipment::{Environment, EquipmentKind};
use crate::outcome::SkillTier;
use crate::quality::QualityTier;

const DEFAULT_FORMULAS_DATA: &str = include_str!("../assets/data/formulas.json");
const DEFAULT_STATIONS_DATA: &str = include_str!("../assets/data/stations.json");
const DEFAULT_MATERIALS_DATA: &str = include_str!("../assets/data/materials.json");

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse balance data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("station {station} has non-positive efficiency {efficiency:.2}")]
    NonPositiveEfficiency { station: String, efficiency: f64 },
    #[error("station {station} supports no equipment kinds")]
    EmptyKindSupport { station: String },
    #[error("success bounds invalid (min {min:.1} > max {max:.1})")]
    InvalidSuccessBounds { min: f64, max: f64 },
    #[error("{what} for skill {skill} out of range (got {value:.3})")]
    RateOutOfRange {
        what: &'static str,
        skill: SkillTier,
        value: f64,
    },
    #[error("missing {what} entry for skill {skill}")]
    MissingSkillEntry { what: &'static str, skill: SkillTier },
    #[error("missing material quantity multiplier for tier {tier}")]
    MissingTierMultiplier { tier: QualityTier },
    #[error("no repair recipe defined for equipment kind {kind}")]
    MissingRecipe { kind: EquipmentKind },
    #[error("critical damage range invalid (min {min:.1} > max {max:.1})")]
    InvalidCriticalRange { min: f64, max: f64 },
}

/// Success-chance and failure-resolution parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessParams {
    /// Base success rates per skill tier, in percent
    pub base_rates: HashMap<SkillTier, f64>,
    /// Probability of a critical failure once the success roll has failed
    pub critical_failure_rates: HashMap<SkillTier, f64>,
    /// Percent of success chance lost per full point of damage severity
    pub damage_penalty_multiplier: f64,
    /// Percent of success chance gained per point of efficiency above 1.0
    pub efficiency_bonus_per_point: f64,
    pub min_success: f64,
    pub max_success: f64,
    /// Extra durability lost on a critical failure, uniform in this range
    pub critical_damage_min: f64,
    pub critical_damage_max: f64,
}

/// One material line in an equipment kind's repair recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub material: String,
    /// Share of the computed base quantity this material consumes
    pub ratio: f64,
}

/// Material quantity scaling rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRules {
    pub base_quantity_multiplier: f64,
    pub tier_multipliers: HashMap<QualityTier, f64>,
    pub recipes: HashMap<EquipmentKind, Vec<RecipeLine>>,
}

/// Gold-cost and time-estimate parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostParams {
    /// Fraction of base item value forming the full-repair base cost
    pub value_cost_fraction: f64,
    /// Fallback base cost when the item's value is unknown
    pub flat_base_cost: f64,
    pub severity_heavy_threshold: f64,
    pub severity_heavy_multiplier: f64,
    pub severity_extreme_threshold: f64,
    pub severity_extreme_multiplier: f64,
    /// Higher skill repairs faster; divides the time estimate
    pub skill_time_modifiers: HashMap<SkillTier, f64>,
}

/// Which equipment kinds a station accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindSupport {
    All,
    Weapon,
    Armor,
    Shield,
    Accessory,
}

impl KindSupport {
    #[must_use]
    pub const fn covers(self, kind: EquipmentKind) -> bool {
        matches!(
            (self, kind),
            (Self::All, _)
                | (Self::Weapon, EquipmentKind::Weapon)
                | (Self::Armor, EquipmentKind::Armor)
                | (Self::Shield, EquipmentKind::Shield)
                | (Self::Accessory, EquipmentKind::Accessory)
        )
    }
}

/// A registered repair venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSpec {
    pub name: String,
    pub supported_kinds: Vec<KindSupport>,
    pub supported_tiers: Vec<QualityTier>,
    /// Higher efficiency means cheaper and faster repairs
    pub efficiency: f64,
}

impl StationSpec {
    #[must_use]
    pub fn accepts(&self, kind: EquipmentKind, tier: QualityTier) -> bool {
        self.supported_kinds.iter().any(|s| s.covers(kind))
            && self.supported_tiers.contains(&tier)
    }
}

/// Catalog entry for a repair material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSpec {
    pub name: String,
    pub unit_cost: f64,
}

/// Wrapper shape of the embedded formulas asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FormulasData {
    environment_factors: HashMap<Environment, f64>,
    success: SuccessParams,
    materials: MaterialRules,
    costs: CostParams,
}

/// Complete, validated engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub environment_factors: HashMap<Environment, f64>,
    pub success: SuccessParams,
    pub materials: MaterialRules,
    pub costs: CostParams,
    pub stations: HashMap<String, StationSpec>,
    pub material_catalog: HashMap<String, MaterialSpec>,
}

impl EngineConfig {
    /// Parse the embedded balance assets. Panics only if the shipped assets
    /// are malformed, which the data-shape tests guard against.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(
            DEFAULT_FORMULAS_DATA,
            DEFAULT_STATIONS_DATA,
            DEFAULT_MATERIALS_DATA,
        )
        .expect("valid embedded balance data")
    }

    /// Build a configuration from raw JSON documents.
    ///
    /// # Errors
    ///
    /// Returns an error if any document fails to parse or the combined
    /// configuration fails validation.
    pub fn from_json(
        formulas: &str,
        stations: &str,
        materials: &str,
    ) -> Result<Self, ConfigError> {
        let formulas: FormulasData = serde_json::from_str(formulas)?;
        let stations: HashMap<String, StationSpec> = serde_json::from_str(stations)?;
        let material_catalog: HashMap<String, MaterialSpec> = serde_json::from_str(materials)?;
        let cfg = Self {
            environment_factors: formulas.environment_factors,
            success: formulas.success,
            materials: formulas.materials,
            costs: formulas.costs,
            stations,
            material_catalog,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate cross-field invariants after deserialization.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (id, station) in &self.stations {
            if station.efficiency <= 0.0 {
                return Err(ConfigError::NonPositiveEfficiency {
                    station: id.clone(),
                    efficiency: station.efficiency,
                });
            }
            if station.supported_kinds.is_empty() {
                return Err(ConfigError::EmptyKindSupport {
                    station: id.clone(),
                });
            }
        }
        if self.success.min_success > self.success.max_success {
            return Err(ConfigError::InvalidSuccessBounds {
                min: self.success.min_success,
                max: self.success.max_success,
            });
        }
        if self.success.critical_damage_min > self.success.critical_damage_max {
            return Err(ConfigError::InvalidCriticalRange {
                min: self.success.critical_damage_min,
                max: self.success.critical_damage_max,
            });
        }
        for skill in SkillTier::ALL {
            let base = self.success.base_rates.get(&skill).copied().ok_or(
                ConfigError::MissingSkillEntry {
                    what: "base success rate",
                    skill,
                },
            )?;
            if !(0.0..=100.0).contains(&base) {
                return Err(ConfigError::RateOutOfRange {
                    what: "base success rate",
                    skill,
                    value: base,
                });
            }
            let crit = self
                .success
                .critical_failure_rates
                .get(&skill)
                .copied()
                .ok_or(ConfigError::MissingSkillEntry {
                    what: "critical failure rate",
                    skill,
                })?;
            if !(0.0..=1.0).contains(&crit) {
                return Err(ConfigError::RateOutOfRange {
                    what: "critical failure rate",
                    skill,
                    value: crit,
                });
            }
            if !self.costs.skill_time_modifiers.contains_key(&skill) {
                return Err(ConfigError::MissingSkillEntry {
                    what: "time modifier",
                    skill,
                });
            }
        }
        for tier in QualityTier::ALL {
            if !self.materials.tier_multipliers.contains_key(&tier) {
                return Err(ConfigError::MissingTierMultiplier { tier });
            }
        }
        for kind in EquipmentKind::ALL {
            match self.materials.recipes.get(&kind) {
                Some(lines) if !lines.is_empty() => {}
                _ => return Err(ConfigError::MissingRecipe { kind }),
            }
        }
        Ok(())
    }

    /// Wear multiplier for an environment; unknown entries fall back to 1.0.
    #[must_use]
    pub fn environment_factor(&self, environment: Environment) -> f64 {
        self.environment_factors
            .get(&environment)
            .copied()
            .unwrap_or(1.0)
    }

    #[must_use]
    pub fn station(&self, id: &str) -> Option<&StationSpec> {
        self.stations.get(id)
    }
}
