//! Repair cost, time, and material estimation
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::equipment::{EquipmentKind, EquipmentSnapshot};
use crate::numbers::floor_f64_to_u32;
use crate::outcome::SkillTier;
use crate::quality::QualityTier;

/// Everything a repair at a given station will take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairQuote {
    pub equipment_id: String,
    pub station_id: String,
    pub station_name: String,
    pub current_durability: f64,
    pub target_durability: f64,
    /// Fraction of the full bar being restored, in [0, 1]
    pub repair_percentage: f64,
    pub damage_severity: f64,
    pub severity_multiplier: f64,
    /// Full-repair base cost before scaling
    pub base_cost: f64,
    /// Final gold cost after severity and station efficiency
    pub cost: f64,
    pub hours: f64,
    pub materials: BTreeMap<String, u32>,
    pub station_efficiency: f64,
    pub skill: SkillTier,
}

/// Cost escalation for badly damaged items.
#[must_use]
pub fn severity_multiplier(cfg: &EngineConfig, damage_severity: f64) -> f64 {
    if damage_severity > cfg.costs.severity_extreme_threshold {
        cfg.costs.severity_extreme_multiplier
    } else if damage_severity > cfg.costs.severity_heavy_threshold {
        cfg.costs.severity_heavy_multiplier
    } else {
        1.0
    }
}

/// Full-repair base cost for an item; falls back to the flat base when the
/// item's value is unknown.
#[must_use]
pub fn base_repair_cost(cfg: &EngineConfig, tier: QualityTier, base_value: f64) -> f64 {
    let value_part = if base_value > 0.0 {
        base_value * cfg.costs.value_cost_fraction
    } else {
        cfg.costs.flat_base_cost
    };
    tier.spec().repair_cost_multiplier * value_part
}

/// Gold cost to restore `current -> target` at a station of the given
/// efficiency. Non-negative and non-decreasing in the repair gain.
#[must_use]
pub fn repair_cost(
    cfg: &EngineConfig,
    tier: QualityTier,
    base_value: f64,
    current: f64,
    target: f64,
    efficiency: f64,
) -> f64 {
    let repair_percentage = ((target - current) / 100.0).max(0.0);
    let damage_severity = ((100.0 - current) / 100.0).clamp(0.0, 1.0);
    let cost = base_repair_cost(cfg, tier, base_value)
        * repair_percentage
        * severity_multiplier(cfg, damage_severity);
    cost / efficiency.max(f64::EPSILON)
}

/// Hours to restore `current -> target`, given station efficiency and the
/// repairer's proficiency.
#[must_use]
pub fn repair_time(
    cfg: &EngineConfig,
    tier: QualityTier,
    current: f64,
    target: f64,
    efficiency: f64,
    skill: SkillTier,
) -> f64 {
    let repair_percentage = ((target - current) / 100.0).max(0.0);
    let skill_modifier = cfg
        .costs
        .skill_time_modifiers
        .get(&skill)
        .copied()
        .unwrap_or(1.0);
    repair_percentage * tier.spec().base_repair_hours
        / (efficiency.max(f64::EPSILON) * skill_modifier.max(f64::EPSILON))
}

/// Material quantities for a repair, per the equipment kind's recipe.
/// Every recipe line yields at least one unit.
#[must_use]
pub fn material_quantities(
    cfg: &EngineConfig,
    kind: EquipmentKind,
    tier: QualityTier,
    repair_percentage: f64,
    damage_severity: f64,
) -> BTreeMap<String, u32> {
    let tier_multiplier = cfg
        .materials
        .tier_multipliers
        .get(&tier)
        .copied()
        .unwrap_or(1.0);
    let base_qty = repair_percentage.max(0.0)
        * damage_severity.clamp(0.0, 1.0)
        * cfg.materials.base_quantity_multiplier
        * tier_multiplier;
    let mut needed = BTreeMap::new();
    if let Some(lines) = cfg.materials.recipes.get(&kind) {
        for line in lines {
            let qty = floor_f64_to_u32(base_qty * line.ratio).max(1);
            needed.insert(line.material.clone(), qty);
        }
    }
    needed
}

/// Build a full quote for repairing an equipment snapshot at a station.
///
/// The caller is responsible for having validated the station and the
/// target; gains are floored at zero here.
#[must_use]
pub fn build_quote(
    cfg: &EngineConfig,
    equipment: &EquipmentSnapshot,
    target: f64,
    station_id: &str,
    station_name: &str,
    efficiency: f64,
    skill: SkillTier,
) -> RepairQuote {
    let repair_percentage = ((target - equipment.durability) / 100.0).max(0.0);
    let damage_severity = equipment.damage_severity();
    RepairQuote {
        equipment_id: equipment.id.clone(),
        station_id: station_id.to_string(),
        station_name: station_name.to_string(),
        current_durability: equipment.durability,
        target_durability: target,
        repair_percentage,
        damage_severity,
        severity_multiplier: severity_multiplier(cfg, damage_severity),
        base_cost: base_repair_cost(cfg, equipment.tier, equipment.base_value),
        cost: repair_cost(
            cfg,
            equipment.tier,
            equipment.base_value,
            equipment.durability,
            target,
            efficiency,
        ),
        hours: repair_time(
            cfg,
            equipment.tier,
            equipment.durability,
            target,
            efficiency,
            skill,
        ),
        materials: material_quantities(cfg, equipment.kind, equipment.tier, repair_percentage, damage_severity),
        station_efficiency: efficiency,
        skill,
    }
}

/// What a repair requirement line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Material,
    Tool,
}

/// One line of a repair request's requirement list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairRequirement {
    pub kind: RequirementKind,
    pub item_id: String,
    pub quantity: u32,
    pub required: bool,
}

/// Requirement list attached to a repair request: base repair metal scaled
/// by the gain, specialist tools for heavily damaged items, and an optional
/// finishing oil for military-grade and better gear.
#[must_use]
pub fn request_requirements(
    tier: QualityTier,
    current: f64,
    target: f64,
) -> Vec<RepairRequirement> {
    let gain = (target - current).max(0.0);
    let mut requirements = vec![RepairRequirement {
        kind: RequirementKind::Material,
        item_id: "repair_metal".to_string(),
        quantity: floor_f64_to_u32(gain / 10.0).max(1),
        required: true,
    }];
    if current < 25.0 {
        requirements.push(RepairRequirement {
            kind: RequirementKind::Tool,
            item_id: "master_tools".to_string(),
            quantity: 1,
            required: true,
        });
    }
    if tier != QualityTier::Basic {
        requirements.push(RepairRequirement {
            kind: RequirementKind::Material,
            item_id: "quality_oil".to_string(),
            quantity: 1,
            required: false,
        });
    }
    requirements
}
