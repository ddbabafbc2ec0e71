//! Multi-source durability degradation
//!
//! Three independent wear sources are computed and summed: time under use,
//! combat events, and environmental exposure. Each source reports its own
//! breakdown so callers can surface why an item wore out.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::condition::{ConditionReport, classify_condition};
use crate::config::EngineConfig;
use crate::equipment::{
    Environment, EquipmentKind, EquipmentSnapshot, MaterialKind, clamp_durability,
};
use crate::quality::QualityTier;
use crate::rng::RngBundle;

/// One combat event involving the equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    pub kind: EquipmentKind,
    /// 1.0 is an ordinary skirmish
    #[serde(default = "default_intensity")]
    pub intensity: f64,
    #[serde(default)]
    pub critical: bool,
    /// Damage absorbed; stresses armor
    #[serde(default)]
    pub damage_taken: f64,
    /// Blocks performed; stresses shields
    #[serde(default)]
    pub blocks_made: u32,
}

const fn default_intensity() -> f64 {
    1.0
}

/// A stretch of environmental exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    pub hours: f64,
    pub environment: Environment,
    pub material: MaterialKind,
    pub kind: EquipmentKind,
}

/// Everything that wears an item down since its last assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WearFactors {
    /// Days since durability was last assessed
    #[serde(default)]
    pub elapsed_days: f64,
    /// 1.0 = baseline use, 2.0 = heavy use
    #[serde(default = "default_intensity")]
    pub usage_intensity: f64,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub combat_events: Vec<CombatEvent>,
    #[serde(default)]
    pub exposure: Option<Exposure>,
}

impl Default for WearFactors {
    fn default() -> Self {
        Self {
            elapsed_days: 0.0,
            usage_intensity: default_intensity(),
            environment: Environment::default(),
            combat_events: Vec::new(),
            exposure: None,
        }
    }
}

/// Breakdown of time-based wear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWear {
    pub elapsed_days: f64,
    pub daily_rate: f64,
    pub usage_intensity: f64,
    pub environment_factor: f64,
    /// Uniform jitter in [0.8, 1.2] applied to the deterministic decay
    pub jitter: f64,
    pub amount: f64,
}

/// Breakdown of combat wear across all events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CombatWear {
    pub events: usize,
    pub amount: f64,
}

/// Breakdown of environmental-exposure wear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureWear {
    pub hours: f64,
    pub base_rate: f64,
    pub environment_factor: f64,
    pub material_factor: f64,
    pub amount: f64,
}

/// Per-source wear amounts for observability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WearBreakdown {
    pub time: Option<TimeWear>,
    pub combat: CombatWear,
    pub exposure: Option<ExposureWear>,
}

/// Full result of a wear assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
// `ConditionReport` borrows `&'static str` keys, so its `Deserialize` impl
// requires `'de: 'static`; this bound propagates that requirement.
#[serde(bound(deserialize = "'de: 'static"))]
pub struct WearReport {
    pub equipment_id: String,
    pub previous_durability: f64,
    pub new_durability: f64,
    /// Sum of all sources before the floor-at-zero clamp
    pub total_wear: f64,
    pub breakdown: WearBreakdown,
    pub previous_condition: ConditionReport,
    pub new_condition: ConditionReport,
    pub condition_changed: bool,
    pub became_broken: bool,
    pub needs_immediate_attention: bool,
}

/// Wear from time passing under a given usage intensity and environment.
pub fn time_wear<R>(
    tier: QualityTier,
    elapsed_days: f64,
    usage_intensity: f64,
    environment: Environment,
    cfg: &EngineConfig,
    rng: &mut R,
) -> TimeWear
where
    R: Rng + ?Sized,
{
    let elapsed_days = elapsed_days.max(0.0);
    let usage_intensity = usage_intensity.max(0.0);
    let daily_rate = tier.daily_decay_rate();
    let environment_factor = cfg.environment_factor(environment);
    let jitter = rng.gen_range(0.8..=1.2);
    // Decay cannot exceed a full bar regardless of elapsed time.
    let amount =
        (daily_rate * elapsed_days * usage_intensity * environment_factor * jitter).min(100.0);
    TimeWear {
        elapsed_days,
        daily_rate,
        usage_intensity,
        environment_factor,
        jitter,
        amount,
    }
}

/// Wear from a single combat event.
pub fn combat_event_wear<R>(event: &CombatEvent, rng: &mut R) -> f64
where
    R: Rng + ?Sized,
{
    let variance = rng.gen_range(0.8..=1.2);
    let mut amount = event.kind.combat_wear_base() * variance * event.intensity.max(0.0);
    if event.critical && event.kind == EquipmentKind::Weapon {
        amount *= 2.0;
    }
    if event.kind == EquipmentKind::Armor && event.damage_taken > 0.0 {
        amount += event.damage_taken * 0.05;
    }
    if event.kind == EquipmentKind::Shield && event.blocks_made > 0 {
        amount += f64::from(event.blocks_made) * 0.2;
    }
    amount.max(0.0)
}

/// Wear from environmental exposure; fully deterministic.
#[must_use]
pub fn exposure_wear(exposure: &Exposure, cfg: &EngineConfig) -> ExposureWear {
    let hours = exposure.hours.max(0.0);
    let base_rate = exposure.kind.exposure_wear_base();
    let environment_factor = cfg.environment_factor(exposure.environment);
    let material_factor = exposure.material.exposure_resistance();
    ExposureWear {
        hours,
        base_rate,
        environment_factor,
        material_factor,
        amount: base_rate * environment_factor * material_factor * hours,
    }
}

/// Assess all wear sources against an equipment snapshot.
///
/// The returned report proposes a new durability; persisting it is the
/// orchestrator's job.
#[must_use]
pub fn assess_wear(
    equipment: &EquipmentSnapshot,
    factors: &WearFactors,
    cfg: &EngineConfig,
    rng: &RngBundle,
) -> WearReport {
    let mut wear_rng = rng.wear();
    let mut total = 0.0;

    let time = (factors.elapsed_days > 0.0).then(|| {
        time_wear(
            equipment.tier,
            factors.elapsed_days,
            factors.usage_intensity,
            factors.environment,
            cfg,
            &mut *wear_rng,
        )
    });
    if let Some(ref t) = time {
        total += t.amount;
    }

    let mut combat = CombatWear::default();
    for event in &factors.combat_events {
        combat.amount += combat_event_wear(event, &mut *wear_rng);
        combat.events += 1;
    }
    total += combat.amount;

    let exposure = factors.exposure.as_ref().map(|e| exposure_wear(e, cfg));
    if let Some(ref e) = exposure {
        total += e.amount;
    }

    let previous = clamp_durability(equipment.durability);
    let new_durability = clamp_durability(previous - total);
    let previous_condition = classify_condition(previous);
    let new_condition = classify_condition(new_durability);

    debug!(
        "wear {}: {:.2} -> {:.2} (time {:.2}, combat {:.2} over {} events, exposure {:.2})",
        equipment.id,
        previous,
        new_durability,
        time.as_ref().map_or(0.0, |t| t.amount),
        combat.amount,
        combat.events,
        exposure.as_ref().map_or(0.0, |e| e.amount),
    );

    WearReport {
        equipment_id: equipment.id.clone(),
        previous_durability: previous,
        new_durability,
        total_wear: total,
        breakdown: WearBreakdown {
            time,
            combat,
            exposure,
        },
        condition_changed: previous_condition.status != new_condition.status,
        became_broken: new_durability < 10.0 && previous >= 10.0,
        needs_immediate_attention: new_condition.repair_urgency.is_immediate(),
        previous_condition,
        new_condition,
    }
}
