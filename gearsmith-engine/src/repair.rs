//! Repair orchestration facade.
//!
//! Validates inputs, quotes cost and materials, resolves the stochastic
//! attempt, and persists results through the store collaborator. Every
//! business-rule violation is detected before any mutation; only
//! store-level failures are exceptional and trigger rollback.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use chrono::Utc;

use crate::condition::{ConditionReport, classify_condition};
use crate::config::EngineConfig;
use crate::degradation::{WearFactors, WearReport, assess_wear};
use crate::equipment::EquipmentSnapshot;
use crate::estimator::{RepairQuote, build_quote, request_requirements};
use crate::outcome::{RepairOutcome, SkillTier, resolve_repair};
use crate::rng::RngBundle;
use crate::station::{CostRange, StationError, quote_range, validate_station};
use crate::store::{
    EquipmentStore, MaintenanceRecord, RepairPriority, RepairRequest, RepairStatus, StoreError,
    TransitionError,
};

/// Per-material gap between what a repair needs and what was offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialShortfall {
    pub material: String,
    pub needed: u32,
    pub available: u32,
    pub missing: u32,
}

/// Failures surfaced by the orchestrator.
///
/// Partial and critical repair failures are *not* errors; they are ordinary
/// [`RepairOutcome`] values inside a successful receipt.
#[derive(Debug, Error)]
pub enum RepairError {
    #[error("equipment not found: {id}")]
    EquipmentNotFound { id: String },
    #[error(transparent)]
    Station(#[from] StationError),
    #[error("target durability {target:.1} is invalid")]
    InvalidTarget { target: f64 },
    #[error("equipment doesn't need repair (current {current:.1}, target {target:.1})")]
    NoRepairNeeded { current: f64, target: f64 },
    #[error("estimated cost {estimated:.2} exceeds budget {max:.2}")]
    BudgetExceeded { estimated: f64, max: f64 },
    #[error("insufficient materials ({} short)", .shortfalls.len())]
    InsufficientMaterials { shortfalls: Vec<MaterialShortfall> },
    #[error(transparent)]
    RequestState(#[from] TransitionError),
    #[error("concurrent modification of {id}: expected durability {expected:.2}, found {actual:.2}")]
    Conflict {
        id: String,
        expected: f64,
        actual: f64,
    },
    #[error("persistence failure: {0}")]
    Persistence(StoreError),
}

impl RepairError {
    /// Conflict and persistence failures may be retried; validation
    /// failures need corrected input first.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Persistence(_))
    }
}

fn map_store_error(err: StoreError) -> RepairError {
    match err {
        StoreError::NotFound { id } => RepairError::EquipmentNotFound { id },
        StoreError::Conflict {
            id,
            expected,
            actual,
        } => RepairError::Conflict {
            id,
            expected,
            actual,
        },
        other => RepairError::Persistence(other),
    }
}

/// Structured result of a resolved repair attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairReceipt {
    pub equipment_id: String,
    pub station_id: String,
    pub outcome: RepairOutcome,
    pub success_chance: f64,
    pub roll: f64,
    pub previous_durability: f64,
    pub new_durability: f64,
    pub cost_paid: f64,
    pub hours_taken: f64,
    pub materials_consumed: BTreeMap<String, u32>,
    pub skill: SkillTier,
    /// Pending request resolved by this attempt, if one existed
    pub request_id: Option<String>,
}

/// The repair engine facade over config, store, and estimator components.
pub struct RepairEngine<'a, S: EquipmentStore + ?Sized> {
    cfg: &'a EngineConfig,
    store: &'a S,
}

impl<'a, S: EquipmentStore + ?Sized> RepairEngine<'a, S> {
    #[must_use]
    pub const fn new(cfg: &'a EngineConfig, store: &'a S) -> Self {
        Self { cfg, store }
    }

    /// Condition report for a durability percentage; pure passthrough kept
    /// on the facade so callers need only one entry point.
    #[must_use]
    pub fn classify_condition(&self, durability: f64) -> ConditionReport {
        classify_condition(durability)
    }

    /// Compute wear from the given factors without persisting anything.
    ///
    /// # Errors
    ///
    /// Returns [`RepairError::EquipmentNotFound`] for unknown ids.
    pub fn estimate_decay(
        &self,
        equipment_id: &str,
        factors: &WearFactors,
        rng: &RngBundle,
    ) -> Result<WearReport, RepairError> {
        let equipment = self.store.get(equipment_id).map_err(map_store_error)?;
        Ok(assess_wear(&equipment, factors, self.cfg, rng))
    }

    /// Compute wear and persist the new durability plus an audit record.
    ///
    /// # Errors
    ///
    /// Returns [`RepairError::Conflict`] when the durability changed
    /// between read and write, and [`RepairError::Persistence`] when the
    /// audit append fails (the durability write is rolled back).
    pub fn apply_decay(
        &self,
        equipment_id: &str,
        factors: &WearFactors,
        rng: &RngBundle,
    ) -> Result<WearReport, RepairError> {
        let report = self.estimate_decay(equipment_id, factors, rng)?;
        self.store
            .set_durability(
                equipment_id,
                report.previous_durability,
                report.new_durability,
            )
            .map_err(map_store_error)?;
        self.append_record_or_rollback(
            equipment_id,
            "wear.assessed",
            report.previous_durability,
            report.new_durability,
        )?;
        Ok(report)
    }

    /// Quote the cost, time, and materials to repair at a station.
    ///
    /// # Errors
    ///
    /// Returns not-found, station, or validation errors; never mutates.
    pub fn calculate_requirements(
        &self,
        equipment_id: &str,
        target_durability: f64,
        station_id: &str,
        skill: SkillTier,
    ) -> Result<RepairQuote, RepairError> {
        let equipment = self.store.get(equipment_id).map_err(map_store_error)?;
        let target = validated_target(&equipment, target_durability)?;
        let station = validate_station(self.cfg, station_id, equipment.kind, equipment.tier)?;
        Ok(build_quote(
            self.cfg,
            &equipment,
            target,
            &station.id,
            &station.name,
            station.efficiency,
            skill,
        ))
    }

    /// Cost spread across all eligible stations, for a quick estimate.
    ///
    /// # Errors
    ///
    /// Returns not-found or validation errors; `None` when no station can
    /// handle the equipment.
    pub fn estimate_cost_range(
        &self,
        equipment_id: &str,
        target_durability: f64,
    ) -> Result<Option<CostRange>, RepairError> {
        let equipment = self.store.get(equipment_id).map_err(map_store_error)?;
        let target = validated_target(&equipment, target_durability)?;
        Ok(quote_range(
            self.cfg,
            equipment.kind,
            equipment.tier,
            equipment.base_value,
            equipment.durability,
            target,
        ))
    }

    /// Attempt a repair end to end: validate, quote, resolve, persist.
    ///
    /// # Errors
    ///
    /// All business-rule violations are returned before any mutation.
    /// [`RepairError::Conflict`] and [`RepairError::Persistence`] are
    /// retryable; on a failed audit append the durability write is rolled
    /// back first.
    pub fn perform_repair(
        &self,
        equipment_id: &str,
        station_id: &str,
        target_durability: f64,
        available_materials: &HashMap<String, u32>,
        skill: SkillTier,
        rng: &RngBundle,
    ) -> Result<RepairReceipt, RepairError> {
        let quote =
            self.calculate_requirements(equipment_id, target_durability, station_id, skill)?;

        let shortfalls: Vec<MaterialShortfall> = quote
            .materials
            .iter()
            .filter_map(|(material, &needed)| {
                let available = available_materials.get(material).copied().unwrap_or(0);
                (available < needed).then(|| MaterialShortfall {
                    material: material.clone(),
                    needed,
                    available,
                    missing: needed - available,
                })
            })
            .collect();
        if !shortfalls.is_empty() {
            return Err(RepairError::InsufficientMaterials { shortfalls });
        }

        let resolved = resolve_repair(self.cfg, &quote, rng);
        let previous = quote.current_durability;
        let new_durability = resolved.outcome.new_durability();

        // Durability first: the CAS is the concurrency guard for the whole
        // read-quote-write sequence.
        self.store
            .set_durability(equipment_id, previous, new_durability)
            .map_err(map_store_error)?;
        self.append_record_or_rollback(
            equipment_id,
            &format!("repair.{}", resolved.outcome.key()),
            previous,
            new_durability,
        )?;

        let request_id = self.resolve_pending_request(
            equipment_id,
            previous,
            new_durability,
            resolved.outcome.is_success(),
        )?;

        debug!(
            "repair {equipment_id} at {station_id}: {} ({previous:.1} -> {new_durability:.1})",
            resolved.outcome.key(),
        );

        Ok(RepairReceipt {
            equipment_id: equipment_id.to_string(),
            station_id: quote.station_id.clone(),
            outcome: resolved.outcome,
            success_chance: resolved.success_chance,
            roll: resolved.roll,
            previous_durability: previous,
            new_durability,
            cost_paid: resolved.cost_paid,
            hours_taken: resolved.hours_taken,
            materials_consumed: resolved.materials_consumed,
            skill,
            request_id,
        })
    }

    /// Create a pending repair request after validating need and budget.
    ///
    /// # Errors
    ///
    /// Returns validation errors with no mutation on any rejection path.
    pub fn create_repair_request(
        &self,
        equipment_id: &str,
        target_durability: f64,
        priority: RepairPriority,
        max_cost: Option<f64>,
    ) -> Result<RepairRequest, RepairError> {
        let equipment = self.store.get(equipment_id).map_err(map_store_error)?;
        let target = validated_target(&equipment, target_durability)?;

        // Estimates use a neutral station and the default proficiency; the
        // actual venue is chosen when the repair is performed.
        let quote = build_quote(
            self.cfg,
            &equipment,
            target,
            "unassigned",
            "unassigned",
            1.0,
            SkillTier::default(),
        );
        if let Some(max) = max_cost
            && quote.cost > max
        {
            return Err(RepairError::BudgetExceeded {
                estimated: quote.cost,
                max,
            });
        }

        let request = RepairRequest {
            id: String::new(),
            equipment_id: equipment_id.to_string(),
            target_durability: target,
            estimated_cost: quote.cost,
            estimated_hours: quote.hours,
            priority,
            status: RepairStatus::Pending,
            requirements: request_requirements(equipment.tier, equipment.durability, target),
            created_at: Utc::now(),
            completed_at: None,
        };
        self.store
            .create_repair_request(request)
            .map_err(map_store_error)
    }

    /// Cancel a pending repair request.
    ///
    /// # Errors
    ///
    /// Returns [`RepairError::RequestState`] when the request already left
    /// the pending state.
    pub fn cancel_repair_request(&self, request_id: &str) -> Result<RepairRequest, RepairError> {
        let mut request = self
            .store
            .get_repair_request(request_id)
            .map_err(map_store_error)?;
        request.transition(RepairStatus::Cancelled)?;
        self.store
            .update_repair_request(&request)
            .map_err(map_store_error)?;
        Ok(request)
    }

    /// Append an audit record, rolling the durability write back if the
    /// append fails so no half-persisted state survives.
    fn append_record_or_rollback(
        &self,
        equipment_id: &str,
        action: &str,
        previous: f64,
        new_durability: f64,
    ) -> Result<(), RepairError> {
        if let Err(err) = self.store.append_maintenance_record(MaintenanceRecord {
            equipment_id: equipment_id.to_string(),
            action: action.to_string(),
            durability_before: previous,
            durability_after: new_durability,
            at: Utc::now(),
        }) {
            if let Err(rollback) = self
                .store
                .set_durability(equipment_id, new_durability, previous)
            {
                warn!("rollback of {equipment_id} durability failed: {rollback}");
            }
            return Err(RepairError::Persistence(err));
        }
        Ok(())
    }

    /// Drive the oldest pending request for this equipment through the
    /// state machine; attempts resolve to completed or failed, terminally.
    fn resolve_pending_request(
        &self,
        equipment_id: &str,
        previous: f64,
        new_durability: f64,
        success: bool,
    ) -> Result<Option<String>, RepairError> {
        let Some(mut request) = self
            .store
            .pending_request_for(equipment_id)
            .map_err(map_store_error)?
        else {
            return Ok(None);
        };
        request.transition(RepairStatus::InProgress)?;
        let terminal = if success {
            RepairStatus::Completed
        } else {
            RepairStatus::Failed
        };
        request.transition(terminal)?;
        if let Err(err) = self.store.update_repair_request(&request) {
            if let Err(rollback) = self
                .store
                .set_durability(equipment_id, new_durability, previous)
            {
                warn!("rollback of {equipment_id} durability failed: {rollback}");
            }
            return Err(RepairError::Persistence(err));
        }
        Ok(Some(request.id))
    }
}

/// Validate a requested target durability against the current state.
///
/// Targets above 100 are clamped (a repair can never exceed perfect);
/// non-finite or non-positive targets are rejected outright, and a target
/// at or below the current durability means no repair is needed.
fn validated_target(
    equipment: &EquipmentSnapshot,
    target: f64,
) -> Result<f64, RepairError> {
    if !target.is_finite() || target <= 0.0 {
        return Err(RepairError::InvalidTarget { target });
    }
    let target = target.min(100.0);
    if target <= equipment.durability {
        return Err(RepairError::NoRepairNeeded {
            current: equipment.durability,
            target,
        });
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::{EquipmentKind, MaterialKind};
    use crate::quality::QualityTier;
    use crate::store::MemoryStore;

    fn seeded_store(durability: f64) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_equipment(EquipmentSnapshot {
            id: "sword-1".into(),
            kind: EquipmentKind::Weapon,
            tier: QualityTier::Basic,
            durability,
            base_value: 100.0,
            material: MaterialKind::Metal,
        });
        store
    }

    fn ample_materials() -> HashMap<String, u32> {
        HashMap::from([
            ("iron_ingot".to_string(), 50),
            ("leather_strips".to_string(), 50),
        ])
    }

    #[test]
    fn unknown_equipment_is_rejected_first() {
        let cfg = EngineConfig::load_from_static();
        let store = MemoryStore::new();
        let engine = RepairEngine::new(&cfg, &store);
        let err = engine
            .calculate_requirements("ghost", 100.0, "village_smithy", SkillTier::Journeyman)
            .unwrap_err();
        assert!(matches!(err, RepairError::EquipmentNotFound { .. }));
    }

    #[test]
    fn no_repair_needed_when_target_not_above_current() {
        let cfg = EngineConfig::load_from_static();
        let store = seeded_store(80.0);
        let engine = RepairEngine::new(&cfg, &store);
        let err = engine
            .create_repair_request("sword-1", 80.0, RepairPriority::Normal, None)
            .unwrap_err();
        assert!(matches!(err, RepairError::NoRepairNeeded { .. }));
        assert!(!err.is_retryable());
        // No mutation on the rejection path.
        assert!(store.pending_request_for("sword-1").unwrap().is_none());
        assert!((store.get("sword-1").unwrap().durability - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn budget_cap_is_enforced_before_creation() {
        let cfg = EngineConfig::load_from_static();
        let store = seeded_store(40.0);
        let engine = RepairEngine::new(&cfg, &store);
        // Golden cost for 40 -> 100 at neutral efficiency is 4.8.
        let err = engine
            .create_repair_request("sword-1", 100.0, RepairPriority::Normal, Some(4.0))
            .unwrap_err();
        assert!(
            matches!(err, RepairError::BudgetExceeded { estimated, .. } if (estimated - 4.8).abs() < 1e-9)
        );
        let request = engine
            .create_repair_request("sword-1", 100.0, RepairPriority::Normal, Some(5.0))
            .unwrap();
        assert_eq!(request.status, RepairStatus::Pending);
        assert!((request.estimated_cost - 4.8).abs() < 1e-9);
    }

    #[test]
    fn material_shortfalls_are_itemized() {
        let cfg = EngineConfig::load_from_static();
        let store = seeded_store(10.0);
        let engine = RepairEngine::new(&cfg, &store);
        let rng = RngBundle::from_user_seed(1);
        let err = engine
            .perform_repair(
                "sword-1",
                "village_smithy",
                100.0,
                &HashMap::from([("iron_ingot".to_string(), 1)]),
                SkillTier::Journeyman,
                &rng,
            )
            .unwrap_err();
        let RepairError::InsufficientMaterials { shortfalls } = err else {
            panic!("expected material shortfalls");
        };
        assert!(shortfalls.iter().any(|s| s.material == "iron_ingot" && s.missing > 0));
        assert!(shortfalls.iter().any(|s| s.material == "leather_strips" && s.available == 0));
        // Nothing was consumed or written.
        assert!((store.get("sword-1").unwrap().durability - 10.0).abs() < f64::EPSILON);
        assert!(store.maintenance_records().is_empty());
    }

    #[test]
    fn successful_repair_persists_durability_and_audit() {
        let cfg = EngineConfig::load_from_static();
        let store = seeded_store(40.0);
        let engine = RepairEngine::new(&cfg, &store);
        // Master skill at 40 durability: chance is clamped to the max, and
        // only a roll above it fails; pick a seed that succeeds.
        let rng = RngBundle::from_user_seed(2);
        let receipt = engine
            .perform_repair(
                "sword-1",
                "royal_arsenal",
                100.0,
                &ample_materials(),
                SkillTier::Master,
                &rng,
            )
            .unwrap();
        let stored = store.get("sword-1").unwrap().durability;
        assert!((stored - receipt.new_durability).abs() < 1e-9);
        let records = store.maintenance_records();
        assert_eq!(records.len(), 1);
        assert!(records[0].action.starts_with("repair."));
        assert!((records[0].durability_before - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn audit_failure_rolls_back_durability() {
        let cfg = EngineConfig::load_from_static();
        let store = seeded_store(40.0);
        store.fail_record_appends(true);
        let engine = RepairEngine::new(&cfg, &store);
        let rng = RngBundle::from_user_seed(2);
        let err = engine
            .perform_repair(
                "sword-1",
                "royal_arsenal",
                100.0,
                &ample_materials(),
                SkillTier::Master,
                &rng,
            )
            .unwrap_err();
        assert!(matches!(err, RepairError::Persistence(_)));
        assert!(err.is_retryable());
        assert!((store.get("sword-1").unwrap().durability - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pending_request_resolves_terminally_with_the_repair() {
        let cfg = EngineConfig::load_from_static();
        let store = seeded_store(40.0);
        let engine = RepairEngine::new(&cfg, &store);
        let request = engine
            .create_repair_request("sword-1", 100.0, RepairPriority::High, None)
            .unwrap();
        let rng = RngBundle::from_user_seed(2);
        let receipt = engine
            .perform_repair(
                "sword-1",
                "royal_arsenal",
                100.0,
                &ample_materials(),
                SkillTier::Master,
                &rng,
            )
            .unwrap();
        assert_eq!(receipt.request_id.as_deref(), Some(request.id.as_str()));
        let stored = store.get_repair_request(&request.id).unwrap();
        assert!(stored.status.is_terminal());
        assert!(stored.completed_at.is_some());
    }

    #[test]
    fn cancelled_requests_cannot_be_cancelled_twice() {
        let cfg = EngineConfig::load_from_static();
        let store = seeded_store(40.0);
        let engine = RepairEngine::new(&cfg, &store);
        let request = engine
            .create_repair_request("sword-1", 90.0, RepairPriority::Low, None)
            .unwrap();
        let cancelled = engine.cancel_repair_request(&request.id).unwrap();
        assert_eq!(cancelled.status, RepairStatus::Cancelled);
        assert!(matches!(
            engine.cancel_repair_request(&request.id),
            Err(RepairError::RequestState(_))
        ));
    }

    #[test]
    fn targets_above_perfect_are_clamped() {
        let cfg = EngineConfig::load_from_static();
        let store = seeded_store(40.0);
        let engine = RepairEngine::new(&cfg, &store);
        let quote = engine
            .calculate_requirements("sword-1", 150.0, "village_smithy", SkillTier::Journeyman)
            .unwrap();
        assert!((quote.target_durability - 100.0).abs() < f64::EPSILON);
        assert!(matches!(
            engine.calculate_requirements("sword-1", -5.0, "village_smithy", SkillTier::Journeyman),
            Err(RepairError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn decay_application_writes_through_cas() {
        let cfg = EngineConfig::load_from_static();
        let store = seeded_store(70.0);
        let engine = RepairEngine::new(&cfg, &store);
        let rng = RngBundle::from_user_seed(8);
        let factors = WearFactors {
            elapsed_days: 3.0,
            ..WearFactors::default()
        };
        let report = engine.apply_decay("sword-1", &factors, &rng).unwrap();
        assert!(report.total_wear > 0.0);
        assert!((store.get("sword-1").unwrap().durability - report.new_durability).abs() < 1e-9);
        assert_eq!(store.maintenance_records().len(), 1);
    }
}
