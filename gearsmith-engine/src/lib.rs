//! Gearsmith Engine
//!
//! Platform-agnostic durability and repair simulation for game equipment.
//! This crate models wear, condition classification, repair cost and
//! material estimation, station matching, and stochastic repair outcomes
//! without UI or platform-specific dependencies.

pub mod condition;
pub mod config;
pub mod degradation;
pub mod equipment;
pub mod estimator;
pub mod numbers;
pub mod outcome;
pub mod quality;
pub mod repair;
pub mod rng;
pub mod station;
pub mod store;

// Re-export commonly used types
pub use condition::{
    ConditionReport, ConditionStatus, RepairUrgency, UseCheck, UseKind, apply_stat_penalties,
    classify_condition, usability,
};
pub use config::{ConfigError, EngineConfig, KindSupport, MaterialSpec, StationSpec};
pub use degradation::{
    CombatEvent, Exposure, WearBreakdown, WearFactors, WearReport, assess_wear,
};
pub use equipment::{
    Environment, EquipmentKind, EquipmentSnapshot, MaterialKind, clamp_durability,
};
pub use estimator::{
    RepairQuote, RepairRequirement, RequirementKind, build_quote, request_requirements,
};
pub use outcome::{RepairOutcome, ResolvedRepair, SkillTier, resolve_repair, success_chance};
pub use quality::{QualitySpec, QualityTier};
pub use repair::{MaterialShortfall, RepairEngine, RepairError, RepairReceipt};
pub use rng::RngBundle;
pub use station::{CostRange, StationError, StationMatch, eligible_stations, validate_station};
pub use store::{
    EquipmentStore, MaintenanceRecord, MemoryStore, RepairPriority, RepairRequest, RepairStatus,
    StoreError, TransitionError,
};
