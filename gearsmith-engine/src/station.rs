//! Repair station matching
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::equipment::EquipmentKind;
use crate::estimator::repair_cost;
use crate::quality::QualityTier;

/// A station eligible for a given repair, annotated with its efficiency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMatch {
    pub id: String,
    pub name: String,
    pub efficiency: f64,
}

/// Station resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StationError {
    #[error("unknown repair station: {id}")]
    Unknown { id: String },
    #[error("station {id} cannot repair {kind} equipment of {tier} quality")]
    Unsupported {
        id: String,
        kind: EquipmentKind,
        tier: QualityTier,
    },
}

/// All registered stations able to repair the given kind and tier,
/// in stable id order.
#[must_use]
pub fn eligible_stations(
    cfg: &EngineConfig,
    kind: EquipmentKind,
    tier: QualityTier,
) -> Vec<StationMatch> {
    let mut matches: Vec<StationMatch> = cfg
        .stations
        .iter()
        .filter(|(_, spec)| spec.accepts(kind, tier))
        .map(|(id, spec)| StationMatch {
            id: id.clone(),
            name: spec.name.clone(),
            efficiency: spec.efficiency,
        })
        .collect();
    matches.sort_by(|a, b| a.id.cmp(&b.id));
    matches
}

/// Resolve a chosen station and confirm it can handle the repair.
///
/// # Errors
///
/// Returns [`StationError::Unknown`] for an unregistered id and
/// [`StationError::Unsupported`] when the station cannot handle the
/// equipment kind or quality tier.
pub fn validate_station(
    cfg: &EngineConfig,
    id: &str,
    kind: EquipmentKind,
    tier: QualityTier,
) -> Result<StationMatch, StationError> {
    let spec = cfg
        .station(id)
        .ok_or_else(|| StationError::Unknown { id: id.to_string() })?;
    if !spec.accepts(kind, tier) {
        return Err(StationError::Unsupported {
            id: id.to_string(),
            kind,
            tier,
        });
    }
    Ok(StationMatch {
        id: id.to_string(),
        name: spec.name.clone(),
        efficiency: spec.efficiency,
    })
}

/// Cost spread across every eligible station for a quick estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRange {
    pub min_cost: f64,
    pub max_cost: f64,
    pub stations: usize,
}

/// Estimate the cheapest and priciest way to repair `current -> target`
/// across all eligible stations. Returns `None` when no station qualifies.
#[must_use]
pub fn quote_range(
    cfg: &EngineConfig,
    kind: EquipmentKind,
    tier: QualityTier,
    base_value: f64,
    current: f64,
    target: f64,
) -> Option<CostRange> {
    let eligible = eligible_stations(cfg, kind, tier);
    if eligible.is_empty() {
        return None;
    }
    let mut min_cost = f64::MAX;
    let mut max_cost = f64::MIN;
    for station in &eligible {
        let cost = repair_cost(cfg, tier, base_value, current, target, station.efficiency);
        min_cost = min_cost.min(cost);
        max_cost = max_cost.max(cost);
    }
    Some(CostRange {
        min_cost,
        max_cost,
        stations: eligible.len(),
    })
}
