//! Persistence collaborators for the repair engine.
//!
//! The engine owns none of the equipment state; it reads snapshots and
//! proposes writes through [`EquipmentStore`]. The durability write is a
//! compare-and-swap on the expected current value, so two racing repairs
//! (or a repair racing a decay update) cannot silently lose an update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use crate::equipment::EquipmentSnapshot;
use crate::estimator::RepairRequirement;

/// Failures at the storage boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("equipment not found: {id}")]
    NotFound { id: String },
    #[error("repair request not found: {id}")]
    RequestNotFound { id: String },
    #[error("durability conflict on {id}: expected {expected:.2}, found {actual:.2}")]
    Conflict {
        id: String,
        expected: f64,
        actual: f64,
    },
    #[error("storage backend failure: {reason}")]
    Io { reason: String },
}

impl StoreError {
    /// Whether the caller may retry the operation as-is.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Io { .. })
    }
}

/// Audit record appended after every durability mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    pub equipment_id: String,
    /// What happened, e.g. `repair.success` or `wear.assessed`
    pub action: String,
    pub durability_before: f64,
    pub durability_after: f64,
    pub at: DateTime<Utc>,
}

/// Urgency requested by the owner, not derived from condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RepairPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// Repair request lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl RepairStatus {
    /// Terminal states admit no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether the state machine permits `self -> next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress | Self::Cancelled)
                | (Self::InProgress, Self::Completed | Self::Failed)
        )
    }
}

/// Attempted transition out of a terminal or incompatible state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("repair request {id} cannot move from {from:?} to {to:?}")]
pub struct TransitionError {
    pub id: String,
    pub from: RepairStatus,
    pub to: RepairStatus,
}

/// A solicited repair, persisted until it resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairRequest {
    pub id: String,
    pub equipment_id: String,
    pub target_durability: f64,
    pub estimated_cost: f64,
    pub estimated_hours: f64,
    pub priority: RepairPriority,
    pub status: RepairStatus,
    pub requirements: Vec<RepairRequirement>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RepairRequest {
    /// Advance the lifecycle state machine.
    ///
    /// # Errors
    ///
    /// Returns a [`TransitionError`] when the transition is not permitted,
    /// including any transition out of a terminal state.
    pub fn transition(&mut self, next: RepairStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

/// Persistence boundary the engine drives.
pub trait EquipmentStore {
    /// Fetch the current snapshot of an equipment entity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids.
    fn get(&self, id: &str) -> Result<EquipmentSnapshot, StoreError>;

    /// Compare-and-swap the durability value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the stored durability no
    /// longer matches `expected`, and [`StoreError::Io`] on backend
    /// failure; both are retryable.
    fn set_durability(&self, id: &str, expected: f64, new: f64) -> Result<(), StoreError>;

    /// Append an audit record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on backend failure.
    fn append_maintenance_record(&self, record: MaintenanceRecord) -> Result<(), StoreError>;

    /// Persist a new repair request, assigning its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on backend failure.
    fn create_repair_request(&self, request: RepairRequest) -> Result<RepairRequest, StoreError>;

    /// Persist an updated repair request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RequestNotFound`] for unknown ids.
    fn update_repair_request(&self, request: &RepairRequest) -> Result<(), StoreError>;

    /// Fetch a repair request by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RequestNotFound`] for unknown ids.
    fn get_repair_request(&self, id: &str) -> Result<RepairRequest, StoreError>;

    /// The pending request for an equipment id, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on backend failure.
    fn pending_request_for(&self, equipment_id: &str)
    -> Result<Option<RepairRequest>, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    equipment: HashMap<String, EquipmentSnapshot>,
    requests: HashMap<String, RepairRequest>,
    records: Vec<MaintenanceRecord>,
    next_request: u64,
    fail_record_appends: bool,
}

/// In-memory reference store used by tests and default wiring.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an equipment entity.
    pub fn insert_equipment(&self, snapshot: EquipmentSnapshot) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.equipment.insert(snapshot.id.clone(), snapshot);
        }
    }

    /// Force subsequent maintenance-record appends to fail, for tests
    /// exercising the rollback path.
    pub fn fail_record_appends(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_record_appends = fail;
        }
    }

    /// All audit records appended so far.
    #[must_use]
    pub fn maintenance_records(&self) -> Vec<MaintenanceRecord> {
        self.inner
            .lock()
            .map(|inner| inner.records.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryInner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Io {
            reason: "store mutex poisoned".to_string(),
        })
    }
}

impl EquipmentStore for MemoryStore {
    fn get(&self, id: &str) -> Result<EquipmentSnapshot, StoreError> {
        self.lock()?
            .equipment
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    fn set_durability(&self, id: &str, expected: f64, new: f64) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let entry = inner
            .equipment
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        if (entry.durability - expected).abs() > 1e-9 {
            return Err(StoreError::Conflict {
                id: id.to_string(),
                expected,
                actual: entry.durability,
            });
        }
        entry.durability = new;
        Ok(())
    }

    fn append_maintenance_record(&self, record: MaintenanceRecord) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner.fail_record_appends {
            return Err(StoreError::Io {
                reason: "record append rejected".to_string(),
            });
        }
        inner.records.push(record);
        Ok(())
    }

    fn create_repair_request(
        &self,
        mut request: RepairRequest,
    ) -> Result<RepairRequest, StoreError> {
        let mut inner = self.lock()?;
        inner.next_request += 1;
        request.id = format!("repair-{:04}", inner.next_request);
        inner.requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn update_repair_request(&self, request: &RepairRequest) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if !inner.requests.contains_key(&request.id) {
            return Err(StoreError::RequestNotFound {
                id: request.id.clone(),
            });
        }
        inner.requests.insert(request.id.clone(), request.clone());
        Ok(())
    }

    fn get_repair_request(&self, id: &str) -> Result<RepairRequest, StoreError> {
        self.lock()?
            .requests
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::RequestNotFound { id: id.to_string() })
    }

    fn pending_request_for(
        &self,
        equipment_id: &str,
    ) -> Result<Option<RepairRequest>, StoreError> {
        let inner = self.lock()?;
        let mut pending: Vec<&RepairRequest> = inner
            .requests
            .values()
            .filter(|r| r.equipment_id == equipment_id && r.status == RepairStatus::Pending)
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending.first().map(|r| (*r).clone()))
    }
}
