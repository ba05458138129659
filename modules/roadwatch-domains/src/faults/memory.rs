//! In-memory `FaultStore` for tests.

use async_trait::async_trait;
use roadwatch_common::{Device, FaultRecord, FaultType, JoinedFaultRow, Neighborhood, NewFaultRecord};
use roadwatch_core::{FaultStore, FaultTx, StoreError, StoreResult};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct State {
    neighborhoods: Vec<Neighborhood>,
    fault_types: Vec<FaultType>,
    devices: Vec<Device>,
    faults: Vec<FaultRecord>,
    next_id: i64,
    unavailable: bool,
    fail_inserts: bool,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Writes made through a transaction become visible only on commit.
#[derive(Clone, Default)]
pub struct MemoryFaultStore {
    state: Arc<Mutex<State>>,
}

impl MemoryFaultStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn seed_neighborhood(&self, name: &str) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.neighborhoods.push(Neighborhood {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn seed_fault_type(&self, name: &str, priority: &str, description: &str) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.fault_types.push(FaultType {
            id,
            name: name.to_string(),
            priority: priority.to_string(),
            description: description.to_string(),
        });
        id
    }

    /// Every call fails with `StoreError::Unavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// `insert_fault` fails while set; lookups still work.
    pub fn fail_inserts(&self, fail: bool) {
        self.lock().fail_inserts = fail;
    }

    pub fn faults(&self) -> Vec<FaultRecord> {
        self.lock().faults.clone()
    }

    pub fn devices(&self) -> Vec<Device> {
        self.lock().devices.clone()
    }

    fn check_available(state: &State) -> StoreResult<()> {
        if state.unavailable {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FaultStore for MemoryFaultStore {
    async fn lookup_or_create_device(&self, identifier: &str) -> StoreResult<Device> {
        let mut state = self.lock();
        Self::check_available(&state)?;
        if let Some(device) = state.devices.iter().find(|d| d.identifier == identifier) {
            return Ok(device.clone());
        }
        let device = Device {
            id: state.next_id(),
            identifier: identifier.to_string(),
        };
        state.devices.push(device.clone());
        Ok(device)
    }

    async fn begin(&self) -> StoreResult<Box<dyn FaultTx>> {
        Self::check_available(&self.lock())?;
        Ok(Box::new(MemoryFaultTx {
            store: self.clone(),
            pending: Vec::new(),
        }))
    }

    async fn scan_joined_faults(&self) -> StoreResult<Vec<JoinedFaultRow>> {
        let state = self.lock();
        Self::check_available(&state)?;

        let mut rows = Vec::with_capacity(state.faults.len());
        for fault in &state.faults {
            let (Some(neighborhood), Some(fault_type)) = (
                state.neighborhoods.iter().find(|n| n.id == fault.neighborhood_id),
                state.fault_types.iter().find(|t| t.id == fault.fault_type_id),
            ) else {
                continue;
            };
            rows.push(JoinedFaultRow {
                fault_id: fault.id,
                neighborhood_id: neighborhood.id,
                neighborhood_name: neighborhood.name.clone(),
                latitude: fault.coordinate.latitude(),
                longitude: fault.coordinate.longitude(),
                detected_at: fault.detected_at,
                confidence: fault.confidence,
                repair_status: fault.repair_status,
                image_ref: fault.image_ref.clone(),
                fault_type_name: fault_type.name.clone(),
                fault_type_priority: fault_type.priority.clone(),
                fault_type_description: fault_type.description.clone(),
            });
        }
        Ok(rows)
    }
}

struct MemoryFaultTx {
    store: MemoryFaultStore,
    pending: Vec<FaultRecord>,
}

#[async_trait]
impl FaultTx for MemoryFaultTx {
    async fn lookup_neighborhood_id(&mut self, name: &str) -> StoreResult<Option<i64>> {
        let state = self.store.lock();
        MemoryFaultStore::check_available(&state)?;
        Ok(state.neighborhoods.iter().find(|n| n.name == name).map(|n| n.id))
    }

    async fn lookup_fault_type_id(&mut self, name: &str) -> StoreResult<Option<i64>> {
        let state = self.store.lock();
        MemoryFaultStore::check_available(&state)?;
        Ok(state.fault_types.iter().find(|t| t.name == name).map(|t| t.id))
    }

    async fn insert_fault(&mut self, record: &NewFaultRecord) -> StoreResult<i64> {
        let mut state = self.store.lock();
        MemoryFaultStore::check_available(&state)?;
        if state.fail_inserts {
            return Err(StoreError::Query("insert rejected".to_string()));
        }
        let id = state.next_id();
        self.pending.push(record.clone().into_record(id));
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryFaultTx { store, pending } = *self;
        let mut state = store.lock();
        MemoryFaultStore::check_available(&state)?;
        state.faults.extend(pending);
        Ok(())
    }
}
