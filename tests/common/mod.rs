// tests/common/mod.rs
//
// In-memory directory and store used by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use dispatch_lib::{
    AssignmentSnapshot, AssignmentStatus, AssignmentStore, DispatchError,
    DistanceAnnotatedResponder, GeoPoint, Responder, ResponderDirectory, ResponderId,
    ResponderKind, Result, Target, TargetRecord,
};

pub const DHAKA: GeoPoint = GeoPoint {
    latitude: 23.8103,
    longitude: 90.4125,
};

pub fn responder(id: &str, name: &str, latitude: f64, longitude: f64) -> Responder {
    Responder {
        id: Some(ResponderId(id.to_string())),
        name: name.to_string(),
        affiliation: format!("{} Station", name),
        phone_number: Some(format!("+88017{:08}", id.len())),
        location: GeoPoint {
            latitude,
            longitude,
        },
    }
}

pub fn annotated(id: &str, distance_meters: f64) -> DistanceAnnotatedResponder {
    DistanceAnnotatedResponder::new(
        responder(id, &format!("Responder {}", id), DHAKA.latitude, DHAKA.longitude),
        distance_meters,
    )
}

/// Directory whose answers are fixed up front
pub struct MemoryDirectory {
    pub nearby: Option<Vec<DistanceAnnotatedResponder>>,
    pub everyone: Option<Vec<Responder>>,
    pub nearby_calls: AtomicUsize,
    pub all_calls: AtomicUsize,
}

impl MemoryDirectory {
    pub fn new(nearby: Vec<DistanceAnnotatedResponder>, everyone: Vec<Responder>) -> Self {
        Self {
            nearby: Some(nearby),
            everyone: Some(everyone),
            nearby_calls: AtomicUsize::new(0),
            all_calls: AtomicUsize::new(0),
        }
    }

    /// A directory that errors on every call
    pub fn unreachable() -> Self {
        Self {
            nearby: None,
            everyone: None,
            nearby_calls: AtomicUsize::new(0),
            all_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_failing_all(mut self) -> Self {
        self.everyone = None;
        self
    }

    pub fn all_calls(&self) -> usize {
        self.all_calls.load(Ordering::SeqCst)
    }

    pub fn nearby_calls(&self) -> usize {
        self.nearby_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResponderDirectory for MemoryDirectory {
    async fn nearby(
        &self,
        _kind: ResponderKind,
        _origin: GeoPoint,
        limit: usize,
        _max_distance_meters: f64,
    ) -> Result<Vec<DistanceAnnotatedResponder>> {
        self.nearby_calls.fetch_add(1, Ordering::SeqCst);
        match &self.nearby {
            Some(list) => Ok(list.iter().take(limit).cloned().collect()),
            None => Err(DispatchError::DirectoryUnavailable(
                "connection refused".to_string(),
            )),
        }
    }

    async fn all(&self, _kind: ResponderKind) -> Result<Vec<Responder>> {
        self.all_calls.fetch_add(1, Ordering::SeqCst);
        match &self.everyone {
            Some(list) => Ok(list.clone()),
            None => Err(DispatchError::DirectoryUnavailable(
                "connection reset".to_string(),
            )),
        }
    }
}

#[derive(Default)]
struct StoredTarget {
    location: Option<GeoPoint>,
    status: Option<AssignmentStatus>,
    snapshots: HashMap<ResponderKind, AssignmentSnapshot>,
}

/// Store backed by a map, with switches to make writes fail
#[derive(Default)]
pub struct MemoryStore {
    targets: Mutex<HashMap<Target, StoredTarget>>,
    pub fail_assign: bool,
    pub fail_status: bool,
    pub status_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn with_target(target: &Target, location: GeoPoint, status: AssignmentStatus) -> Self {
        let store = Self::default();
        store.targets.lock().unwrap().insert(
            target.clone(),
            StoredTarget {
                location: Some(location),
                status: Some(status),
                snapshots: HashMap::new(),
            },
        );
        store
    }

    pub fn status_of(&self, target: &Target) -> Option<AssignmentStatus> {
        self.targets
            .lock()
            .unwrap()
            .get(target)
            .and_then(|t| t.status)
    }

    pub fn snapshot_of(&self, target: &Target, kind: ResponderKind) -> Option<AssignmentSnapshot> {
        self.targets
            .lock()
            .unwrap()
            .get(target)
            .and_then(|t| t.snapshots.get(&kind).cloned())
    }

    pub fn put_snapshot(&self, target: &Target, snapshot: AssignmentSnapshot) {
        let mut targets = self.targets.lock().unwrap();
        let stored = targets.entry(target.clone()).or_default();
        stored.snapshots.insert(snapshot.responder_kind, snapshot);
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn load_target(&self, target: &Target) -> Result<TargetRecord> {
        let targets = self.targets.lock().unwrap();
        let stored = targets
            .get(target)
            .ok_or_else(|| DispatchError::TargetNotFound(target.to_string()))?;
        Ok(TargetRecord {
            target: target.clone(),
            location: stored.location.unwrap_or(DHAKA),
            status: stored.status.unwrap_or(AssignmentStatus::Pending),
        })
    }

    async fn load_snapshot(
        &self,
        target: &Target,
        kind: ResponderKind,
    ) -> Result<Option<AssignmentSnapshot>> {
        Ok(self.snapshot_of(target, kind))
    }

    async fn set_status(&self, target: &Target, status: AssignmentStatus) -> Result<()> {
        if self.fail_status {
            return Err(DispatchError::PersistenceFailure(
                "status write rejected".to_string(),
            ));
        }
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        let mut targets = self.targets.lock().unwrap();
        let stored = targets
            .get_mut(target)
            .ok_or_else(|| DispatchError::TargetNotFound(target.to_string()))?;
        stored.status = Some(status);
        Ok(())
    }

    async fn assign(&self, target: &Target, snapshot: &AssignmentSnapshot) -> Result<()> {
        if self.fail_assign {
            return Err(DispatchError::PersistenceFailure(
                "snapshot write rejected".to_string(),
            ));
        }
        let mut targets = self.targets.lock().unwrap();
        let stored = targets
            .get_mut(target)
            .ok_or_else(|| DispatchError::TargetNotFound(target.to_string()))?;
        stored
            .snapshots
            .insert(snapshot.responder_kind, snapshot.clone());
        Ok(())
    }
}
