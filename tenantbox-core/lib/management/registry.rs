//! In-process index of launched tenants.
//!
//! The registry is filled on launch and pruned on delete and on every discovery pass. It is not
//! persisted: after a restart it starts empty and the runtime's container labels remain the only
//! record of which tenants exist.

use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::identity::TenantId;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// What the registry knows about one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantRecord {
    /// The tenant id.
    pub tenant_id: TenantId,

    /// The id of the tenant's container.
    pub container_id: String,

    /// The id of the template the tenant was launched from.
    pub template_id: String,

    /// When the tenant was launched.
    pub created_at: DateTime<Utc>,
}

/// A thread-safe map from tenant id to [`TenantRecord`].
#[derive(Debug, Default)]
pub struct TenantRegistry {
    records: RwLock<HashMap<TenantId, TenantRecord>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl TenantRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly launched tenant, replacing any previous record for the same id.
    pub fn record(&self, record: TenantRecord) {
        self.write().insert(record.tenant_id.clone(), record);
    }

    /// Returns the record for `tenant_id`.
    pub fn get(&self, tenant_id: &TenantId) -> Option<TenantRecord> {
        self.read().get(tenant_id).cloned()
    }

    /// Returns the record whose container id is exactly `container_id`.
    ///
    /// Short ids do not match; callers resolve them to the full id through the runtime first.
    pub fn find_by_container(&self, container_id: &str) -> Option<TenantRecord> {
        self.read()
            .values()
            .find(|r| r.container_id == container_id)
            .cloned()
    }

    /// Removes the record of the tenant running in the container with the full id
    /// `container_id`, returning it.
    pub fn evict_container(&self, container_id: &str) -> Option<TenantRecord> {
        let mut records = self.write();
        let tenant_id = records
            .values()
            .find(|r| r.container_id == container_id)
            .map(|r| r.tenant_id.clone())?;
        records.remove(&tenant_id)
    }

    /// Drops every record whose container is not in `live_container_ids`.
    ///
    /// Returns the number of records dropped.
    pub fn retain_containers<'a>(
        &self,
        live_container_ids: impl IntoIterator<Item = &'a str>,
    ) -> usize {
        let live: Vec<&str> = live_container_ids.into_iter().collect();
        let mut records = self.write();
        let before = records.len();
        records.retain(|_, r| live.contains(&r.container_id.as_str()));
        before - records.len()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TenantId, TenantRecord>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TenantId, TenantRecord>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
