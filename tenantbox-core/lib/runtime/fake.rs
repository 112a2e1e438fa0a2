//! An in-memory [`ContainerRuntime`] that records every call, for tests.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::json;

use super::{
    ContainerDetails, ContainerRecord, ContainerRuntime, ContainerSpec, LogRequest, LogStream,
    RuntimeError, VolumeRecord,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A call made against the [`FakeRuntime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    /// `ping`
    Ping,
    /// `image_exists(image)`
    ImageExists(String),
    /// `create_container(image)`
    Create(String),
    /// `start_container(id)`
    Start(String),
    /// `stop_container(id, grace)`
    Stop(String, u32),
    /// `restart_container(id, grace)`
    Restart(String, u32),
    /// `remove_container(id, force)`
    Remove(String, bool),
    /// `inspect_container(id)`
    Inspect(String),
    /// `list_containers(all)`
    List(bool),
    /// `container_logs(id, request)`
    Logs(String, LogRequest),
    /// `list_volumes`
    ListVolumes,
    /// `remove_volume(name)`
    RemoveVolume(String),
}

/// A cloneable handle to a shared in-memory runtime.
#[derive(Debug, Clone, Default)]
pub struct FakeRuntime {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<RuntimeCall>,
    images: BTreeSet<String>,
    containers: BTreeMap<String, FakeContainer>,
    volumes: BTreeSet<String>,
    logs: HashMap<String, Vec<Bytes>>,
    failures: BTreeSet<FailPoint>,
    next_id: u64,
}

#[derive(Debug, Clone)]
struct FakeContainer {
    spec: ContainerSpec,
    running: bool,
}

/// An operation the fake can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailPoint {
    /// Every call reports the runtime as unreachable.
    Unavailable,
    /// `create_container` fails.
    Create,
    /// `start_container` fails.
    Start,
    /// `start_container` never completes.
    StallStart,
    /// `stop_container` fails.
    Stop,
    /// `restart_container` fails.
    Restart,
    /// `remove_container` fails.
    Remove,
    /// The log stream yields an error after its chunks.
    LogRead,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl FakeRuntime {
    /// Creates an empty runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a runtime with the given images already present.
    pub fn with_images<'a>(images: impl IntoIterator<Item = &'a str>) -> Self {
        let runtime = Self::new();
        for image in images {
            runtime.add_image(image);
        }
        runtime
    }

    /// Adds an image to the local image store.
    pub fn add_image(&self, image: &str) {
        self.state().images.insert(image.to_string());
    }

    /// Adds a container that was not created through tenantbox.
    pub fn add_foreign_container(&self, id: &str, image: &str, labels: HashMap<String, String>) {
        let spec = ContainerSpec {
            image: image.to_string(),
            exposed_port: String::new(),
            labels,
            volume_mounts: vec![],
            network: "bridge".to_string(),
        };
        self.state().containers.insert(
            id.to_string(),
            FakeContainer {
                spec,
                running: true,
            },
        );
    }

    /// Sets the log chunks a container's log stream yields.
    pub fn set_logs(&self, id: &str, chunks: Vec<Bytes>) {
        self.state().logs.insert(id.to_string(), chunks);
    }

    /// Makes the given operation fail from now on.
    pub fn fail(&self, point: FailPoint) {
        self.state().failures.insert(point);
    }

    /// Returns every call made so far.
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.state().calls.clone()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Returns the ids of existing containers.
    pub fn container_ids(&self) -> Vec<String> {
        self.state().containers.keys().cloned().collect()
    }

    /// Returns the spec a container was created with.
    pub fn container_spec(&self, id: &str) -> Option<ContainerSpec> {
        self.state().containers.get(id).map(|c| c.spec.clone())
    }

    /// Returns whether a container is running.
    pub fn is_running(&self, id: &str) -> Option<bool> {
        self.state().containers.get(id).map(|c| c.running)
    }

    /// Returns the names of existing volumes.
    pub fn volume_names(&self) -> Vec<String> {
        self.state().volumes.iter().cloned().collect()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        // A panicking test must not poison the fake for the assertions that follow.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(&self, call: RuntimeCall) -> Result<MutexGuard<'_, FakeState>, RuntimeError> {
        let mut state = self.state();
        state.calls.push(call);
        if state.failures.contains(&FailPoint::Unavailable) {
            return Err(RuntimeError::Unavailable(
                "cannot connect to the runtime socket".to_string(),
            ));
        }
        Ok(state)
    }
}

impl FakeState {
    fn check(&self, point: FailPoint, what: &str) -> Result<(), RuntimeError> {
        if self.failures.contains(&point) {
            return Err(RuntimeError::Failed(format!("injected {} failure", what)));
        }
        Ok(())
    }

    fn container_mut(&mut self, id: &str) -> Result<&mut FakeContainer, RuntimeError> {
        self.containers
            .get_mut(id)
            .ok_or_else(|| RuntimeError::NotFound(format!("No such container: {}", id)))
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> Result<(), RuntimeError> {
        self.enter(RuntimeCall::Ping)?;
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        let state = self.enter(RuntimeCall::ImageExists(image.to_string()))?;
        Ok(state.images.contains(image))
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let mut state = self.enter(RuntimeCall::Create(spec.image.clone()))?;
        state.check(FailPoint::Create, "create")?;

        state.next_id += 1;
        let id = format!("{:064x}", state.next_id);
        for mount in &spec.volume_mounts {
            state.volumes.insert(mount.source.clone());
        }
        state.containers.insert(
            id.clone(),
            FakeContainer {
                spec: spec.clone(),
                running: false,
            },
        );
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        let stall = {
            let mut state = self.enter(RuntimeCall::Start(id.to_string()))?;
            state.check(FailPoint::Start, "start")?;
            let stall = state.failures.contains(&FailPoint::StallStart);
            if !stall {
                state.container_mut(id)?.running = true;
            }
            stall
        };

        if stall {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn stop_container(&self, id: &str, grace_secs: u32) -> Result<(), RuntimeError> {
        let mut state = self.enter(RuntimeCall::Stop(id.to_string(), grace_secs))?;
        state.check(FailPoint::Stop, "stop")?;
        state.container_mut(id)?.running = false;
        Ok(())
    }

    async fn restart_container(&self, id: &str, grace_secs: u32) -> Result<(), RuntimeError> {
        let mut state = self.enter(RuntimeCall::Restart(id.to_string(), grace_secs))?;
        state.check(FailPoint::Restart, "restart")?;
        state.container_mut(id)?.running = true;
        Ok(())
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), RuntimeError> {
        let mut state = self.enter(RuntimeCall::Remove(id.to_string(), force))?;
        state.check(FailPoint::Remove, "remove")?;
        let container = state.container_mut(id)?;
        if container.running && !force {
            return Err(RuntimeError::Failed(
                "cannot remove a running container".to_string(),
            ));
        }
        state.containers.remove(id);
        state.logs.remove(id);
        Ok(())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        let mut state = self.enter(RuntimeCall::Inspect(id.to_string()))?;
        let container = state.container_mut(id)?;
        let status = if container.running { "running" } else { "exited" };
        let mut networks = serde_json::Map::new();
        networks.insert(container.spec.network.clone(), json!({}));

        Ok(ContainerDetails {
            id: id.to_string(),
            name: format!("/fake-{}", &id[id.len().saturating_sub(6)..]),
            state: json!({ "Status": status, "Running": container.running }),
            config: json!({
                "Image": container.spec.image,
                "Labels": container.spec.labels,
            }),
            image: Some(container.spec.image.clone()),
            mounts: json!(container
                .spec
                .volume_mounts
                .iter()
                .map(|m| json!({ "Type": "volume", "Name": m.source, "Destination": m.target }))
                .collect::<Vec<_>>()),
            network_settings: json!({ "Networks": networks }),
            log_path: Some(format!("/var/lib/fake/{}.log", id)),
            ..Default::default()
        })
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerRecord>, RuntimeError> {
        let state = self.enter(RuntimeCall::List(all))?;
        Ok(state
            .containers
            .iter()
            .filter(|(_, c)| all || c.running)
            .map(|(id, c)| ContainerRecord {
                id: id.clone(),
                names: vec![format!("/fake-{}", &id[id.len().saturating_sub(6)..])],
                image: c.spec.image.clone(),
                state: if c.running { "running" } else { "exited" }.to_string(),
                status: if c.running { "Up" } else { "Exited (0)" }.to_string(),
                labels: c.spec.labels.clone(),
            })
            .collect())
    }

    fn container_logs(&self, id: &str, request: &LogRequest) -> LogStream {
        let state = match self.enter(RuntimeCall::Logs(id.to_string(), request.clone())) {
            Ok(state) => state,
            Err(e) => return futures::stream::iter(vec![Err(e)]).boxed(),
        };

        let mut items: Vec<Result<Bytes, RuntimeError>> = state
            .logs
            .get(id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(Ok)
            .collect();
        if state.failures.contains(&FailPoint::LogRead) {
            items.push(Err(RuntimeError::Failed("log stream reset".to_string())));
        }

        futures::stream::iter(items).boxed()
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>, RuntimeError> {
        let state = self.enter(RuntimeCall::ListVolumes)?;
        Ok(state
            .volumes
            .iter()
            .map(|name| VolumeRecord {
                name: name.clone(),
                mountpoint: Some(format!("/var/lib/fake/volumes/{}/_data", name)),
            })
            .collect())
    }

    async fn remove_volume(&self, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.enter(RuntimeCall::RemoveVolume(name.to_string()))?;
        let in_use = state
            .containers
            .values()
            .any(|c| c.spec.volume_mounts.iter().any(|m| m.source == name));
        if in_use {
            return Err(RuntimeError::Failed(format!("volume {} is in use", name)));
        }
        if !state.volumes.remove(name) {
            return Err(RuntimeError::NotFound(format!("no such volume: {}", name)));
        }
        Ok(())
    }
}
