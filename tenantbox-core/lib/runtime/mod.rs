//! The seam between tenantbox and the container runtime.
//!
//! [`ContainerRuntime`] covers exactly the container, image and volume calls the orchestrator
//! makes. [`DockerRuntime`] implements it against the Docker Engine API; tests substitute a
//! recording fake.

mod docker;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use std::{collections::HashMap, pin::Pin};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use docker::*;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A stream of raw log chunks as delivered by the runtime.
pub type LogStream = Pin<Box<dyn Stream<Item = Result<Bytes, RuntimeError>> + Send>>;

/// An error reported by the container runtime.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// The object the call referred to does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The runtime could not be reached.
    #[error("{0}")]
    Unavailable(String),

    /// The runtime rejected the call.
    #[error("{0}")]
    Failed(String),
}

/// A named volume mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    /// Volume name.
    pub source: String,

    /// Mount path inside the container.
    pub target: String,
}

/// Everything needed to create a tenant container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Image reference.
    pub image: String,

    /// Exposed port in `<port>/<proto>` form.
    pub exposed_port: String,

    /// Labels attached to the container.
    pub labels: HashMap<String, String>,

    /// Named volumes to mount.
    pub volume_mounts: Vec<VolumeMount>,

    /// Pre-existing network to attach the container to.
    pub network: String,
}

/// A container as it appears in a runtime listing.
#[derive(Debug, Clone, Default)]
pub struct ContainerRecord {
    /// Full container id.
    pub id: String,

    /// Container names, each with the runtime's leading slash.
    pub names: Vec<String>,

    /// Image reference the container was created from.
    pub image: String,

    /// Run state, e.g. `running` or `exited`.
    pub state: String,

    /// Human readable status, e.g. `Up 5 minutes`.
    pub status: String,

    /// Labels attached to the container.
    pub labels: HashMap<String, String>,
}

/// A normalized projection of a container's inspect data.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContainerDetails {
    /// Full container id.
    pub id: String,

    /// Human readable name.
    pub name: String,

    /// Run state as reported by the runtime.
    pub state: Value,

    /// Creation-time configuration (image, labels, exposed ports, env).
    pub config: Value,

    /// Creation timestamp.
    pub created: Option<String>,

    /// Entrypoint path.
    pub path: Option<String>,

    /// Entrypoint arguments.
    pub args: Vec<String>,

    /// Image id.
    pub image: Option<String>,

    /// Platform the container runs on.
    pub platform: Option<String>,

    /// SELinux mount label.
    pub mount_label: Option<String>,

    /// SELinux process label.
    pub process_label: Option<String>,

    /// Number of restarts.
    pub restart_count: i64,

    /// Storage driver.
    pub driver: Option<String>,

    /// Mounted volumes and binds.
    pub mounts: Value,

    /// Network attachment details.
    pub network_settings: Value,

    /// Path of the runtime's log file for the container.
    pub log_path: Option<String>,
}

/// Options for a log request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRequest {
    /// Include standard output.
    pub stdout: bool,

    /// Include standard error.
    pub stderr: bool,

    /// Prefix every line with its timestamp.
    pub timestamps: bool,

    /// Only return this many trailing lines.
    pub tail: usize,
}

/// A named volume as it appears in a runtime listing.
#[derive(Debug, Clone, Default)]
pub struct VolumeRecord {
    /// Volume name.
    pub name: String,

    /// Where the volume lives on the host.
    pub mountpoint: Option<String>,
}

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// The container runtime operations tenantbox depends on.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Verifies that the runtime is reachable.
    async fn ping(&self) -> Result<(), RuntimeError>;

    /// Returns whether `image` is present in the local image store.
    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError>;

    /// Creates a container and returns its id.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    /// Starts a created or stopped container.
    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Stops a container, killing it after `grace_secs`.
    async fn stop_container(&self, id: &str, grace_secs: u32) -> Result<(), RuntimeError>;

    /// Restarts a container, killing it after `grace_secs` if it does not stop.
    async fn restart_container(&self, id: &str, grace_secs: u32) -> Result<(), RuntimeError>;

    /// Removes a container. Named volumes are left in place.
    async fn remove_container(&self, id: &str, force: bool) -> Result<(), RuntimeError>;

    /// Returns the inspect data of a container.
    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError>;

    /// Lists containers; with `all` set, stopped containers are included.
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerRecord>, RuntimeError>;

    /// Opens the log stream of a container.
    fn container_logs(&self, id: &str, request: &LogRequest) -> LogStream;

    /// Lists named volumes.
    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>, RuntimeError>;

    /// Removes a named volume.
    async fn remove_volume(&self, name: &str) -> Result<(), RuntimeError>;
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ContainerRecord {
    /// The 12 character short form of the container id.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(12) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}

impl ContainerDetails {
    /// Whether the runtime reports the container as running.
    pub fn is_running(&self) -> bool {
        self.state
            .get("Running")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

impl Default for LogRequest {
    fn default() -> Self {
        Self {
            stdout: true,
            stderr: true,
            timestamps: true,
            tail: tenantbox_utils::LOG_TAIL_LINES,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
