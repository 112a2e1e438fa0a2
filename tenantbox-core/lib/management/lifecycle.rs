//! Lifecycle control of existing tenant containers.
//!
//! Every operation takes a container id from the caller and checks that the container exists
//! before acting on it, so that a missing container is reported as such instead of as a generic
//! runtime failure.

use std::{fmt, str::FromStr, sync::Arc};

use futures::StreamExt;
use serde::Serialize;
use tenantbox_utils::{LOG_CAPTURE_LIMIT, NO_LOGS_SENTINEL, STOP_GRACE_PERIOD_SECS};

use crate::{
    management::TenantRegistry,
    runtime::{ContainerDetails, ContainerRuntime, LogRequest, LogStream},
    TenantboxError, TenantboxResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// An action that can be applied to a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerAction {
    /// Start a stopped container.
    Start,

    /// Stop a running container.
    Stop,

    /// Stop and start a container.
    Restart,
}

/// The result of a control action.
#[derive(Debug, Clone, Serialize)]
pub struct ControlOutcome {
    /// A human readable confirmation.
    pub message: String,

    /// The container the action was applied to.
    pub container_id: String,

    /// The action that was applied.
    pub action: ContainerAction,
}

/// The result of a delete.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    /// A human readable confirmation.
    pub message: String,

    /// The container that was removed.
    pub container_id: String,

    /// Set when the graceful stop failed and the container was removed by force.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Controls existing containers.
#[derive(Clone)]
pub struct LifecycleController {
    runtime: Arc<dyn ContainerRuntime>,
    registry: Arc<TenantRegistry>,
    log_limit: usize,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ContainerAction {
    /// The lowercase name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

impl LifecycleController {
    /// Creates a new controller.
    pub fn new(runtime: Arc<dyn ContainerRuntime>, registry: Arc<TenantRegistry>) -> Self {
        Self {
            runtime,
            registry,
            log_limit: LOG_CAPTURE_LIMIT,
        }
    }

    /// Applies `action` to the container `id`.
    ///
    /// Stop and restart give the container a fixed grace period before it is killed.
    pub async fn control(
        &self,
        id: &str,
        action: ContainerAction,
    ) -> TenantboxResult<ControlOutcome> {
        self.ensure_exists(id).await?;

        let result = match action {
            ContainerAction::Start => self.runtime.start_container(id).await,
            ContainerAction::Stop => {
                self.runtime
                    .stop_container(id, STOP_GRACE_PERIOD_SECS)
                    .await
            }
            ContainerAction::Restart => {
                self.runtime
                    .restart_container(id, STOP_GRACE_PERIOD_SECS)
                    .await
            }
        };
        result.map_err(|e| TenantboxError::runtime(&format!("{} container", action), e))?;

        tracing::info!("container {} {}", id, past_tense(action));

        Ok(ControlOutcome {
            message: format!("Container {} successfully", past_tense(action)),
            container_id: id.to_string(),
            action,
        })
    }

    /// Parses `action` and applies it to the container `id`.
    ///
    /// An unknown action is rejected before the runtime is contacted.
    pub async fn control_str(&self, id: &str, action: &str) -> TenantboxResult<ControlOutcome> {
        require_id(id)?;
        let action = action.parse::<ContainerAction>()?;
        self.control(id, action).await
    }

    /// Stops and removes the container `id`. Its data volume is left in place.
    ///
    /// A failing stop (typically because the container is not running) does not abort the
    /// delete; the container is removed by force and the failure is reported as a warning.
    pub async fn delete(&self, id: &str) -> TenantboxResult<DeleteOutcome> {
        let details = self.inspect(id).await?;
        // The caller may pass a short id; the registry is keyed by the full one.
        let full_id = if details.id.is_empty() {
            id
        } else {
            details.id.as_str()
        };

        let warning = match self
            .runtime
            .stop_container(id, STOP_GRACE_PERIOD_SECS)
            .await
        {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("failed to stop container {}: {}", id, e);
                Some(format!("Failed to stop container gracefully: {}", e))
            }
        };

        self.runtime
            .remove_container(id, true)
            .await
            .map_err(|e| TenantboxError::runtime("remove container", e))?;

        match self.registry.evict_container(full_id) {
            Some(record) => {
                tracing::info!("deleted tenant {} (container {})", record.tenant_id, full_id)
            }
            None => tracing::info!("deleted container {}", full_id),
        }

        Ok(DeleteOutcome {
            message: "Container deleted successfully".to_string(),
            container_id: id.to_string(),
            warning,
        })
    }

    /// Returns the inspect data of the container `id`.
    pub async fn inspect(&self, id: &str) -> TenantboxResult<ContainerDetails> {
        require_id(id)?;
        self.runtime
            .inspect_container(id)
            .await
            .map_err(|e| TenantboxError::lookup(id, e))
    }

    /// Returns the most recent output of the container `id` as one text blob.
    ///
    /// At most the last 100 lines of standard output and error, with timestamps, are requested
    /// and at most 8 KiB of them are kept. An empty capture is reported as
    /// `"No logs available"`.
    pub async fn logs(&self, id: &str) -> TenantboxResult<String> {
        self.ensure_exists(id).await?;

        let stream = self.runtime.container_logs(id, &LogRequest::default());
        let captured = capture_logs(stream, self.log_limit).await?;

        if captured.is_empty() {
            return Ok(NO_LOGS_SENTINEL.to_string());
        }

        Ok(String::from_utf8_lossy(&captured).into_owned())
    }

    async fn ensure_exists(&self, id: &str) -> TenantboxResult<()> {
        self.inspect(id).await.map(|_| ())
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn require_id(id: &str) -> TenantboxResult<()> {
    if id.trim().is_empty() {
        return Err(TenantboxError::InvalidRequest(
            "Container ID is required".to_string(),
        ));
    }
    Ok(())
}

fn past_tense(action: ContainerAction) -> &'static str {
    match action {
        ContainerAction::Start => "started",
        ContainerAction::Stop => "stopped",
        ContainerAction::Restart => "restarted",
    }
}

/// Reads from `stream` until it ends or `limit` bytes have been captured.
///
/// A read error after some output was captured ends the capture early; a read error before any
/// output is returned to the caller.
async fn capture_logs(mut stream: LogStream, limit: usize) -> TenantboxResult<Vec<u8>> {
    let mut captured = Vec::with_capacity(limit.min(4096));

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) if captured.is_empty() => {
                return Err(TenantboxError::runtime("read logs", e));
            }
            Err(e) => {
                tracing::warn!("log stream ended early: {}", e);
                break;
            }
        };

        let room = limit - captured.len();
        if chunk.len() >= room {
            captured.extend_from_slice(&chunk[..room]);
            tracing::debug!("log capture truncated at {} bytes", limit);
            break;
        }
        captured.extend_from_slice(&chunk);
    }

    Ok(captured)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl FromStr for ContainerAction {
    type Err = TenantboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            _ => Err(TenantboxError::InvalidRequest(
                "Invalid action. Use start, stop, or restart".to_string(),
            )),
        }
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
