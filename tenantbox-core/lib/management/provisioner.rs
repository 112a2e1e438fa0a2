//! Tenant provisioning.
//!
//! A launch turns one request into a consistent set of runtime objects keyed by a freshly minted
//! tenant id: a container from the template image, its routing labels, a named data volume and
//! an attachment to the network shared with the reverse proxy. The container is created and then
//! started in two separate runtime calls. If the start fails, the container and its volume are
//! removed again on a best-effort basis unless rollback has been disabled. The same removal is
//! spawned in the background when the launch is cancelled between the two calls, for example
//! because the request deadline expired or the client went away.

use std::sync::Arc;

use chrono::Utc;
use getset::Getters;
use serde::{Deserialize, Serialize};
use tenantbox_utils::TENANT_DATA_MOUNT_PATH;

use crate::{
    catalog::{Template, TemplateCatalog},
    identity::{RoutingScheme, TenantBlueprint, TenantId},
    management::{TenantRecord, TenantRegistry},
    runtime::{ContainerRuntime, ContainerSpec, VolumeMount},
    TenantboxError, TenantboxResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A request to launch a tenant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LaunchRequest {
    /// The id of the template to launch. Unknown or missing ids select the first template.
    #[serde(default)]
    pub template: Option<String>,
}

/// The result of a successful launch.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchedTenant {
    /// A human readable confirmation.
    pub message: String,

    /// The id of the new container.
    pub container_id: String,

    /// The template that was launched.
    pub template: Template,

    /// The id of the new tenant.
    pub tenant_id: TenantId,

    /// The URL the tenant is reachable under.
    pub url: String,
}

/// Launches tenants.
#[derive(Clone, Getters)]
#[getset(get = "pub with_prefix")]
pub struct Provisioner {
    /// The container runtime.
    #[getset(skip)]
    runtime: Arc<dyn ContainerRuntime>,

    /// The templates that can be launched.
    catalog: Arc<TemplateCatalog>,

    /// How tenants are published.
    scheme: RoutingScheme,

    /// The pre-existing network shared with the reverse proxy.
    network: String,

    /// The registry launched tenants are recorded in.
    registry: Arc<TenantRegistry>,

    /// Whether a container that fails to start is removed again.
    rollback: bool,
}

/// Removes a created container and its volume when dropped while still armed.
struct StartGuard {
    runtime: Arc<dyn ContainerRuntime>,
    container_id: String,
    volume_name: String,
    armed: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Provisioner {
    /// Creates a new provisioner.
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        catalog: Arc<TemplateCatalog>,
        scheme: RoutingScheme,
        network: impl Into<String>,
        registry: Arc<TenantRegistry>,
    ) -> Self {
        Self {
            runtime,
            catalog,
            scheme,
            network: network.into(),
            registry,
            rollback: true,
        }
    }

    /// Sets whether a container that fails to start is removed again.
    pub fn with_rollback(mut self, rollback: bool) -> Self {
        self.rollback = rollback;
        self
    }

    /// Launches a tenant.
    ///
    /// ## Errors
    ///
    /// - [`TenantboxError::ImageNotFound`] if the template's image is not in the local store
    /// - [`TenantboxError::RuntimeOperationFailed`] if creating or starting the container fails
    /// - [`TenantboxError::RuntimeUnavailable`] if the runtime cannot be reached
    pub async fn launch(&self, request: &LaunchRequest) -> TenantboxResult<LaunchedTenant> {
        let template = self.catalog.resolve(request.template.as_deref()).clone();

        // Advisory only: the image can still disappear before the create call.
        let image = template.get_image();
        let image_present = self
            .runtime
            .image_exists(image)
            .await
            .map_err(|e| TenantboxError::runtime("inspect image", e))?;
        if !image_present {
            return Err(TenantboxError::ImageNotFound {
                image: image.clone(),
                template: template.get_name().clone(),
            });
        }

        let blueprint = TenantBlueprint::build(&self.scheme, &template);
        let spec = self.container_spec(&template, &blueprint);
        let tenant_id = blueprint.get_tenant_id().clone();

        tracing::debug!(
            "creating container for tenant {} from {}",
            tenant_id,
            spec.image
        );
        let container_id = self
            .runtime
            .create_container(&spec)
            .await
            .map_err(|e| TenantboxError::runtime("create container", e))?;

        let guard = self.rollback.then(|| StartGuard {
            runtime: self.runtime.clone(),
            container_id: container_id.clone(),
            volume_name: blueprint.get_volume_name().clone(),
            armed: true,
        });
        let started = self.runtime.start_container(&container_id).await;
        if let Some(guard) = guard {
            guard.disarm();
        }

        if let Err(e) = started {
            tracing::error!(
                "failed to start container {} for tenant {}: {}",
                container_id,
                tenant_id,
                e
            );
            if self.rollback {
                roll_back(
                    self.runtime.as_ref(),
                    &container_id,
                    blueprint.get_volume_name(),
                )
                .await;
            }
            return Err(TenantboxError::runtime("start container", e));
        }

        self.registry.record(TenantRecord {
            tenant_id: tenant_id.clone(),
            container_id: container_id.clone(),
            template_id: template.get_id().clone(),
            created_at: Utc::now(),
        });

        tracing::info!(
            "launched tenant {} ({}) in container {}",
            tenant_id,
            template.get_id(),
            container_id
        );

        Ok(LaunchedTenant {
            message: format!("{} container launched!", template.get_name()),
            container_id,
            url: self.scheme.tenant_url(tenant_id.as_str()),
            tenant_id,
            template,
        })
    }

    fn container_spec(&self, template: &Template, blueprint: &TenantBlueprint) -> ContainerSpec {
        ContainerSpec {
            image: template.get_image().clone(),
            exposed_port: format!("{}/tcp", template.get_port()),
            labels: blueprint
                .get_labels()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            volume_mounts: vec![VolumeMount {
                source: blueprint.get_volume_name().clone(),
                target: TENANT_DATA_MOUNT_PATH.to_string(),
            }],
            network: self.network.clone(),
        }
    }
}

impl StartGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Drop for StartGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                "launch cancelled outside a runtime, container {} is left behind",
                self.container_id
            );
            return;
        };

        tracing::warn!(
            "launch cancelled before container {} started, rolling back",
            self.container_id
        );
        let runtime = self.runtime.clone();
        let container_id = std::mem::take(&mut self.container_id);
        let volume_name = std::mem::take(&mut self.volume_name);
        handle.spawn(async move {
            roll_back(runtime.as_ref(), &container_id, &volume_name).await;
        });
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Removes a container that was created but never started, then its volume.
async fn roll_back(runtime: &dyn ContainerRuntime, container_id: &str, volume_name: &str) {
    if let Err(e) = runtime.remove_container(container_id, true).await {
        tracing::warn!(
            "rollback: failed to remove container {}: {}",
            container_id,
            e
        );
        // The volume is still attached to the container.
        return;
    }

    if let Err(e) = runtime.remove_volume(volume_name).await {
        tracing::warn!("rollback: failed to remove volume {}: {}", volume_name, e);
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
