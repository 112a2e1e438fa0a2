//! Tenant discovery.
//!
//! A listing walks every container on the host and keeps the tenant containers among them.
//! Tenants launched by this process are identified through the registry. Any other container is
//! a tenant only if it carries a router label written by tenantbox, which is how tenants survive
//! a restart of the server. Containers without either belong to someone else and are skipped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tenantbox_utils::{TEMPLATE_ID_LABEL, TEMPLATE_NAME_LABEL, TENANT_VOLUME_PREFIX};

use crate::{
    identity::RoutingScheme,
    management::TenantRegistry,
    runtime::{ContainerRecord, ContainerRuntime},
    TenantboxError, TenantboxResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A tenant as reconstructed from its container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantDescriptor {
    /// The 12 character short container id.
    pub id: String,

    /// The full container id.
    pub full_id: String,

    /// The image the container runs.
    pub image: String,

    /// The run state, e.g. `running`.
    pub state: String,

    /// The human readable status, e.g. `Up 3 minutes`.
    pub status: String,

    /// The container names.
    pub names: Vec<String>,

    /// The URL the tenant is reachable under, empty if the tenant id could not be recovered.
    pub url: String,

    /// The tenant id.
    pub tenant_id: String,

    /// The id of the template the tenant was launched from.
    pub template_id: String,

    /// The name of the template the tenant was launched from.
    pub template_name: String,

    /// When the tenant was launched, if it was launched by this server process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A tenant data volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantVolume {
    /// The volume name.
    pub name: String,

    /// The tenant id the volume belongs to.
    pub tenant_id: String,

    /// Where the volume lives on the host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mountpoint: Option<String>,
}

/// Rebuilds the tenant list from the container runtime.
#[derive(Clone)]
pub struct Discovery {
    runtime: Arc<dyn ContainerRuntime>,
    scheme: RoutingScheme,
    registry: Arc<TenantRegistry>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Discovery {
    /// Creates a new discovery.
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        scheme: RoutingScheme,
        registry: Arc<TenantRegistry>,
    ) -> Self {
        Self {
            runtime,
            scheme,
            registry,
        }
    }

    /// Lists every tenant container, running or not, in the runtime's listing order.
    ///
    /// Registry records whose container is gone are dropped along the way.
    pub async fn list(&self) -> TenantboxResult<Vec<TenantDescriptor>> {
        let containers = self
            .runtime
            .list_containers(true)
            .await
            .map_err(|e| TenantboxError::runtime("list containers", e))?;

        let dropped = self
            .registry
            .retain_containers(containers.iter().map(|c| c.id.as_str()));
        if dropped > 0 {
            tracing::debug!("dropped {} stale tenant records", dropped);
        }

        Ok(containers
            .into_iter()
            .filter_map(|c| self.describe(c))
            .collect())
    }

    /// Lists the tenant data volumes on the host, including those of deleted tenants.
    pub async fn list_volumes(&self) -> TenantboxResult<Vec<TenantVolume>> {
        let volumes = self
            .runtime
            .list_volumes()
            .await
            .map_err(|e| TenantboxError::runtime("list volumes", e))?;

        Ok(volumes
            .into_iter()
            .filter_map(|v| {
                let tenant_id = v.name.strip_prefix(TENANT_VOLUME_PREFIX)?.to_string();
                Some(TenantVolume {
                    name: v.name,
                    tenant_id,
                    mountpoint: v.mountpoint,
                })
            })
            .collect())
    }

    /// Builds the descriptor of a container, or `None` if it is not a tenant container.
    ///
    /// Containers known to the registry are described from their record. Any other container
    /// counts as a tenant only if it carries a router label under the configured domain.
    fn describe(&self, container: ContainerRecord) -> Option<TenantDescriptor> {
        let label = |key: &str| container.labels.get(key).cloned().unwrap_or_default();

        let (tenant_id, template_id, created_at) =
            match self.registry.find_by_container(&container.id) {
                Some(record) => (
                    record.tenant_id.to_string(),
                    record.template_id,
                    Some(record.created_at),
                ),
                None => {
                    let tenant_id = container
                        .labels
                        .iter()
                        .find_map(|(k, v)| self.scheme.tenant_from_router_label(k, v))?
                        .to_string();
                    (tenant_id, label(TEMPLATE_ID_LABEL), None)
                }
            };
        let template_name = label(TEMPLATE_NAME_LABEL);

        let url = if tenant_id.is_empty() {
            String::new()
        } else {
            self.scheme.tenant_url(&tenant_id)
        };

        Some(TenantDescriptor {
            id: container.short_id().to_string(),
            full_id: container.id,
            image: container.image,
            state: container.state,
            status: container.status,
            names: container.names,
            url,
            tenant_id,
            template_id,
            template_name,
            created_at,
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::{
        catalog::TemplateCatalog,
        management::{
            ContainerAction, LaunchRequest, LifecycleController, Provisioner, TenantRecord,
        },
        runtime::fake::FakeRuntime,
    };

    use super::*;

    struct Harness {
        runtime: FakeRuntime,
        provisioner: Provisioner,
        controller: LifecycleController,
        discovery: Discovery,
        registry: Arc<TenantRegistry>,
    }

    fn harness() -> Harness {
        let runtime = FakeRuntime::with_images(["app_template:latest", "note_template:latest"]);
        let shared: Arc<dyn ContainerRuntime> = Arc::new(runtime.clone());
        let registry = Arc::new(TenantRegistry::new());
        let scheme = RoutingScheme::default();

        Harness {
            provisioner: Provisioner::new(
                shared.clone(),
                Arc::new(TemplateCatalog::builtin()),
                scheme.clone(),
                "dev_container_default",
                registry.clone(),
            ),
            controller: LifecycleController::new(shared.clone(), registry.clone()),
            discovery: Discovery::new(shared, scheme, registry.clone()),
            registry,
            runtime,
        }
    }

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test_log::test(tokio::test)]
    async fn test_list_includes_launched_and_excludes_foreign() -> TenantboxResult<()> {
        let h = harness();
        h.runtime
            .add_foreign_container("db", "postgres:16", labels(&[("com.example.role", "db")]));
        h.runtime.add_foreign_container(
            "other-proxy",
            "whoami",
            labels(&[("traefik.http.routers.whoami.rule", "Host(`whoami.example.com`)")]),
        );

        let launched = h
            .provisioner
            .launch(&LaunchRequest {
                template: Some("note_template".into()),
            })
            .await?;

        let tenants = h.discovery.list().await?;
        assert_eq!(tenants.len(), 1);

        let tenant = &tenants[0];
        assert_eq!(tenant.full_id, launched.container_id);
        assert_eq!(tenant.id.len(), 12);
        assert_eq!(tenant.tenant_id, launched.tenant_id.as_str());
        assert_eq!(tenant.url, launched.url);
        assert_eq!(tenant.template_id, "note_template");
        assert_eq!(tenant.template_name, "Notes App");
        assert_eq!(tenant.state, "running");
        assert!(tenant.created_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_recovers_tenants_unknown_to_registry() -> TenantboxResult<()> {
        let h = harness();
        h.runtime.add_foreign_container(
            "abcdef0123456789",
            "app_template:latest",
            labels(&[
                ("traefik.enable", "true"),
                ("traefik.http.routers.t-42.rule", "Host(`t-42.localhost`)"),
            ]),
        );

        let tenants = h.discovery.list().await?;
        assert_eq!(tenants.len(), 1);
        assert_eq!(tenants[0].tenant_id, "t-42");
        assert_eq!(tenants[0].url, "http://t-42.localhost");
        assert_eq!(tenants[0].template_id, "");
        assert_eq!(tenants[0].created_at, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_prefers_registry_record_over_labels() -> TenantboxResult<()> {
        let h = harness();
        h.runtime.add_foreign_container(
            "0123456789abcdef",
            "app_template:latest",
            labels(&[("template.name", "Basic Web App")]),
        );
        h.registry.record(TenantRecord {
            tenant_id: "t-7".into(),
            container_id: "0123456789abcdef".to_string(),
            template_id: "app_template".to_string(),
            created_at: Utc::now(),
        });

        let tenants = h.discovery.list().await?;
        assert_eq!(tenants.len(), 1);
        assert_eq!(tenants[0].tenant_id, "t-7");
        assert_eq!(tenants[0].url, "http://t-7.localhost");
        assert_eq!(tenants[0].template_id, "app_template");
        assert_eq!(tenants[0].template_name, "Basic Web App");
        assert!(tenants[0].created_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_includes_stopped_tenants_and_prunes_registry() -> TenantboxResult<()> {
        let h = harness();
        let a = h.provisioner.launch(&LaunchRequest::default()).await?;
        let b = h.provisioner.launch(&LaunchRequest::default()).await?;

        h.controller
            .control(&a.container_id, ContainerAction::Stop)
            .await?;

        // Removed behind tenantbox's back
        h.runtime
            .remove_container(&b.container_id, true)
            .await
            .map_err(|e| TenantboxError::runtime("remove container", e))?;

        let tenants = h.discovery.list().await?;
        assert_eq!(tenants.len(), 1);
        assert_eq!(tenants[0].state, "exited");
        assert_eq!(h.registry.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_keeps_volume() -> TenantboxResult<()> {
        let h = harness();
        let launched = h.provisioner.launch(&LaunchRequest::default()).await?;

        h.controller.delete(&launched.container_id).await?;

        assert!(h.discovery.list().await?.is_empty());
        assert!(h.registry.is_empty());

        let volumes = h.discovery.list_volumes().await?;
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].tenant_id, launched.tenant_id.as_str());
        assert_eq!(
            volumes[0].name,
            format!("tenant_data_{}", launched.tenant_id)
        );
        Ok(())
    }
}
