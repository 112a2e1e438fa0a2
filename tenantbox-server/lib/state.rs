//! Application state for the tenantbox server.
//!
//! The state is built once at startup and cloned into every request. It holds no locks of its
//! own: the catalog is read-only and the only mutable piece, the tenant registry, guards itself.

use std::sync::Arc;

use getset::Getters;
use tenantbox_core::{
    catalog::TemplateCatalog,
    management::{Discovery, LifecycleController, Provisioner, TenantRegistry},
    runtime::ContainerRuntime,
};

use crate::config::Config;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Application state structure
#[derive(Clone, Getters)]
#[getset(get = "pub with_prefix")]
pub struct AppState {
    /// The application configuration
    config: Arc<Config>,

    /// The templates that can be launched
    catalog: Arc<TemplateCatalog>,

    /// Launches tenants
    provisioner: Arc<Provisioner>,

    /// Controls existing tenant containers
    controller: Arc<LifecycleController>,

    /// Lists tenants and their volumes
    discovery: Arc<Discovery>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl AppState {
    /// Create a new application state instance
    pub fn new(
        config: Arc<Config>,
        runtime: Arc<dyn ContainerRuntime>,
        catalog: Arc<TemplateCatalog>,
    ) -> Self {
        let registry = Arc::new(TenantRegistry::new());
        let scheme = config.get_scheme().clone();

        let provisioner = Provisioner::new(
            runtime.clone(),
            catalog.clone(),
            scheme.clone(),
            config.get_network().clone(),
            registry.clone(),
        )
        .with_rollback(*config.get_launch_rollback());

        let controller = LifecycleController::new(runtime.clone(), registry.clone());
        let discovery = Discovery::new(runtime, scheme, registry);

        Self {
            config,
            catalog,
            provisioner: Arc::new(provisioner),
            controller: Arc::new(controller),
            discovery: Arc::new(discovery),
        }
    }
}
