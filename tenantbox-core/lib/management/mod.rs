//! Tenant management for tenantbox.
//!
//! This module holds the operations behind the HTTP API:
//! - [`Provisioner`]: launch a tenant from a template
//! - [`LifecycleController`]: start, stop, restart, delete, inspect and read logs of a container
//! - [`Discovery`]: rebuild the tenant list from container metadata
//! - [`TenantRegistry`]: the in-process index of tenants launched by this server

mod discovery;
mod lifecycle;
mod provisioner;
mod registry;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use discovery::*;
pub use lifecycle::*;
pub use provisioner::*;
pub use registry::*;
