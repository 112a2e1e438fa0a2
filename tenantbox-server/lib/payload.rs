//! Request and response payload definitions for the tenantbox server.
//!
//! Launch, control and delete responses reuse the outcome types of `tenantbox_core` directly.
//! The wrappers here only add the envelope the HTTP API puts around lists and container reads.

use serde::Serialize;
use tenantbox_core::{
    catalog::Template,
    management::{TenantDescriptor, TenantVolume},
    runtime::ContainerDetails,
};

//--------------------------------------------------------------------------------------------------
// Types: REST API Responses
//--------------------------------------------------------------------------------------------------

/// Response carrying a plain message
#[derive(Debug, Serialize)]
pub struct RegularMessageResponse {
    /// Message indicating the status of the operation
    pub message: String,
}

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human readable error message
    pub error: String,
}

/// Response for the tenant listing
#[derive(Debug, Serialize)]
pub struct ContainerListResponse {
    /// Every tenant container, running or not
    pub containers: Vec<TenantDescriptor>,
}

/// Response for the template listing
#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    /// The templates in catalog order
    pub templates: Vec<Template>,
}

/// Response for the tenant volume listing
#[derive(Debug, Serialize)]
pub struct VolumeListResponse {
    /// Every tenant data volume on the host
    pub volumes: Vec<TenantVolume>,
}

/// Response carrying the recent log output of a container
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    /// The captured log text
    pub logs: String,

    /// The container the logs were read from
    pub container_id: String,
}

/// Response carrying the inspection data of a container
#[derive(Debug, Serialize)]
pub struct InspectResponse {
    /// The runtime's inspection data
    pub details: ContainerDetails,

    /// The container that was inspected
    pub container_id: String,
}
