//! Arguments of the `tenantboxd` server binary.
//!
//! Every option can also be set through a `TENANTBOX_*` environment variable, which a `.env` file
//! in the working directory may provide.

use std::path::PathBuf;

use clap::Parser;
use tenantbox_utils::{
    DEFAULT_LABEL_NAMESPACE, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVER_HOST,
    DEFAULT_SERVER_PORT, DEFAULT_SHARED_NETWORK, DEFAULT_SUFFIX_DOMAIN, TENANTBOX_DOMAIN_ENV_VAR,
    TENANTBOX_HOST_ENV_VAR, TENANTBOX_LABEL_NAMESPACE_ENV_VAR, TENANTBOX_NETWORK_ENV_VAR,
    TENANTBOX_PORT_ENV_VAR, TENANTBOX_REQUEST_TIMEOUT_ENV_VAR, TENANTBOX_TEMPLATES_ENV_VAR,
};

use crate::styles;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Arguments for the tenantboxd command
#[derive(Debug, Parser)]
#[command(name = "tenantboxd", author, version, about, styles=styles::styles())]
pub struct TenantboxdArgs {
    /// Address to listen on
    #[arg(long, env = TENANTBOX_HOST_ENV_VAR, default_value = DEFAULT_SERVER_HOST)]
    pub host: String,

    /// Port number to listen on
    #[arg(long, env = TENANTBOX_PORT_ENV_VAR, default_value_t = DEFAULT_SERVER_PORT)]
    pub port: u16,

    /// Domain tenant subdomains are published under
    #[arg(long, env = TENANTBOX_DOMAIN_ENV_VAR, default_value = DEFAULT_SUFFIX_DOMAIN)]
    pub domain: String,

    /// Pre-existing network shared with the reverse proxy
    #[arg(long, env = TENANTBOX_NETWORK_ENV_VAR, default_value = DEFAULT_SHARED_NETWORK)]
    pub network: String,

    /// Label namespace the reverse proxy reads routing labels from
    #[arg(long, env = TENANTBOX_LABEL_NAMESPACE_ENV_VAR, default_value = DEFAULT_LABEL_NAMESPACE)]
    pub label_namespace: String,

    /// YAML file replacing the built-in templates
    #[arg(long, env = TENANTBOX_TEMPLATES_ENV_VAR)]
    pub templates: Option<PathBuf>,

    /// Seconds a request may take before it is answered with 504
    #[arg(long, env = TENANTBOX_REQUEST_TIMEOUT_ENV_VAR, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout: u64,

    /// Leave containers that fail to start in place instead of removing them
    #[arg(long, default_value_t = false)]
    pub no_launch_rollback: bool,
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
