//! Environment variable names recognised by the tenantbox binaries.

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Environment variable for the address the server binds to
pub const TENANTBOX_HOST_ENV_VAR: &str = "TENANTBOX_HOST";

/// Environment variable for the port the server listens on
pub const TENANTBOX_PORT_ENV_VAR: &str = "TENANTBOX_PORT";

/// Environment variable for the suffix domain tenants are published under
pub const TENANTBOX_DOMAIN_ENV_VAR: &str = "TENANTBOX_DOMAIN";

/// Environment variable for the shared proxy network
pub const TENANTBOX_NETWORK_ENV_VAR: &str = "TENANTBOX_NETWORK";

/// Environment variable for the reverse proxy label namespace
pub const TENANTBOX_LABEL_NAMESPACE_ENV_VAR: &str = "TENANTBOX_LABEL_NAMESPACE";

/// Environment variable for a YAML file overriding the built-in templates
pub const TENANTBOX_TEMPLATES_ENV_VAR: &str = "TENANTBOX_TEMPLATES";

/// Environment variable for the per-request deadline in seconds
pub const TENANTBOX_REQUEST_TIMEOUT_ENV_VAR: &str = "TENANTBOX_REQUEST_TIMEOUT";

