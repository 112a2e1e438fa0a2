//! Default values and naming conventions shared by the orchestrator crates.
//!
//! Everything that forms part of the contract with the reverse proxy or with the
//! tenant images (label layout, volume naming, mount path) lives here so that the
//! builder that writes the metadata and the discovery code that reads it back
//! agree on a single definition.

//--------------------------------------------------------------------------------------------------
// Constants: Server
//--------------------------------------------------------------------------------------------------

/// The default host the API server binds to.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// The default port the API server listens on.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// The default server-side ceiling for a single request, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

//--------------------------------------------------------------------------------------------------
// Constants: Routing
//--------------------------------------------------------------------------------------------------

/// The default label namespace understood by the reverse proxy.
pub const DEFAULT_LABEL_NAMESPACE: &str = "traefik";

/// The default suffix domain tenants are published under.
pub const DEFAULT_SUFFIX_DOMAIN: &str = "localhost";

/// The default pre-existing network shared with the reverse proxy.
pub const DEFAULT_SHARED_NETWORK: &str = "dev_container_default";

/// Label carrying the id of the template a tenant was launched from.
pub const TEMPLATE_ID_LABEL: &str = "template.id";

/// Label carrying the display name of the template a tenant was launched from.
pub const TEMPLATE_NAME_LABEL: &str = "template.name";

//--------------------------------------------------------------------------------------------------
// Constants: Isolation
//--------------------------------------------------------------------------------------------------

/// Prefix of every tenant data volume. The tenant id is appended verbatim.
pub const TENANT_VOLUME_PREFIX: &str = "tenant_data_";

/// Path inside the tenant container where the data volume is mounted.
pub const TENANT_DATA_MOUNT_PATH: &str = "/app/data";

//--------------------------------------------------------------------------------------------------
// Constants: Lifecycle
//--------------------------------------------------------------------------------------------------

/// Seconds a container is given to shut down gracefully on stop and restart.
pub const STOP_GRACE_PERIOD_SECS: u32 = 10;

/// Number of trailing log lines requested from the runtime.
pub const LOG_TAIL_LINES: usize = 100;

/// Maximum number of log bytes captured for a single logs request.
pub const LOG_CAPTURE_LIMIT: usize = 8192;

/// Returned in place of an empty log capture.
pub const NO_LOGS_SENTINEL: &str = "No logs available";
