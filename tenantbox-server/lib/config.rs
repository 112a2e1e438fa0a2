//! Configuration for the tenantbox server.
//!
//! A [`Config`] starts from the listen address and the defaults in `tenantbox_utils`, and is
//! refined with the `with_*` methods. Each of them validates its input, so a `Config` that was
//! built without error is usable as is.

use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use getset::Getters;
use tenantbox_core::identity::RoutingScheme;
use tenantbox_utils::{
    DEFAULT_LABEL_NAMESPACE, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SHARED_NETWORK,
    DEFAULT_SUFFIX_DOMAIN,
};

use crate::{ServerError, ServerResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Configuration structure that holds all the server settings
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub with_prefix")]
pub struct Config {
    /// Address to listen on
    addr: SocketAddr,

    /// How tenants are published through the reverse proxy
    scheme: RoutingScheme,

    /// The pre-existing network every tenant container joins
    network: String,

    /// YAML file to load the template catalog from, the built-in catalog if unset
    templates_file: Option<PathBuf>,

    /// Deadline for handling a single request
    request_timeout: Duration,

    /// Whether a container that fails to start is removed again
    launch_rollback: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Config {
    /// Creates a new configuration listening on `host:port`.
    pub fn new(host: &str, port: u16) -> ServerResult<Self> {
        let ip: IpAddr = host
            .parse()
            .map_err(|e| ServerError::ConfigError(format!("invalid host '{}': {}", host, e)))?;

        Ok(Self {
            addr: SocketAddr::new(ip, port),
            scheme: RoutingScheme::new(DEFAULT_LABEL_NAMESPACE, DEFAULT_SUFFIX_DOMAIN),
            network: DEFAULT_SHARED_NETWORK.to_string(),
            templates_file: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            launch_rollback: true,
        })
    }

    /// Sets the routing label namespace and the domain tenants are published under.
    pub fn with_routing(mut self, label_namespace: &str, suffix_domain: &str) -> ServerResult<Self> {
        let label_namespace = label_namespace.trim();
        if label_namespace.is_empty() {
            return Err(ServerError::ConfigError(
                "label namespace must not be empty".to_string(),
            ));
        }

        if label_namespace.contains('.') || label_namespace.contains(char::is_whitespace) {
            return Err(ServerError::ConfigError(format!(
                "label namespace '{}' must not contain dots or whitespace",
                label_namespace
            )));
        }

        let suffix_domain = suffix_domain.trim().trim_matches('.');
        if suffix_domain.is_empty() {
            return Err(ServerError::ConfigError("domain must not be empty".to_string()));
        }

        if suffix_domain.contains("://") || suffix_domain.contains(['/', '`', ' ']) {
            return Err(ServerError::ConfigError(format!(
                "domain '{}' must be a bare host name",
                suffix_domain
            )));
        }

        self.scheme = RoutingScheme::new(label_namespace, suffix_domain);
        Ok(self)
    }

    /// Sets the network tenant containers join.
    pub fn with_network(mut self, network: &str) -> ServerResult<Self> {
        let network = network.trim();
        if network.is_empty() {
            return Err(ServerError::ConfigError("network must not be empty".to_string()));
        }

        self.network = network.to_string();
        Ok(self)
    }

    /// Sets the YAML file the template catalog is loaded from.
    pub fn with_templates_file(mut self, templates_file: Option<PathBuf>) -> Self {
        self.templates_file = templates_file;
        self
    }

    /// Sets the per-request deadline.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> ServerResult<Self> {
        if request_timeout.is_zero() {
            return Err(ServerError::ConfigError(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        self.request_timeout = request_timeout;
        Ok(self)
    }

    /// Sets whether a container that fails to start is removed again.
    pub fn with_launch_rollback(mut self, launch_rollback: bool) -> Self {
        self.launch_rollback = launch_rollback;
        self
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() -> ServerResult<()> {
        let config = Config::new("127.0.0.1", 8080)?;
        assert_eq!(config.get_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.get_scheme().get_label_namespace(), "traefik");
        assert_eq!(config.get_scheme().get_suffix_domain(), "localhost");
        assert_eq!(config.get_network(), "dev_container_default");
        assert_eq!(*config.get_request_timeout(), Duration::from_secs(60));
        assert!(*config.get_launch_rollback());
        assert!(config.get_templates_file().is_none());
        Ok(())
    }

    #[test]
    fn test_routing_is_validated() -> ServerResult<()> {
        let config = Config::new("0.0.0.0", 9000)?.with_routing("proxy", ".apps.example.com")?;
        assert_eq!(config.get_scheme().get_label_namespace(), "proxy");
        assert_eq!(config.get_scheme().get_suffix_domain(), "apps.example.com");

        let base = Config::new("127.0.0.1", 8080)?;
        assert!(base.clone().with_routing("", "localhost").is_err());
        assert!(base.clone().with_routing("traefik.http", "localhost").is_err());
        assert!(base.clone().with_routing("traefik", " ").is_err());
        assert!(base.with_routing("traefik", "http://localhost").is_err());
        Ok(())
    }

    #[test]
    fn test_invalid_values_are_rejected() -> ServerResult<()> {
        assert!(matches!(
            Config::new("not-an-ip", 8080),
            Err(ServerError::ConfigError(_))
        ));

        let base = Config::new("127.0.0.1", 8080)?;
        assert!(base.clone().with_network("  ").is_err());
        assert!(base.with_request_timeout(Duration::ZERO).is_err());
        Ok(())
    }
}
