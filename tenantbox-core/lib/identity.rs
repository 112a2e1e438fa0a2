//! Tenant identity and the routing/isolation metadata derived from it.
//!
//! A tenant id is minted once per launch and is used verbatim as the proxy router name, the
//! proxy service name, the subdomain label and the volume name suffix. Ids are hyphenated UUIDs,
//! so they only ever contain `[0-9a-f-]` and can be placed into label keys and into the proxy's
//! rule language without escaping.
//!
//! The label layout produced here is the wire contract with the reverse proxy:
//!
//! ```text
//! <ns>.enable=true
//! <ns>.http.routers.<tenant>.rule=Host(`<tenant>.<domain>`)
//! <ns>.http.services.<tenant>.loadbalancer.server.port=<port>
//! template.id=<id>
//! template.name=<name>
//! ```

use std::{collections::BTreeMap, fmt};

use getset::Getters;
use serde::{Deserialize, Serialize};
use tenantbox_utils::{
    DEFAULT_LABEL_NAMESPACE, DEFAULT_SUFFIX_DOMAIN, TEMPLATE_ID_LABEL, TEMPLATE_NAME_LABEL,
    TENANT_VOLUME_PREFIX,
};
use uuid::Uuid;

use crate::catalog::Template;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A globally unique tenant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

/// Where tenants are published and which label namespace the reverse proxy reads.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub with_prefix")]
pub struct RoutingScheme {
    /// The label namespace of the reverse proxy, e.g. `traefik`.
    label_namespace: String,

    /// The domain every tenant subdomain hangs off, e.g. `localhost`.
    suffix_domain: String,
}

/// Everything that identifies one tenant before its container exists.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub with_prefix")]
pub struct TenantBlueprint {
    /// The freshly minted tenant id.
    tenant_id: TenantId,

    /// The routing and template labels to attach to the container.
    labels: BTreeMap<String, String>,

    /// The name of the tenant's data volume.
    volume_name: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl TenantId {
    /// Mints a new random tenant id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RoutingScheme {
    /// Creates a new routing scheme.
    pub fn new(label_namespace: impl Into<String>, suffix_domain: impl Into<String>) -> Self {
        Self {
            label_namespace: label_namespace.into(),
            suffix_domain: suffix_domain.into(),
        }
    }

    /// The key of the label that switches proxy handling on for a container.
    pub fn enable_key(&self) -> String {
        format!("{}.enable", self.label_namespace)
    }

    /// The prefix shared by every router label key.
    pub fn router_key_prefix(&self) -> String {
        format!("{}.http.routers.", self.label_namespace)
    }

    /// The key of the router rule label for `tenant`.
    pub fn router_rule_key(&self, tenant: &TenantId) -> String {
        format!("{}{}.rule", self.router_key_prefix(), tenant)
    }

    /// The key of the service port label for `tenant`.
    pub fn service_port_key(&self, tenant: &TenantId) -> String {
        format!(
            "{}.http.services.{}.loadbalancer.server.port",
            self.label_namespace, tenant
        )
    }

    /// The host the tenant is published under.
    pub fn tenant_host(&self, tenant: &str) -> String {
        format!("{}.{}", tenant, self.suffix_domain)
    }

    /// The router rule matching the tenant's host.
    pub fn host_rule(&self, tenant: &TenantId) -> String {
        format!("Host(`{}`)", self.tenant_host(tenant.as_str()))
    }

    /// The externally reachable URL of `tenant`.
    pub fn tenant_url(&self, tenant: &str) -> String {
        format!("http://{}", self.tenant_host(tenant))
    }

    /// Recovers the tenant id from a router label, if the label is one this scheme writes.
    ///
    /// A label matches when its key carries the router prefix and its value mentions the suffix
    /// domain. The tenant id is the key segment right after the prefix and may be empty for a
    /// malformed key; `None` means the label is not a tenant router label at all.
    pub fn tenant_from_router_label<'a>(&self, key: &'a str, value: &str) -> Option<&'a str> {
        let rest = key.strip_prefix(self.router_key_prefix().as_str())?;
        if !value.contains(&format!(".{}", self.suffix_domain)) {
            return None;
        }

        Some(rest.split('.').next().unwrap_or_default())
    }
}

impl TenantBlueprint {
    /// Mints a tenant id and derives the metadata for launching `template`.
    pub fn build(scheme: &RoutingScheme, template: &Template) -> Self {
        Self::with_id(scheme, template, TenantId::generate())
    }

    /// Derives the metadata for launching `template` as `tenant_id`.
    pub fn with_id(scheme: &RoutingScheme, template: &Template, tenant_id: TenantId) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(scheme.enable_key(), "true".to_string());
        labels.insert(scheme.router_rule_key(&tenant_id), scheme.host_rule(&tenant_id));
        labels.insert(
            scheme.service_port_key(&tenant_id),
            template.get_port().clone(),
        );
        labels.insert(TEMPLATE_ID_LABEL.to_string(), template.get_id().clone());
        labels.insert(TEMPLATE_NAME_LABEL.to_string(), template.get_name().clone());

        let volume_name = volume_name_for(&tenant_id);

        Self {
            tenant_id,
            labels,
            volume_name,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// The name of the data volume belonging to `tenant`.
pub fn volume_name_for(tenant: &TenantId) -> String {
    format!("{}{}", TENANT_VOLUME_PREFIX, tenant)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for RoutingScheme {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_NAMESPACE, DEFAULT_SUFFIX_DOMAIN)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TenantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
