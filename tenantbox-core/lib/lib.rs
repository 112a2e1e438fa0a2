//! `tenantbox` provisions isolated, per-tenant instances of predefined application images on a
//! single container runtime host.
//!
//! # Overview
//!
//! Every tenant is one container started from a template image. The container carries the
//! routing labels a label-driven reverse proxy needs to publish it under its own subdomain, and
//! a dedicated named volume for its data. The container runtime is the system of record: tenant
//! state is reconstructed from container metadata on every listing.
//!
//! # Modules
//!
//! - [`catalog`] - The fixed set of launchable templates
//! - [`identity`] - Tenant identifiers and the routing/isolation metadata derived from them
//! - [`runtime`] - The seam to the container runtime and its Docker implementation
//! - [`management`] - Provisioning, lifecycle control, discovery and the tenant registry

#![warn(missing_docs)]

mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod catalog;
pub mod identity;
pub mod management;
pub mod runtime;

pub use error::*;
