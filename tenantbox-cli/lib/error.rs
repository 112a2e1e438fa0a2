//! Error types for the tenantbox binaries.
//!
//! This module handles:
//! - Errors raised while setting up or running `tenantboxd`
//! - Conversion from the server and core error types
//!
//! The module provides:
//! - [`TenantboxCliError`], the error every binary entry point returns
//! - [`TenantboxCliResult`], its result alias

use tenantbox_core::TenantboxError;
use tenantbox_server::ServerError;
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a tenantbox binary operation.
pub type TenantboxCliResult<T> = Result<T, TenantboxCliError>;

/// An error that stopped a tenantbox binary.
#[derive(Debug, Error)]
pub enum TenantboxCliError {
    /// An I/O error, e.g. the listen address is taken.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The server could not be configured.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// The template catalog could not be loaded.
    #[error(transparent)]
    Core(#[from] TenantboxError),
}
