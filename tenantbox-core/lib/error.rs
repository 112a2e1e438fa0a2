use thiserror::Error;

use crate::runtime::RuntimeError;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a tenantbox-related operation.
pub type TenantboxResult<T> = Result<T, TenantboxError>;

/// An error that occurred while provisioning or managing tenants.
#[derive(Debug, Error)]
pub enum TenantboxError {
    /// The container runtime control socket could not be reached.
    #[error("container runtime is unavailable: {0}")]
    RuntimeUnavailable(String),

    /// The image a template refers to is not present in the local image store.
    #[error("Image not found: {image}. Please build the {template} image first.")]
    ImageNotFound {
        /// The image reference that was looked up.
        image: String,

        /// The display name of the template that needs the image.
        template: String,
    },

    /// No container exists with the given id.
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// The request was malformed, e.g. a missing id or an unknown action.
    #[error("{0}")]
    InvalidRequest(String),

    /// A create, start, stop, restart, remove or log read call was rejected by the runtime.
    #[error("{0}")]
    RuntimeOperationFailed(String),

    /// The template catalog could not be built.
    #[error("invalid template catalog: {0}")]
    InvalidCatalog(String),

    /// An I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A template file could not be parsed.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl TenantboxError {
    /// Converts a runtime failure of the given operation, keeping unavailability distinct.
    ///
    /// `action` is phrased to complete "Failed to ...", e.g. `"remove container"`.
    pub fn runtime(action: &str, err: RuntimeError) -> Self {
        match err {
            RuntimeError::Unavailable(msg) => Self::RuntimeUnavailable(msg),
            other => Self::RuntimeOperationFailed(format!("Failed to {}: {}", action, other)),
        }
    }

    /// Converts the failure of an existence check on `id`.
    pub fn lookup(id: &str, err: RuntimeError) -> Self {
        match err {
            RuntimeError::NotFound(_) => Self::ContainerNotFound(id.to_string()),
            RuntimeError::Unavailable(msg) => Self::RuntimeUnavailable(msg),
            RuntimeError::Failed(msg) => Self::RuntimeOperationFailed(msg),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
