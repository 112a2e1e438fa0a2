//! Request handlers for the tenantbox server.
//!
//! Each handler runs its work under the configured request deadline. A handler that exceeds it
//! is abandoned and the client gets a 504, which also drops any runtime call still in flight.

use std::future::Future;

use axum::{
    extract::{
        rejection::{BytesRejection, PathRejection},
        MatchedPath, Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use tenantbox_core::{management::LaunchRequest, TenantboxResult};

use crate::{
    error::{ServerError, ValidationError},
    payload::{
        ContainerListResponse, InspectResponse, LogsResponse, RegularMessageResponse,
        TemplateListResponse, VolumeListResponse,
    },
    state::AppState,
    ServerResult,
};

//--------------------------------------------------------------------------------------------------
// Functions: REST API Handlers
//--------------------------------------------------------------------------------------------------

/// Handler for health check
pub async fn health() -> ServerResult<impl IntoResponse> {
    Ok((
        StatusCode::OK,
        Json(RegularMessageResponse {
            message: "Service is healthy".to_string(),
        }),
    ))
}

/// Handler for launching a tenant
///
/// The body is optional. Anything that does not parse as a launch request launches the default
/// template.
pub async fn launch(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ServerResult<impl IntoResponse> {
    let body = body.map_err(rejected_body)?;
    let request = parse_launch_request(&body);
    let launched = with_deadline(&state, state.get_provisioner().launch(&request)).await?;

    Ok((StatusCode::OK, Json(launched)))
}

/// Handler for a delete without a container id
pub async fn delete_without_id() -> ServerError {
    ServerError::ValidationError(ValidationError::InvalidInput(
        "Container ID is required".to_string(),
    ))
}

/// Handler for deleting a tenant container
pub async fn delete_tenant(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ServerResult<impl IntoResponse> {
    let Path(id) = id.map_err(invalid_path)?;
    let outcome = with_deadline(&state, state.get_controller().delete(&id)).await?;

    Ok((StatusCode::OK, Json(outcome)))
}

/// Handler for listing tenant containers
pub async fn list_containers(State(state): State<AppState>) -> ServerResult<impl IntoResponse> {
    let containers = with_deadline(&state, state.get_discovery().list()).await?;

    Ok((StatusCode::OK, Json(ContainerListResponse { containers })))
}

/// Handler for listing the template catalog
pub async fn list_templates(State(state): State<AppState>) -> ServerResult<impl IntoResponse> {
    let templates = state.get_catalog().list().to_vec();

    Ok((StatusCode::OK, Json(TemplateListResponse { templates })))
}

/// Handler for listing tenant data volumes
pub async fn list_volumes(State(state): State<AppState>) -> ServerResult<impl IntoResponse> {
    let volumes = with_deadline(&state, state.get_discovery().list_volumes()).await?;

    Ok((StatusCode::OK, Json(VolumeListResponse { volumes })))
}

/// Handler for starting, stopping or restarting a container
pub async fn control_container(
    State(state): State<AppState>,
    params: Result<Path<(String, String)>, PathRejection>,
) -> ServerResult<impl IntoResponse> {
    let Path((id, action)) = params.map_err(invalid_path)?;
    let outcome = with_deadline(&state, state.get_controller().control_str(&id, &action)).await?;

    Ok((StatusCode::OK, Json(outcome)))
}

/// Handler for a control action posted to the logs or inspect path of a container
///
/// `logs` and `inspect` are not control actions, so these are rejected like any other unknown
/// action.
pub async fn control_container_reserved(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    path: MatchedPath,
) -> ServerResult<impl IntoResponse> {
    let Path(id) = id.map_err(invalid_path)?;
    let action = path.as_str().rsplit('/').next().unwrap_or_default();
    let outcome = with_deadline(&state, state.get_controller().control_str(&id, action)).await?;

    Ok((StatusCode::OK, Json(outcome)))
}

/// Handler for reading the recent logs of a container
pub async fn container_logs(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ServerResult<impl IntoResponse> {
    let Path(id) = id.map_err(invalid_path)?;
    let logs = with_deadline(&state, state.get_controller().logs(&id)).await?;

    Ok((
        StatusCode::OK,
        Json(LogsResponse {
            logs,
            container_id: id,
        }),
    ))
}

/// Handler for inspecting a container
pub async fn container_inspect(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ServerResult<impl IntoResponse> {
    let Path(id) = id.map_err(invalid_path)?;
    let details = with_deadline(&state, state.get_controller().inspect(&id)).await?;

    Ok((
        StatusCode::OK,
        Json(InspectResponse {
            details,
            container_id: id,
        }),
    ))
}

/// Handler for unknown routes
pub async fn fallback() -> ServerError {
    ServerError::NotFound("Not found".to_string())
}

/// Handler for known routes called with a method they do not accept
pub async fn method_not_allowed() -> ServerError {
    ServerError::MethodNotAllowed
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Runs `work` under the configured request deadline.
async fn with_deadline<T>(
    state: &AppState,
    work: impl Future<Output = TenantboxResult<T>>,
) -> ServerResult<T> {
    let deadline = *state.get_config().get_request_timeout();
    match tokio::time::timeout(deadline, work).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            tracing::warn!("request exceeded its {:?} deadline", deadline);
            Err(ServerError::Timeout(deadline))
        }
    }
}

fn parse_launch_request(body: &[u8]) -> LaunchRequest {
    if body.iter().all(u8::is_ascii_whitespace) {
        return LaunchRequest::default();
    }

    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::debug!("ignoring unparsable launch body: {}", e);
        LaunchRequest::default()
    })
}

fn invalid_path(rejection: PathRejection) -> ServerError {
    ServerError::ValidationError(ValidationError::InvalidInput(rejection.body_text()))
}

fn rejected_body(rejection: BytesRejection) -> ServerError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ServerError::PayloadTooLarge(rejection.body_text());
    }
    ServerError::ValidationError(ValidationError::InvalidInput(rejection.body_text()))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
