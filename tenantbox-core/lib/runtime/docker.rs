//! Docker Engine implementation of [`ContainerRuntime`].

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::{
    container::{
        Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions, LogOutput,
        LogsOptions, NetworkingConfig, RemoveContainerOptions, RestartContainerOptions,
        StartContainerOptions, StopContainerOptions,
    },
    errors::Error as DockerError,
    models::{ContainerInspectResponse, ContainerSummary, EndpointSettings, HostConfig, Mount, MountTypeEnum},
    volume::{ListVolumesOptions, RemoveVolumeOptions},
    Docker,
};
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;

use super::{
    ContainerDetails, ContainerRecord, ContainerRuntime, ContainerSpec, LogRequest, LogStream,
    RuntimeError, VolumeRecord,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A [`ContainerRuntime`] backed by the local Docker Engine.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DockerRuntime {
    /// Connects using the same defaults as the Docker CLI, honouring `DOCKER_HOST`.
    ///
    /// No request is made here; an unreachable daemon surfaces on the first call.
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults().map_err(|e| {
            RuntimeError::Unavailable(format!("failed to connect to Docker: {}", e))
        })?;
        Ok(Self { docker })
    }

    /// Wraps an existing bollard client.
    pub fn with_client(docker: Docker) -> Self {
        Self { docker }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> Result<(), RuntimeError> {
        self.docker.ping().await?;
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let mut exposed_ports = HashMap::new();
        exposed_ports.insert(spec.exposed_port.clone(), HashMap::new());

        let mounts = spec
            .volume_mounts
            .iter()
            .map(|m| Mount {
                typ: Some(MountTypeEnum::VOLUME),
                source: Some(m.source.clone()),
                target: Some(m.target.clone()),
                ..Default::default()
            })
            .collect();

        let mut endpoints_config = HashMap::new();
        endpoints_config.insert(spec.network.clone(), EndpointSettings::default());

        let config = Config {
            image: Some(spec.image.clone()),
            exposed_ports: Some(exposed_ports),
            labels: Some(spec.labels.clone()),
            host_config: Some(HostConfig {
                mounts: Some(mounts),
                ..Default::default()
            }),
            networking_config: Some(NetworkingConfig { endpoints_config }),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await?;

        for warning in &response.warnings {
            tracing::warn!("runtime warning creating container {}: {}", response.id, warning);
        }

        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn stop_container(&self, id: &str, grace_secs: u32) -> Result<(), RuntimeError> {
        let options = StopContainerOptions {
            t: i64::from(grace_secs),
        };
        self.docker.stop_container(id, Some(options)).await?;
        Ok(())
    }

    async fn restart_container(&self, id: &str, grace_secs: u32) -> Result<(), RuntimeError> {
        let options = RestartContainerOptions {
            t: grace_secs as isize,
        };
        self.docker.restart_container(id, Some(options)).await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        self.docker.remove_container(id, Some(options)).await?;
        Ok(())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        let info = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;
        Ok(info.into())
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerRecord>, RuntimeError> {
        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };

        let containers = self.docker.list_containers(Some(options)).await?;
        Ok(containers.into_iter().map(Into::into).collect())
    }

    fn container_logs(&self, id: &str, request: &LogRequest) -> LogStream {
        let options = LogsOptions::<String> {
            stdout: request.stdout,
            stderr: request.stderr,
            timestamps: request.timestamps,
            tail: request.tail.to_string(),
            ..Default::default()
        };

        self.docker
            .logs(id, Some(options))
            .map(|chunk| {
                chunk.map_err(RuntimeError::from).map(|output| match output {
                    LogOutput::StdOut { message }
                    | LogOutput::StdErr { message }
                    | LogOutput::StdIn { message }
                    | LogOutput::Console { message } => message,
                })
            })
            .boxed()
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>, RuntimeError> {
        let response = self
            .docker
            .list_volumes(None::<ListVolumesOptions<String>>)
            .await?;

        Ok(response
            .volumes
            .unwrap_or_default()
            .into_iter()
            .map(|v| VolumeRecord {
                name: v.name,
                mountpoint: Some(v.mountpoint).filter(|m| !m.is_empty()),
            })
            .collect())
    }

    async fn remove_volume(&self, name: &str) -> Result<(), RuntimeError> {
        self.docker
            .remove_volume(name, None::<RemoveVolumeOptions>)
            .await?;
        Ok(())
    }
}

impl From<DockerError> for RuntimeError {
    fn from(err: DockerError) -> Self {
        match err {
            DockerError::DockerResponseServerError {
                status_code: 404,
                message,
            } => RuntimeError::NotFound(message),
            DockerError::DockerResponseServerError { message, .. } => RuntimeError::Failed(message),
            DockerError::IOError { err } => RuntimeError::Unavailable(err.to_string()),
            DockerError::RequestTimeoutError => {
                RuntimeError::Unavailable("request to the Docker daemon timed out".to_string())
            }
            other => RuntimeError::Failed(other.to_string()),
        }
    }
}

impl From<ContainerSummary> for ContainerRecord {
    fn from(summary: ContainerSummary) -> Self {
        Self {
            id: summary.id.unwrap_or_default(),
            names: summary.names.unwrap_or_default(),
            image: summary.image.unwrap_or_default(),
            state: summary.state.unwrap_or_default(),
            status: summary.status.unwrap_or_default(),
            labels: summary.labels.unwrap_or_default(),
        }
    }
}

impl From<ContainerInspectResponse> for ContainerDetails {
    fn from(info: ContainerInspectResponse) -> Self {
        Self {
            id: info.id.unwrap_or_default(),
            name: info.name.unwrap_or_default(),
            state: to_json(info.state),
            config: to_json(info.config),
            created: info.created,
            path: info.path,
            args: info.args.unwrap_or_default(),
            image: info.image,
            platform: info.platform,
            mount_label: info.mount_label,
            process_label: info.process_label,
            restart_count: info.restart_count.unwrap_or_default(),
            driver: info.driver,
            mounts: to_json(info.mounts),
            network_settings: to_json(info.network_settings),
            log_path: info.log_path,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn to_json<T: Serialize>(value: Option<T>) -> Value {
    value
        .and_then(|v| serde_json::to_value(v).ok())
        .unwrap_or(Value::Null)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use bollard::models::{ContainerState, ContainerStateStatusEnum};

    use super::*;

    #[test]
    fn test_docker_errors_map_to_runtime_errors() {
        let err: RuntimeError = DockerError::DockerResponseServerError {
            status_code: 404,
            message: "No such container: abc".into(),
        }
        .into();
        assert!(matches!(err, RuntimeError::NotFound(_)));

        let err: RuntimeError = DockerError::DockerResponseServerError {
            status_code: 409,
            message: "conflict".into(),
        }
        .into();
        assert!(matches!(err, RuntimeError::Failed(ref m) if m == "conflict"));

        let err: RuntimeError = DockerError::IOError {
            err: std::io::Error::new(std::io::ErrorKind::NotFound, "no socket"),
        }
        .into();
        assert!(matches!(err, RuntimeError::Unavailable(_)));
    }

    #[test]
    fn test_summary_conversion() {
        let summary = ContainerSummary {
            id: Some("abcdef0123456789".into()),
            names: Some(vec!["/tenant".into()]),
            image: Some("app_template:latest".into()),
            state: Some("running".into()),
            status: Some("Up 2 minutes".into()),
            labels: Some(HashMap::from([("template.id".into(), "app_template".into())])),
            ..Default::default()
        };

        let record = ContainerRecord::from(summary);
        assert_eq!(record.short_id(), "abcdef012345");
        assert_eq!(record.names, vec!["/tenant".to_string()]);
        assert_eq!(record.labels["template.id"], "app_template");
    }

    #[test]
    fn test_inspect_conversion_keeps_state() {
        let info = ContainerInspectResponse {
            id: Some("abc".into()),
            name: Some("/tenant".into()),
            state: Some(ContainerState {
                status: Some(ContainerStateStatusEnum::EXITED),
                running: Some(false),
                ..Default::default()
            }),
            log_path: Some("/var/lib/docker/containers/abc/abc-json.log".into()),
            ..Default::default()
        };

        let details = ContainerDetails::from(info);
        assert_eq!(details.name, "/tenant");
        assert!(!details.is_running());
        assert_eq!(details.state["Status"], "exited");
        assert!(details.mounts.is_null());
    }
}
