// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Thin wrapper over the `aws ecs` CLI.
//!
//! Each call shells out, demands exit code zero, and decodes stdout into
//! a typed shape. None of these operations are transactional: a crash
//! mid-sequence leaves the orchestrator holding its last accepted state.

use std::ffi::OsStr;
use std::ffi::OsString;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use coral_types::Network;

/// Environment variable inside a container definition that names the
/// snapshot the node restores from. Empty means "latest".
pub const SNAPSHOT_ENV_KEY: &str = "SNAPSHOT_NAME";

#[derive(Debug, Error)]
pub enum EcsError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with code {code}")]
    Failed { command: String, code: i32 },
    #[error("unable to parse `{command}` output: {source}")]
    Malformed {
        command: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to stage the current-SHA marker file: {0}")]
    Scratch(#[source] std::io::Error),
}

/// One container definition out of a task definition, as the `aws` CLI
/// prints it. Only the fields we rewrite are modeled; everything else
/// rides along in `extra` so re-registration round-trips the original
/// configuration untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerDefinition {
    pub image: String,
    #[serde(default)]
    pub environment: Vec<EnvironmentVariable>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

impl ContainerDefinition {
    /// Point this container at a different image.
    pub fn set_image(&mut self, image: impl Into<String>) {
        self.image = image.into();
    }

    /// Upsert the snapshot-name variable. Setting it always, even to the
    /// empty string, keeps "latest snapshot" explicit in the registered
    /// revision.
    pub fn set_snapshot(&mut self, snapshot: &str) {
        for variable in &mut self.environment {
            if variable.name == SNAPSHOT_ENV_KEY {
                variable.value = snapshot.to_owned();
                return;
            }
        }
        self.environment.push(EnvironmentVariable {
            name: SNAPSHOT_ENV_KEY.to_owned(),
            value: snapshot.to_owned(),
        });
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskDefinitionEnvelope {
    task_definition: TaskDefinitionBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskDefinitionBody {
    container_definitions: Vec<ContainerDefinition>,
    task_definition_arn: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeServicesResponse {
    #[serde(default)]
    services: Vec<ServiceDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServiceDescription {
    service_name: String,
    #[serde(default)]
    running_count: i64,
    #[serde(default)]
    deployments: Vec<DeploymentDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeploymentDescription {
    status: Option<String>,
    task_definition: Option<String>,
}

#[derive(Clone, Default)]
pub struct EcsClient;

impl EcsClient {
    pub fn new() -> Self {
        Self
    }

    async fn run_aws<I, S>(&self, args: I) -> Result<Vec<u8>, EcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|arg| arg.as_ref().to_owned()).collect();
        let command = std::iter::once("aws".to_owned())
            .chain(args.iter().map(|arg| arg.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ");
        debug!("Running {command}");

        let output = Command::new("aws")
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| EcsError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(EcsError::Failed {
                command,
                code: output.status.code().unwrap_or(-1),
            });
        }

        Ok(output.stdout)
    }

    fn decode<T: serde::de::DeserializeOwned>(
        operation: &str,
        stdout: &[u8],
    ) -> Result<T, EcsError> {
        serde_json::from_slice(stdout).map_err(|source| EcsError::Malformed {
            command: operation.to_owned(),
            source,
        })
    }

    /// Fetch the latest registered task definition for a node's family.
    pub async fn describe_task_definition(
        &self,
        node: &str,
        region: &str,
    ) -> Result<Vec<ContainerDefinition>, EcsError> {
        let stdout = self
            .run_aws([
                "ecs",
                "describe-task-definition",
                "--region",
                region,
                "--task-definition",
                node,
            ])
            .await?;

        let envelope: TaskDefinitionEnvelope =
            Self::decode("aws ecs describe-task-definition", &stdout)?;
        Ok(envelope.task_definition.container_definitions)
    }

    /// Register a new revision of the node's task definition and return
    /// its ARN. Registering unchanged definitions is harmless: it mints
    /// a new revision with the same effective configuration.
    pub async fn register_task_definition(
        &self,
        node: &str,
        region: &str,
        container_definitions: &[ContainerDefinition],
    ) -> Result<String, EcsError> {
        let rendered = serde_json::to_string(container_definitions).map_err(|source| {
            EcsError::Malformed {
                command: "aws ecs register-task-definition".to_owned(),
                source,
            }
        })?;

        let stdout = self
            .run_aws([
                "ecs",
                "register-task-definition",
                "--region",
                region,
                "--family",
                node,
                "--container-definitions",
                rendered.as_str(),
            ])
            .await?;

        let envelope: TaskDefinitionEnvelope =
            Self::decode("aws ecs register-task-definition", &stdout)?;
        Ok(envelope.task_definition.task_definition_arn)
    }

    /// Point the node's service at its latest task definition and let the
    /// orchestrator redeploy it. Desired count zero stops the service.
    pub async fn update_service(
        &self,
        node: &str,
        region: &str,
        cluster: &str,
        desired_count: u32,
    ) -> Result<(), EcsError> {
        let desired_count = desired_count.to_string();
        self.run_aws([
            "ecs",
            "update-service",
            "--cluster",
            cluster,
            "--region",
            region,
            "--service",
            node,
            "--task-definition",
            node,
            "--desired-count",
            desired_count.as_str(),
        ])
        .await?;
        Ok(())
    }

    /// Whether the node's service currently runs exactly the given task
    /// definition revision, with the old deployment fully drained. Used
    /// as a polling predicate.
    pub async fn is_service_running(
        &self,
        node: &str,
        region: &str,
        cluster: &str,
        task_definition_arn: &str,
    ) -> Result<bool, EcsError> {
        let stdout = self
            .run_aws([
                "ecs",
                "describe-services",
                "--cluster",
                cluster,
                "--region",
                region,
                "--services",
                node,
            ])
            .await?;

        let response: DescribeServicesResponse =
            Self::decode("aws ecs describe-services", &stdout)?;
        Ok(service_at_revision(
            &response.services,
            node,
            task_definition_arn,
        ))
    }

    /// Publish `current-{network}.txt` to the images bucket so local
    /// tooling knows which SHA a network runs. Overwrites, never merges.
    pub async fn register_current_sha(
        &self,
        network: Network,
        sha: &str,
        bucket: &str,
    ) -> Result<(), EcsError> {
        let marker = tempfile::NamedTempFile::new().map_err(EcsError::Scratch)?;
        tokio::fs::write(marker.path(), format!("{sha}\n"))
            .await
            .map_err(EcsError::Scratch)?;

        let destination = format!("s3://{bucket}/current-{network}.txt");
        self.run_aws([
            OsStr::new("s3"),
            OsStr::new("cp"),
            marker.path().as_os_str(),
            OsStr::new(&destination),
        ])
        .await?;
        Ok(())
    }
}

/// The service is "running at revision" only when the target revision is
/// the sole deployment (nothing old still draining), it is PRIMARY, and
/// one task instance is actually up.
fn service_at_revision(services: &[ServiceDescription], node: &str, arn: &str) -> bool {
    services
        .iter()
        .filter(|service| service.service_name == node)
        .any(|service| match service.deployments.as_slice() {
            [deployment] => {
                deployment.status.as_deref() == Some("PRIMARY")
                    && deployment.task_definition.as_deref() == Some(arn)
                    && service.running_count == 1
            }
            _ => false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(snapshot: Option<&str>) -> ContainerDefinition {
        let mut environment = vec![EnvironmentVariable {
            name: "NODE_ID".to_owned(),
            value: "testnet-2".to_owned(),
        }];
        if let Some(snapshot) = snapshot {
            environment.push(EnvironmentVariable {
                name: SNAPSHOT_ENV_KEY.to_owned(),
                value: snapshot.to_owned(),
            });
        }
        ContainerDefinition {
            image: "repo/coralnode:old".to_owned(),
            environment,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn set_snapshot_updates_existing_variable() {
        let mut def = definition(Some("snapshot-testnet-100"));
        def.set_snapshot("snapshot-testnet-200");
        let values: Vec<_> = def
            .environment
            .iter()
            .filter(|v| v.name == SNAPSHOT_ENV_KEY)
            .collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, "snapshot-testnet-200");
    }

    #[test]
    fn set_snapshot_appends_when_missing() {
        let mut def = definition(None);
        def.set_snapshot("");
        assert!(def
            .environment
            .iter()
            .any(|v| v.name == SNAPSHOT_ENV_KEY && v.value.is_empty()));
        // The unrelated variable is untouched.
        assert!(def.environment.iter().any(|v| v.name == "NODE_ID"));
    }

    #[test]
    fn reapplying_the_same_mutation_is_idempotent() {
        // Registering an unchanged image/snapshot mints a new revision
        // on AWS, but the submitted configuration must be identical.
        let mut first = definition(Some("snapshot-testnet-100"));
        first.set_image("repo/coralnode:abc");
        first.set_snapshot("");

        let mut second = first.clone();
        second.set_image("repo/coralnode:abc");
        second.set_snapshot("");

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&vec![first]).unwrap(),
            serde_json::to_string(&vec![second]).unwrap()
        );
    }

    #[test]
    fn container_definition_round_trips_unknown_keys() {
        let raw = serde_json::json!({
            "image": "repo/coralnode:abc",
            "environment": [{"name": "SNAPSHOT_NAME", "value": ""}],
            "memoryReservation": 7168,
            "portMappings": [{"containerPort": 3030, "hostPort": 3030}],
        });
        let mut def: ContainerDefinition = serde_json::from_value(raw.clone()).unwrap();
        def.set_image("repo/coralnode:def");

        let back = serde_json::to_value(&def).unwrap();
        assert_eq!(back["image"], "repo/coralnode:def");
        assert_eq!(back["memoryReservation"], 7168);
        assert_eq!(back["portMappings"], raw["portMappings"]);
    }

    #[test]
    fn task_definition_decode_requires_expected_keys() {
        let ok = serde_json::json!({
            "taskDefinition": {
                "containerDefinitions": [{"image": "repo/coralnode:abc"}],
                "taskDefinitionArn": "arn:aws:ecs:us-east-1:1:task-definition/testnet-0:42",
            }
        });
        let envelope: TaskDefinitionEnvelope = serde_json::from_value(ok).unwrap();
        assert_eq!(envelope.task_definition.container_definitions.len(), 1);

        let missing_arn = serde_json::json!({
            "taskDefinition": {"containerDefinitions": []}
        });
        assert!(serde_json::from_value::<TaskDefinitionEnvelope>(missing_arn).is_err());

        let not_an_envelope = serde_json::json!({"something": "else"});
        assert!(serde_json::from_value::<TaskDefinitionEnvelope>(not_an_envelope).is_err());
    }

    fn services_json(deployments: serde_json::Value, running_count: i64) -> Vec<ServiceDescription> {
        let response: DescribeServicesResponse = serde_json::from_value(serde_json::json!({
            "services": [{
                "serviceName": "testnet-2",
                "runningCount": running_count,
                "deployments": deployments,
            }]
        }))
        .unwrap();
        response.services
    }

    const ARN: &str = "arn:aws:ecs:us-west-1:1:task-definition/testnet-2:7";

    #[test]
    fn service_running_at_target_revision() {
        let services = services_json(
            serde_json::json!([{"status": "PRIMARY", "taskDefinition": ARN}]),
            1,
        );
        assert!(service_at_revision(&services, "testnet-2", ARN));
        // Wrong service name finds nothing.
        assert!(!service_at_revision(&services, "testnet-3", ARN));
    }

    #[test]
    fn draining_old_deployment_is_not_running() {
        let services = services_json(
            serde_json::json!([
                {"status": "PRIMARY", "taskDefinition": ARN},
                {"status": "ACTIVE", "taskDefinition": "arn:aws:ecs:us-west-1:1:task-definition/testnet-2:6"},
            ]),
            1,
        );
        assert!(!service_at_revision(&services, "testnet-2", ARN));
    }

    #[test]
    fn zero_running_tasks_is_not_running() {
        let services = services_json(
            serde_json::json!([{"status": "PRIMARY", "taskDefinition": ARN}]),
            0,
        );
        assert!(!service_at_revision(&services, "testnet-2", ARN));
    }

    #[test]
    fn old_revision_is_not_running() {
        let services = services_json(
            serde_json::json!([{"status": "PRIMARY", "taskDefinition": "arn:other"}]),
            1,
        );
        assert!(!service_at_revision(&services, "testnet-2", ARN));
    }
}
