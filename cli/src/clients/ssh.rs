// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! SSH access to node hosts, used to trigger snapshots inside a node's
//! container. Exit code and stdout are the only channel we get back.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use coral_types::network::NODE_DOMAIN;

use crate::cli_env::CliEnv;

/// How long we give a node to produce its snapshot marker file.
const SNAPSHOT_ATTEMPTS: u32 = 60;
const SNAPSHOT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum SshError {
    #[error("failed to run ssh: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("ssh to {node} failed to {action} with code {code}")]
    Failed {
        node: String,
        action: &'static str,
        code: i32,
    },
    #[error("`{0}` does not look like a container id")]
    InvalidContainerId(String),
    #[error("timed out waiting for {node} to produce a snapshot")]
    SnapshotTimedOut { node: String },
}

#[derive(Clone)]
pub struct SshClient {
    key_path: PathBuf,
    user: String,
}

impl SshClient {
    pub fn new(env: &CliEnv) -> Self {
        Self {
            key_path: env.ssh_key_path().to_owned(),
            user: env.ssh_user().to_owned(),
        }
    }

    /// All devnet nodes share one host behind the `devnet` cname; every
    /// other node is addressable under its own name.
    fn host(&self, node: &str) -> String {
        let cname = if node.starts_with("devnet") {
            "devnet"
        } else {
            node
        };
        format!("{}@{cname}.{NODE_DOMAIN}", self.user)
    }

    async fn run(&self, node: &str, command: &str) -> Result<std::process::Output, SshError> {
        let host = self.host(node);
        debug!("Running `{command}` on {host}");
        Command::new("ssh")
            .arg("-i")
            .arg(&self.key_path)
            .args(["-o", "StrictHostKeyChecking=no"])
            .arg(&host)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .await
            .map_err(SshError::Spawn)
    }

    fn expect_success(
        node: &str,
        action: &'static str,
        output: &std::process::Output,
    ) -> Result<(), SshError> {
        if output.status.success() {
            Ok(())
        } else {
            Err(SshError::Failed {
                node: node.to_owned(),
                action,
                code: output.status.code().unwrap_or(-1),
            })
        }
    }

    /// Verify we can reach the host and talk to its docker daemon before
    /// any destructive step. Returns the matching container listing.
    pub async fn test_access(&self, node: &str) -> Result<String, SshError> {
        let action = "test access";
        let output = self
            .run(node, &format!("docker container ls -f name={node}"))
            .await?;
        Self::expect_success(node, action, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_owned())
    }

    /// Discover the id of the node's container on its host.
    pub async fn container_id(&self, node: &str) -> Result<String, SshError> {
        let action = "get container id";
        let output = self
            .run(node, &format!("docker container ls -q -f name={node}"))
            .await?;
        Self::expect_success(node, action, &output)?;

        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if !is_container_id(&container_id) {
            return Err(SshError::InvalidContainerId(container_id));
        }
        Ok(container_id)
    }

    /// Have the node generate a snapshot and publish it as the latest.
    /// Only nodes provisioned with bucket credentials actually upload;
    /// elsewhere the snapshot stays inside the container.
    pub async fn take_snapshot(&self, node: &str) -> Result<(), SshError> {
        let container_id = self.container_id(node).await?;

        let action = "create snapshot";
        let output = self
            .run(
                node,
                &format!(
                    "docker exec {container_id} rm -f /image/snapshot_result; \
                     docker exec {container_id} killall -HUP supervisor"
                ),
            )
            .await?;
        Self::expect_success(node, action, &output)?;

        // The marker file appears once the supervisor finishes the
        // upload. Polling happens out here; a shell `until` loop inside
        // the container made ssh return 126 on some hosts.
        for _ in 0..SNAPSHOT_ATTEMPTS {
            let output = self
                .run(
                    node,
                    &format!("docker exec {container_id} test -f /image/snapshot_result"),
                )
                .await?;

            match output.status.code() {
                Some(0) => return Ok(()),
                // The file is not there yet; give it another second.
                Some(1) => tokio::time::sleep(SNAPSHOT_POLL_INTERVAL).await,
                code => {
                    return Err(SshError::Failed {
                        node: node.to_owned(),
                        action: "detect snapshot",
                        code: code.unwrap_or(-1),
                    })
                }
            }
        }

        Err(SshError::SnapshotTimedOut {
            node: node.to_owned(),
        })
    }
}

fn is_container_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_id_validation() {
        assert!(is_container_id("0123456789abcdef"));
        assert!(is_container_id("ABCDEF01"));
        assert!(!is_container_id(""));
        assert!(!is_container_id("deadbeef\nwarning: foo"));
        assert!(!is_container_id("not-a-container"));
    }
}
