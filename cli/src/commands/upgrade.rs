// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Rolls a new node image across a network, one node at a time.
//!
//! Per node: fetch the current task definition, rewrite image and
//! snapshot, register a new revision, redeploy the service, then block
//! until the node is running that revision, caught up, and healthy.
//! Node restarts are staggered by a minimum gap. Any structural failure
//! (orchestrator call, SSH, manifest) aborts the whole run; there is no
//! rollback, the orchestrator keeps whatever state it last accepted.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use cling::prelude::*;

use coral_types::directory::NodeUrls;
use coral_types::status::Catchup;
use coral_types::{Network, NodeLocation};

use crate::cli_env::CliEnv;
use crate::clients::{DirectoryClient, EcsClient, NodeStatusClient, SlackClient, SshClient};
use crate::ui::console::confirm_or_exit;
use crate::{c_println, c_success, c_warn};

/// Minimum gap between the start of consecutive node upgrades. This
/// staggers the daily restart tasks so nodes do not all restart near
/// the same time; part of the gap is consumed by the service restart
/// itself.
pub const MIN_WAIT_BETWEEN_NODES: Duration = Duration::from_secs(120);

/// How long stopped services get to drain in repave mode.
const DRAIN_WAIT: Duration = Duration::from_secs(75);

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Run, Parser, Collect, Clone)]
#[cling(run = "run_upgrade")]
pub struct Upgrade {
    /// Network to upgrade
    #[clap(value_enum)]
    network: Network,

    /// Image SHA to roll out
    sha: String,

    /// Only upgrade this node
    #[clap(long)]
    node: Option<String>,

    /// Snapshot for the first node to catch up from; the latest
    /// published snapshot when omitted
    #[clap(long)]
    snapshot: Option<String>,

    /// Stop every node first, then redeploy from scratch in ascending
    /// order without waiting for catch-up
    #[clap(long)]
    repave: bool,

    /// Wall-clock budget per node for restart plus catch-up
    #[clap(long, value_parser = humantime::parse_duration, default_value = "30m")]
    catchup_timeout: Duration,
}

pub async fn run_upgrade(State(env): State<CliEnv>, opts: &Upgrade) -> Result<()> {
    // Be extra careful with mainnet.
    if opts.network == Network::Mainnet {
        let node_text = opts.node.as_deref().unwrap_or("ALL NODES");
        c_warn!(
            "You are about to UPGRADE {node_text} ON MAINNET to the following SHA: {}",
            opts.sha
        );
        c_println!("Please be sure that this SHA has been staged and tested on testnet first.");
        confirm_or_exit(
            &env,
            &format!("Proceed with upgrading {node_text} on mainnet now?"),
        )?;
    }

    let started = Instant::now();

    let directory = DirectoryClient::new(&env)?;
    let nodes = directory.resolve(opts.network, opts.node.as_deref()).await?;

    let sequencer = Sequencer::new(&env, opts)?;
    sequencer.run(&nodes).await?;

    // Register the SHA even when a single node was upgraded: once one
    // node moves, the rest of the network is expected to follow.
    c_println!(
        "Registering {} as the current SHA in use on {}...",
        opts.sha,
        opts.network
    );
    sequencer
        .ecs
        .register_current_sha(opts.network, &opts.sha, env.images_bucket())
        .await?;

    SlackClient::new(&env)?
        .post(&format!(
            "Upgrade to {} complete; nodes for {} are now running and healthy.",
            opts.sha, opts.network
        ))
        .await;

    c_success!("Total upgrade time: {} seconds", started.elapsed().as_secs());
    Ok(())
}

struct Sequencer<'a> {
    env: &'a CliEnv,
    network: Network,
    sha: String,
    snapshot: String,
    repave: bool,
    catchup_timeout: Duration,
    ecs: EcsClient,
    ssh: SshClient,
    status: NodeStatusClient,
}

impl<'a> Sequencer<'a> {
    fn new(env: &'a CliEnv, opts: &Upgrade) -> Result<Self> {
        Ok(Self {
            env,
            network: opts.network,
            sha: opts.sha.clone(),
            snapshot: opts.snapshot.clone().unwrap_or_default(),
            repave: opts.repave,
            catchup_timeout: opts.catchup_timeout,
            ecs: EcsClient::new(),
            ssh: SshClient::new(env),
            status: NodeStatusClient::new(env)?,
        })
    }

    async fn run(&self, nodes: &BTreeMap<String, NodeUrls>) -> Result<()> {
        // Every node must have a known placement before we touch any of
        // them; failing on node four of six helps nobody.
        let locations = locate_all(self.network, nodes)?;
        let order = upgrade_order(nodes.keys(), self.repave);

        if self.repave {
            for name in &order {
                let location = locations[name.as_str()];
                c_println!("Stopping {name} service...");
                self.ecs
                    .update_service(name, location.region, location.cluster, 0)
                    .await?;
            }
            c_println!("Waiting for nodes to stop...");
            tokio::time::sleep(DRAIN_WAIT).await;
        }

        let mut snapshot = self.snapshot.clone();
        let mut time_spent_waiting: Option<Duration> = None;
        for name in &order {
            let location = locations[name.as_str()];
            let urls = &nodes[name.as_str()];

            if let Some(spent) = time_spent_waiting {
                let pad = stagger_delay(spent, MIN_WAIT_BETWEEN_NODES);
                if !pad.is_zero() {
                    c_println!(
                        "Waiting {} more seconds before upgrading {name}...",
                        pad.as_secs()
                    );
                    tokio::time::sleep(pad).await;
                }
            }

            time_spent_waiting = Some(self.upgrade_node(name, location, urls, &snapshot).await?);

            // A node that just caught up from a named snapshot has
            // regenerated all of its data. Let it publish a fresh
            // snapshot for the remaining nodes, then redeploy it on
            // "latest" so a crash-restart does not replay from the
            // original, possibly distant, snapshot again.
            if !snapshot.is_empty() && !self.repave {
                self.ssh
                    .take_snapshot(name)
                    .await
                    .with_context(|| format!("Unable to take a snapshot on {name}"))?;
                snapshot = String::new();

                c_println!("Redeploying {name} at the latest snapshot...");
                time_spent_waiting =
                    Some(self.upgrade_node(name, location, urls, &snapshot).await?);
            }
        }
        Ok(())
    }

    async fn upgrade_node(
        &self,
        name: &str,
        location: NodeLocation,
        urls: &NodeUrls,
        snapshot: &str,
    ) -> Result<Duration> {
        if !snapshot.is_empty() {
            // A snapshot run needs SSH later; prove we have access
            // before mutating the service.
            self.ssh.test_access(name).await?;
        }

        c_println!("Fetching latest {name} task definition...");
        let mut definitions = self
            .ecs
            .describe_task_definition(name, location.region)
            .await?;

        let image = format!("{}:{}", self.env.image_repository(), self.sha);
        for definition in &mut definitions {
            definition.set_image(image.clone());
            // Re-assert the snapshot even when empty, so "latest" does
            // not inherit a stale name from the previous revision.
            definition.set_snapshot(snapshot);
        }

        c_println!("Registering new {name} task definition...");
        let task_definition_arn = self
            .ecs
            .register_task_definition(name, location.region, &definitions)
            .await?;
        c_println!("Task definition: {task_definition_arn}");

        c_println!("Updating {name} service...");
        self.ecs
            .update_service(name, location.region, location.cluster, 1)
            .await?;

        c_println!("Waiting for {name} to restart and catch up...");
        self.wait_for_service(name, location, urls, &task_definition_arn)
            .await
    }

    /// Wait for the node's service to run the new revision, then for the
    /// node to catch up and report healthy. Returns the time spent
    /// waiting after the restart, which counts toward the stagger gap.
    async fn wait_for_service(
        &self,
        name: &str,
        location: NodeLocation,
        urls: &NodeUrls,
        task_definition_arn: &str,
    ) -> Result<Duration> {
        let deadline = Instant::now() + self.catchup_timeout;

        // First make sure we are not polling the old deployment that
        // may still be draining.
        while !self
            .ecs
            .is_service_running(name, location.region, location.cluster, task_definition_arn)
            .await?
        {
            if Instant::now() >= deadline {
                bail!("Timed out waiting for {name} to restart");
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        c_println!("Restart of {name} is complete");

        // The service being up is not the start that matters; the node
        // process inside it is. Count waiting time from here.
        let restarted = Instant::now();
        loop {
            if Instant::now() >= deadline {
                bail!("Timed out waiting for {name} upgrade to complete");
            }
            // Some time between status requests, so we don't hammer the
            // node.
            tokio::time::sleep(POLL_INTERVAL).await;

            if !self.repave {
                // An unhealthy node would fail the catch-up test anyway;
                // checking sync first saves the health round-trip.
                if self.status.catchup(&urls.rpc).await != Catchup::Complete {
                    continue;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }

            if !self.status.health(&urls.api).await.is_ok() {
                continue;
            }

            c_println!("Catchup of {name} is complete and node is healthy");
            return Ok(restarted.elapsed());
        }
    }
}

fn locate_all<'u>(
    network: Network,
    nodes: &'u BTreeMap<String, NodeUrls>,
) -> Result<BTreeMap<&'u str, NodeLocation>> {
    nodes
        .keys()
        .map(|name| {
            network
                .location_of(name)
                .map(|location| (name.as_str(), location))
                .with_context(|| format!("Unknown location for node {name} on network {network}"))
        })
        .collect()
}

/// Descending name order by default. Later nodes tend to be the less
/// load-bearing ones, so they absorb a bad image first. Repave restarts
/// everything from scratch anyway and goes ascending.
fn upgrade_order<'k>(names: impl Iterator<Item = &'k String>, repave: bool) -> Vec<String> {
    let mut order: Vec<String> = names.cloned().collect();
    order.sort();
    if !repave {
        order.reverse();
    }
    order
}

/// Pad between consecutive node upgrades: time already spent waiting on
/// the previous node's catch-up counts toward the minimum gap.
fn stagger_delay(time_spent_waiting: Duration, min_wait: Duration) -> Duration {
    min_wait.saturating_sub(time_spent_waiting)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stagger_pads_fast_catchups() {
        assert_eq!(
            stagger_delay(Duration::from_secs(30), MIN_WAIT_BETWEEN_NODES),
            Duration::from_secs(90)
        );
        assert_eq!(
            stagger_delay(Duration::ZERO, MIN_WAIT_BETWEEN_NODES),
            MIN_WAIT_BETWEEN_NODES
        );
    }

    #[test]
    fn stagger_never_delays_slow_catchups() {
        assert_eq!(
            stagger_delay(Duration::from_secs(120), MIN_WAIT_BETWEEN_NODES),
            Duration::ZERO
        );
        assert_eq!(
            stagger_delay(Duration::from_secs(3600), MIN_WAIT_BETWEEN_NODES),
            Duration::ZERO
        );
    }

    #[test]
    fn nodes_upgrade_in_descending_name_order() {
        let names: Vec<String> = ["testnet-0", "testnet-2", "testnet-backup", "testnet-1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            upgrade_order(names.iter(), false),
            vec!["testnet-backup", "testnet-2", "testnet-1", "testnet-0"]
        );
    }

    #[test]
    fn repave_goes_ascending() {
        let names: Vec<String> = ["devnet-1", "devnet-0", "devnet-3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            upgrade_order(names.iter(), true),
            vec!["devnet-0", "devnet-1", "devnet-3"]
        );
    }
}
