// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeMap;

use anyhow::Result;
use cling::prelude::*;
use comfy_table::{Cell, Color, Table};
use strum::IntoEnumIterator;

use coral_types::directory::NodeUrls;
use coral_types::status::{Catchup, Health, UNKNOWN};
use coral_types::Network;

use crate::c_println;
use crate::cli_env::CliEnv;
use crate::clients::{DirectoryClient, NodeStatusClient};
use crate::ui::stylesheet::{StyledTable, NETWORK_ICON};
use crate::ui::watcher::Watch;
use crate::{c_title, ui};

#[derive(Run, Parser, Collect, Clone)]
#[cling(run = "run_status")]
pub struct Status {
    /// Network to display; all networks when omitted
    #[clap(value_enum)]
    network: Option<Network>,

    #[clap(flatten)]
    watch: Watch,
}

struct NodeReport {
    health: Health,
    version: String,
    sha: String,
    catchup: Catchup,
    height: u64,
    peers: i64,
}

impl NodeReport {
    fn empty(env: &CliEnv) -> Self {
        Self {
            health: Health::Bad,
            version: UNKNOWN.to_owned(),
            sha: UNKNOWN.to_owned(),
            catchup: Catchup::Unknown,
            height: 0,
            peers: env.peers_failure_sentinel(),
        }
    }
}

pub async fn run_status(State(env): State<CliEnv>, opts: &Status) -> Result<()> {
    let networks: Vec<Network> = match opts.network {
        Some(network) => vec![network],
        None => Network::iter().collect(),
    };

    // The manifest is fetched once; only the status polls refresh in
    // watch mode.
    let directory = DirectoryClient::new(&env)?;
    let manifest = ui::with_progress("Fetching services manifest", directory.fetch()).await?;

    let mut resolved = Vec::new();
    for network in networks {
        resolved.push((network, manifest.resolve(network, None)?));
    }

    let client = NodeStatusClient::new(&env)?;
    opts.watch
        .run(|| render_networks(&env, &client, &resolved))
        .await
}

async fn render_networks(
    env: &CliEnv,
    client: &NodeStatusClient,
    resolved: &[(Network, BTreeMap<String, NodeUrls>)],
) -> Result<()> {
    for (network, nodes) in resolved {
        let mut reports: BTreeMap<&str, NodeReport> = nodes
            .keys()
            .map(|name| (name.as_str(), NodeReport::empty(env)))
            .collect();

        // Poll one status kind across all nodes before moving on to the
        // next kind, so no single node absorbs back-to-back requests.
        for (name, report) in reports.iter_mut() {
            report.health = client.health(&nodes[*name].api).await;
        }
        for (name, report) in reports.iter_mut() {
            report.version = client.version(&nodes[*name].api).await;
        }
        for (name, report) in reports.iter_mut() {
            report.sha = client.sha(&nodes[*name].api).await;
        }
        for (name, report) in reports.iter_mut() {
            report.catchup = client.catchup(&nodes[*name].rpc).await;
        }
        for (name, report) in reports.iter_mut() {
            report.height = client.height(&nodes[*name].api).await;
        }
        for (name, report) in reports.iter_mut() {
            report.peers = client.peers(&nodes[*name].rpc).await;
        }

        c_title!(NETWORK_ICON.0, network);
        let mut table = Table::new_styled(env.ui_config());
        table.set_styled_header(vec![
            "NODE", "HEALTH", "VERSION", "SHA", "CATCHUP", "HEIGHT", "PEERS",
        ]);
        for (name, report) in &reports {
            table.add_row(vec![
                Cell::new(name),
                health_cell(env, &report.health),
                Cell::new(&report.version),
                Cell::new(&report.sha),
                catchup_cell(env, report.catchup),
                Cell::new(report.height),
                Cell::new(report.peers),
            ]);
        }
        c_println!("{table}");
    }
    Ok(())
}

fn health_cell(env: &CliEnv, health: &Health) -> Cell {
    let cell = Cell::new(health);
    if !env.colorful() {
        return cell;
    }
    match health {
        Health::Ok => cell.fg(Color::Green),
        Health::Bad => cell.fg(Color::Red),
        Health::Ill | Health::Other(_) => cell.fg(Color::Yellow),
    }
}

fn catchup_cell(env: &CliEnv, catchup: Catchup) -> Cell {
    let cell = Cell::new(catchup);
    if !env.colorful() {
        return cell;
    }
    match catchup {
        Catchup::Complete => cell.fg(Color::Green),
        Catchup::CatchingUp => cell.fg(Color::Yellow),
        Catchup::Unknown => cell.fg(Color::Red),
    }
}
