// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use anyhow::Result;
use cling::prelude::*;

use coral_types::Network;

use crate::c_println;
use crate::cli_env::CliEnv;
use crate::clients::{DirectoryClient, NodeStatusClient};

#[derive(Run, Parser, Collect, Clone)]
#[cling(run = "run_get")]
pub struct Get {
    /// Which status value to fetch
    #[clap(value_enum)]
    kind: StatusKind,

    /// Network whose nodes to ask
    #[clap(value_enum)]
    network: Network,

    /// Only ask this node, and print the bare value
    #[clap(long)]
    node: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Node health from the API /health endpoint
    Health,
    /// Current block height
    Height,
    /// Whether the node has caught up with the network
    Catchup,
    /// Peer count from the consensus RPC
    Peers,
    /// Node software version
    Version,
    /// Image SHA the node is running
    Sha,
    /// Validator voting power
    VotingPower,
}

pub async fn run_get(State(env): State<CliEnv>, opts: &Get) -> Result<()> {
    let directory = DirectoryClient::new(&env)?;
    let nodes = directory.resolve(opts.network, opts.node.as_deref()).await?;
    let client = NodeStatusClient::new(&env)?;

    for (name, urls) in &nodes {
        let value = match opts.kind {
            StatusKind::Health => client.health(&urls.api).await.to_string(),
            StatusKind::Height => client.height(&urls.api).await.to_string(),
            StatusKind::Catchup => client.catchup(&urls.rpc).await.to_string(),
            StatusKind::Peers => client.peers(&urls.rpc).await.to_string(),
            StatusKind::Version => client.version(&urls.api).await,
            StatusKind::Sha => client.sha(&urls.api).await,
            StatusKind::VotingPower => client.voting_power(&urls.rpc).await,
        };

        // Bare values stay easy to consume from scripts; the node name
        // only shows up when more than one node could be answering.
        if opts.node.is_some() {
            c_println!("{value}");
        } else {
            c_println!("{name} {value}");
        }
    }

    Ok(())
}
