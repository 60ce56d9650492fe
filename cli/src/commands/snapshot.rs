// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use anyhow::{Context, Result};
use cling::prelude::*;

use crate::cli_env::CliEnv;
use crate::clients::SshClient;
use crate::{c_println, c_success};

#[derive(Run, Parser, Collect, Clone)]
#[cling(run = "run_snapshot")]
pub struct Snapshot {
    /// Node whose host should generate and publish the snapshot
    node: String,
}

pub async fn run_snapshot(State(env): State<CliEnv>, opts: &Snapshot) -> Result<()> {
    let ssh = SshClient::new(&env);

    c_println!("Testing {} SSH access...", opts.node);
    let listing = ssh.test_access(&opts.node).await?;
    c_println!("{listing}");

    c_println!("Creating snapshot...");
    ssh.take_snapshot(&opts.node)
        .await
        .with_context(|| format!("attempting to take a snapshot on {}", opts.node))?;

    c_success!("Snapshot on {} is complete", opts.node);
    Ok(())
}
