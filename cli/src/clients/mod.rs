// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod directory;
mod ecs;
mod node;
mod slack;
mod ssh;

pub use self::directory::{DirectoryClient, DirectoryClientError};
pub use self::ecs::{ContainerDefinition, EcsClient, EcsError, SNAPSHOT_ENV_KEY};
pub use self::node::NodeStatusClient;
pub use self::slack::SlackClient;
pub use self::ssh::{SshClient, SshError};

use crate::cli_env::CliEnv;

/// One client configuration for every HTTP caller in this module: short
/// per-request timeouts, identifiable user agent.
pub(crate) fn http_client(env: &CliEnv) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(format!(
            "{}/{} {}-{}",
            env!("CARGO_PKG_NAME"),
            crate::build_info::CORALCTL_VERSION,
            std::env::consts::OS,
            std::env::consts::ARCH,
        ))
        .connect_timeout(env.connect_timeout())
        .timeout(env.request_timeout())
        .build()
}
