// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use cling::prelude::*;
use comfy_table::Table;

use crate::build_info;
use crate::c_println;
use crate::cli_env::CliEnv;

#[derive(Run, Parser, Clone)]
#[cling(run = "run")]
pub struct WhoAmI {}

pub async fn run(State(env): State<CliEnv>) {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::NOTHING);
    table.add_row(vec!["Services manifest URL", env.services_url().as_str()]);
    table.add_row(vec!["Image repository", env.image_repository()]);
    table.add_row(vec!["Images bucket", env.images_bucket()]);
    table.add_row(vec![
        "SSH key",
        &format!(
            "{} {}",
            env.ssh_key_path().display(),
            if env.ssh_key_path().exists() {
                "(exists)"
            } else {
                "(does not exist)"
            }
        ),
    ]);
    table.add_row(vec![
        "Peers failure sentinel",
        &env.peers_failure_sentinel().to_string(),
    ]);
    c_println!("{}", table);

    c_println!();
    c_println!("Local Environment");
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::NOTHING);
    table.add_row(vec![
        "Config Dir",
        &format!(
            "{} {}",
            env.config_home().display(),
            if env.config_home().exists() {
                "(exists)"
            } else {
                "(does not exist)"
            }
        ),
    ]);
    table.add_row(vec![
        "Loaded .env file",
        &env.env_file_path()
            .map(|x| x.display().to_string())
            .unwrap_or("(NONE)".to_string()),
    ]);
    c_println!("{}", table);

    c_println!();
    c_println!("Build Information");
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::NOTHING);
    table.add_row(vec!["Version", build_info::CORALCTL_VERSION]);
    table.add_row(vec!["OS", std::env::consts::OS]);
    table.add_row(vec!["Arch", std::env::consts::ARCH]);
    c_println!("{}", table);
}
