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
use clap_verbosity_flag::LogLevel;
use cling::prelude::*;
use tracing_log::AsTrace;

use crate::cli_env::CliEnv;
use crate::commands::{get, snapshot, status, upgrade, whoami};

#[derive(Run, Parser, Clone)]
#[command(author, version = crate::build_info::version(), about, infer_subcommands = true)]
#[cling(run = "init")]
pub struct CliApp {
    #[clap(flatten)]
    #[cling(collect)]
    pub verbose: clap_verbosity_flag::Verbosity<Quiet>,
    #[clap(flatten)]
    pub global_opts: GlobalOpts,
    #[clap(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Clone, Default)]
pub struct UiConfig {
    /// Which table output style to use
    #[arg(long, default_value = "compact", global = true)]
    pub table_style: TableStyle,
}

#[derive(ValueEnum, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableStyle {
    #[default]
    /// No borders, condensed layout
    Compact,
    /// UTF8 borders, good for multiline text
    Borders,
}

const DEFAULT_CONNECT_TIMEOUT: u64 = 1_000;
const DEFAULT_REQUEST_TIMEOUT: u64 = 3_000;

#[derive(Args, Collect, Clone)]
pub struct GlobalOpts {
    /// Auto answer "yes" to confirmation prompts
    #[arg(long, short, global = true)]
    pub yes: bool,

    /// Connection timeout for node status calls, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT, global = true)]
    pub connect_timeout: u64,

    /// Overall request timeout for node status calls, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT, global = true)]
    pub request_timeout: u64,

    #[clap(flatten)]
    pub ui_config: UiConfig,
}

impl Default for GlobalOpts {
    fn default() -> Self {
        Self {
            yes: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            ui_config: UiConfig::default(),
        }
    }
}

#[derive(Run, Subcommand, Clone)]
pub enum Command {
    /// Print one status value for a node, or for every node on a network
    Get(get::Get),
    /// Show a status table for Coral networks
    Status(status::Status),
    /// Roll a new node image across the nodes of a network
    Upgrade(upgrade::Upgrade),
    /// Have a node host generate and publish a snapshot
    Snapshot(snapshot::Snapshot),
    /// Prints general information about the configured environment
    #[clap(name = "whoami")]
    WhoAmI(whoami::WhoAmI),
}

fn init(
    Collected(verbosity): Collected<clap_verbosity_flag::Verbosity<Quiet>>,
    global_opts: &GlobalOpts,
) -> Result<State<CliEnv>> {
    let env = CliEnv::load(global_opts)?;
    crate::ui::stylesheet::set_colors_enabled(env.colorful());
    // Setup logging from env and from -v .. -vvvv
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_max_level(verbosity.log_level_filter().as_trace())
        .with_ansi(env.colorful())
        .init();

    match &env.env_file_path() {
        Some(path) => {
            tracing::info!("Loaded .env file from: {}", path.display())
        }
        None => tracing::info!("Didn't load '.env' file"),
    };

    Ok(State(env))
}

/// Silent (no) logging by default in CLI
#[derive(Clone)]
pub struct Quiet;
impl LogLevel for Quiet {
    fn default() -> Option<tracing_log::log::Level> {
        None
    }
}
