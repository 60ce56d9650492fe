// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Resolves the CLI's environment: endpoints, credentials paths, and UI
//! settings. Everything is read once at startup into an immutable value
//! that gets injected into commands; nothing downstream reads ambient
//! process state.

#[cfg(test)]
use std::collections::HashMap;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use url::Url;

use crate::app::{GlobalOpts, UiConfig};

/// Environment variable to override the default config dir path.
pub const CLI_CONFIG_HOME_ENV: &str = "CORAL_CLI_CONFIG_HOME";

pub const SERVICES_URL_ENV: &str = "CORAL_SERVICES_URL";
pub const IMAGE_REPOSITORY_ENV: &str = "CORAL_IMAGE_REPOSITORY";
pub const IMAGES_BUCKET_ENV: &str = "CORAL_IMAGES_BUCKET";
pub const SSH_KEY_ENV: &str = "CORAL_SSH_KEY";
pub const SSH_USER_ENV: &str = "CORAL_SSH_USER";
pub const PEERS_SENTINEL_ENV: &str = "CORAL_PEERS_FAILURE_SENTINEL";
pub const SLACK_DEPLOYS_KEY_ENV: &str = "SLACK_DEPLOYS_KEY";

// Default values
pub const SERVICES_URL_DEFAULT: &str =
    "https://s3.us-east-2.amazonaws.com/coral-json/services.json";
pub const IMAGE_REPOSITORY_DEFAULT: &str =
    "578312804370.dkr.ecr.us-east-1.amazonaws.com/coralnode";
pub const IMAGES_BUCKET_DEFAULT: &str = "coral-images";
pub const SSH_USER_DEFAULT: &str = "ec2-user";

/// Historically both `-1` and `0` have been used for "peer count could
/// not be determined". `-1` is the default because `0` is also a real
/// (if alarming) answer; the env var keeps the other convention
/// expressible for scripts that depend on it.
pub const PEERS_FAILURE_SENTINEL_DEFAULT: i64 = -1;

#[derive(Clone)]
pub struct CliEnv {
    loaded_env_file: Option<PathBuf>,
    config_home: PathBuf,
    services_url: Url,
    image_repository: String,
    images_bucket: String,
    ssh_key_path: PathBuf,
    ssh_user: String,
    slack_deploys_key: Option<String>,
    peers_failure_sentinel: i64,
    connect_timeout: Duration,
    request_timeout: Duration,
    auto_confirm: bool,
    ui_config: UiConfig,
    colorful: bool,
    is_terminal: bool,
}

impl CliEnv {
    pub fn load(global_opts: &GlobalOpts) -> Result<Self> {
        let os_env = OsEnv::default();
        Self::load_from_env(&os_env, global_opts)
    }

    /// Loading CliEnv with a custom OsEnv. OsEnv can be customised in cfg(test)
    pub fn load_from_env(os_env: &OsEnv, global_opts: &GlobalOpts) -> Result<Self> {
        // Load .env file. Best effort.
        let maybe_env = dotenv();

        let config_home = os_env
            .get(CLI_CONFIG_HOME_ENV)
            .map(|x| Ok(PathBuf::from(x)))
            .unwrap_or_else(default_config_home)?;

        let services_url = os_env
            .get(SERVICES_URL_ENV)
            .map(|x| Url::parse(&x))
            .unwrap_or_else(|| Url::parse(SERVICES_URL_DEFAULT))
            .context("Invalid services manifest URL")?;

        let image_repository = os_env
            .get(IMAGE_REPOSITORY_ENV)
            .unwrap_or_else(|| IMAGE_REPOSITORY_DEFAULT.to_owned());

        let images_bucket = os_env
            .get(IMAGES_BUCKET_ENV)
            .unwrap_or_else(|| IMAGES_BUCKET_DEFAULT.to_owned());

        let ssh_key_path = os_env
            .get(SSH_KEY_ENV)
            .map(|x| Ok(PathBuf::from(x)))
            .unwrap_or_else(default_ssh_key_path)?;

        let ssh_user = os_env
            .get(SSH_USER_ENV)
            .unwrap_or_else(|| SSH_USER_DEFAULT.to_owned());

        let slack_deploys_key = os_env.get(SLACK_DEPLOYS_KEY_ENV).filter(|x| !x.is_empty());

        let peers_failure_sentinel = os_env
            .get(PEERS_SENTINEL_ENV)
            .map(|x| {
                x.trim()
                    .parse()
                    .with_context(|| format!("{PEERS_SENTINEL_ENV} must be an integer, got `{x}`"))
            })
            .unwrap_or(Ok(PEERS_FAILURE_SENTINEL_DEFAULT))?;

        // color setup
        // We respect NO_COLOR if set, otherwise, we default to colorful
        // unless stdout is not a terminal
        let colorful = os_env
            .get("NO_COLOR")
            .map(|x| x == "0")
            .unwrap_or_else(|| true);
        let is_terminal = std::io::stdout().is_terminal();
        let colorful = is_terminal && colorful;

        Ok(Self {
            loaded_env_file: maybe_env.ok(),
            config_home,
            services_url,
            image_repository,
            images_bucket,
            ssh_key_path,
            ssh_user,
            slack_deploys_key,
            peers_failure_sentinel,
            connect_timeout: Duration::from_millis(global_opts.connect_timeout),
            request_timeout: Duration::from_millis(global_opts.request_timeout),
            auto_confirm: global_opts.yes,
            ui_config: global_opts.ui_config.clone(),
            colorful,
            is_terminal,
        })
    }

    pub fn config_home(&self) -> &Path {
        self.config_home.as_path()
    }

    pub fn env_file_path(&self) -> Option<&Path> {
        self.loaded_env_file.as_deref()
    }

    pub fn services_url(&self) -> &Url {
        &self.services_url
    }

    pub fn image_repository(&self) -> &str {
        &self.image_repository
    }

    pub fn images_bucket(&self) -> &str {
        &self.images_bucket
    }

    pub fn ssh_key_path(&self) -> &Path {
        self.ssh_key_path.as_path()
    }

    pub fn ssh_user(&self) -> &str {
        &self.ssh_user
    }

    pub fn slack_deploys_key(&self) -> Option<&str> {
        self.slack_deploys_key.as_deref()
    }

    pub fn peers_failure_sentinel(&self) -> i64 {
        self.peers_failure_sentinel
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn auto_confirm(&self) -> bool {
        self.auto_confirm
    }

    pub fn ui_config(&self) -> &UiConfig {
        &self.ui_config
    }

    pub fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    pub fn colorful(&self) -> bool {
        self.colorful
    }
}

fn default_config_home() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Could not detect the home directory")?
        .join(".config")
        .join("coral"))
}

fn default_ssh_key_path() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Could not detect the home directory")?
        .join(".ssh")
        .join("coral-node-ec2.pem"))
}

/// Wrapper over the OS environment variables that uses a hashmap in test
/// cfg to enable testing.
#[derive(Default)]
pub struct OsEnv<'a> {
    /// Environment variable mocks
    #[cfg(test)]
    pub env: HashMap<&'a str, String>,

    #[cfg(not(test))]
    _marker: std::marker::PhantomData<&'a ()>,
}

impl<'a> OsEnv<'a> {
    // Retrieves a environment variable from the os or from a table if in testing mode
    #[cfg(test)]
    pub fn get<K: AsRef<str>>(&self, key: K) -> Option<String> {
        self.env
            .get(key.as_ref())
            .map(std::string::ToString::to_string)
    }

    #[cfg(not(test))]
    #[inline]
    pub fn get<K: AsRef<str>>(&self, key: K) -> Option<String> {
        std::env::var(key.as_ref()).ok()
    }

    #[cfg(test)]
    pub fn insert(&mut self, k: &'a str, v: String) -> Option<String> {
        self.env.insert(k, v)
    }

    #[cfg(test)]
    pub fn clear(&mut self) {
        self.env.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_services_url_override() -> Result<()> {
        let mut os_env = OsEnv::default();
        let cli_env = CliEnv::load_from_env(&os_env, &GlobalOpts::default())?;
        assert_eq!(
            cli_env.services_url().to_string(),
            SERVICES_URL_DEFAULT.to_string()
        );

        os_env.clear();
        os_env.insert(
            SERVICES_URL_ENV,
            "http://localhost:9000/services.json".to_string(),
        );
        let cli_env = CliEnv::load_from_env(&os_env, &GlobalOpts::default())?;
        assert_eq!(
            cli_env.services_url().to_string(),
            "http://localhost:9000/services.json".to_string()
        );

        Ok(())
    }

    #[test]
    fn test_config_home_order() -> Result<()> {
        let mut os_env = OsEnv::default();
        let cli_env = CliEnv::load_from_env(&os_env, &GlobalOpts::default())?;
        assert_eq!(cli_env.config_home(), default_config_home()?);

        let new_home = PathBuf::from("/random/path");
        os_env.insert(CLI_CONFIG_HOME_ENV, new_home.display().to_string());
        let cli_env = CliEnv::load_from_env(&os_env, &GlobalOpts::default())?;
        assert_eq!(cli_env.config_home(), new_home);

        Ok(())
    }

    #[test]
    fn test_peers_sentinel() -> Result<()> {
        let mut os_env = OsEnv::default();
        let cli_env = CliEnv::load_from_env(&os_env, &GlobalOpts::default())?;
        assert_eq!(
            cli_env.peers_failure_sentinel(),
            PEERS_FAILURE_SENTINEL_DEFAULT
        );

        // The older convention is expressible.
        os_env.insert(PEERS_SENTINEL_ENV, "0".to_string());
        let cli_env = CliEnv::load_from_env(&os_env, &GlobalOpts::default())?;
        assert_eq!(cli_env.peers_failure_sentinel(), 0);

        // A non-integer sentinel is a configuration error, not something
        // to silently fall back from.
        os_env.clear();
        os_env.insert(PEERS_SENTINEL_ENV, "none".to_string());
        assert!(CliEnv::load_from_env(&os_env, &GlobalOpts::default()).is_err());

        Ok(())
    }

    #[test]
    fn test_slack_key_presence() -> Result<()> {
        let mut os_env = OsEnv::default();
        let cli_env = CliEnv::load_from_env(&os_env, &GlobalOpts::default())?;
        assert_eq!(cli_env.slack_deploys_key(), None);

        // An empty key means "not configured".
        os_env.insert(SLACK_DEPLOYS_KEY_ENV, "".to_string());
        let cli_env = CliEnv::load_from_env(&os_env, &GlobalOpts::default())?;
        assert_eq!(cli_env.slack_deploys_key(), None);

        os_env.clear();
        os_env.insert(SLACK_DEPLOYS_KEY_ENV, "T000/B000/xyz".to_string());
        let cli_env = CliEnv::load_from_env(&os_env, &GlobalOpts::default())?;
        assert_eq!(cli_env.slack_deploys_key(), Some("T000/B000/xyz"));

        Ok(())
    }
}
