// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Deploy notifications to the operations Slack channel. Strictly best
//! effort: a missing webhook key or a failed post is worth a console
//! note, never a failed upgrade.

use crate::cli_env::{CliEnv, SLACK_DEPLOYS_KEY_ENV};
use crate::{c_println, c_warn};

#[derive(Clone)]
pub struct SlackClient {
    inner: reqwest::Client,
    webhook_url: Option<String>,
}

impl SlackClient {
    pub fn new(env: &CliEnv) -> reqwest::Result<Self> {
        Ok(Self {
            inner: super::http_client(env)?,
            webhook_url: env
                .slack_deploys_key()
                .map(|key| format!("https://hooks.slack.com/services/{key}")),
        })
    }

    pub async fn post(&self, message: &str) {
        let Some(webhook_url) = &self.webhook_url else {
            c_warn!("Unable to post to slack without {SLACK_DEPLOYS_KEY_ENV} env var: '{message}'");
            return;
        };

        let body = serde_json::json!({ "text": message });
        match self.inner.post(webhook_url).json(&body).send().await {
            Err(err) => c_warn!("Failed to post to slack: {err}: '{message}'"),
            Ok(response) if !response.status().is_success() => {
                c_warn!(
                    "Got {} when posting to slack: '{message}'",
                    response.status()
                );
            }
            Ok(response) => match response.text().await.as_deref() {
                Ok("ok") => c_println!("Posted to slack: '{message}'"),
                _ => c_warn!("Posted to slack but got back a non-ok response: '{message}'"),
            },
        }
    }
}
