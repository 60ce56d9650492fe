// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Fetches the published services manifest and resolves node URLs from
//! it. Unlike the status pollers, failures here are structural: an
//! unreachable or malformed manifest aborts the whole run.

use std::collections::BTreeMap;

use thiserror::Error;
use url::Url;

use coral_types::directory::{DirectoryError, NodeUrls, ServicesManifest};
use coral_types::Network;

use crate::cli_env::CliEnv;

#[derive(Debug, Error)]
pub enum DirectoryClientError {
    #[error("unable to fetch services manifest from {url}: {source}")]
    Unreachable {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("services manifest fetch from {url} answered HTTP {status}")]
    BadStatus {
        url: Url,
        status: reqwest::StatusCode,
    },
    #[error("unable to parse services manifest: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Resolve(#[from] DirectoryError),
}

#[derive(Clone)]
pub struct DirectoryClient {
    inner: reqwest::Client,
    services_url: Url,
}

impl DirectoryClient {
    pub fn new(env: &CliEnv) -> reqwest::Result<Self> {
        Ok(Self {
            inner: super::http_client(env)?,
            services_url: env.services_url().clone(),
        })
    }

    pub async fn fetch(&self) -> Result<ServicesManifest, DirectoryClientError> {
        let url = self.services_url.clone();
        let response = self
            .inner
            .get(url.clone())
            .send()
            .await
            .map_err(|source| DirectoryClientError::Unreachable {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryClientError::BadStatus { url, status });
        }

        let body = response
            .text()
            .await
            .map_err(|source| DirectoryClientError::Unreachable { url, source })?;

        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch the manifest and resolve node URLs in one go.
    pub async fn resolve(
        &self,
        network: Network,
        node: Option<&str>,
    ) -> Result<BTreeMap<String, NodeUrls>, DirectoryClientError> {
        Ok(self.fetch().await?.resolve(network, node)?)
    }
}
