// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Schema of the published services manifest and the node URL resolution
//! built on top of it.
//!
//! The manifest is a single JSON document of shape
//! `{"networks": {<network>: {"nodes": {<node>: {"api": "host:port", "rpc": "host:port"}}}}}`.
//! Decoding it into these types is the one validation boundary; everything
//! downstream works with guaranteed-shape values.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use url::Url;

use crate::network::{Network, NODE_DOMAIN};

/// Port the node API listens on, for synthesized backup-node entries.
pub const API_PORT: u16 = 3030;
/// Port the consensus RPC listens on, for synthesized backup-node entries.
pub const RPC_PORT: u16 = 26670;

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesManifest {
    pub networks: HashMap<String, NetworkServices>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkServices {
    pub nodes: BTreeMap<String, NodeEndpoints>,
}

/// `host:port` pairs exactly as published in the manifest.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NodeEndpoints {
    pub api: String,
    pub rpc: String,
}

/// Fully-qualified endpoints for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeUrls {
    pub api: Url,
    pub rpc: Url,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("network `{0}` is not present in the services manifest")]
    UnknownNetwork(Network),
    #[error("node `{node}` is not present in the `{network}` services manifest")]
    UnknownNode { network: Network, node: String },
    #[error("node `{node}` publishes an unusable endpoint `{endpoint}`: {source}")]
    InvalidEndpoint {
        node: String,
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
}

impl ServicesManifest {
    /// Resolve the API/RPC URLs of one node, or of every node on the
    /// network when `node` is `None`. Node names come back in ascending
    /// name order; callers pick their own traversal direction.
    pub fn resolve(
        &self,
        network: Network,
        node: Option<&str>,
    ) -> Result<BTreeMap<String, NodeUrls>, DirectoryError> {
        let services = self
            .networks
            .get(&network.to_string())
            .ok_or(DirectoryError::UnknownNetwork(network))?;

        let mut nodes = services.nodes.clone();
        if network.has_backup_node() {
            let backup = format!("{network}-backup");
            nodes
                .entry(backup.clone())
                .or_insert_with(|| NodeEndpoints {
                    api: format!("{backup}.{NODE_DOMAIN}:{API_PORT}"),
                    rpc: format!("{backup}.{NODE_DOMAIN}:{RPC_PORT}"),
                });
        }

        if let Some(node) = node {
            if !nodes.contains_key(node) {
                return Err(DirectoryError::UnknownNode {
                    network,
                    node: node.to_owned(),
                });
            }
        }

        nodes
            .into_iter()
            .filter(|(name, _)| node.map_or(true, |n| n == name))
            .map(|(name, endpoints)| {
                let urls = NodeUrls {
                    api: endpoint_url(network, &name, &endpoints.api)?,
                    rpc: endpoint_url(network, &name, &endpoints.rpc)?,
                };
                Ok((name, urls))
            })
            .collect()
    }
}

fn endpoint_url(network: Network, node: &str, endpoint: &str) -> Result<Url, DirectoryError> {
    Url::parse(&format!("{}://{endpoint}", network.scheme())).map_err(|source| {
        DirectoryError::InvalidEndpoint {
            node: node.to_owned(),
            endpoint: endpoint.to_owned(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> ServicesManifest {
        serde_json::from_value(serde_json::json!({
            "networks": {
                "devnet": {
                    "nodes": {
                        "devnet-0": {"api": "devnet.coral.network:3030", "rpc": "devnet.coral.network:26670"},
                        "devnet-1": {"api": "devnet.coral.network:3031", "rpc": "devnet.coral.network:26671"},
                    }
                },
                "mainnet": {
                    "nodes": {
                        "mainnet-0": {"api": "mainnet-0.coral.network:3030", "rpc": "mainnet-0.coral.network:26670"},
                        "mainnet-1": {"api": "mainnet-1.coral.network:3030", "rpc": "mainnet-1.coral.network:26670"},
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn resolves_every_node_with_network_scheme() {
        let urls = manifest().resolve(Network::Devnet, None).unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(
            urls["devnet-0"].api.as_str(),
            "http://devnet.coral.network:3030/"
        );
        assert_eq!(
            urls["devnet-1"].rpc.as_str(),
            "http://devnet.coral.network:26671/"
        );

        let urls = manifest().resolve(Network::Mainnet, None).unwrap();
        assert_eq!(urls["mainnet-0"].api.scheme(), "https");
    }

    #[test]
    fn injects_backup_node_when_absent() {
        let urls = manifest().resolve(Network::Mainnet, None).unwrap();
        let backup = &urls["mainnet-backup"];
        assert_eq!(
            backup.api.as_str(),
            "https://mainnet-backup.coral.network:3030/"
        );
        assert_eq!(
            backup.rpc.as_str(),
            "https://mainnet-backup.coral.network:26670/"
        );

        // Devnet carries no backup node.
        assert!(!manifest()
            .resolve(Network::Devnet, None)
            .unwrap()
            .contains_key("devnet-backup"));
    }

    #[test]
    fn single_node_filter() {
        let urls = manifest()
            .resolve(Network::Devnet, Some("devnet-1"))
            .unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls.contains_key("devnet-1"));

        let err = manifest()
            .resolve(Network::Devnet, Some("devnet-7"))
            .unwrap_err();
        assert!(matches!(err, DirectoryError::UnknownNode { ref node, .. } if node == "devnet-7"));
    }

    #[test]
    fn missing_network_names_the_network() {
        let err = manifest().resolve(Network::Testnet, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "network `testnet` is not present in the services manifest"
        );
    }

    #[test]
    fn schema_violations_fail_decode() {
        // A node entry without an rpc endpoint is a manifest bug, not
        // something to paper over downstream.
        let result: Result<ServicesManifest, _> = serde_json::from_value(serde_json::json!({
            "networks": {"devnet": {"nodes": {"devnet-0": {"api": "x:1"}}}}
        }));
        assert!(result.is_err());

        let result: Result<ServicesManifest, _> =
            serde_json::from_value(serde_json::json!({"nets": {}}));
        assert!(result.is_err());
    }
}
