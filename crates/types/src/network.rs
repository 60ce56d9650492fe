// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The catalog of Coral networks and where their nodes are deployed.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use strum_macros::{Display, EnumIter, EnumString};

/// DNS zone under which node hosts are addressable.
pub const NODE_DOMAIN: &str = "coral.network";

/// A Coral network, in ascending order of operational blast radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Network {
    Devnet,
    Testnet,
    Mainnet,
}

/// The ECS cluster and AWS region a node's service lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLocation {
    pub cluster: &'static str,
    pub region: &'static str,
}

const fn loc(cluster: &'static str, region: &'static str) -> NodeLocation {
    NodeLocation { cluster, region }
}

// Every devnet node shares one cluster; testnet/mainnet nodes each get
// their own cluster, spread across regions so a regional AWS incident
// cannot take down a quorum.
static DEVNET_LOCATIONS: Lazy<BTreeMap<&'static str, NodeLocation>> = Lazy::new(|| {
    BTreeMap::from([
        ("devnet-0", loc("devnet", "us-west-1")),
        ("devnet-1", loc("devnet", "us-west-1")),
        ("devnet-2", loc("devnet", "us-west-1")),
        ("devnet-3", loc("devnet", "us-west-1")),
        ("devnet-4", loc("devnet", "us-west-1")),
    ])
});

static TESTNET_LOCATIONS: Lazy<BTreeMap<&'static str, NodeLocation>> = Lazy::new(|| {
    BTreeMap::from([
        ("testnet-0", loc("testnet-0", "us-east-1")),
        ("testnet-1", loc("testnet-1", "us-east-2")),
        ("testnet-2", loc("testnet-2", "us-west-1")),
        ("testnet-3", loc("testnet-3", "us-west-2")),
        ("testnet-4", loc("testnet-4", "ap-southeast-1")),
        ("testnet-backup", loc("testnet-backup", "us-east-2")),
    ])
});

static MAINNET_LOCATIONS: Lazy<BTreeMap<&'static str, NodeLocation>> = Lazy::new(|| {
    BTreeMap::from([
        ("mainnet-0", loc("mainnet-0", "us-east-1")),
        ("mainnet-1", loc("mainnet-1", "us-east-2")),
        ("mainnet-2", loc("mainnet-2", "us-west-1")),
        ("mainnet-3", loc("mainnet-3", "us-west-2")),
        ("mainnet-4", loc("mainnet-4", "ap-southeast-1")),
        ("mainnet-backup", loc("mainnet-backup", "us-east-2")),
    ])
});

impl Network {
    /// URL scheme used to reach this network's node endpoints. Devnet and
    /// testnet terminate TLS nowhere, mainnet sits behind certificates.
    pub fn scheme(&self) -> &'static str {
        match self {
            Network::Devnet | Network::Testnet => "http",
            Network::Mainnet => "https",
        }
    }

    /// Whether this network carries an out-of-band backup node that is
    /// managed on AWS but never published in the services manifest.
    pub fn has_backup_node(&self) -> bool {
        matches!(self, Network::Testnet | Network::Mainnet)
    }

    /// Cluster/region placement for every node we manage on this network.
    pub fn locations(&self) -> &'static BTreeMap<&'static str, NodeLocation> {
        match self {
            Network::Devnet => &DEVNET_LOCATIONS,
            Network::Testnet => &TESTNET_LOCATIONS,
            Network::Mainnet => &MAINNET_LOCATIONS,
        }
    }

    pub fn location_of(&self, node: &str) -> Option<NodeLocation> {
        self.locations().get(node).copied()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        for network in Network::iter() {
            let name = network.to_string();
            assert_eq!(Network::from_str(&name).unwrap(), network);
        }
        assert_eq!(Network::from_str("MAINNET").unwrap(), Network::Mainnet);
        assert!(Network::from_str("stagenet").is_err());
    }

    #[test]
    fn schemes() {
        assert_eq!(Network::Devnet.scheme(), "http");
        assert_eq!(Network::Testnet.scheme(), "http");
        assert_eq!(Network::Mainnet.scheme(), "https");
    }

    #[test]
    fn devnet_shares_one_cluster() {
        let locations = Network::Devnet.locations();
        assert_eq!(locations.len(), 5);
        assert!(locations
            .values()
            .all(|l| l.cluster == "devnet" && l.region == "us-west-1"));
    }

    #[test]
    fn testnet_nodes_have_dedicated_clusters() {
        let locations = Network::Testnet.locations();
        assert_eq!(locations.len(), 6);
        for (name, location) in locations {
            assert_eq!(location.cluster, *name);
        }
        assert_eq!(
            Network::Testnet.location_of("testnet-backup").unwrap().region,
            "us-east-2"
        );
        assert_eq!(Network::Testnet.location_of("testnet-9"), None);
    }
}
