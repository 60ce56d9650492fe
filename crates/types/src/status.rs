// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Node status sentinels and the parsers that produce them.
//!
//! Nodes are polled over plain HTTP and answer with small JSON (or bare
//! text) bodies. The parsers in this module are total: any malformed,
//! truncated, or unexpected body maps to the documented failure sentinel
//! instead of an error. Polling loops stay simple because of it; whether
//! a node is broken or the network blipped is deliberately not
//! distinguishable here.

use serde::Deserialize;
use strum_macros::Display;

/// Sentinel printed when a node's version or SHA cannot be determined.
pub const UNKNOWN: &str = "UNKNOWN";

/// Health as reported by the node API's `/health` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    /// The node answered `OK`.
    Ok,
    /// The node answered with an empty body. It responded, so it is not
    /// unreachable, but it is not healthy either.
    Ill,
    /// The node could not be reached at all.
    Bad,
    /// The node answered with some other status text.
    Other(String),
}

impl Health {
    pub fn is_ok(&self) -> bool {
        matches!(self, Health::Ok)
    }
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Health::Ok => write!(f, "OK"),
            Health::Ill => write!(f, "ILL"),
            Health::Bad => write!(f, "BAD"),
            Health::Other(text) => write!(f, "{text}"),
        }
    }
}

/// Whether a node has replayed the chain up to the network tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Catchup {
    #[strum(serialize = "COMPLETE")]
    Complete,
    #[strum(serialize = "CATCHINGUP")]
    CatchingUp,
    #[strum(serialize = "UNKNOWN")]
    Unknown,
}

/// Decode a `/health` body. The endpoint replies with a bare (sometimes
/// JSON-quoted) string.
pub fn parse_health(body: &str) -> Health {
    let health = body.trim().trim_matches('"').trim();
    match health {
        "" => Health::Ill,
        "OK" => Health::Ok,
        other => Health::Other(other.to_owned()),
    }
}

#[derive(Debug, Deserialize)]
struct BlockResponse {
    block_meta: BlockMeta,
}

#[derive(Debug, Deserialize)]
struct BlockMeta {
    header: BlockHeader,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    height: u64,
}

/// Decode a `/block/current` body into a height. `0` is not a valid
/// chain height and doubles as the failure sentinel.
pub fn parse_height(body: &[u8]) -> u64 {
    serde_json::from_slice::<BlockResponse>(body)
        .map(|response| response.block_meta.header.height)
        .unwrap_or(0)
}

/// Numbers in the consensus RPC arrive either bare or as decimal strings
/// depending on the field. Accept both shapes behind one type.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    String(String),
}

impl NumberOrString {
    fn as_i64(&self) -> Option<i64> {
        match self {
            NumberOrString::Number(n) => Some(*n),
            NumberOrString::String(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcStatusResponse {
    result: RpcStatusResult,
}

#[derive(Debug, Deserialize)]
struct RpcStatusResult {
    sync_info: Option<SyncInfo>,
    validator_info: Option<ValidatorInfo>,
}

#[derive(Debug, Deserialize)]
struct SyncInfo {
    catching_up: bool,
    latest_block_height: NumberOrString,
}

#[derive(Debug, Deserialize)]
struct ValidatorInfo {
    voting_power: NumberOrString,
}

/// Decode a consensus RPC `/status` body into a catch-up verdict. A node
/// that reports height zero has not replayed anything yet and counts as
/// still catching up.
pub fn parse_catchup(body: &[u8]) -> Catchup {
    let sync_info = match serde_json::from_slice::<RpcStatusResponse>(body) {
        Ok(response) => match response.result.sync_info {
            Some(sync_info) => sync_info,
            None => return Catchup::Unknown,
        },
        Err(_) => return Catchup::Unknown,
    };

    match sync_info.latest_block_height.as_i64() {
        Some(height) if !sync_info.catching_up && height > 0 => Catchup::Complete,
        Some(_) => Catchup::CatchingUp,
        None => Catchup::Unknown,
    }
}

/// Decode the validator voting power out of a `/status` body.
pub fn parse_voting_power(body: &[u8]) -> Option<i64> {
    serde_json::from_slice::<RpcStatusResponse>(body)
        .ok()?
        .result
        .validator_info?
        .voting_power
        .as_i64()
}

#[derive(Debug, Deserialize)]
struct NetInfoResponse {
    result: NetInfoResult,
}

#[derive(Debug, Deserialize)]
struct NetInfoResult {
    n_peers: NumberOrString,
}

/// Decode the peer count out of a `/net_info` body. The failure sentinel
/// is chosen by the caller (see `CliEnv::peers_failure_sentinel`).
pub fn parse_peers(body: &[u8]) -> Option<i64> {
    serde_json::from_slice::<NetInfoResponse>(body)
        .ok()?
        .result
        .n_peers
        .as_i64()
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    #[serde(rename = "CoralVersion")]
    version: Option<String>,
    #[serde(rename = "CoralSha")]
    sha: Option<String>,
}

/// Decode the node software version out of a `/version` body.
pub fn parse_version(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<VersionResponse>(body).ok()?.version
}

/// Decode the node image SHA out of a `/version` body.
pub fn parse_sha(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<VersionResponse>(body).ok()?.sha
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_strips_json_quotes() {
        assert_eq!(parse_health("\"OK\"\n"), Health::Ok);
        assert_eq!(parse_health("OK"), Health::Ok);
        assert_eq!(parse_health(""), Health::Ill);
        assert_eq!(parse_health("\"\""), Health::Ill);
        assert_eq!(
            parse_health("degraded: indexer lagging"),
            Health::Other("degraded: indexer lagging".to_owned())
        );
        assert_eq!(Health::Ok.to_string(), "OK");
        assert_eq!(Health::Bad.to_string(), "BAD");
    }

    #[test]
    fn height_extracts_nested_field() {
        let body = br#"{"block_meta":{"header":{"height":12345}}}"#;
        assert_eq!(parse_height(body), 12345);
    }

    #[test]
    fn height_failure_shapes_all_map_to_zero() {
        for body in [
            &b""[..],
            b"not json",
            br#"{"block_meta":{}}"#,
            br#"{"block_meta":{"header":{}}}"#,
            br#"{"block_meta":{"header":{"height":"twelve"}}}"#,
        ] {
            assert_eq!(parse_height(body), 0, "body: {body:?}");
        }
    }

    #[test]
    fn catchup_complete_requires_synced_and_nonzero_height() {
        let body = br#"{"result":{"sync_info":{"catching_up":false,"latest_block_height":"500"}}}"#;
        assert_eq!(parse_catchup(body), Catchup::Complete);

        let body = br#"{"result":{"sync_info":{"catching_up":true,"latest_block_height":"500"}}}"#;
        assert_eq!(parse_catchup(body), Catchup::CatchingUp);

        let body = br#"{"result":{"sync_info":{"catching_up":false,"latest_block_height":0}}}"#;
        assert_eq!(parse_catchup(body), Catchup::CatchingUp);
    }

    #[test]
    fn catchup_failure_shapes_are_unknown() {
        for body in [
            &b""[..],
            b"<html>bad gateway</html>",
            br#"{"result":{}}"#,
            br#"{"result":{"sync_info":{"catching_up":false,"latest_block_height":"tall"}}}"#,
        ] {
            assert_eq!(parse_catchup(body), Catchup::Unknown, "body: {body:?}");
        }
        assert_eq!(Catchup::Unknown.to_string(), UNKNOWN);
        assert_eq!(Catchup::CatchingUp.to_string(), "CATCHINGUP");
    }

    #[test]
    fn peers_accepts_bare_and_stringified_counts() {
        assert_eq!(parse_peers(br#"{"result":{"n_peers":"4"}}"#), Some(4));
        assert_eq!(parse_peers(br#"{"result":{"n_peers":4}}"#), Some(4));
        assert_eq!(parse_peers(br#"{"result":{}}"#), None);
        assert_eq!(parse_peers(b"{}"), None);
    }

    #[test]
    fn voting_power() {
        let body =
            br#"{"result":{"validator_info":{"voting_power":"10"},"sync_info":{"catching_up":false,"latest_block_height":"1"}}}"#;
        assert_eq!(parse_voting_power(body), Some(10));
        assert_eq!(parse_voting_power(br#"{"result":{}}"#), None);
    }

    #[test]
    fn version_and_sha_come_from_named_fields() {
        let body = br#"{"CoralVersion":"v1.8.2","CoralSha":"a1b2c3d"}"#;
        assert_eq!(parse_version(body).as_deref(), Some("v1.8.2"));
        assert_eq!(parse_sha(body).as_deref(), Some("a1b2c3d"));
        assert_eq!(parse_version(br#"{"CoralSha":"a1b2c3d"}"#), None);
        assert_eq!(parse_sha(b"garbage"), None);
    }
}
