// Copyright (c) 2024 - 2026 Coral Systems, Inc.
// All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Polls a node's status endpoints.
//!
//! Every method is total: timeouts, connection failures, non-200
//! answers, and malformed bodies all come back as the documented
//! sentinel for that status kind. Retrying is the caller's business.

use url::Url;

use coral_types::status::{
    parse_catchup, parse_health, parse_height, parse_peers, parse_sha, parse_version,
    parse_voting_power, Catchup, Health, UNKNOWN,
};

use crate::cli_env::CliEnv;

#[derive(Clone)]
pub struct NodeStatusClient {
    inner: reqwest::Client,
    peers_failure_sentinel: i64,
}

impl NodeStatusClient {
    pub fn new(env: &CliEnv) -> reqwest::Result<Self> {
        Ok(Self {
            inner: super::http_client(env)?,
            peers_failure_sentinel: env.peers_failure_sentinel(),
        })
    }

    async fn fetch(&self, base_url: &Url, path: &str) -> Option<String> {
        let url = base_url.join(path).ok()?;
        let response = self.inner.get(url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.text().await.ok()
    }

    /// Health from the node API. `BAD` when the node cannot be reached.
    pub async fn health(&self, api_url: &Url) -> Health {
        match self.fetch(api_url, "/health").await {
            Some(body) => parse_health(&body),
            None => Health::Bad,
        }
    }

    /// Current block height from the node API. `0` signals failure.
    pub async fn height(&self, api_url: &Url) -> u64 {
        self.fetch(api_url, "/block/current")
            .await
            .map(|body| parse_height(body.as_bytes()))
            .unwrap_or(0)
    }

    /// Catch-up status from the consensus RPC.
    pub async fn catchup(&self, rpc_url: &Url) -> Catchup {
        self.fetch(rpc_url, "/status")
            .await
            .map(|body| parse_catchup(body.as_bytes()))
            .unwrap_or(Catchup::Unknown)
    }

    /// Peer count from the consensus RPC. The failure sentinel comes
    /// from [`CliEnv::peers_failure_sentinel`].
    pub async fn peers(&self, rpc_url: &Url) -> i64 {
        self.fetch(rpc_url, "/net_info")
            .await
            .and_then(|body| parse_peers(body.as_bytes()))
            .unwrap_or(self.peers_failure_sentinel)
    }

    /// Node software version from the node API.
    pub async fn version(&self, api_url: &Url) -> String {
        self.fetch(api_url, "/version")
            .await
            .and_then(|body| parse_version(body.as_bytes()))
            .unwrap_or_else(|| UNKNOWN.to_owned())
    }

    /// Image SHA the node is running, from the node API.
    pub async fn sha(&self, api_url: &Url) -> String {
        self.fetch(api_url, "/version")
            .await
            .and_then(|body| parse_sha(body.as_bytes()))
            .unwrap_or_else(|| UNKNOWN.to_owned())
    }

    /// Validator voting power from the consensus RPC.
    pub async fn voting_power(&self, rpc_url: &Url) -> String {
        self.fetch(rpc_url, "/status")
            .await
            .and_then(|body| parse_voting_power(body.as_bytes()))
            .map(|power| power.to_string())
            .unwrap_or_else(|| UNKNOWN.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::GlobalOpts;
    use crate::cli_env::OsEnv;

    fn client() -> NodeStatusClient {
        let env = CliEnv::load_from_env(&OsEnv::default(), &GlobalOpts::default()).unwrap();
        NodeStatusClient::new(&env).unwrap()
    }

    /// Answer every connection on a fresh local port with a canned HTTP
    /// response.
    fn serve(response: &'static str) -> Url {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut buf = [0u8; 2048];
                let _ = std::io::Read::read(&mut stream, &mut buf);
                let _ = std::io::Write::write_all(&mut stream, response.as_bytes());
            }
        });
        Url::parse(&format!("http://{addr}")).unwrap()
    }

    fn response(status_line: &str, body: &str) -> &'static str {
        Box::leak(
            format!(
                "HTTP/1.1 {status_line}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            )
            .into_boxed_str(),
        )
    }

    #[test_log::test(tokio::test)]
    async fn health_over_the_wire() {
        let url = serve(response("200 OK", "\"OK\"\n"));
        assert_eq!(client().health(&url).await, Health::Ok);
    }

    #[test_log::test(tokio::test)]
    async fn non_200_is_the_failure_sentinel() {
        let url = serve(response("502 Bad Gateway", "upstream sad"));
        let client = client();
        assert_eq!(client.health(&url).await, Health::Bad);
        assert_eq!(client.height(&url).await, 0);
        assert_eq!(client.catchup(&url).await, Catchup::Unknown);
        assert_eq!(client.peers(&url).await, -1);
        assert_eq!(client.version(&url).await, UNKNOWN);
    }

    #[test_log::test(tokio::test)]
    async fn unreachable_node_is_the_failure_sentinel() {
        // Bind a port, then free it again so connections get refused.
        let url = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap()
        };
        let client = client();
        assert_eq!(client.health(&url).await, Health::Bad);
        assert_eq!(client.sha(&url).await, UNKNOWN);
        assert_eq!(client.peers(&url).await, -1);
    }

    #[test_log::test(tokio::test)]
    async fn catchup_over_the_wire() {
        let url = serve(response(
            "200 OK",
            r#"{"result":{"sync_info":{"catching_up":false,"latest_block_height":"500"}}}"#,
        ));
        assert_eq!(client().catchup(&url).await, Catchup::Complete);
    }
}
