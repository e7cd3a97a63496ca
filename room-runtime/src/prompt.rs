//! Fetches a participant's strategy/constraints document over HTTP,
//! rewriting `ipfs://` URIs through a configured gateway.

use crate::error::RoomError;
use crate::types::PromptData;

#[derive(Debug, Clone)]
pub struct PromptFetcher {
    gateway: String,
    client: reqwest::Client,
}

impl PromptFetcher {
    /// `gateway` is the IPFS HTTP gateway base, e.g. `https://ipfs.io`.
    pub fn new(gateway: impl Into<String>) -> Self {
        Self {
            gateway: gateway.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetch and decode a prompt document. No retry: failures propagate and
    /// the caller treats them as "unknown data" for that participant.
    pub async fn fetch(&self, uri: &str) -> Result<PromptData, RoomError> {
        let url = self.resolve_uri(uri);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RoomError::PromptFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RoomError::PromptFetch(format!(
                "{url}: {}",
                response.status()
            )));
        }

        response
            .json::<PromptData>()
            .await
            .map_err(|e| RoomError::PromptFetch(e.to_string()))
    }

    /// Rewrite `ipfs://<cid>` (scheme matched case-insensitively) to
    /// `<gateway>/ipfs/<cid>`; anything else passes through verbatim.
    fn resolve_uri(&self, uri: &str) -> String {
        let scheme = "ipfs://";
        if uri.len() >= scheme.len() && uri[..scheme.len()].eq_ignore_ascii_case(scheme) {
            format!("{}/ipfs/{}", self.gateway, &uri[scheme.len()..])
        } else {
            uri.to_string()
        }
    }
}
