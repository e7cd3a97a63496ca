//! Resolves a room's registered agents into typed participants.
//!
//! Each agent token is handled in isolation: a missing document or a
//! malformed entry drops that participant with a warning instead of
//! aborting the whole resolution.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::chain::ChainClient;
use crate::contracts::{IAgentRegistry, IRoomRegistry};
use crate::error::RoomError;
use crate::prompt::PromptFetcher;
use crate::types::{AGENT_TYPE_INVESTOR, AGENT_TYPE_TRADER, AgentInfo, Participant};

/// Read access to the on-chain room and agent registries.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn room_agents(&self, room_id: u64) -> Result<Vec<u64>, RoomError>;
    async fn agent_info(&self, token_id: u64) -> Result<AgentInfo, RoomError>;
}

/// `AgentDirectory` backed by the deployed registry contracts.
pub struct OnChainDirectory {
    chain: Arc<ChainClient>,
    room_registry: Address,
    agent_registry: Address,
}

impl OnChainDirectory {
    pub fn new(chain: Arc<ChainClient>, room_registry: Address, agent_registry: Address) -> Self {
        Self {
            chain,
            room_registry,
            agent_registry,
        }
    }
}

#[async_trait]
impl AgentDirectory for OnChainDirectory {
    async fn room_agents(&self, room_id: u64) -> Result<Vec<u64>, RoomError> {
        let registry = IRoomRegistry::new(self.room_registry, self.chain.provider());
        let token_ids = registry
            .getRoomAgents(U256::from(room_id))
            .call()
            .await
            .map_err(|e| RoomError::ChainError(format!("getRoomAgents failed: {e}")))?;
        Ok(token_ids.into_iter().filter_map(to_token_id).collect())
    }

    async fn agent_info(&self, token_id: u64) -> Result<AgentInfo, RoomError> {
        let registry = IAgentRegistry::new(self.agent_registry, self.chain.provider());
        let agent_type = registry
            .getAgentType(U256::from(token_id))
            .call()
            .await
            .map_err(|e| RoomError::ChainError(format!("getAgentType failed: {e}")))?;
        let prompt_uri = registry
            .tokenURI(U256::from(token_id))
            .call()
            .await
            .map_err(|e| RoomError::ChainError(format!("tokenURI failed: {e}")))?;
        Ok(AgentInfo {
            token_id,
            agent_type,
            prompt_uri,
        })
    }
}

// Token ids are minted sequentially; a value past u64 is a corrupt read,
// and one bad id must not drop the rest of the room.
fn to_token_id(id: U256) -> Option<u64> {
    match u64::try_from(id) {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::warn!(token_id = %id, "token id out of range, skipping");
            None
        }
    }
}

pub struct ParticipantResolver {
    directory: Arc<dyn AgentDirectory>,
    fetcher: PromptFetcher,
}

impl ParticipantResolver {
    pub fn new(directory: Arc<dyn AgentDirectory>, fetcher: PromptFetcher) -> Self {
        Self { directory, fetcher }
    }

    /// Resolve all well-formed participants for a room.
    ///
    /// Never fails: a registry-level error yields an empty list ("no
    /// participants known") and per-token errors drop only that token.
    pub async fn resolve(&self, room_id: u64) -> Vec<Participant> {
        let token_ids = match self.directory.room_agents(room_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(room_id, error = %e, "room agent lookup failed");
                return Vec::new();
            }
        };

        let mut participants = Vec::new();
        for token_id in token_ids {
            match self.resolve_one(token_id).await {
                Ok(Some(participant)) => participants.push(participant),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(room_id, token_id, error = %e, "skipping agent");
                }
            }
        }
        participants
    }

    async fn resolve_one(&self, token_id: u64) -> Result<Option<Participant>, RoomError> {
        let info = self.directory.agent_info(token_id).await?;
        let prompt = self.fetcher.fetch(&info.prompt_uri).await?;

        match info.agent_type {
            AGENT_TYPE_TRADER => match prompt.strategy.filter(|s| !s.is_empty()) {
                Some(strategy) => Ok(Some(Participant::Trader { strategy })),
                None => {
                    tracing::warn!(token_id, "trader agent has no strategy document");
                    Ok(None)
                }
            },
            AGENT_TYPE_INVESTOR => match prompt.constraints.filter(|c| !c.is_empty()) {
                Some(constraints) => Ok(Some(Participant::Investor { constraints })),
                None => {
                    tracing::warn!(token_id, "investor agent has no constraints document");
                    Ok(None)
                }
            },
            other => {
                tracing::warn!(token_id, agent_type = other, "unknown agent type");
                Ok(None)
            }
        }
    }
}
