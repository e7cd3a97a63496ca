//! Poll-based watcher for on-chain `RoomCreated` events.
//!
//! Each observed event triggers one conversation run for that room. The
//! watcher tracks the last scanned block and never re-scans a range, so a
//! room is orchestrated at most once per event.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use alloy::providers::Provider;
use alloy::rpc::types::Filter;
use alloy::sol_types::SolEvent;

use room_runtime::chain::ChainClient;
use room_runtime::contracts::IRoomRegistry;
use room_runtime::engine::ConversationEngine;

use crate::prompts::system_prompt;

pub struct RoomWatcher {
    chain: Arc<ChainClient>,
    room_registry: Address,
    poll_interval: Duration,
}

impl RoomWatcher {
    pub fn new(chain: Arc<ChainClient>, room_registry: Address, poll_interval: Duration) -> Self {
        Self {
            chain,
            room_registry,
            poll_interval,
        }
    }

    pub async fn run(self, engine: Arc<ConversationEngine>) {
        let mut from_block = match self.chain.provider().get_block_number().await {
            Ok(n) => n + 1,
            Err(e) => {
                tracing::warn!(error = %e, "block number read failed, starting from genesis");
                0
            }
        };

        loop {
            tokio::time::sleep(self.poll_interval).await;

            let latest = match self.chain.provider().get_block_number().await {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(error = %e, "block number read failed");
                    continue;
                }
            };
            if latest < from_block {
                continue;
            }

            let filter = Filter::new()
                .address(self.room_registry)
                .event_signature(IRoomRegistry::RoomCreated::SIGNATURE_HASH)
                .from_block(from_block)
                .to_block(latest);

            match self.chain.provider().get_logs(&filter).await {
                Ok(logs) => {
                    for log in logs {
                        // roomId is the first indexed topic.
                        let Some(topic) = log.topics().get(1) else {
                            continue;
                        };
                        let Some(room_id) = decode_room_id(topic) else {
                            tracing::warn!(topic = %topic, "room id out of range, skipping event");
                            continue;
                        };
                        tracing::info!(room_id, "room created, starting negotiation");

                        let engine = Arc::clone(&engine);
                        tokio::spawn(async move {
                            let prompt = system_prompt(room_id);
                            if let Err(e) = engine.run_room(room_id, &prompt).await {
                                tracing::error!(room_id, error = %e, "negotiation run failed");
                            }
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "log scan failed");
                    continue;
                }
            }

            from_block = latest + 1;
        }
    }
}

fn decode_room_id(topic: &B256) -> Option<u64> {
    u64::try_from(U256::from_be_bytes(topic.0)).ok()
}
