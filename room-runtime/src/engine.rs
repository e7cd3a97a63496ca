//! Tool-call conversation engine.
//!
//! Drives one room's negotiation: send history to the chat endpoint, parse
//! the reply into commands, execute each, fold the results back into the
//! next turn. The loop is bounded so a model that never calls `stop` still
//! terminates. A single failing command is reported back to the model, not
//! allowed to abort the turn.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::command::{Command, parse_commands};
use crate::error::RoomError;
use crate::ledger::RoomActionLedger;
use crate::llm::ChatClient;
use crate::participants::{AgentDirectory, ParticipantResolver};
use crate::swap::SwapEngine;
use crate::types::Message;

/// Use-case-registered tool, dispatched for command names the engine does
/// not handle itself.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, room_id: u64) -> Result<String, RoomError>;
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hard cap on completion turns per run.
    pub max_turns: u32,
    /// Ticker → token address map for `executeTrade`.
    pub tokens: HashMap<String, Address>,
}

impl EngineConfig {
    pub fn new(tokens: HashMap<String, Address>) -> Self {
        Self {
            max_turns: 5,
            tokens,
        }
    }
}

pub struct ConversationEngine {
    config: EngineConfig,
    chat: ChatClient,
    resolver: Arc<ParticipantResolver>,
    directory: Arc<dyn AgentDirectory>,
    swaps: Arc<SwapEngine>,
    ledger: Arc<RoomActionLedger>,
    extensions: HashMap<String, Arc<dyn ToolHandler>>,
    running: AtomicBool,
}

impl ConversationEngine {
    pub fn new(
        config: EngineConfig,
        chat: ChatClient,
        resolver: Arc<ParticipantResolver>,
        directory: Arc<dyn AgentDirectory>,
        swaps: Arc<SwapEngine>,
        ledger: Arc<RoomActionLedger>,
    ) -> Self {
        Self {
            config,
            chat,
            resolver,
            directory,
            swaps,
            ledger,
            extensions: HashMap::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Register an extra tool under the name the model will emit.
    pub fn register_tool(&mut self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        self.extensions.insert(name.into(), handler);
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one bounded negotiation for a room.
    ///
    /// Terminates when the turn cap is reached, when a reply carries no
    /// commands, or when the model calls `stop`.
    pub async fn run_room(&self, room_id: u64, system_prompt: &str) -> Result<(), RoomError> {
        if !self.is_running() {
            return Err(RoomError::NotRunning("conversation engine"));
        }

        let mut messages = vec![Message::system(system_prompt)];
        let participants = self.resolver.resolve(room_id).await;
        messages.push(Message::user(format!(
            "Room {room_id} participants: {}",
            serde_json::to_string(&participants)?
        )));

        for turn in 0..self.config.max_turns {
            let reply = self.chat.complete(&messages).await?;
            messages.push(Message::assistant(reply.clone()));

            let commands = parse_commands(&reply);
            if commands.is_empty() {
                tracing::debug!(room_id, turn, "no commands in reply, ending run");
                break;
            }
            self.ledger.increment_computation_count(room_id);

            let mut results = Vec::with_capacity(commands.len());
            let mut stopped = false;
            for command in &commands {
                if matches!(command, Command::Stop) {
                    tracing::info!(room_id, turn, "stop requested");
                    self.ledger.mark_stopped(room_id);
                    stopped = true;
                    break;
                }
                match self.execute_command(room_id, command).await {
                    Ok(result) => results.push(format!("{}: {result}", command.name())),
                    Err(e) => {
                        tracing::warn!(room_id, tool = command.name(), error = %e, "tool failed");
                        results.push(format!("{} failed: {e}", command.name()));
                    }
                }
            }
            if stopped {
                break;
            }

            messages.push(Message::user(results.join("\n")));
        }

        Ok(())
    }

    async fn execute_command(&self, room_id: u64, command: &Command) -> Result<String, RoomError> {
        match command {
            Command::GetParticipants => {
                let participants = self.resolver.resolve(room_id).await;
                Ok(serde_json::to_string(&participants)?)
            }
            Command::GetNftData => {
                let mut entries = Vec::new();
                for token_id in self.directory.room_agents(room_id).await? {
                    let info = self.directory.agent_info(token_id).await?;
                    entries.push(serde_json::json!({
                        "tokenId": info.token_id,
                        "agentType": info.agent_type,
                        "uri": info.prompt_uri,
                    }));
                }
                Ok(serde_json::Value::Array(entries).to_string())
            }
            Command::ExecuteTrade { ticker, amount } => {
                let token = self
                    .config
                    .tokens
                    .get(&ticker.to_uppercase())
                    .copied()
                    .ok_or_else(|| RoomError::ConfigError(format!("Unknown ticker: {ticker}")))?;
                let tx_hash = self.swaps.swap(room_id, token, U256::from(*amount)).await?;
                Ok(format!("swap submitted: {tx_hash}"))
            }
            Command::WaitFor { seconds } => {
                // Cooperative delay; nothing can abort it early.
                tokio::time::sleep(Duration::from_secs(*seconds)).await;
                Ok(format!("waited {seconds}s"))
            }
            // Stop is intercepted in the turn loop.
            Command::Stop => Ok("stopping".into()),
            Command::Unknown { name } => match self.extensions.get(name) {
                Some(handler) => handler.handle(room_id).await,
                None => Err(RoomError::ConfigError(format!("Unknown tool: {name}"))),
            },
        }
    }
}
