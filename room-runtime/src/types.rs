use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resolved room participant. Constructed only with its required document,
/// so a malformed agent can never be stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Participant {
    Trader { strategy: String },
    Investor { constraints: String },
}

/// Agent registry entry: a numeric type tag plus the URI of the agent's
/// strategy/constraints document.
#[derive(Debug, Clone)]
pub struct AgentInfo {
    pub token_id: u64,
    pub agent_type: u8,
    pub prompt_uri: String,
}

pub const AGENT_TYPE_TRADER: u8 = 0;
pub const AGENT_TYPE_INVESTOR: u8 = 1;

/// Strategy/constraints document fetched from prompt storage.
///
/// `tradingStrategy` is the legacy field name still present in older
/// documents; serde folds it into `strategy`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptData {
    #[serde(default, alias = "tradingStrategy")]
    pub strategy: Option<String>,
    #[serde(default)]
    pub constraints: Option<String>,
}

/// One turn of conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Persisted room → custodial wallet binding. At most one per room; the
/// credential blob is the hex-encoded signing key for the room's wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub room_id: u64,
    pub wallet_address: String,
    pub credential: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Swap,
    Approve,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Confirmed,
    Failed,
}

/// One swap/approve transition in a room's ledger.
///
/// `tx_hash` is `None` only when the action failed before a transaction was
/// ever submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub tx_hash: Option<String>,
    pub status: ActionStatus,
    /// Volume in smallest units of the funding token.
    #[serde(rename = "volumeUSD")]
    pub volume_usd: u128,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransactionAction {
    pub fn pending(action_type: ActionType, tx_hash: String, volume_usd: u128) -> Self {
        Self {
            action_type,
            tx_hash: Some(tx_hash),
            status: ActionStatus::Pending,
            volume_usd,
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn confirmed(action_type: ActionType, tx_hash: String, volume_usd: u128) -> Self {
        Self {
            action_type,
            tx_hash: Some(tx_hash),
            status: ActionStatus::Confirmed,
            volume_usd,
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn failed(action_type: ActionType, error: impl Into<String>) -> Self {
        Self {
            action_type,
            tx_hash: None,
            status: ActionStatus::Failed,
            volume_usd: 0,
            timestamp: Utc::now(),
            error: Some(error.into()),
        }
    }
}

/// Accumulated per-room activity. Lives for the process lifetime only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomActionData {
    pub transactions: Vec<TransactionAction>,
    pub computation_count: u64,
    pub is_stopped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_data_accepts_legacy_field() {
        let data: PromptData =
            serde_json::from_str(r#"{"tradingStrategy": "buy low"}"#).unwrap();
        assert_eq!(data.strategy.as_deref(), Some("buy low"));
    }

    #[test]
    fn prompt_data_prefers_canonical_field() {
        let data: PromptData = serde_json::from_str(r#"{"strategy": "momentum"}"#).unwrap();
        assert_eq!(data.strategy.as_deref(), Some("momentum"));
        assert!(data.constraints.is_none());
    }

    #[test]
    fn transaction_action_serializes_volume_field() {
        let action = TransactionAction::pending(ActionType::Swap, "0xabc".into(), 100_000000);
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["volumeUSD"], 100_000000u64);
        assert_eq!(json["type"], "swap");
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn failed_action_has_no_hash() {
        let action = TransactionAction::failed(ActionType::Swap, "boom");
        assert!(action.tx_hash.is_none());
        assert_eq!(action.status, ActionStatus::Failed);
        assert_eq!(action.error.as_deref(), Some("boom"));
    }
}
