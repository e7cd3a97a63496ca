//! In-memory per-room action ledger. Process-lifetime only: no eviction,
//! no persistence.

use dashmap::DashMap;

use crate::types::{ActionStatus, RoomActionData, TransactionAction};

#[derive(Debug, Default)]
pub struct RoomActionLedger {
    rooms: DashMap<u64, RoomActionData>,
}

impl RoomActionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action, unless an entry with the same transaction hash
    /// already exists — in that case the existing entry is replaced, so a
    /// pending → confirmed transition stays a single row.
    pub fn add_or_update_transaction_action(&self, room_id: u64, action: TransactionAction) {
        let mut entry = self.rooms.entry(room_id).or_default();
        let existing = action.tx_hash.as_ref().and_then(|hash| {
            entry
                .transactions
                .iter_mut()
                .find(|t| t.tx_hash.as_deref() == Some(hash))
        });
        match existing {
            Some(slot) => *slot = action,
            None => entry.transactions.push(action),
        }
    }

    pub fn increment_computation_count(&self, room_id: u64) {
        self.rooms.entry(room_id).or_default().computation_count += 1;
    }

    pub fn mark_stopped(&self, room_id: u64) {
        self.rooms.entry(room_id).or_default().is_stopped = true;
    }

    pub fn get_room_action_data(&self, room_id: u64) -> Option<RoomActionData> {
        self.rooms.get(&room_id).map(|entry| entry.clone())
    }

    /// Sum of confirmed and pending swap volume for a room, in smallest
    /// units of the funding token.
    pub fn total_volume(&self, room_id: u64) -> u128 {
        self.rooms
            .get(&room_id)
            .map(|entry| {
                entry
                    .transactions
                    .iter()
                    .filter(|t| t.status != ActionStatus::Failed)
                    .map(|t| t.volume_usd)
                    .sum()
            })
            .unwrap_or(0)
    }

    pub fn room_ids(&self) -> Vec<u64> {
        self.rooms.iter().map(|entry| *entry.key()).collect()
    }
}
