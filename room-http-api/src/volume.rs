//! Per-period room volume ranking.
//!
//! Rankings are memoized per period string for the process lifetime: the
//! first query for a period fixes its ordering, repeat queries return the
//! identical list even as the ledger keeps growing. Different periods are
//! computed (and frozen) independently.

use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;

use room_runtime::RoomError;
use room_runtime::ledger::RoomActionLedger;
use room_runtime::types::ActionStatus;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomVolume {
    pub room_id: u64,
    /// Volume in smallest units of the funding token.
    pub volume: u128,
}

pub struct VolumeBoard {
    ledger: Arc<RoomActionLedger>,
    memo: DashMap<String, Vec<RoomVolume>>,
}

impl VolumeBoard {
    pub fn new(ledger: Arc<RoomActionLedger>) -> Self {
        Self {
            ledger,
            memo: DashMap::new(),
        }
    }

    /// Volume ranking for a period like `1d` or `7d`, highest first.
    pub fn get_volume(&self, period: &str) -> Result<Vec<RoomVolume>, RoomError> {
        if let Some(cached) = self.memo.get(period) {
            return Ok(cached.clone());
        }
        let window = parse_period(period)?;
        let ranking = self.compute(window);
        self.memo.insert(period.to_string(), ranking.clone());
        Ok(ranking)
    }

    fn compute(&self, window: Duration) -> Vec<RoomVolume> {
        let cutoff = Utc::now() - window;
        let mut ranking: Vec<RoomVolume> = self
            .ledger
            .room_ids()
            .into_iter()
            .filter_map(|room_id| {
                let data = self.ledger.get_room_action_data(room_id)?;
                let volume = data
                    .transactions
                    .iter()
                    .filter(|t| t.status != ActionStatus::Failed && t.timestamp >= cutoff)
                    .map(|t| t.volume_usd)
                    .sum();
                Some(RoomVolume { room_id, volume })
            })
            .collect();
        ranking.sort_by(|a, b| b.volume.cmp(&a.volume).then(a.room_id.cmp(&b.room_id)));
        ranking
    }
}

// Period strings come straight from the URL path, so this must reject
// arbitrary (including non-ASCII) input without panicking.
fn parse_period(period: &str) -> Result<Duration, RoomError> {
    let invalid = || RoomError::ConfigError(format!("Invalid period: {period}"));

    let (value, to_window): (&str, fn(i64) -> Duration) =
        if let Some(value) = period.strip_suffix('h') {
            (value, Duration::hours)
        } else if let Some(value) = period.strip_suffix('d') {
            (value, Duration::days)
        } else {
            return Err(invalid());
        };

    let value: i64 = value.parse().map_err(|_| invalid())?;
    if value <= 0 {
        return Err(invalid());
    }
    Ok(to_window(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use room_runtime::types::{ActionType, TransactionAction};

    fn ledger_with(rooms: &[(u64, u128)]) -> Arc<RoomActionLedger> {
        let ledger = Arc::new(RoomActionLedger::new());
        for (room_id, volume) in rooms {
            ledger.add_or_update_transaction_action(
                *room_id,
                TransactionAction::pending(ActionType::Swap, format!("0x{room_id:x}"), *volume),
            );
        }
        ledger
    }

    #[test]
    fn ranks_rooms_by_volume() {
        let board = VolumeBoard::new(ledger_with(&[(1, 100), (2, 300), (3, 200)]));
        let ranking = board.get_volume("7d").unwrap();
        let ids: Vec<u64> = ranking.iter().map(|r| r.room_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn same_period_is_memoized() {
        let ledger = ledger_with(&[(1, 100), (2, 300)]);
        let board = VolumeBoard::new(Arc::clone(&ledger));

        let first = board.get_volume("7d").unwrap();
        // New activity after the first query must not reshuffle the ranking.
        ledger.add_or_update_transaction_action(
            1,
            TransactionAction::pending(ActionType::Swap, "0xnew".into(), 10_000),
        );
        let second = board.get_volume("7d").unwrap();
        assert_eq!(first, second);

        // A different period sees the new state and may order differently.
        let daily = board.get_volume("1d").unwrap();
        let ids: Vec<u64> = daily.iter().map(|r| r.room_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn rejects_malformed_periods() {
        let board = VolumeBoard::new(Arc::new(RoomActionLedger::new()));
        assert!(board.get_volume("week").is_err());
        assert!(board.get_volume("0d").is_err());
        assert!(board.get_volume("-1d").is_err());
        assert!(board.get_volume("").is_err());
    }

    #[test]
    fn rejects_non_ascii_periods_without_panicking() {
        let board = VolumeBoard::new(Arc::new(RoomActionLedger::new()));
        assert!(board.get_volume("7é").is_err());
        assert!(board.get_volume("é").is_err());
        assert!(board.get_volume("７d").is_err());
    }
}
