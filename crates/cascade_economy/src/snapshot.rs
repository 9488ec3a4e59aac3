//! # Save Record
//!
//! The complete persisted state of the economy, stored as one JSON record
//! with camelCase keys:
//!
//! ```text
//! {
//!   "schemaVersion": 3,
//!   "coins": 1200, "diamonds": 14,
//!   "inventory": { "hammer": 2 },
//!   "currentEvent": { "eventId": "gem_rush", "points": 640, ... } | null,
//!   "miniGames": { "lastPlayedDate": { "bubble_pop": "2026-10-16" },
//!                  "totalPlays": { "bubble_pop": 4 } },
//!   "totalLevelsPlayed": 37,
//!   "lastDailyLogin": "2026-10-16" | null,
//!   "dailyReplay": { "lastResetDate": "2026-10-16", "replaysCompleted": 1 }
//! }
//! ```
//!
//! Balances and counts are unsigned, so the non-negative invariant holds by
//! construction.

use std::collections::{BTreeMap, BTreeSet};

use cascade_shared::{Currency, ItemId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// Complete persisted economy state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    /// Schema version of the record.
    pub schema_version: u32,
    /// Coin balance.
    pub coins: u64,
    /// Diamond balance.
    pub diamonds: u64,
    /// Item counts. Entries are never stored with a zero count.
    pub inventory: BTreeMap<ItemId, u32>,
    /// The live progression event, if one has been started.
    pub current_event: Option<ProgressionEventState>,
    /// Mini-game play statistics.
    pub mini_games: MiniGameRecords,
    /// Levels completed over the lifetime of the save.
    pub total_levels_played: u64,
    /// Date of the last daily login bonus.
    pub last_daily_login: Option<NaiveDate>,
    /// Daily replay allowance.
    pub daily_replay: DailyReplayState,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            coins: 0,
            diamonds: 0,
            inventory: BTreeMap::new(),
            current_event: None,
            mini_games: MiniGameRecords::default(),
            total_levels_played: 0,
            last_daily_login: None,
            daily_replay: DailyReplayState::default(),
        }
    }
}

impl Snapshot {
    /// Balance of a currency.
    #[inline]
    #[must_use]
    pub const fn balance(&self, currency: Currency) -> u64 {
        match currency {
            Currency::Coins => self.coins,
            Currency::Diamonds => self.diamonds,
        }
    }

    /// Mutable balance of a currency.
    #[inline]
    pub fn balance_mut(&mut self, currency: Currency) -> &mut u64 {
        match currency {
            Currency::Coins => &mut self.coins,
            Currency::Diamonds => &mut self.diamonds,
        }
    }

    /// Count of an item (0 if absent).
    #[must_use]
    pub fn item_count(&self, item_id: &str) -> u32 {
        self.inventory.get(item_id).copied().unwrap_or(0)
    }

    /// Adds `quantity` of an item, returning the new count.
    pub fn add_item(&mut self, item_id: &str, quantity: u32) -> u32 {
        if quantity == 0 {
            return self.item_count(item_id);
        }
        let count = self.inventory.entry(item_id.to_string()).or_insert(0);
        *count = count.saturating_add(quantity);
        *count
    }

    /// Removes one item, returning the remaining count, or `None` if the
    /// count was already zero.
    pub fn take_item(&mut self, item_id: &str) -> Option<u32> {
        let count = self.inventory.get_mut(item_id)?;
        if *count == 0 {
            self.inventory.remove(item_id);
            return None;
        }
        *count -= 1;
        let remaining = *count;
        if remaining == 0 {
            self.inventory.remove(item_id);
        }
        Some(remaining)
    }

    /// Play statistics of one mini-game.
    #[must_use]
    pub fn mini_game_stats(&self, game_id: &str) -> MiniGameStats {
        MiniGameStats {
            last_played_date: self.mini_games.last_played_date.get(game_id).copied(),
            total_plays: self.mini_games.total_plays.get(game_id).copied().unwrap_or(0),
        }
    }
}

/// Persisted state of the live progression event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionEventState {
    /// Id of the event definition this state belongs to.
    pub event_id: String,
    /// Points accumulated this cycle.
    #[serde(default)]
    pub points: u64,
    /// Indices claimed this cycle.
    #[serde(default)]
    pub claimed_checkpoints: BTreeSet<usize>,
    /// Date the cycle started; `None` in records written before it was
    /// tracked, filled in when the event is next opened.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Whether the completion bonus was claimed this cycle.
    #[serde(default)]
    pub completion_bonus_claimed: bool,
}

impl ProgressionEventState {
    /// A fresh cycle of `event_id` starting on `start_date`.
    #[must_use]
    pub fn new(event_id: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            event_id: event_id.into(),
            points: 0,
            claimed_checkpoints: BTreeSet::new(),
            start_date: Some(start_date),
            completion_bonus_claimed: false,
        }
    }
}

/// Per-game play statistics, keyed by mini-game id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MiniGameRecords {
    /// Date each game was last played.
    pub last_played_date: BTreeMap<String, NaiveDate>,
    /// Lifetime plays of each game.
    pub total_plays: BTreeMap<String, u64>,
}

/// Play statistics of one mini-game.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MiniGameStats {
    /// Date of the last play.
    pub last_played_date: Option<NaiveDate>,
    /// Lifetime plays.
    pub total_plays: u64,
}

/// Daily replay allowance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyReplayState {
    /// Date the counter was last reset; `None` before the first rollover.
    pub last_reset_date: Option<NaiveDate>,
    /// Replays used since the last reset.
    pub replays_completed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_item_removes_empty_entries() {
        let mut snapshot = Snapshot::default();
        assert_eq!(snapshot.add_item("hammer", 2), 2);
        assert_eq!(snapshot.take_item("hammer"), Some(1));
        assert_eq!(snapshot.take_item("hammer"), Some(0));
        assert!(!snapshot.inventory.contains_key("hammer"));
        assert_eq!(snapshot.take_item("hammer"), None);
    }

    #[test]
    fn test_add_zero_does_not_create_entry() {
        let mut snapshot = Snapshot::default();
        assert_eq!(snapshot.add_item("shuffle", 0), 0);
        assert!(snapshot.inventory.is_empty());
    }

    #[test]
    fn test_json_keys_are_camel_case() {
        let json = serde_json::to_value(Snapshot::default()).unwrap();
        let object = json.as_object().unwrap();
        for key in [
            "schemaVersion",
            "coins",
            "diamonds",
            "inventory",
            "currentEvent",
            "miniGames",
            "totalLevelsPlayed",
            "lastDailyLogin",
            "dailyReplay",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert!(json["miniGames"].get("lastPlayedDate").is_some());
        assert!(json["dailyReplay"].get("replaysCompleted").is_some());
    }
}
