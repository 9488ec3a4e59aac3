//! # Daily Rewards
//!
//! Login bonus and replay allowance, both keyed on the UTC calendar date.
//!
//! Day changes are applied by an explicit [`DailyRewards::rollover_if_needed`]
//! call at session start (or on a timer). Reads never write.

use std::sync::Arc;

use cascade_shared::{DailyConfig, EconomyConfig, EconomyEvent, EventKind, Reward};
use chrono::NaiveDate;

use crate::bus::{EventBus, Subscription};
use crate::error::EconomyError;
use crate::ledger::Ledger;
use crate::snapshot::DailyReplayState;
use crate::store::SharedStore;

/// Daily login bonus and replay counter.
pub struct DailyRewards {
    store: SharedStore,
    ledger: Arc<Ledger>,
    config: Arc<EconomyConfig>,
    bus: EventBus,
}

impl DailyRewards {
    /// Creates the daily manager.
    #[must_use]
    pub fn new(store: SharedStore, ledger: Arc<Ledger>, config: Arc<EconomyConfig>) -> Self {
        Self {
            store,
            ledger,
            config,
            bus: EventBus::new(),
        }
    }

    /// The manager's event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    /// Subscribes to one kind of daily event.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&EconomyEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    fn settings(&self) -> &DailyConfig {
        &self.config.daily
    }

    /// Resets the replay counter if it was last reset on another date.
    /// Returns whether a reset happened.
    pub fn rollover_if_needed(&self, today: NaiveDate) -> bool {
        let mut store = self.store.lock();
        if store.load().daily_replay.last_reset_date == Some(today) {
            return false;
        }
        store.update(|s| {
            s.daily_replay = DailyReplayState {
                last_reset_date: Some(today),
                replays_completed: 0,
            };
        });
        tracing::info!("Daily rollover to {}", today);
        true
    }

    /// Persisted replay state.
    #[must_use]
    pub fn daily_replay(&self) -> DailyReplayState {
        self.store.lock().load().daily_replay
    }

    /// Replays left today.
    #[must_use]
    pub fn replays_remaining(&self) -> u32 {
        self.settings()
            .max_replays
            .saturating_sub(self.daily_replay().replays_completed)
    }

    /// Uses one replay. Returns `false`, changing nothing, once the daily
    /// allowance is spent.
    pub fn use_daily_replay(&self) -> bool {
        let max_replays = self.settings().max_replays;
        let result = self.store.lock().try_update(|s| {
            if s.daily_replay.replays_completed >= max_replays {
                return Err(EconomyError::DailyReplaysExhausted(max_replays));
            }
            s.daily_replay.replays_completed += 1;
            Ok(())
        });

        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!("Replay rejected: {}", err);
                false
            }
        }
    }

    /// Date of the last login bonus.
    #[must_use]
    pub fn last_daily_login(&self) -> Option<NaiveDate> {
        self.store.lock().load().last_daily_login
    }

    /// Grants the login bonus on the first call of each date.
    ///
    /// Returns the rewards granted, or `None` if today's bonus was already
    /// taken.
    pub fn check_daily_login(&self, today: NaiveDate) -> Option<Vec<Reward>> {
        {
            let mut store = self.store.lock();
            if store.load().last_daily_login == Some(today) {
                return None;
            }
            store.update(|s| s.last_daily_login = Some(today));
        }

        let rewards = self.settings().login_bonus.clone();
        for reward in &rewards {
            self.ledger.award_reward(reward, "daily_login");
        }
        tracing::info!("Daily login bonus granted for {}", today);
        self.bus.publish(&EconomyEvent::DailyLoginBonus {
            rewards: rewards.clone(),
        });
        Some(rewards)
    }
}

impl std::fmt::Debug for DailyRewards {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyRewards")
            .field("max_replays", &self.settings().max_replays)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStorage, SnapshotStore};
    use cascade_shared::Currency;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily() -> (Arc<Ledger>, DailyRewards) {
        let config = Arc::new(EconomyConfig::default());
        let store = SnapshotStore::shared(MemoryStorage::new());
        let ledger = Arc::new(Ledger::new(Arc::clone(&store), Arc::clone(&config)));
        let daily = DailyRewards::new(store, Arc::clone(&ledger), config);
        (ledger, daily)
    }

    #[test]
    fn test_login_bonus_once_per_date() {
        let (ledger, daily) = daily();
        let today = date(2026, 10, 16);

        assert_eq!(daily.check_daily_login(today), Some(vec![Reward::coins(100)]));
        assert_eq!(daily.check_daily_login(today), None);
        assert_eq!(ledger.balance(Currency::Coins), 100);

        assert!(daily.check_daily_login(today.succ_opt().unwrap()).is_some());
        assert_eq!(ledger.balance(Currency::Coins), 200);
    }

    #[test]
    fn test_replays_capped_per_day() {
        let (_, daily) = daily();
        let today = date(2026, 10, 16);
        assert!(daily.rollover_if_needed(today));

        for _ in 0..3 {
            assert!(daily.use_daily_replay());
        }
        assert!(!daily.use_daily_replay());
        assert_eq!(daily.replays_remaining(), 0);
        assert_eq!(daily.daily_replay().replays_completed, 3);
    }

    #[test]
    fn test_rollover_only_on_new_date() {
        let (_, daily) = daily();
        let today = date(2026, 10, 16);
        assert!(daily.rollover_if_needed(today));
        assert!(daily.use_daily_replay());

        assert!(!daily.rollover_if_needed(today));
        assert_eq!(daily.replays_remaining(), 2);

        assert!(daily.rollover_if_needed(date(2026, 10, 17)));
        assert_eq!(daily.replays_remaining(), 3);
        assert_eq!(daily.daily_replay().last_reset_date, Some(date(2026, 10, 17)));
    }

    #[test]
    fn test_reads_do_not_reset() {
        let (_, daily) = daily();
        assert!(daily.use_daily_replay());
        assert_eq!(daily.daily_replay().replays_completed, 1);
        assert_eq!(daily.daily_replay().last_reset_date, None);
    }
}
