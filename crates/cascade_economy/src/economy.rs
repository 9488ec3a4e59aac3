//! # Economy Facade
//!
//! One object that owns the store and every manager, wired the way a game
//! session needs them.
//!
//! ## The Golden Path: Level Complete
//!
//! ```text
//! match engine ──> on_level_complete(LevelResult) ──> Economy
//!                                                       │
//!                         ┌─────────────────────────────┤
//!                         ▼                             ▼
//!                   Ledger                       ProgressionTracker
//!             coins + milestone diamonds          event points
//!                         │                             │
//!                         └──────────────┬──────────────┘
//!                                        ▼
//!                              SnapshotStore (write-through)
//!                                        │
//!                                        ▼
//!                           events: HUD, VFX, event buffer
//! ```
//!
//! Every event from every manager is also copied into a buffer the host
//! drains once per frame with [`Economy::drain_events`].

use std::path::Path;
use std::sync::Arc;

use cascade_shared::{EconomyConfig, EconomyEvent, EventKind, LevelResult, Reward};
use parking_lot::Mutex;

use crate::bus::EventBus;
use crate::clock::{Clock, SystemClock};
use crate::daily::DailyRewards;
use crate::error::EconomyResult;
use crate::ledger::{Ledger, LevelRewards};
use crate::progression::ProgressionTracker;
use crate::rotation::RotationScheduler;
use crate::snapshot::Snapshot;
use crate::store::{FileStorage, SharedStore, SnapshotStore, StoragePort};

/// What a completed level paid out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LevelCompletion {
    /// Coins and diamonds credited.
    pub rewards: LevelRewards,
    /// Event points added.
    pub points: u64,
}

/// What happened at session start.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStart {
    /// Whether the daily replay counter was reset.
    pub replays_reset: bool,
    /// Login bonus granted, if this is the first session today.
    pub login_bonus: Option<Vec<Reward>>,
}

/// The whole meta-progression economy.
pub struct Economy {
    store: SharedStore,
    config: Arc<EconomyConfig>,
    clock: Arc<dyn Clock>,
    ledger: Arc<Ledger>,
    progression: ProgressionTracker,
    rotation: RotationScheduler,
    daily: DailyRewards,
    event_buffer: Arc<Mutex<Vec<EconomyEvent>>>,
}

impl Economy {
    /// Builds the economy over a storage port.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid.
    pub fn open(
        config: EconomyConfig,
        port: impl StoragePort + 'static,
        clock: Arc<dyn Clock>,
    ) -> EconomyResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let store = SnapshotStore::shared(port);

        let ledger = Arc::new(Ledger::new(Arc::clone(&store), Arc::clone(&config)));
        let progression = ProgressionTracker::new(
            Arc::clone(&store),
            Arc::clone(&ledger),
            Arc::clone(&config),
            Arc::clone(&clock),
        );
        let rotation = RotationScheduler::new(
            Arc::clone(&store),
            Arc::clone(&ledger),
            Arc::clone(&config),
            Arc::clone(&clock),
        );
        let daily = DailyRewards::new(Arc::clone(&store), Arc::clone(&ledger), Arc::clone(&config));

        let event_buffer = Arc::new(Mutex::new(Vec::new()));
        for bus in [ledger.events(), progression.events(), rotation.events(), daily.events()] {
            buffer_all(bus, &event_buffer);
        }

        tracing::info!(
            "Economy opened: {} shop items, {} mini-games, event {}",
            config.shop.len(),
            config.mini_games.len(),
            config.event.id
        );

        Ok(Self {
            store,
            config,
            clock,
            ledger,
            progression,
            rotation,
            daily,
            event_buffer,
        })
    }

    /// Builds the economy over a save file, on the system clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid.
    pub fn open_file(config: EconomyConfig, path: impl AsRef<Path>) -> EconomyResult<Self> {
        Self::open(config, FileStorage::new(path), Arc::new(SystemClock))
    }

    /// Applies day rollover and the daily login bonus.
    pub fn start_session(&self) -> SessionStart {
        let today = self.clock.today();
        SessionStart {
            replays_reset: self.daily.rollover_if_needed(today),
            login_bonus: self.daily.check_daily_login(today),
        }
    }

    /// Routes a finished level to the ledger and the progression event.
    pub fn on_level_complete(&self, result: &LevelResult) -> LevelCompletion {
        let rewards = self.ledger.award_level_rewards(result);
        let points = self.progression.on_level_complete(result);
        LevelCompletion { rewards, points }
    }

    /// The ledger.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The progression event tracker.
    #[must_use]
    pub fn progression(&self) -> &ProgressionTracker {
        &self.progression
    }

    /// The mini-game rotation.
    #[must_use]
    pub fn rotation(&self) -> &RotationScheduler {
        &self.rotation
    }

    /// Daily bonus and replays.
    #[must_use]
    pub fn daily(&self) -> &DailyRewards {
        &self.daily
    }

    /// The static config.
    #[must_use]
    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Copy of the current save record.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.store.lock().snapshot()
    }

    /// Wipes the save record back to defaults and starts a fresh event cycle.
    pub fn reset(&self) {
        tracing::warn!("Resetting economy save record");
        self.store.lock().reset();
        self.progression.reset_event();
    }

    /// Takes every event published since the last drain.
    pub fn drain_events(&self) -> Vec<EconomyEvent> {
        std::mem::take(&mut *self.event_buffer.lock())
    }

    /// Events waiting to be drained.
    #[must_use]
    pub fn pending_event_count(&self) -> usize {
        self.event_buffer.lock().len()
    }
}

impl std::fmt::Debug for Economy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Economy")
            .field("ledger", &self.ledger)
            .field("progression", &self.progression)
            .field("rotation", &self.rotation)
            .field("daily", &self.daily)
            .finish_non_exhaustive()
    }
}

fn buffer_all(bus: &EventBus, buffer: &Arc<Mutex<Vec<EconomyEvent>>>) {
    for kind in EventKind::ALL {
        let sink = Arc::clone(buffer);
        let _ = bus.subscribe(kind, move |event| sink.lock().push(event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryStorage;
    use cascade_shared::{ConfigError, Currency};

    fn economy() -> Economy {
        Economy::open(
            EconomyConfig::default(),
            MemoryStorage::new(),
            Arc::new(FixedClock::new(0)),
        )
        .unwrap()
    }

    #[test]
    fn test_level_routes_to_ledger_and_event() {
        let economy = economy();
        let completion = economy.on_level_complete(&LevelResult::new(10, 3, true));

        assert_eq!(completion.rewards.coins, 130);
        assert_eq!(completion.rewards.diamonds, 5);
        assert_eq!(completion.points, 350);
        assert_eq!(economy.ledger().balance(Currency::Coins), 130);
        assert_eq!(economy.progression().points(), 350);
    }

    #[test]
    fn test_events_buffered_in_order() {
        let economy = economy();
        economy.on_level_complete(&LevelResult::new(1, 1, false));

        let kinds: Vec<EventKind> = economy.drain_events().iter().map(EconomyEvent::kind).collect();
        assert_eq!(kinds, vec![EventKind::CoinsChanged, EventKind::PointsAdded]);
        assert_eq!(economy.pending_event_count(), 0);
    }

    #[test]
    fn test_session_start_once_per_day() {
        let economy = economy();
        let first = economy.start_session();
        assert!(first.replays_reset);
        assert!(first.login_bonus.is_some());

        let second = economy.start_session();
        assert_eq!(second, SessionStart::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EconomyConfig::default();
        config.rotation.window_days = 0;
        let result = Economy::open(config, MemoryStorage::new(), Arc::new(FixedClock::new(0)));
        assert!(matches!(
            result,
            Err(crate::error::EconomyError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_reset_clears_everything() {
        let economy = economy();
        economy.on_level_complete(&LevelResult::new(5, 2, true));
        economy.reset();

        let snapshot = economy.snapshot();
        assert_eq!(snapshot.coins, 0);
        assert_eq!(snapshot.total_levels_played, 0);
        assert_eq!(economy.progression().points(), 0);
    }
}
