//! # Mini-Game Rotation
//!
//! **Deterministic, Time-Bucketed Selection**
//!
//! ```text
//! day_index      = floor(now_ms / 86_400_000)
//! rotation_index = floor(day_index / window_days)
//! live games     = games[rotation_index % N], games[(rotation_index + 1) % N]
//! ```
//!
//! Every client computes the same live pair from the wall clock alone; no
//! rotation state is stored. Only play statistics persist.

use std::sync::Arc;

use cascade_shared::{Currency, EconomyConfig, EconomyEvent, EventKind, MiniGameConfig};

use crate::bus::{EventBus, Subscription};
use crate::clock::{Clock, MS_PER_DAY};
use crate::error::EconomyError;
use crate::ledger::Ledger;
use crate::snapshot::MiniGameStats;
use crate::store::SharedStore;

/// Games shown together in one window.
pub const LIVE_GAME_COUNT: usize = 2;

/// Index of the rotation window containing `now_ms`.
#[inline]
#[must_use]
pub fn rotation_index(window_days: u32, now_ms: i64) -> i64 {
    let day_index = now_ms.div_euclid(MS_PER_DAY);
    day_index.div_euclid(i64::from(window_days.max(1)))
}

/// The live games at `now_ms`.
///
/// Two games when at least two are configured, one when exactly one is,
/// none when the list is empty.
#[must_use]
pub fn select_rotation(games: &[MiniGameConfig], window_days: u32, now_ms: i64) -> Vec<&MiniGameConfig> {
    let Ok(count) = i64::try_from(games.len()) else {
        return Vec::new();
    };
    if count == 0 {
        return Vec::new();
    }

    let index = rotation_index(window_days, now_ms);
    let mut live: Vec<&MiniGameConfig> = Vec::with_capacity(LIVE_GAME_COUNT);
    for offset in 0..LIVE_GAME_COUNT as i64 {
        let slot = (index + offset).rem_euclid(count);
        let game = &games[usize::try_from(slot).unwrap_or(0)];
        if !live.iter().any(|g| g.id == game.id) {
            live.push(game);
        }
    }
    live
}

/// Milliseconds from `now_ms` to the start of the next window.
#[must_use]
pub fn time_until_rotation(window_days: u32, now_ms: i64) -> i64 {
    let window_ms = i64::from(window_days.max(1)) * MS_PER_DAY;
    let next_boundary = (rotation_index(window_days, now_ms) + 1) * window_ms;
    next_boundary - now_ms
}

/// Runs the mini-game rotation and records plays.
pub struct RotationScheduler {
    store: SharedStore,
    ledger: Arc<Ledger>,
    config: Arc<EconomyConfig>,
    clock: Arc<dyn Clock>,
    bus: EventBus,
}

impl RotationScheduler {
    /// Creates the scheduler.
    #[must_use]
    pub fn new(
        store: SharedStore,
        ledger: Arc<Ledger>,
        config: Arc<EconomyConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            config,
            clock,
            bus: EventBus::new(),
        }
    }

    /// The scheduler's event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    /// Subscribes to one kind of scheduler event.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&EconomyEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    /// Games live right now.
    #[must_use]
    pub fn current_games(&self) -> Vec<MiniGameConfig> {
        select_rotation(
            &self.config.mini_games,
            self.config.rotation.window_days,
            self.clock.now_ms(),
        )
        .into_iter()
        .cloned()
        .collect()
    }

    /// Whether `game_id` is in the live rotation.
    #[must_use]
    pub fn is_game_available(&self, game_id: &str) -> bool {
        select_rotation(
            &self.config.mini_games,
            self.config.rotation.window_days,
            self.clock.now_ms(),
        )
        .iter()
        .any(|game| game.id == game_id)
    }

    /// Milliseconds until the live games change.
    #[must_use]
    pub fn time_until_rotation(&self) -> i64 {
        time_until_rotation(self.config.rotation.window_days, self.clock.now_ms())
    }

    /// Pays for one play of `game_id` and records it.
    ///
    /// Returns `false` for unknown games, for games outside the rotation when
    /// `rotation.enforce_rotation` is set, or when diamonds do not cover the
    /// cost. Rejections change nothing.
    pub fn play_game(&self, game_id: &str) -> bool {
        let Some(game) = self.config.mini_game(game_id) else {
            tracing::debug!("Play ignored: {}", EconomyError::UnknownMiniGame(game_id.to_string()));
            return false;
        };
        if self.config.rotation.enforce_rotation && !self.is_game_available(game_id) {
            tracing::debug!("Play rejected: {}", EconomyError::MiniGameNotLive(game_id.to_string()));
            return false;
        }

        let source = format!("minigame:{}", game.id);
        if !self.ledger.debit(Currency::Diamonds, game.diamond_cost, &source) {
            return false;
        }

        let today = self.clock.today();
        let total_plays = self.store.lock().update(|s| {
            s.mini_games.last_played_date.insert(game.id.clone(), today);
            let plays = s.mini_games.total_plays.entry(game.id.clone()).or_insert(0);
            *plays = plays.saturating_add(1);
            *plays
        });

        tracing::debug!("Played {} ({} plays)", game.id, total_plays);
        self.bus.publish(&EconomyEvent::MiniGamePlayed {
            game_id: game.id.clone(),
            diamond_cost: game.diamond_cost,
            total_plays,
        });
        true
    }

    /// Play statistics of one game.
    #[must_use]
    pub fn stats(&self, game_id: &str) -> MiniGameStats {
        self.store.lock().load().mini_game_stats(game_id)
    }
}

impl std::fmt::Debug for RotationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationScheduler")
            .field("games", &self.config.mini_games.len())
            .field("window_days", &self.config.rotation.window_days)
            .finish_non_exhaustive()
    }
}
