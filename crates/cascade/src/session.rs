//! # Scripted Sessions
//!
//! Drives an [`Economy`] through a list of player actions without a match
//! engine or UI. Scripts are TOML:
//!
//! ```toml
//! [[step]]
//! action = "start_session"
//!
//! [[step]]
//! action = "level"
//! level_id = 10
//! stars = 3
//! first_time = true
//!
//! [[step]]
//! action = "buy"
//! item_id = "hammer"
//!
//! [[step]]
//! action = "advance_days"
//! days = 1
//! ```
//!
//! The session owns a [`FixedClock`] so scripts can move through days and
//! rotation windows deterministically.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use cascade_economy::{Clock, Economy, EconomyError, FixedClock, Snapshot, StoragePort};
use cascade_shared::{ConfigError, EconomyConfig, EconomyEvent, EventKind, LevelResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while setting up or loading a session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The script file could not be read.
    #[error("failed to read script {path}: {source}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The script is not valid TOML for the step schema.
    #[error("failed to parse script: {0}")]
    Script(#[from] toml::de::Error),

    /// The economy config could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The economy could not be opened.
    #[error(transparent)]
    Economy(#[from] EconomyError),
}

/// Result type for session setup.
pub type SessionResult<T> = Result<T, SessionError>;

/// One scripted player action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionStep {
    /// Day rollover and daily login bonus.
    StartSession,
    /// A finished level.
    Level {
        /// Level number.
        level_id: u32,
        /// Stars earned.
        stars: u8,
        /// First completion of this level.
        #[serde(default)]
        first_time: bool,
        /// Powerups used.
        #[serde(default)]
        powerups: u32,
        /// Longest combo.
        #[serde(default)]
        combo: u32,
    },
    /// Buy a shop item.
    Buy {
        /// Shop item id.
        item_id: String,
    },
    /// Consume one inventory item.
    UseItem {
        /// Item id.
        item_id: String,
    },
    /// Play a specific mini-game.
    PlayMiniGame {
        /// Mini-game id.
        game_id: String,
    },
    /// Play the first game of the live rotation.
    PlayLiveGame,
    /// Claim every available checkpoint.
    ClaimCheckpoints,
    /// Claim the event completion bonus.
    ClaimCompletionBonus,
    /// Use one daily replay.
    UseReplay,
    /// Move the clock forward.
    AdvanceDays {
        /// Days to skip.
        days: i64,
    },
}

impl SessionStep {
    /// The level result of a `Level` step.
    #[must_use]
    pub fn level_result(&self) -> Option<LevelResult> {
        match *self {
            Self::Level {
                level_id,
                stars,
                first_time,
                powerups,
                combo,
            } => Some(
                LevelResult::new(level_id, stars, first_time)
                    .with_powerups(powerups)
                    .with_combo(combo),
            ),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StartSession => write!(f, "start session"),
            Self::Level {
                level_id, stars, ..
            } => write!(f, "level {level_id} ({stars}*)"),
            Self::Buy { item_id } => write!(f, "buy {item_id}"),
            Self::UseItem { item_id } => write!(f, "use {item_id}"),
            Self::PlayMiniGame { game_id } => write!(f, "play {game_id}"),
            Self::PlayLiveGame => write!(f, "play live game"),
            Self::ClaimCheckpoints => write!(f, "claim checkpoints"),
            Self::ClaimCompletionBonus => write!(f, "claim completion bonus"),
            Self::UseReplay => write!(f, "use replay"),
            Self::AdvanceDays { days } => write!(f, "advance {days} day(s)"),
        }
    }
}

/// An ordered list of steps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionScript {
    /// Steps in execution order.
    #[serde(rename = "step", default)]
    pub steps: Vec<SessionStep>,
}

impl SessionScript {
    /// Parses a TOML script.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Script` on malformed TOML or unknown actions.
    pub fn from_toml_str(source: &str) -> SessionResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Reads a TOML script file.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Io` if the file cannot be read, otherwise the
    /// errors of [`SessionScript::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// A short first-week session touching every manager.
    #[must_use]
    pub fn demo() -> Self {
        let level = |level_id, stars, first_time, combo| SessionStep::Level {
            level_id,
            stars,
            first_time,
            powerups: 0,
            combo,
        };

        let mut steps = vec![SessionStep::StartSession];
        for id in 1..=10 {
            steps.push(level(id, 3, true, id % 7));
        }
        steps.extend([
            SessionStep::ClaimCheckpoints,
            SessionStep::Buy {
                item_id: "hammer".to_string(),
            },
            SessionStep::Buy {
                item_id: "rainbow".to_string(),
            },
            SessionStep::UseItem {
                item_id: "hammer".to_string(),
            },
            SessionStep::UseReplay,
            SessionStep::PlayLiveGame,
            SessionStep::AdvanceDays { days: 1 },
            SessionStep::StartSession,
        ]);
        for id in 11..=20 {
            steps.push(level(id, 2 + (id % 2) as u8, true, 5));
        }
        steps.extend([
            SessionStep::ClaimCheckpoints,
            SessionStep::ClaimCompletionBonus,
            SessionStep::AdvanceDays { days: 7 },
            SessionStep::StartSession,
            SessionStep::PlayLiveGame,
        ]);
        Self { steps }
    }
}

/// What one step did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    /// The step.
    pub step: SessionStep,
    /// Whether the economy accepted it.
    pub accepted: bool,
    /// Events it published, in order.
    pub events: Vec<EconomyEvent>,
}

/// Summary of a finished session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Steps run.
    pub steps: usize,
    /// Steps the economy rejected.
    pub rejected: usize,
    /// Events published, by kind.
    pub event_counts: BTreeMap<EventKind, usize>,
    /// Save record at the end of the session.
    pub final_state: Snapshot,
}

impl SessionReport {
    /// Events of one kind.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.event_counts.get(&kind).copied().unwrap_or(0)
    }
}

/// An economy on a scripted clock.
#[derive(Debug)]
pub struct SessionRunner {
    economy: Economy,
    clock: Arc<FixedClock>,
}

impl SessionRunner {
    /// Opens an economy over `port` with the clock pinned at `start_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid.
    pub fn open(
        config: EconomyConfig,
        port: impl StoragePort + 'static,
        start_ms: i64,
    ) -> SessionResult<Self> {
        let clock = Arc::new(FixedClock::new(start_ms));
        let economy = Economy::open(config, port, Arc::clone(&clock) as Arc<dyn Clock>)?;
        Ok(Self { economy, clock })
    }

    /// The economy.
    #[must_use]
    pub fn economy(&self) -> &Economy {
        &self.economy
    }

    /// The session clock.
    #[must_use]
    pub fn clock(&self) -> &FixedClock {
        &self.clock
    }

    /// Runs one step and collects the events it published.
    pub fn run_step(&self, step: &SessionStep) -> StepOutcome {
        let economy = &self.economy;
        economy.drain_events();

        let accepted = match step {
            SessionStep::StartSession => {
                economy.start_session();
                true
            }
            SessionStep::Level { .. } => {
                if let Some(result) = step.level_result() {
                    economy.on_level_complete(&result);
                }
                true
            }
            SessionStep::Buy { item_id } => economy.ledger().purchase_item(item_id),
            SessionStep::UseItem { item_id } => economy.ledger().use_item(item_id),
            SessionStep::PlayMiniGame { game_id } => economy.rotation().play_game(game_id),
            SessionStep::PlayLiveGame => economy
                .rotation()
                .current_games()
                .first()
                .is_some_and(|game| economy.rotation().play_game(&game.id)),
            SessionStep::ClaimCheckpoints => {
                let tracker = economy.progression();
                let available = tracker.available_checkpoints();
                let claimed = available
                    .into_iter()
                    .filter(|&index| tracker.claim_checkpoint(index).is_some())
                    .count();
                claimed > 0
            }
            SessionStep::ClaimCompletionBonus => {
                economy.progression().claim_completion_bonus().is_some()
            }
            SessionStep::UseReplay => economy.daily().use_daily_replay(),
            SessionStep::AdvanceDays { days } => {
                self.clock.advance_days(*days);
                true
            }
        };

        if !accepted {
            tracing::debug!("Session step rejected: {}", step);
        }

        StepOutcome {
            step: step.clone(),
            accepted,
            events: economy.drain_events(),
        }
    }

    /// Runs a script, handing each outcome to `on_step` as it completes.
    pub fn run(&self, script: &SessionScript, mut on_step: impl FnMut(&StepOutcome)) -> SessionReport {
        let mut report = SessionReport::default();
        for step in &script.steps {
            let outcome = self.run_step(step);
            report.steps += 1;
            if !outcome.accepted {
                report.rejected += 1;
            }
            for event in &outcome.events {
                *report.event_counts.entry(event.kind()).or_insert(0) += 1;
            }
            on_step(&outcome);
        }
        report.final_state = self.economy.snapshot();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_economy::{MemoryStorage, MS_PER_DAY};

    fn runner() -> SessionRunner {
        SessionRunner::open(EconomyConfig::default(), MemoryStorage::new(), 100 * MS_PER_DAY).unwrap()
    }

    #[test]
    fn test_script_parses_all_actions() {
        let script = SessionScript::from_toml_str(
            r#"
            [[step]]
            action = "start_session"

            [[step]]
            action = "level"
            level_id = 4
            stars = 2

            [[step]]
            action = "buy"
            item_id = "hammer"

            [[step]]
            action = "play_live_game"

            [[step]]
            action = "advance_days"
            days = 2
            "#,
        )
        .unwrap();

        assert_eq!(script.steps.len(), 5);
        assert_eq!(
            script.steps[1].level_result(),
            Some(LevelResult::new(4, 2, false))
        );
        assert_eq!(script.steps[4], SessionStep::AdvanceDays { days: 2 });
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result = SessionScript::from_toml_str("[[step]]\naction = \"fly\"\n");
        assert!(matches!(result, Err(SessionError::Script(_))));
    }

    #[test]
    fn test_step_collects_its_events() {
        let runner = runner();
        let outcome = runner.run_step(&SessionStep::Level {
            level_id: 5,
            stars: 1,
            first_time: false,
            powerups: 0,
            combo: 0,
        });

        assert!(outcome.accepted);
        let kinds: Vec<EventKind> = outcome.events.iter().map(EconomyEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::CoinsChanged,
                EventKind::DiamondsChanged,
                EventKind::PointsAdded
            ]
        );
    }

    #[test]
    fn test_rejected_purchase_is_reported() {
        let runner = runner();
        let outcome = runner.run_step(&SessionStep::Buy {
            item_id: "rainbow".to_string(),
        });
        assert!(!outcome.accepted);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].kind(), EventKind::PurchaseFailed);
    }

    #[test]
    fn test_demo_session() {
        let runner = runner();
        let report = runner.run(&SessionScript::demo(), |_| {});

        assert_eq!(report.steps, SessionScript::demo().steps.len());
        assert_eq!(report.final_state.total_levels_played, 20);
        assert_eq!(report.count(EventKind::DailyLoginBonus), 3);
        assert!(report.count(EventKind::CheckpointClaimed) >= 2);
        assert_eq!(report.count(EventKind::PurchaseSuccess), 2);
        assert_eq!(report.count(EventKind::ItemUsed), 1);
    }

    #[test]
    fn test_advance_days_moves_clock() {
        let runner = runner();
        let before = runner.clock().today();
        runner.run_step(&SessionStep::AdvanceDays { days: 3 });
        assert_eq!((runner.clock().today() - before).num_days(), 3);
    }
}
