//! # Progression Event Tracker
//!
//! **Checkpoint State Machine over an Accumulating Point Counter**
//!
//! ```text
//!            points >= threshold              claim_checkpoint()
//! ┌────────┐ ─────────────────> ┌───────────┐ ─────────────────> ┌─────────┐
//! │ Locked │                    │ Available │                    │ Claimed │
//! └────────┘                    └───────────┘                    └─────────┘
//! ```
//!
//! The event as a whole is complete once points reach the last checkpoint's
//! threshold. Completion is derived from the points, never stored.
//!
//! ## Guarantees
//!
//! 1. **Exactly-once claims**: an index is recorded before its reward is
//!    dispatched, and a recorded index is never paid again this cycle
//! 2. **No claims ahead of progress**: a checkpoint below its threshold
//!    cannot be claimed
//! 3. **Zero mutation on rejection**: a rejected claim writes nothing

use std::collections::BTreeSet;
use std::sync::Arc;

use cascade_shared::{
    Checkpoint, EconomyConfig, EconomyEvent, EventKind, LevelResult, PointsConfig,
    ProgressionEventDefinition, Reward,
};
use chrono::NaiveDate;

use crate::bus::{EventBus, Subscription};
use crate::clock::Clock;
use crate::error::{EconomyError, EconomyResult};
use crate::ledger::Ledger;
use crate::snapshot::{ProgressionEventState, Snapshot};
use crate::store::SharedStore;

/// State of one checkpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointStatus {
    /// Threshold not reached.
    Locked,
    /// Threshold reached, reward not yet claimed.
    Available,
    /// Reward claimed.
    Claimed,
}

/// The next checkpoint still locked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NextCheckpoint {
    /// Checkpoint index.
    pub index: usize,
    /// The checkpoint.
    pub checkpoint: Checkpoint,
    /// Points still needed.
    pub points_remaining: u64,
}

/// Event points earned by a level.
///
/// `level_complete + stars*per_star + perfect_level (3 stars) +
/// powerups*per_powerup + big_combo (max combo at threshold)`.
#[must_use]
pub fn calculate_points(config: &PointsConfig, result: &LevelResult) -> u64 {
    let stars = u64::from(result.clamped_stars());
    let mut points = config
        .level_complete
        .saturating_add(stars.saturating_mul(config.per_star))
        .saturating_add(u64::from(result.powerups_used).saturating_mul(config.per_powerup));
    if result.is_perfect() {
        points = points.saturating_add(config.perfect_level);
    }
    if result.max_combo >= config.big_combo_threshold {
        points = points.saturating_add(config.big_combo);
    }
    points
}

/// Tracks the live progression event.
pub struct ProgressionTracker {
    store: SharedStore,
    ledger: Arc<Ledger>,
    config: Arc<EconomyConfig>,
    clock: Arc<dyn Clock>,
    bus: EventBus,
}

impl ProgressionTracker {
    /// Creates the tracker. A persisted state that belongs to a different
    /// event id is replaced with a fresh cycle of the configured event; one
    /// saved without a start date keeps its progress and starts today.
    #[must_use]
    pub fn new(
        store: SharedStore,
        ledger: Arc<Ledger>,
        config: Arc<EconomyConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        {
            let event_id = config.event.id.as_str();
            let mut guard = store.lock();
            let today = clock.today();
            let (stale, undated) = guard
                .load()
                .current_event
                .as_ref()
                .map_or((true, false), |state| {
                    (state.event_id != event_id, state.start_date.is_none())
                });
            if stale {
                tracing::info!("Starting progression event {}", event_id);
                guard.update(|s| {
                    s.current_event = Some(ProgressionEventState::new(event_id, today));
                });
            } else if undated {
                guard.update(|s| {
                    if let Some(state) = s.current_event.as_mut() {
                        state.start_date = Some(today);
                    }
                });
            }
        }

        Self {
            store,
            ledger,
            config,
            clock,
            bus: EventBus::new(),
        }
    }

    /// The tracker's event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    /// Subscribes to one kind of progression event.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&EconomyEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    /// The event definition being tracked.
    #[must_use]
    pub fn definition(&self) -> &ProgressionEventDefinition {
        &self.config.event
    }

    /// Event points a level result is worth.
    #[must_use]
    pub fn calculate_points(&self, result: &LevelResult) -> u64 {
        calculate_points(&self.config.points, result)
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Adds a level's points to the event and returns the points added.
    ///
    /// Publishes `points_added`, then `checkpoint_available` for each
    /// unclaimed checkpoint this level crossed, then `event_complete` if the
    /// total is at or past the final threshold.
    pub fn on_level_complete(&self, result: &LevelResult) -> u64 {
        let earned = self.calculate_points(result);
        let today = self.clock.today();
        let definition = self.definition();

        let (before, after, claimed) = self.store.lock().update(|s| {
            let state = live_state_mut(s, definition, today);
            let before = state.points;
            state.points = before.saturating_add(earned);
            (before, state.points, state.claimed_checkpoints.clone())
        });

        self.bus.publish(&EconomyEvent::PointsAdded {
            points: earned,
            total: after,
        });

        for (index, checkpoint) in definition.checkpoints.iter().enumerate() {
            let crossed = before < checkpoint.points_required && after >= checkpoint.points_required;
            if crossed && !claimed.contains(&index) {
                self.bus.publish(&EconomyEvent::CheckpointAvailable {
                    index,
                    label: checkpoint.label.clone(),
                });
            }
        }

        if let Some(final_threshold) = definition.final_threshold() {
            if after >= final_threshold {
                self.bus.publish(&EconomyEvent::EventComplete {
                    event_id: definition.id.clone(),
                    points: after,
                    first_time: before < final_threshold,
                });
            }
        }

        earned
    }

    /// Claims a checkpoint's reward.
    ///
    /// Returns `None`, writing nothing, if the index is out of range, the
    /// threshold is not met, or it was already claimed. Otherwise records the
    /// claim, pays the reward through the ledger and returns it.
    pub fn claim_checkpoint(&self, index: usize) -> Option<Reward> {
        let today = self.clock.today();
        let definition = self.definition();

        let result = self.store.lock().try_update(|s| {
            let checkpoint = definition.checkpoints.get(index).ok_or(
                EconomyError::CheckpointOutOfRange {
                    index,
                    count: definition.checkpoints.len(),
                },
            )?;
            let (points, claimed) = live_state(s, definition)
                .map_or((0, false), |state| {
                    (state.points, state.claimed_checkpoints.contains(&index))
                });
            if points < checkpoint.points_required {
                return Err(EconomyError::CheckpointLocked {
                    index,
                    points,
                    required: checkpoint.points_required,
                });
            }
            if claimed {
                return Err(EconomyError::CheckpointAlreadyClaimed(index));
            }

            live_state_mut(s, definition, today)
                .claimed_checkpoints
                .insert(index);
            Ok(checkpoint.reward.clone())
        });

        match result {
            Ok(reward) => {
                let source = format!("event:{}:checkpoint_{}", definition.id, index);
                self.ledger.award_reward(&reward, &source);
                self.bus.publish(&EconomyEvent::CheckpointClaimed {
                    index,
                    reward: reward.clone(),
                });
                Some(reward)
            }
            Err(err) => {
                tracing::debug!("Checkpoint claim rejected: {}", err);
                None
            }
        }
    }

    /// Claims the completion bonus once every checkpoint has been claimed.
    ///
    /// Returns `None`, writing nothing, before that point, after the bonus
    /// was already claimed this cycle, or if the event has no bonus.
    pub fn claim_completion_bonus(&self) -> Option<Vec<Reward>> {
        let today = self.clock.today();
        let definition = self.definition();

        let result = self.store.lock().try_update(|s| {
            check_completion_bonus(live_state(s, definition), definition)?;
            live_state_mut(s, definition, today).completion_bonus_claimed = true;
            Ok(definition.completion_bonus.clone())
        });

        match result {
            Ok(rewards) => {
                let source = format!("event:{}:completion", definition.id);
                for reward in &rewards {
                    self.ledger.award_reward(reward, &source);
                }
                Some(rewards)
            }
            Err(err) => {
                tracing::debug!("Completion bonus rejected: {}", err);
                None
            }
        }
    }

    /// Starts a new cycle: points to zero, claims cleared.
    pub fn reset_event(&self) {
        let today = self.clock.today();
        let event_id = self.definition().id.clone();
        tracing::info!("Resetting progression event {}", event_id);
        self.store.lock().update(|s| {
            s.current_event = Some(ProgressionEventState::new(event_id, today));
        });
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Persisted state of the current cycle.
    #[must_use]
    pub fn state(&self) -> ProgressionEventState {
        let mut store = self.store.lock();
        live_state(store.load(), self.definition())
            .cloned()
            .unwrap_or_else(|| ProgressionEventState::new(&self.definition().id, self.clock.today()))
    }

    /// Points accumulated this cycle.
    #[must_use]
    pub fn points(&self) -> u64 {
        self.state().points
    }

    /// Status of one checkpoint, `None` if out of range.
    #[must_use]
    pub fn checkpoint_status(&self, index: usize) -> Option<CheckpointStatus> {
        let state = self.state();
        let checkpoint = self.definition().checkpoints.get(index)?;
        Some(status_of(&state, index, checkpoint))
    }

    /// Indices reached but not yet claimed.
    #[must_use]
    pub fn available_checkpoints(&self) -> Vec<usize> {
        let state = self.state();
        self.definition()
            .checkpoints
            .iter()
            .enumerate()
            .filter(|(index, checkpoint)| {
                status_of(&state, *index, checkpoint) == CheckpointStatus::Available
            })
            .map(|(index, _)| index)
            .collect()
    }

    /// Indices claimed this cycle.
    #[must_use]
    pub fn claimed_checkpoints(&self) -> BTreeSet<usize> {
        self.state().claimed_checkpoints
    }

    /// First checkpoint not yet reached, `None` once the event is complete.
    #[must_use]
    pub fn next_checkpoint(&self) -> Option<NextCheckpoint> {
        let points = self.points();
        self.definition()
            .checkpoints
            .iter()
            .enumerate()
            .find(|(_, checkpoint)| checkpoint.points_required > points)
            .map(|(index, checkpoint)| NextCheckpoint {
                index,
                checkpoint: checkpoint.clone(),
                points_remaining: checkpoint.points_required - points,
            })
    }

    /// Progress toward the final threshold, 0 to 100.
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        let Some(final_threshold) = self.definition().final_threshold() else {
            return 0;
        };
        if final_threshold == 0 {
            return 100;
        }
        let percent = u128::from(self.points()) * 100 / u128::from(final_threshold);
        u8::try_from(percent.min(100)).unwrap_or(100)
    }

    /// Whether points have reached the final threshold.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.definition()
            .final_threshold()
            .is_some_and(|threshold| self.points() >= threshold)
    }
}

impl std::fmt::Debug for ProgressionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionTracker")
            .field("event", &self.config.event.id)
            .finish_non_exhaustive()
    }
}

fn status_of(state: &ProgressionEventState, index: usize, checkpoint: &Checkpoint) -> CheckpointStatus {
    if state.claimed_checkpoints.contains(&index) {
        CheckpointStatus::Claimed
    } else if state.points >= checkpoint.points_required {
        CheckpointStatus::Available
    } else {
        CheckpointStatus::Locked
    }
}

fn check_completion_bonus(
    state: Option<&ProgressionEventState>,
    definition: &ProgressionEventDefinition,
) -> EconomyResult<()> {
    if definition.completion_bonus.is_empty() {
        return Err(EconomyError::CompletionBonusUnavailable("event has no completion bonus"));
    }
    let Some(state) = state else {
        return Err(EconomyError::CompletionBonusUnavailable("checkpoints unclaimed"));
    };
    if state.completion_bonus_claimed {
        return Err(EconomyError::CompletionBonusUnavailable("already claimed"));
    }
    if state.claimed_checkpoints.len() < definition.checkpoints.len() {
        return Err(EconomyError::CompletionBonusUnavailable("checkpoints unclaimed"));
    }
    Ok(())
}

/// The persisted state if it belongs to `definition`.
fn live_state<'a>(
    snapshot: &'a Snapshot,
    definition: &ProgressionEventDefinition,
) -> Option<&'a ProgressionEventState> {
    snapshot
        .current_event
        .as_ref()
        .filter(|state| state.event_id == definition.id)
}

/// The persisted state of `definition`, starting a fresh cycle if missing.
fn live_state_mut<'a>(
    snapshot: &'a mut Snapshot,
    definition: &ProgressionEventDefinition,
    today: NaiveDate,
) -> &'a mut ProgressionEventState {
    if live_state(snapshot, definition).is_none() {
        snapshot.current_event = Some(ProgressionEventState::new(&definition.id, today));
    }
    snapshot
        .current_event
        .get_or_insert_with(|| ProgressionEventState::new(&definition.id, today))
}
