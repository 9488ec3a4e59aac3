//! # Economy Error Types
//!
//! All errors that can occur in the economy system.
//!
//! Manager operations never return these to callers: validation failures
//! surface as `false`/`None` and storage failures are logged at the store
//! boundary. The variants still name every failure so rejected operations
//! can be logged with a reason.

use cascade_shared::{ConfigError, Currency};
use thiserror::Error;

/// Errors that can occur in the economy system.
#[derive(Error, Debug)]
pub enum EconomyError {
    /// Attempted to spend more than the balance.
    #[error("insufficient {currency}: need {required}, have {available}")]
    InsufficientFunds {
        /// Currency that was short.
        currency: Currency,
        /// The amount required.
        required: u64,
        /// The amount available.
        available: u64,
    },

    /// Attempted to use an item with a zero count.
    #[error("no {0} left in inventory")]
    ItemDepleted(String),

    /// Shop item not found in config.
    #[error("shop item not found: {0}")]
    UnknownShopItem(String),

    /// Mini-game not found in config.
    #[error("mini-game not found: {0}")]
    UnknownMiniGame(String),

    /// Mini-game is not in the live rotation.
    #[error("mini-game {0} is not in the current rotation")]
    MiniGameNotLive(String),

    /// Checkpoint index past the end of the event.
    #[error("checkpoint {index} out of range (event has {count})")]
    CheckpointOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of checkpoints.
        count: usize,
    },

    /// Checkpoint threshold not yet reached.
    #[error("checkpoint {index} locked: {points}/{required} points")]
    CheckpointLocked {
        /// Requested index.
        index: usize,
        /// Current points.
        points: u64,
        /// Points required.
        required: u64,
    },

    /// Checkpoint already claimed this cycle.
    #[error("checkpoint {0} already claimed")]
    CheckpointAlreadyClaimed(usize),

    /// Completion bonus unavailable.
    #[error("completion bonus not claimable: {0}")]
    CompletionBonusUnavailable(&'static str),

    /// Daily replay allowance used up.
    #[error("daily replays exhausted ({0} used)")]
    DailyReplaysExhausted(u32),

    /// Storage medium failure.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Stored record failed its integrity check.
    #[error("save record corrupted: {0}")]
    CorruptedRecord(String),

    /// Snapshot (de)serialization failure.
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration file.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
