//! # CASCADE Shared
//!
//! Types shared by the economy and its collaborators (scenes, HUD, match
//! engine): rewards, level results, events and the static economy config.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on rendering, audio or the match-3 engine.
//! The only engine type here is [`LevelResult`], the boundary record the
//! engine hands over when a level ends.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod events;
pub mod level;
pub mod reward;

pub use config::{
    Checkpoint, ConfigError, ConfigResult, DailyConfig, EconomyConfig, ItemCategory,
    LevelRewardConfig, MiniGameConfig, MiniGameFlags, PointsConfig, ProgressionEventDefinition,
    RotationConfig, ShopItem,
};
pub use events::{EconomyEvent, EventKind};
pub use level::{LevelResult, MAX_STARS};
pub use reward::{Currency, ItemId, Reward};
