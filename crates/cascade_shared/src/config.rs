//! # Static Economy Configuration
//!
//! All balance data (reward constants, event checkpoints, shop catalogue and
//! mini-game list) is loaded once at startup from a TOML file. Every section
//! is optional; missing sections fall back to the built-in defaults below.
//!
//! ```toml
//! [level_rewards]
//! base = 50
//! per_star = 10
//!
//! [rotation]
//! window_days = 7
//!
//! [[shop]]
//! id = "hammer"
//! category = "powerup"
//! coin_cost = 300
//! quantity = 1
//! icon = "icons/hammer.png"
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reward::{ItemId, Reward};

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The TOML could not be parsed into the config schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config parsed but breaks an economy rule.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

// ============================================================================
// Reward constants
// ============================================================================

/// Coins and diamonds granted for finishing a level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelRewardConfig {
    /// Coins for any completion.
    pub base: u64,
    /// Coins per star.
    pub per_star: u64,
    /// Extra coins for a three-star completion.
    pub perfect_bonus: u64,
    /// Extra coins the first time a level is completed.
    pub first_time_bonus: u64,
    /// Diamonds on every tenth level.
    pub every_10_levels: u64,
    /// Diamonds on every fifth level that is not a tenth.
    pub every_5_levels: u64,
}

impl Default for LevelRewardConfig {
    fn default() -> Self {
        Self {
            base: 50,
            per_star: 10,
            perfect_bonus: 20,
            first_time_bonus: 30,
            every_10_levels: 5,
            every_5_levels: 2,
        }
    }
}

/// Event points granted for finishing a level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointsConfig {
    /// Points for any completion.
    pub level_complete: u64,
    /// Points per star.
    pub per_star: u64,
    /// Extra points for a three-star completion.
    pub perfect_level: u64,
    /// Points per powerup used.
    pub per_powerup: u64,
    /// Extra points when the max combo reaches `big_combo_threshold`.
    pub big_combo: u64,
    /// Combo length that counts as big.
    pub big_combo_threshold: u32,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            level_complete: 100,
            per_star: 50,
            perfect_level: 100,
            per_powerup: 25,
            big_combo: 75,
            big_combo_threshold: 5,
        }
    }
}

/// Daily login bonus and replay allowance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyConfig {
    /// Rewards granted on the first login of a calendar day.
    pub login_bonus: Vec<Reward>,
    /// Replays allowed per calendar day.
    pub max_replays: u32,
}

impl Default for DailyConfig {
    fn default() -> Self {
        Self {
            login_bonus: vec![Reward::coins(100)],
            max_replays: 3,
        }
    }
}

/// Mini-game rotation settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Days each pair of mini-games stays live.
    pub window_days: u32,
    /// Reject purchases of games outside the live pair.
    pub enforce_rotation: bool,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            enforce_rotation: false,
        }
    }
}

// ============================================================================
// Catalogue
// ============================================================================

/// Shop item category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    /// Used during a level.
    Powerup,
    /// Applied before a level starts.
    Booster,
}

/// An entry in the coin shop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    /// Item id; purchases add this id to the inventory.
    pub id: ItemId,
    /// Item category.
    pub category: ItemCategory,
    /// Price in coins.
    pub coin_cost: u64,
    /// Items granted per purchase.
    pub quantity: u32,
    /// Icon asset path.
    #[serde(default)]
    pub icon: String,
}

/// Flags for mini-game presentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MiniGameFlags(u32);

impl MiniGameFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Recently added game.
    pub const NEW: Self = Self(1 << 0);
    /// Highlighted in the lobby.
    pub const FEATURED: Self = Self(1 << 1);
    /// Uses device tilt controls.
    pub const TILT: Self = Self(1 << 2);

    /// Checks if a specific flag is set.
    #[inline]
    #[must_use]
    pub const fn has(self, flag: Self) -> bool {
        (self.0 & flag.0) != 0
    }

    /// Combines two flag sets.
    #[inline]
    #[must_use]
    pub const fn with(self, flag: Self) -> Self {
        Self(self.0 | flag.0)
    }
}

/// An optional paid mini-game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniGameConfig {
    /// Stable id, also the key of its play statistics.
    pub id: String,
    /// Price in diamonds per play.
    pub diamond_cost: u64,
    /// Display name.
    pub name: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Presentation flags.
    #[serde(default)]
    pub flags: MiniGameFlags,
}

// ============================================================================
// Progression event
// ============================================================================

/// A point threshold within a progression event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Points needed to unlock the reward.
    pub points_required: u64,
    /// Reward granted when claimed.
    pub reward: Reward,
    /// Display label.
    #[serde(default)]
    pub label: String,
}

/// Static definition of the live progression event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionEventDefinition {
    /// Event id; a persisted state with another id starts a new cycle.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Checkpoints ordered by strictly increasing `points_required`.
    pub checkpoints: Vec<Checkpoint>,
    /// Rewards for claiming every checkpoint.
    #[serde(default)]
    pub completion_bonus: Vec<Reward>,
}

impl ProgressionEventDefinition {
    /// Threshold of the last checkpoint, or `None` for an empty event.
    #[must_use]
    pub fn final_threshold(&self) -> Option<u64> {
        self.checkpoints.last().map(|c| c.points_required)
    }

    /// Checks ordering rules.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the id is empty, there are no
    /// checkpoints, or thresholds are not strictly increasing.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.id.is_empty() {
            return Err(ConfigError::Invalid("event id must not be empty".to_string()));
        }
        if self.checkpoints.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "event {} has no checkpoints",
                self.id
            )));
        }
        for pair in self.checkpoints.windows(2) {
            if pair[1].points_required <= pair[0].points_required {
                return Err(ConfigError::Invalid(format!(
                    "event {}: checkpoint thresholds must strictly increase ({} then {})",
                    self.id, pair[0].points_required, pair[1].points_required
                )));
            }
        }
        Ok(())
    }
}

impl Default for ProgressionEventDefinition {
    fn default() -> Self {
        Self {
            id: "gem_rush".to_string(),
            name: "Gem Rush".to_string(),
            checkpoints: vec![
                Checkpoint {
                    points_required: 500,
                    reward: Reward::coins(100),
                    label: "Warm Up".to_string(),
                },
                Checkpoint {
                    points_required: 1500,
                    reward: Reward::powerup("hammer", 1),
                    label: "Smasher".to_string(),
                },
                Checkpoint {
                    points_required: 3000,
                    reward: Reward::diamonds(5),
                    label: "Sparkle".to_string(),
                },
                Checkpoint {
                    points_required: 5000,
                    reward: Reward::booster("rainbow", 1),
                    label: "Prism".to_string(),
                },
                Checkpoint {
                    points_required: 8000,
                    reward: Reward::coins(500),
                    label: "Gem Master".to_string(),
                },
            ],
            completion_bonus: vec![Reward::diamonds(10), Reward::booster("color_bomb", 1)],
        }
    }
}

// ============================================================================
// Root
// ============================================================================

/// Complete static economy configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Level completion rewards.
    pub level_rewards: LevelRewardConfig,
    /// Level completion event points.
    pub points: PointsConfig,
    /// Daily bonuses.
    pub daily: DailyConfig,
    /// Mini-game rotation.
    pub rotation: RotationConfig,
    /// Coin shop catalogue.
    pub shop: Vec<ShopItem>,
    /// All mini-games, in rotation order.
    pub mini_games: Vec<MiniGameConfig>,
    /// The live progression event.
    pub event: ProgressionEventDefinition,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            level_rewards: LevelRewardConfig::default(),
            points: PointsConfig::default(),
            daily: DailyConfig::default(),
            rotation: RotationConfig::default(),
            shop: default_shop(),
            mini_games: default_mini_games(),
            event: ProgressionEventDefinition::default(),
        }
    }
}

impl EconomyConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed TOML and
    /// `ConfigError::Invalid` if validation fails.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise the
    /// errors of [`EconomyConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` on a zero rotation window, duplicate
    /// shop or mini-game ids, or an invalid event definition.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.rotation.window_days == 0 {
            return Err(ConfigError::Invalid(
                "rotation.window_days must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for item in &self.shop {
            if !seen.insert(item.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate shop item id {}",
                    item.id
                )));
            }
        }

        let mut seen = HashSet::new();
        for game in &self.mini_games {
            if !seen.insert(game.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate mini-game id {}",
                    game.id
                )));
            }
        }

        self.event.validate()
    }

    /// Looks up a shop item.
    #[must_use]
    pub fn shop_item(&self, id: &str) -> Option<&ShopItem> {
        self.shop.iter().find(|item| item.id == id)
    }

    /// Looks up a mini-game.
    #[must_use]
    pub fn mini_game(&self, id: &str) -> Option<&MiniGameConfig> {
        self.mini_games.iter().find(|game| game.id == id)
    }
}

fn default_shop() -> Vec<ShopItem> {
    let item = |id: &str, category, coin_cost, quantity| ShopItem {
        id: id.to_string(),
        category,
        coin_cost,
        quantity,
        icon: format!("icons/{id}.png"),
    };
    vec![
        item("hammer", ItemCategory::Powerup, 300, 1),
        item("shuffle", ItemCategory::Powerup, 450, 3),
        item("extra_moves", ItemCategory::Powerup, 250, 1),
        item("rainbow", ItemCategory::Booster, 500, 1),
        item("color_bomb", ItemCategory::Booster, 400, 1),
    ]
}

fn default_mini_games() -> Vec<MiniGameConfig> {
    let game = |id: &str, diamond_cost, name: &str, description: &str, flags| MiniGameConfig {
        id: id.to_string(),
        diamond_cost,
        name: name.to_string(),
        description: description.to_string(),
        flags,
    };
    vec![
        game("bubble_pop", 5, "Bubble Pop", "Pop chains of matching bubbles.", MiniGameFlags::NONE),
        game("treasure_dig", 8, "Treasure Dig", "Dig for buried gems.", MiniGameFlags::FEATURED),
        game("lucky_wheel", 10, "Lucky Wheel", "Spin for a prize.", MiniGameFlags::NONE),
        game("gem_slide", 6, "Gem Slide", "Tilt the board to slide gems home.", MiniGameFlags::TILT.with(MiniGameFlags::NEW)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        EconomyConfig::default().validate().unwrap();
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = EconomyConfig::from_toml_str(
            r#"
            [level_rewards]
            base = 75
            "#,
        )
        .unwrap();
        assert_eq!(config.level_rewards.base, 75);
        assert_eq!(config.level_rewards.per_star, 10);
        assert_eq!(config.rotation.window_days, 7);
        assert_eq!(config.event.id, "gem_rush");
    }

    #[test]
    fn test_non_increasing_checkpoints_rejected() {
        let result = EconomyConfig::from_toml_str(
            r#"
            [event]
            id = "broken"
            checkpoints = [
                { points_required = 100, reward = { type = "coins", amount = 1 } },
                { points_required = 100, reward = { type = "coins", amount = 2 } },
            ]
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_window_rejected() {
        let result = EconomyConfig::from_toml_str("[rotation]\nwindow_days = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_duplicate_shop_ids_rejected() {
        let result = EconomyConfig::from_toml_str(
            r#"
            [[shop]]
            id = "hammer"
            category = "powerup"
            coin_cost = 1
            quantity = 1

            [[shop]]
            id = "hammer"
            category = "booster"
            coin_cost = 2
            quantity = 1
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_flags() {
        let flags = MiniGameFlags::TILT.with(MiniGameFlags::NEW);
        assert!(flags.has(MiniGameFlags::NEW));
        assert!(!flags.has(MiniGameFlags::FEATURED));
    }
}
