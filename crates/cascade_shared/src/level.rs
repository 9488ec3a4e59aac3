//! Level outcome reported by the match-3 engine.

use serde::{Deserialize, Serialize};

/// Highest star rating a level can award.
pub const MAX_STARS: u8 = 3;

/// Outcome of a completed level, supplied by the match engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelResult {
    /// Level number (1-based).
    pub level_id: u32,
    /// Star rating, 0 to 3.
    pub stars: u8,
    /// Whether this is the first time the level was completed.
    pub is_first_time: bool,
    /// Powerups consumed during the level.
    pub powerups_used: u32,
    /// Longest cascade combo reached.
    pub max_combo: u32,
}

impl LevelResult {
    /// Creates a result with no powerups used and no combo.
    #[must_use]
    pub const fn new(level_id: u32, stars: u8, is_first_time: bool) -> Self {
        Self {
            level_id,
            stars,
            is_first_time,
            powerups_used: 0,
            max_combo: 0,
        }
    }

    /// Sets the powerups used.
    #[must_use]
    pub const fn with_powerups(mut self, powerups_used: u32) -> Self {
        self.powerups_used = powerups_used;
        self
    }

    /// Sets the max combo.
    #[must_use]
    pub const fn with_combo(mut self, max_combo: u32) -> Self {
        self.max_combo = max_combo;
        self
    }

    /// Star rating clamped to `0..=3`.
    #[inline]
    #[must_use]
    pub const fn clamped_stars(&self) -> u8 {
        if self.stars > MAX_STARS {
            MAX_STARS
        } else {
            self.stars
        }
    }

    /// Whether the level was completed with the maximum rating.
    #[inline]
    #[must_use]
    pub const fn is_perfect(&self) -> bool {
        self.clamped_stars() == MAX_STARS
    }
}
