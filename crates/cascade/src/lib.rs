//! # CASCADE
//!
//! Host crate for the CASCADE meta-progression economy.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        CASCADE HOST                              │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │   data/economy.toml ──> EconomyConfig ──┐                        │
//! │                                         ▼                        │
//! │   SessionScript ──> SessionRunner ──> Economy ──> StoragePort    │
//! │                          │               │                       │
//! │                    FixedClock        Ledger                      │
//! │                                      ProgressionTracker          │
//! │                                      RotationScheduler           │
//! │                                      DailyRewards                │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `session`: scripted player sessions and their reports

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod session;

// Re-export the economy crates
pub use cascade_economy as economy;
pub use cascade_shared as shared;

pub use session::{
    SessionError, SessionReport, SessionResult, SessionRunner, SessionScript, SessionStep,
    StepOutcome,
};

use cascade_shared::{ConfigResult, EconomyConfig};

/// The shipped balance data.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../data/economy.toml");

/// Parses the shipped balance data.
///
/// # Errors
///
/// Returns an error if the bundled TOML is malformed or invalid.
pub fn shipped_config() -> ConfigResult<EconomyConfig> {
    EconomyConfig::from_toml_str(DEFAULT_CONFIG_TOML)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_config_matches_defaults() {
        let shipped = shipped_config().unwrap();
        assert_eq!(shipped, EconomyConfig::default());
    }
}
