//! # CASCADE Economy
//!
//! Meta-progression economy for the CASCADE tile-matching game: what a
//! player owns and earns around the levels.
//!
//! ## Design Principles
//!
//! 1. **Unsigned, saturating arithmetic** - balances and counts can never go
//!    negative or wrap
//! 2. **validate -> mutate -> persist -> publish** - a rejected operation
//!    changes nothing and publishes nothing
//! 3. **One save record** - every manager writes through the same
//!    [`SnapshotStore`]
//! 4. **External configuration** - all balance data in TOML files
//!
//! ## Thread Safety
//!
//! Managers are `Send + Sync` and share the store behind a
//! `parking_lot::Mutex`. The lock is released before events are published,
//! so subscribers may call back into any manager.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cascade_economy::{Economy, FixedClock, MemoryStorage};
//! use cascade_shared::{EconomyConfig, LevelResult};
//!
//! let economy = Economy::open(EconomyConfig::default(), MemoryStorage::new(), clock)?;
//! economy.start_session();
//!
//! let paid = economy.on_level_complete(&LevelResult::new(10, 3, true));
//! assert_eq!(paid.rewards.coins, 130);
//!
//! if economy.ledger().can_afford("hammer") {
//!     economy.ledger().purchase_item("hammer");
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod bus;
pub mod clock;
pub mod daily;
pub mod economy;
pub mod error;
pub mod ledger;
pub mod progression;
pub mod rotation;
pub mod snapshot;
pub mod store;

pub use bus::{EventBus, Subscription, SubscriptionId};
pub use clock::{Clock, FixedClock, SystemClock, MS_PER_DAY};
pub use daily::DailyRewards;
pub use economy::{Economy, LevelCompletion, SessionStart};
pub use error::{EconomyError, EconomyResult};
pub use ledger::{Ledger, LevelRewards};
pub use progression::{CheckpointStatus, NextCheckpoint, ProgressionTracker};
pub use rotation::{select_rotation, time_until_rotation, RotationScheduler};
pub use snapshot::{
    DailyReplayState, MiniGameStats, ProgressionEventState, Snapshot, CURRENT_SCHEMA_VERSION,
};
pub use store::{FileStorage, MemoryStorage, SharedStore, SnapshotStore, StoragePort};
