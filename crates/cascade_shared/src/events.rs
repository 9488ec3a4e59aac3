//! Economy events consumed by rendering and UI.
//!
//! Every event carries enough data to update a HUD without querying back.

use serde::{Deserialize, Serialize};

use crate::reward::{Currency, ItemId, Reward};

/// Event kind discriminator, used as the subscription key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Coin balance changed.
    CoinsChanged,
    /// Diamond balance changed.
    DiamondsChanged,
    /// A reward was granted.
    RewardEarned,
    /// Items were added to the inventory.
    ItemAdded,
    /// An item was consumed.
    ItemUsed,
    /// A shop purchase completed.
    PurchaseSuccess,
    /// A shop purchase was rejected for lack of coins.
    PurchaseFailed,
    /// Event points were added.
    PointsAdded,
    /// A checkpoint became claimable.
    CheckpointAvailable,
    /// A checkpoint was claimed.
    CheckpointClaimed,
    /// The event's final threshold is reached.
    EventComplete,
    /// A mini-game play was purchased.
    MiniGamePlayed,
    /// The daily login bonus was granted.
    DailyLoginBonus,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::CoinsChanged,
        Self::DiamondsChanged,
        Self::RewardEarned,
        Self::ItemAdded,
        Self::ItemUsed,
        Self::PurchaseSuccess,
        Self::PurchaseFailed,
        Self::PointsAdded,
        Self::CheckpointAvailable,
        Self::CheckpointClaimed,
        Self::EventComplete,
        Self::MiniGamePlayed,
        Self::DailyLoginBonus,
    ];

    /// Stable snake_case name, e.g. `"coins_changed"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CoinsChanged => "coins_changed",
            Self::DiamondsChanged => "diamonds_changed",
            Self::RewardEarned => "reward_earned",
            Self::ItemAdded => "item_added",
            Self::ItemUsed => "item_used",
            Self::PurchaseSuccess => "purchase_success",
            Self::PurchaseFailed => "purchase_failed",
            Self::PointsAdded => "points_added",
            Self::CheckpointAvailable => "checkpoint_available",
            Self::CheckpointClaimed => "checkpoint_claimed",
            Self::EventComplete => "event_complete",
            Self::MiniGamePlayed => "minigame_played",
            Self::DailyLoginBonus => "daily_login_bonus",
        }
    }

    /// The balance-change kind for a currency.
    #[must_use]
    pub const fn balance_changed(currency: Currency) -> Self {
        match currency {
            Currency::Coins => Self::CoinsChanged,
            Currency::Diamonds => Self::DiamondsChanged,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change published by an economy manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EconomyEvent {
    /// A currency balance changed.
    BalanceChanged {
        /// Currency that changed.
        currency: Currency,
        /// Signed change (+credit, -debit).
        amount: i64,
        /// Balance after the change.
        total: u64,
        /// What caused the change.
        source: String,
    },
    /// A reward was granted.
    RewardEarned {
        /// The reward.
        reward: Reward,
        /// What granted it.
        source: String,
    },
    /// Items were added to the inventory.
    ItemAdded {
        /// Item added.
        item_id: ItemId,
        /// Quantity added.
        quantity: u32,
        /// Count after the change.
        total: u32,
    },
    /// One item was consumed.
    ItemUsed {
        /// Item consumed.
        item_id: ItemId,
        /// Count after the change.
        remaining: u32,
    },
    /// A shop purchase completed.
    PurchaseSuccess {
        /// Shop item bought.
        item_id: ItemId,
        /// Coins spent.
        cost: u64,
        /// Items granted.
        quantity: u32,
    },
    /// A shop purchase was rejected.
    PurchaseFailed {
        /// Shop item requested.
        item_id: ItemId,
        /// Coins required.
        cost: u64,
        /// Coins available.
        balance: u64,
    },
    /// Event points were added.
    PointsAdded {
        /// Points added.
        points: u64,
        /// Event total after the change.
        total: u64,
    },
    /// A checkpoint threshold was crossed.
    CheckpointAvailable {
        /// Checkpoint index.
        index: usize,
        /// Checkpoint label.
        label: String,
    },
    /// A checkpoint was claimed.
    CheckpointClaimed {
        /// Checkpoint index.
        index: usize,
        /// Reward granted.
        reward: Reward,
    },
    /// The event's final threshold is met.
    ///
    /// Published after every level completion at or past the final
    /// threshold; `first_time` marks the completion that crossed it.
    EventComplete {
        /// Event id.
        event_id: String,
        /// Event total.
        points: u64,
        /// True only for the completion that crossed the final threshold.
        first_time: bool,
    },
    /// A mini-game play was purchased.
    MiniGamePlayed {
        /// Mini-game id.
        game_id: String,
        /// Diamonds spent.
        diamond_cost: u64,
        /// Lifetime plays after this one.
        total_plays: u64,
    },
    /// The daily login bonus was granted.
    DailyLoginBonus {
        /// Rewards granted.
        rewards: Vec<Reward>,
    },
}

impl EconomyEvent {
    /// The subscription key of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::BalanceChanged { currency, .. } => EventKind::balance_changed(*currency),
            Self::RewardEarned { .. } => EventKind::RewardEarned,
            Self::ItemAdded { .. } => EventKind::ItemAdded,
            Self::ItemUsed { .. } => EventKind::ItemUsed,
            Self::PurchaseSuccess { .. } => EventKind::PurchaseSuccess,
            Self::PurchaseFailed { .. } => EventKind::PurchaseFailed,
            Self::PointsAdded { .. } => EventKind::PointsAdded,
            Self::CheckpointAvailable { .. } => EventKind::CheckpointAvailable,
            Self::CheckpointClaimed { .. } => EventKind::CheckpointClaimed,
            Self::EventComplete { .. } => EventKind::EventComplete,
            Self::MiniGamePlayed { .. } => EventKind::MiniGamePlayed,
            Self::DailyLoginBonus { .. } => EventKind::DailyLoginBonus,
        }
    }
}
