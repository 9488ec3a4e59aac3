//! # Rewards
//!
//! Every grant the economy hands out is a [`Reward`]. The set of variants is
//! closed: dispatch sites match exhaustively, so a new kind of grant is a
//! compile error everywhere it is not yet handled.

use serde::{Deserialize, Serialize};

/// Identifier for an inventory item (powerup, booster, shop entry).
pub type ItemId = String;

/// The two durable currencies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    /// Soft currency, earned by playing levels and spent in the shop.
    Coins,
    /// Hard currency, spent on mini-games.
    Diamonds,
}

impl Currency {
    /// Stable lowercase name (`"coins"`, `"diamonds"`).
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coins => "coins",
            Self::Diamonds => "diamonds",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grant of currency or items.
///
/// In TOML the variant is selected by a `type` key:
///
/// ```toml
/// reward = { type = "coins", amount = 100 }
/// reward = { type = "powerup", item_id = "hammer", amount = 1 }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reward {
    /// Coins credited to the ledger.
    Coins {
        /// Amount credited.
        amount: u64,
    },
    /// Diamonds credited to the ledger.
    Diamonds {
        /// Amount credited.
        amount: u64,
    },
    /// Powerup items added to the inventory.
    Powerup {
        /// Item granted.
        item_id: ItemId,
        /// Quantity granted.
        amount: u32,
    },
    /// Booster items added to the inventory.
    Booster {
        /// Item granted.
        item_id: ItemId,
        /// Quantity granted.
        amount: u32,
    },
}

impl Reward {
    /// Coins reward.
    #[must_use]
    pub const fn coins(amount: u64) -> Self {
        Self::Coins { amount }
    }

    /// Diamonds reward.
    #[must_use]
    pub const fn diamonds(amount: u64) -> Self {
        Self::Diamonds { amount }
    }

    /// Powerup reward.
    #[must_use]
    pub fn powerup(item_id: impl Into<ItemId>, amount: u32) -> Self {
        Self::Powerup {
            item_id: item_id.into(),
            amount,
        }
    }

    /// Booster reward.
    #[must_use]
    pub fn booster(item_id: impl Into<ItemId>, amount: u32) -> Self {
        Self::Booster {
            item_id: item_id.into(),
            amount,
        }
    }

    /// The currency this reward credits, if it is a currency reward.
    #[must_use]
    pub const fn currency(&self) -> Option<Currency> {
        match self {
            Self::Coins { .. } => Some(Currency::Coins),
            Self::Diamonds { .. } => Some(Currency::Diamonds),
            Self::Powerup { .. } | Self::Booster { .. } => None,
        }
    }
}

impl std::fmt::Display for Reward {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coins { amount } => write!(f, "{amount} coins"),
            Self::Diamonds { amount } => write!(f, "{amount} diamonds"),
            Self::Powerup { item_id, amount } => write!(f, "{amount}x {item_id} (powerup)"),
            Self::Booster { item_id, amount } => write!(f, "{amount}x {item_id} (booster)"),
        }
    }
}
