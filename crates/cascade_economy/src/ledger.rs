//! # Ledger
//!
//! **Coins, Diamonds and Inventory**
//!
//! Every balance change goes through here. Each operation runs
//! validate -> mutate -> persist -> publish, so by the time a subscriber
//! sees `coins_changed` the new balance is already in the save record.
//!
//! ## Guarantees
//!
//! 1. **Non-negative**: a debit larger than the balance is rejected with no
//!    state change and no event
//! 2. **Transactional purchases**: coins are taken and items granted in a
//!    single store write, or neither happens
//! 3. **Saturating credits**: balances clamp at `u64::MAX` instead of wrapping

use std::collections::BTreeMap;
use std::sync::Arc;

use cascade_shared::{
    Currency, EconomyConfig, EconomyEvent, EventKind, ItemId, LevelRewardConfig, LevelResult,
    Reward,
};

use crate::bus::{EventBus, Subscription};
use crate::error::EconomyError;
use crate::store::SharedStore;

/// Coins and diamonds granted for one level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LevelRewards {
    /// Coins credited.
    pub coins: u64,
    /// Diamonds credited.
    pub diamonds: u64,
}

impl LevelRewards {
    /// Applies the level reward formula.
    ///
    /// Coins: `base + stars*per_star + perfect_bonus (3 stars) +
    /// first_time_bonus (first clear)`. Diamonds: `every_10_levels` on a
    /// multiple of 10, else `every_5_levels` on a multiple of 5, else none.
    #[must_use]
    pub fn compute(config: &LevelRewardConfig, result: &LevelResult) -> Self {
        let stars = u64::from(result.clamped_stars());
        let mut coins = config
            .base
            .saturating_add(stars.saturating_mul(config.per_star));
        if result.is_perfect() {
            coins = coins.saturating_add(config.perfect_bonus);
        }
        if result.is_first_time {
            coins = coins.saturating_add(config.first_time_bonus);
        }

        let diamonds = match result.level_id {
            0 => 0,
            id if id % 10 == 0 => config.every_10_levels,
            id if id % 5 == 0 => config.every_5_levels,
            _ => 0,
        };

        Self { coins, diamonds }
    }
}

/// Owner of currency balances and inventory counts.
pub struct Ledger {
    store: SharedStore,
    config: Arc<EconomyConfig>,
    bus: EventBus,
}

impl Ledger {
    /// Creates a ledger over a shared store.
    #[must_use]
    pub fn new(store: SharedStore, config: Arc<EconomyConfig>) -> Self {
        Self {
            store,
            config,
            bus: EventBus::new(),
        }
    }

    /// The ledger's event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    /// Subscribes to one kind of ledger event.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&EconomyEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    // ========================================================================
    // Currencies
    // ========================================================================

    /// Current balance of a currency.
    #[must_use]
    pub fn balance(&self, currency: Currency) -> u64 {
        self.store.lock().load().balance(currency)
    }

    /// Current coin balance.
    #[must_use]
    pub fn coins(&self) -> u64 {
        self.balance(Currency::Coins)
    }

    /// Current diamond balance.
    #[must_use]
    pub fn diamonds(&self) -> u64 {
        self.balance(Currency::Diamonds)
    }

    /// Adds `amount` to a balance. Always succeeds; returns the new balance.
    pub fn credit(&self, currency: Currency, amount: u64, source: &str) -> u64 {
        let (credited, total) = self.store.lock().update(|s| {
            let balance = s.balance_mut(currency);
            let before = *balance;
            *balance = balance.saturating_add(amount);
            (*balance - before, *balance)
        });

        self.publish_balance(currency, signed(credited), total, source);
        total
    }

    /// Takes `amount` from a balance if it covers it.
    ///
    /// Returns `false`, without any state change or event, when the balance
    /// is too low.
    pub fn debit(&self, currency: Currency, amount: u64, source: &str) -> bool {
        let result = self.store.lock().try_update(|s| {
            let balance = s.balance_mut(currency);
            if *balance < amount {
                return Err(EconomyError::InsufficientFunds {
                    currency,
                    required: amount,
                    available: *balance,
                });
            }
            *balance -= amount;
            Ok(*balance)
        });

        match result {
            Ok(total) => {
                self.publish_balance(currency, -signed(amount), total, source);
                true
            }
            Err(err) => {
                tracing::debug!("Debit rejected ({}): {}", source, err);
                false
            }
        }
    }

    fn publish_balance(&self, currency: Currency, amount: i64, total: u64, source: &str) {
        self.bus.publish(&EconomyEvent::BalanceChanged {
            currency,
            amount,
            total,
            source: source.to_string(),
        });
    }

    // ========================================================================
    // Inventory
    // ========================================================================

    /// Count of one item.
    #[must_use]
    pub fn item_count(&self, item_id: &str) -> u32 {
        self.store.lock().load().item_count(item_id)
    }

    /// All non-zero item counts.
    #[must_use]
    pub fn inventory(&self) -> BTreeMap<ItemId, u32> {
        self.store.lock().load().inventory.clone()
    }

    /// Adds items. Always succeeds; returns the new count.
    pub fn add_item(&self, item_id: &str, quantity: u32) -> u32 {
        let total = self.store.lock().update(|s| s.add_item(item_id, quantity));

        self.bus.publish(&EconomyEvent::ItemAdded {
            item_id: item_id.to_string(),
            quantity,
            total,
        });
        total
    }

    /// Consumes one item. Returns `false` if none are left.
    pub fn use_item(&self, item_id: &str) -> bool {
        let result = self.store.lock().try_update(|s| {
            s.take_item(item_id)
                .ok_or_else(|| EconomyError::ItemDepleted(item_id.to_string()))
        });

        match result {
            Ok(remaining) => {
                self.bus.publish(&EconomyEvent::ItemUsed {
                    item_id: item_id.to_string(),
                    remaining,
                });
                true
            }
            Err(err) => {
                tracing::debug!("Item use rejected: {}", err);
                false
            }
        }
    }

    // ========================================================================
    // Rewards
    // ========================================================================

    /// Grants a reward: currencies are credited, powerups and boosters added
    /// to the inventory. Always publishes `reward_earned`.
    pub fn award_reward(&self, reward: &Reward, source: &str) {
        match reward {
            Reward::Coins { amount } | Reward::Diamonds { amount } => {
                if let Some(currency) = reward.currency() {
                    self.credit(currency, *amount, source);
                }
            }
            Reward::Powerup { item_id, amount } | Reward::Booster { item_id, amount } => {
                self.add_item(item_id, *amount);
            }
        }

        self.bus.publish(&EconomyEvent::RewardEarned {
            reward: reward.clone(),
            source: source.to_string(),
        });
    }

    /// Credits the coins and milestone diamonds for a completed level and
    /// counts it in `total_levels_played`.
    pub fn award_level_rewards(&self, result: &LevelResult) -> LevelRewards {
        let rewards = LevelRewards::compute(&self.config.level_rewards, result);

        let (before, after) = self.store.lock().update(|s| {
            let before = (s.coins, s.diamonds);
            s.total_levels_played = s.total_levels_played.saturating_add(1);
            s.coins = s.coins.saturating_add(rewards.coins);
            s.diamonds = s.diamonds.saturating_add(rewards.diamonds);
            (before, (s.coins, s.diamonds))
        });

        let level_source = format!("level_{}", result.level_id);
        self.publish_balance(Currency::Coins, signed(after.0 - before.0), after.0, &level_source);
        if rewards.diamonds > 0 {
            let milestone_source = format!("milestone_level_{}", result.level_id);
            self.publish_balance(
                Currency::Diamonds,
                signed(after.1 - before.1),
                after.1,
                &milestone_source,
            );
        }

        tracing::debug!(
            "Level {} complete: +{} coins, +{} diamonds",
            result.level_id,
            rewards.coins,
            rewards.diamonds
        );
        rewards
    }

    /// Lifetime count of completed levels.
    #[must_use]
    pub fn total_levels_played(&self) -> u64 {
        self.store.lock().load().total_levels_played
    }

    // ========================================================================
    // Shop
    // ========================================================================

    /// Whether the coin balance covers a shop item. Unknown ids are `false`.
    #[must_use]
    pub fn can_afford(&self, item_id: &str) -> bool {
        self.config
            .shop_item(item_id)
            .is_some_and(|item| self.coins() >= item.coin_cost)
    }

    /// Buys a shop item: takes its coin cost and grants its quantity in one
    /// store write.
    ///
    /// Unknown ids return `false` silently. Insufficient coins return
    /// `false` and publish `purchase_failed`.
    pub fn purchase_item(&self, item_id: &str) -> bool {
        let Some(item) = self.config.shop_item(item_id) else {
            tracing::debug!("Purchase ignored: {}", EconomyError::UnknownShopItem(item_id.to_string()));
            return false;
        };

        let result = self.store.lock().try_update(|s| {
            if s.coins < item.coin_cost {
                return Err(EconomyError::InsufficientFunds {
                    currency: Currency::Coins,
                    required: item.coin_cost,
                    available: s.coins,
                });
            }
            s.coins -= item.coin_cost;
            let total = s.add_item(&item.id, item.quantity);
            Ok((s.coins, total))
        });

        match result {
            Ok((coins, total)) => {
                self.publish_balance(
                    Currency::Coins,
                    -signed(item.coin_cost),
                    coins,
                    &format!("shop:{}", item.id),
                );
                self.bus.publish(&EconomyEvent::ItemAdded {
                    item_id: item.id.clone(),
                    quantity: item.quantity,
                    total,
                });
                self.bus.publish(&EconomyEvent::PurchaseSuccess {
                    item_id: item.id.clone(),
                    cost: item.coin_cost,
                    quantity: item.quantity,
                });
                true
            }
            Err(err) => {
                tracing::debug!("Purchase of {} rejected: {}", item.id, err);
                let balance = match err {
                    EconomyError::InsufficientFunds { available, .. } => available,
                    _ => self.coins(),
                };
                self.bus.publish(&EconomyEvent::PurchaseFailed {
                    item_id: item.id.clone(),
                    cost: item.coin_cost,
                    balance,
                });
                false
            }
        }
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger").field("bus", &self.bus).finish_non_exhaustive()
    }
}

fn signed(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}
