//! Integration test for a full economy session.

use cascade_economy::{
    CheckpointStatus, Clock, Economy, FileStorage, FixedClock, MemoryStorage, SnapshotStore,
    StoragePort, MS_PER_DAY,
};
use cascade_shared::{Currency, EconomyConfig, EconomyEvent, EventKind, LevelResult, Reward};
use chrono::NaiveDate;
use std::sync::Arc;

fn temp_save_path() -> std::path::PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("test_economy_save_{id}.json"))
}

fn clock_at(y: i32, m: u32, d: u32) -> Arc<FixedClock> {
    Arc::new(FixedClock::at_date(NaiveDate::from_ymd_opt(y, m, d).unwrap()))
}

fn open(storage: &MemoryStorage, clock: &Arc<FixedClock>) -> Economy {
    let clock: Arc<dyn Clock> = Arc::clone(clock) as Arc<dyn Clock>;
    Economy::open(EconomyConfig::default(), storage.clone(), clock).unwrap()
}

#[test]
fn test_save_and_restart_round_trip() {
    let storage = MemoryStorage::new();
    let clock = clock_at(2026, 10, 16);

    {
        let economy = open(&storage, &clock);
        economy.start_session();
        economy.on_level_complete(&LevelResult::new(10, 3, true));
        economy.ledger().credit(Currency::Coins, 500, "test");
        assert!(economy.ledger().purchase_item("hammer"));
        economy.ledger().add_item("shuffle", 2);
    }

    let before = {
        let mut store = SnapshotStore::new(storage.clone());
        store.snapshot()
    };

    let economy = open(&storage, &clock);
    let after = economy.snapshot();
    assert_eq!(after.coins, before.coins);
    assert_eq!(after.diamonds, before.diamonds);
    assert_eq!(after.inventory, before.inventory);
    assert_eq!(economy.ledger().item_count("shuffle"), 2);
    assert_eq!(economy.ledger().total_levels_played(), 1);
}

#[test]
fn test_level_ten_perfect_first_clear() {
    let storage = MemoryStorage::new();
    let economy = open(&storage, &clock_at(2026, 10, 16));

    let paid = economy.on_level_complete(&LevelResult::new(10, 3, true));

    assert_eq!(paid.rewards.coins, 130);
    assert_eq!(paid.rewards.diamonds, 5);
    assert_eq!(economy.ledger().balance(Currency::Diamonds), 5);
}

#[test]
fn test_overdraw_is_silent_no_op() {
    let storage = MemoryStorage::new();
    let economy = open(&storage, &clock_at(2026, 10, 16));
    economy.ledger().credit(Currency::Coins, 40, "test");
    economy.drain_events();

    assert!(!economy.ledger().debit(Currency::Coins, 41, "test"));
    assert_eq!(economy.ledger().coins(), 40);
    assert_eq!(economy.pending_event_count(), 0);
}

#[test]
fn test_event_playthrough_claims_every_checkpoint() {
    let storage = MemoryStorage::new();
    let economy = open(&storage, &clock_at(2026, 10, 16));
    let tracker = economy.progression();

    let mut level = 1;
    while !tracker.is_complete() {
        economy.on_level_complete(&LevelResult::new(level, 3, false).with_combo(6));
        level += 1;
    }

    let available = tracker.available_checkpoints();
    assert_eq!(available.len(), tracker.definition().checkpoints.len());
    for index in available {
        assert!(tracker.claim_checkpoint(index).is_some());
        assert_eq!(tracker.checkpoint_status(index), Some(CheckpointStatus::Claimed));
        assert!(tracker.claim_checkpoint(index).is_none());
    }

    let bonus = tracker.claim_completion_bonus().unwrap();
    assert!(bonus.contains(&Reward::booster("color_bomb", 1)));
    assert_eq!(tracker.progress_percentage(), 100);

    let events = economy.drain_events();
    let first_completions = events
        .iter()
        .filter(|e| matches!(e, EconomyEvent::EventComplete { first_time: true, .. }))
        .count();
    assert_eq!(first_completions, 1);
}

#[test]
fn test_daily_login_and_replays_across_days() {
    let storage = MemoryStorage::new();
    let clock = clock_at(2026, 10, 16);
    let economy = open(&storage, &clock);

    assert!(economy.start_session().login_bonus.is_some());
    assert!(economy.daily().use_daily_replay());
    assert!(economy.start_session().login_bonus.is_none());
    assert_eq!(economy.daily().replays_remaining(), 2);

    clock.advance_days(1);
    let next_day = economy.start_session();
    assert!(next_day.replays_reset);
    assert_eq!(next_day.login_bonus, Some(vec![Reward::coins(100)]));
    assert_eq!(economy.daily().replays_remaining(), 3);
    assert_eq!(economy.ledger().coins(), 200);
}

#[test]
fn test_rotation_follows_clock() {
    let storage = MemoryStorage::new();
    let clock = Arc::new(FixedClock::new(0));
    let economy = open(&storage, &clock);
    let rotation = economy.rotation();

    let first = rotation.current_games();
    clock.advance_ms(rotation.time_until_rotation() - 1);
    assert_eq!(rotation.current_games(), first);

    clock.advance_ms(1);
    assert_ne!(rotation.current_games(), first);
    assert_eq!(rotation.time_until_rotation(), 7 * MS_PER_DAY);
}

#[test]
fn test_minigame_play_persists_stats() {
    let storage = MemoryStorage::new();
    let clock = clock_at(2026, 10, 16);
    {
        let economy = open(&storage, &clock);
        economy.ledger().credit(Currency::Diamonds, 20, "test");
        assert!(economy.rotation().play_game("lucky_wheel"));

        let played = economy
            .drain_events()
            .into_iter()
            .filter(|e| e.kind() == EventKind::MiniGamePlayed)
            .count();
        assert_eq!(played, 1);
    }

    let economy = open(&storage, &clock);
    let stats = economy.rotation().stats("lucky_wheel");
    assert_eq!(stats.total_plays, 1);
    assert_eq!(stats.last_played_date, Some(clock.today()));
    assert_eq!(economy.ledger().diamonds(), 10);
}

#[test]
fn test_write_failure_keeps_session_running() {
    let storage = MemoryStorage::new();
    let economy = open(&storage, &clock_at(2026, 10, 16));
    economy.ledger().credit(Currency::Coins, 10, "test");

    storage.set_fail_writes(true);
    economy.ledger().credit(Currency::Coins, 5, "test");
    assert_eq!(economy.ledger().coins(), 15);

    storage.set_fail_writes(false);
    let persisted = SnapshotStore::new(storage.clone()).snapshot();
    assert_eq!(persisted.coins, 10);
}

#[test]
fn test_file_backed_economy_survives_restart() {
    let path = temp_save_path();
    let clock = clock_at(2026, 10, 16);

    {
        let economy =
            Economy::open(EconomyConfig::default(), FileStorage::new(&path), clock.clone()).unwrap();
        economy.on_level_complete(&LevelResult::new(5, 2, false));
    }

    let raw = FileStorage::new(&path).read().unwrap().unwrap();
    assert!(raw.contains("\"totalLevelsPlayed\":1"));

    let economy = Economy::open(EconomyConfig::default(), FileStorage::new(&path), clock).unwrap();
    assert_eq!(economy.ledger().coins(), 70);
    assert_eq!(economy.ledger().diamonds(), 2);

    std::fs::remove_file(&path).ok();
}
