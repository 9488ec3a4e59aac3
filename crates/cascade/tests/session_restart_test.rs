//! Integration test for sessions resumed from a save file.

use cascade::economy::{Clock, FileStorage, MS_PER_DAY};
use cascade::shared::EventKind;
use cascade::{shipped_config, SessionRunner, SessionScript, SessionStep};

fn temp_save_path() -> std::path::PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("test_session_save_{id}.json"))
}

#[test]
fn test_second_session_resumes_save() {
    let path = temp_save_path();
    let start = 20_000 * MS_PER_DAY;

    let (first, resumed_at) = {
        let runner = SessionRunner::open(shipped_config().unwrap(), FileStorage::new(&path), start).unwrap();
        let report = runner.run(&SessionScript::demo(), |_| {});
        (report, runner.clock().now_ms())
    };
    assert!(resumed_at > start);
    assert!(first.count(EventKind::DailyLoginBonus) > 0);

    // Same calendar day the first session ended on: no second login bonus,
    // progress carries over.
    let runner =
        SessionRunner::open(shipped_config().unwrap(), FileStorage::new(&path), resumed_at).unwrap();
    let outcome = runner.run_step(&SessionStep::StartSession);
    assert!(outcome
        .events
        .iter()
        .all(|event| event.kind() != EventKind::DailyLoginBonus));

    let economy = runner.economy();
    assert_eq!(economy.snapshot().coins, first.final_state.coins);
    assert_eq!(economy.snapshot().inventory, first.final_state.inventory);
    assert_eq!(
        economy.progression().points(),
        first.final_state.current_event.as_ref().unwrap().points
    );

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_custom_script_with_rejections() {
    let script = SessionScript::from_toml_str(
        r#"
        [[step]]
        action = "use_item"
        item_id = "hammer"

        [[step]]
        action = "play_mini_game"
        game_id = "lucky_wheel"

        [[step]]
        action = "claim_completion_bonus"

        [[step]]
        action = "level"
        level_id = 10
        stars = 3
        first_time = true
        "#,
    )
    .unwrap();

    let path = temp_save_path();
    let runner = SessionRunner::open(shipped_config().unwrap(), FileStorage::new(&path), 0).unwrap();
    let report = runner.run(&script, |_| {});

    assert_eq!(report.steps, 4);
    assert_eq!(report.rejected, 3);
    assert_eq!(report.final_state.coins, 130);
    assert_eq!(report.final_state.diamonds, 5);
    assert_eq!(report.count(EventKind::PointsAdded), 1);

    std::fs::remove_file(&path).ok();
}
