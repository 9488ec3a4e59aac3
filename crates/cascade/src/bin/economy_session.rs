//! # Economy Session Driver
//!
//! Plays a scripted session against a save file and prints every economy
//! event, headless.
//!
//! ```bash
//! # Demo session, fresh save in the temp directory
//! ./economy_session
//!
//! # Custom balance data and script, persistent save
//! ./economy_session --config data/economy.toml --script week1.toml --save save.json
//!
//! # Start from a clean save
//! ./economy_session --save save.json --reset
//! ```
//!
//! Set `RUST_LOG=debug` to see rejected operations.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use cascade::economy::{Clock, FileStorage, SystemClock};
use cascade::shared::{EconomyConfig, EconomyEvent, MiniGameFlags};
use cascade::{shipped_config, SessionResult, SessionRunner, SessionScript, StepOutcome};
use tracing_subscriber::EnvFilter;

/// Command line options.
#[derive(Debug, Default)]
struct Options {
    config: Option<PathBuf>,
    script: Option<PathBuf>,
    save: Option<PathBuf>,
    reset: bool,
}

fn parse_args() -> Result<Options, String> {
    let mut options = Options::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => options.config = Some(args.next().ok_or("--config needs a path")?.into()),
            "--script" => options.script = Some(args.next().ok_or("--script needs a path")?.into()),
            "--save" => options.save = Some(args.next().ok_or("--save needs a path")?.into()),
            "--reset" => options.reset = true,
            other => return Err(format!("unknown argument {other}")),
        }
    }
    Ok(options)
}

fn describe(event: &EconomyEvent) -> String {
    match event {
        EconomyEvent::BalanceChanged {
            currency,
            amount,
            total,
            source,
        } => format!("{currency} {amount:+} -> {total} ({source})"),
        EconomyEvent::RewardEarned { reward, source } => format!("reward {reward} ({source})"),
        EconomyEvent::ItemAdded {
            item_id,
            quantity,
            total,
        } => format!("+{quantity} {item_id} (now {total})"),
        EconomyEvent::ItemUsed { item_id, remaining } => {
            format!("used {item_id} ({remaining} left)")
        }
        EconomyEvent::PurchaseSuccess { item_id, cost, .. } => {
            format!("bought {item_id} for {cost} coins")
        }
        EconomyEvent::PurchaseFailed {
            item_id,
            cost,
            balance,
        } => format!("cannot buy {item_id}: {cost} coins needed, {balance} held"),
        EconomyEvent::PointsAdded { points, total } => format!("+{points} points (total {total})"),
        EconomyEvent::CheckpointAvailable { index, label } => {
            format!("checkpoint {index} '{label}' unlocked")
        }
        EconomyEvent::CheckpointClaimed { index, reward } => {
            format!("checkpoint {index} claimed: {reward}")
        }
        EconomyEvent::EventComplete {
            event_id,
            points,
            first_time,
        } => {
            let note = if *first_time { " for the first time" } else { "" };
            format!("event {event_id} complete at {points} points{note}")
        }
        EconomyEvent::MiniGamePlayed {
            game_id,
            diamond_cost,
            total_plays,
        } => format!("played {game_id} for {diamond_cost} diamonds (play #{total_plays})"),
        EconomyEvent::DailyLoginBonus { rewards } => {
            let rewards: Vec<String> = rewards.iter().map(ToString::to_string).collect();
            format!("daily login bonus: {}", rewards.join(", "))
        }
    }
}

fn print_outcome(outcome: &StepOutcome) {
    let mark = if outcome.accepted { "✓" } else { "✗" };
    println!("{mark} {}", outcome.step);
    for event in &outcome.events {
        println!("    [{}] {}", event.kind(), describe(event));
    }
}

fn run(options: Options) -> SessionResult<()> {
    let config = match &options.config {
        Some(path) => EconomyConfig::from_toml_file(path)?,
        None => shipped_config()?,
    };
    let script = match &options.script {
        Some(path) => SessionScript::from_toml_file(path)?,
        None => SessionScript::demo(),
    };
    let save = options.save.clone().unwrap_or_else(|| {
        let id = SystemClock.now_ms();
        std::env::temp_dir().join(format!("economy_session_{id}.json"))
    });

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║              CASCADE ECONOMY SESSION                             ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("Save file:  {}", save.display());
    println!("Steps:      {}", script.steps.len());
    println!("Event:      {} ({} checkpoints)", config.event.name, config.event.checkpoints.len());
    println!();

    let runner = SessionRunner::open(config, FileStorage::new(&save), SystemClock.now_ms())?;
    if options.reset {
        runner.economy().reset();
    }

    let start = Instant::now();
    let report = runner.run(&script, print_outcome);
    let elapsed = start.elapsed();

    let state = &report.final_state;
    let economy = runner.economy();
    println!();
    println!("┌─ FINAL STATE ────────────────────────────────────────────────────┐");
    println!("│ Coins:              {}", state.coins);
    println!("│ Diamonds:           {}", state.diamonds);
    println!("│ Levels Played:      {}", state.total_levels_played);
    for (item_id, count) in &state.inventory {
        println!("│ Item {item_id:<14} {count}");
    }
    println!(
        "│ Event Progress:     {} points ({}%)",
        economy.progression().points(),
        economy.progression().progress_percentage()
    );
    println!("│ Replays Left:       {}", economy.daily().replays_remaining());
    let live: Vec<String> = economy
        .rotation()
        .current_games()
        .into_iter()
        .map(|game| {
            let mut tags = Vec::new();
            if game.flags.has(MiniGameFlags::NEW) {
                tags.push("new");
            }
            if game.flags.has(MiniGameFlags::FEATURED) {
                tags.push("featured");
            }
            if tags.is_empty() {
                game.name
            } else {
                format!("{} [{}]", game.name, tags.join(", "))
            }
        })
        .collect();
    println!("│ Live Mini-Games:    {}", live.join(", "));
    println!(
        "│ Next Rotation In:   {:.1} h",
        economy.rotation().time_until_rotation() as f64 / 3_600_000.0
    );
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();
    println!("┌─ EVENTS ─────────────────────────────────────────────────────────┐");
    for (kind, count) in &report.event_counts {
        println!("│ {:<22} {count}", kind.as_str());
    }
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();
    println!(
        "{} steps, {} rejected, {:.3} ms",
        report.steps,
        report.rejected,
        elapsed.as_secs_f64() * 1000.0
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = match parse_args() {
        Ok(options) => options,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!("usage: economy_session [--config PATH] [--script PATH] [--save PATH] [--reset]");
            return ExitCode::from(2);
        }
    };

    match run(options) {
        Ok(()) => {
            println!();
            println!("✅ SESSION COMPLETE");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("❌ SESSION FAILED: {err}");
            ExitCode::FAILURE
        }
    }
}
