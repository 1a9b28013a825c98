//! LegDay Demo Application
//!
//! Plays one week of the habit loop end to end:
//! - the alarm fires and reminders nag until acknowledged
//! - the photo check decides whether the user worked out
//! - if not, squat sessions against a synthetic camera run until one
//!   reaches the target, then the flow re-arms the reminders
//!
//! Usage: `squat-demo [config.json] [--pass] [--skip]`. `--pass` makes the
//! photo check succeed. With `--skip` the simulated user walks away from the
//! first punishment session.

use std::time::Duration;

use chrono::{Datelike, Timelike};
use legday_core::{LegDayResult, SessionPhase};
use legday_runtime::{
    init_tracing, local_now, DeliveryChain, FlowEvent, FlowState, HabitFlow, LegDayConfig,
    LogChannel, ReminderConfig, ReminderLoop, ReminderScheduler, SessionDriver,
};
use legday_test::{SceneConfig, ScriptedSource, SquatScript, SyntheticScene, TokioClock, SQUAT_DOWN, SQUAT_UP};
use tracing::info;

const DEMO_REPS: u32 = 5;
const MAX_PUNISHMENT_SESSIONS: u32 = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let skip = args.iter().any(|a| a == "--skip");
    let pass = args.iter().any(|a| a == "--pass");
    let config = match args.iter().find(|a| !a.starts_with("--")) {
        Some(path) => LegDayConfig::from_path(path)?,
        None => LegDayConfig::default(),
    };
    init_tracing(config.log_format)?;

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║                LegDay Demo - Don't Skip It                 ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    let state = run_week(&config, pass, skip).await?;
    println!();
    println!("Week over, flow is {}", state);
    Ok(())
}

async fn run_week(config: &LegDayConfig, pass: bool, skip: bool) -> LegDayResult<FlowState> {
    // Alarm set for right now, nagging every second so the demo moves along
    let now = local_now();
    let mut reminder = ReminderConfig {
        interval: Duration::from_secs(1),
        ..config.reminder_config()
    };
    reminder.alarm.weekday = now.weekday();
    reminder.alarm.hour = now.hour();
    reminder.alarm.minute = now.minute();
    reminder.alarm.active = true;

    let scheduler = ReminderScheduler::new(reminder, DeliveryChain::new().with(LogChannel))?;
    let reminders = ReminderLoop::spawn(scheduler);

    let mut flow = HabitFlow::new();
    flow.on_rearm(reminders.rearm_hook());

    flow.handle(FlowEvent::AlarmFired)?;
    tokio::time::sleep(Duration::from_millis(2500)).await;
    println!("Reminders sent so far: {}", reminders.reminders_sent());
    reminders.acknowledge();
    flow.handle(FlowEvent::Acknowledged)?;

    if flow.finish_verification(pass)? == FlowState::Punishment {
        println!("Photo check failed. Punishment mode engaged: {} squats.", DEMO_REPS);
        let mut attempt = 0;
        while flow.state() == FlowState::Punishment && attempt < MAX_PUNISHMENT_SESSIONS {
            let walk_away = skip && attempt == 0;
            attempt += 1;
            let phase = punish(config, walk_away).await?;
            if flow.finish_punishment(phase)? == FlowState::Punishment {
                println!("Punishment session ended in {}. Again.", phase);
            }
        }
    } else {
        info!("photo check passed");
    }

    println!("Flow now {} ({:?})", flow.state(), flow.stats());
    println!("Reminders sent this week: {}", reminders.reminders_sent());
    reminders.shutdown().await?;
    Ok(flow.state())
}

/// One punishment squat session against a synthetic camera
async fn punish(config: &LegDayConfig, skip: bool) -> LegDayResult<SessionPhase> {
    let pipeline = config.pipeline_config().with_target(DEMO_REPS);
    let standing = pipeline.calibration_window + Duration::from_millis(400);
    let script = if skip {
        SquatScript::new()
            .stand(standing)
            .squats(2, SQUAT_DOWN, SQUAT_UP)
    } else {
        SquatScript::new()
            .stand(standing)
            .squats(DEMO_REPS, SQUAT_DOWN, SQUAT_UP)
    };
    let give_up = script.duration() + Duration::from_secs(3);

    let scene = SyntheticScene::new(SceneConfig::default(), script, 2024);
    let source = ScriptedSource::new(scene, TokioClock::starting_now());

    let driver = SessionDriver::new(pipeline)?;
    let mut handle = driver.start(source)?;
    let mut updates = handle.subscribe();

    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let status = updates.borrow_and_update().clone();
            println!(
                "[{:>11}] {:>2}/{:<2} {}",
                status.phase.as_str(),
                status.current_count,
                status.target_count,
                status.last_encouragement
            );
        }
    });

    match tokio::time::timeout(give_up, handle.completion()).await {
        Ok(Ok(())) => println!("Target reached!"),
        Ok(Err(e)) => println!("Session ended early: {}", e),
        Err(_) => {
            println!("Gave up waiting, cancelling");
            handle.cancel();
        }
    }

    let phase = handle.join().await?;
    let _ = printer.await;
    Ok(phase)
}
