//! Scripted scenes played through the real tokio driver

use std::time::Duration;

use legday_core::{LegDayError, SessionPhase};
use legday_runtime::SessionDriver;
use legday_signal::PipelineConfig;
use legday_test::{SceneConfig, ScriptedSource, SquatScript, SyntheticScene, TokioClock, SQUAT_DOWN, SQUAT_UP};

fn source(script: SquatScript, scene: SceneConfig) -> ScriptedSource<TokioClock> {
    ScriptedSource::new(SyntheticScene::new(scene, script, 11), TokioClock::starting_now())
}

#[tokio::test(start_paused = true)]
async fn driver_counts_scripted_squats() {
    let script = SquatScript::new()
        .stand(Duration::from_millis(3400))
        .squats(5, SQUAT_DOWN, SQUAT_UP);
    let driver = SessionDriver::new(PipelineConfig::default().with_target(5)).unwrap();
    let mut handle = driver.start(source(script, SceneConfig::default())).unwrap();

    tokio::time::timeout(Duration::from_secs(60), handle.completion())
        .await
        .expect("target reached in time")
        .unwrap();

    assert_eq!(handle.status().current_count, 5);
    assert_eq!(handle.join().await.unwrap(), SessionPhase::Complete);
}

#[tokio::test(start_paused = true)]
async fn driver_stops_on_missing_camera() {
    let script = SquatScript::new().offline(Duration::from_secs(30));
    let driver = SessionDriver::new(PipelineConfig::default()).unwrap();
    let mut handle = driver.start(source(script, SceneConfig::default())).unwrap();

    let err = handle.completion().await.unwrap_err();
    assert!(matches!(err, LegDayError::CalibrationFailed));
    assert!(handle.stats().frames_missing >= 14);
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_cancels() {
    let script = SquatScript::new().stand(Duration::from_secs(60));
    let driver = SessionDriver::new(PipelineConfig::default()).unwrap();
    let handle = driver.start(source(script, SceneConfig::default())).unwrap();
    let mut status = handle.subscribe();

    status
        .wait_for(|s| s.phase == SessionPhase::Tracking)
        .await
        .unwrap();
    drop(handle);

    status
        .wait_for(|s| s.phase == SessionPhase::Cancelled)
        .await
        .unwrap();
}
