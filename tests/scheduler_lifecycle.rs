//! Scheduler lifecycle against the reference and scripted devices

mod common;

use std::time::Duration;

use anyhow::Result;
use common::{ScriptedDevice, test_data};
use firmware_harness::{
    Harness, HarnessConfig, HarnessError, PulseCounterDevice, SchedulerState, StorageOperationKind,
};

fn configured_harness() -> Result<Harness<PulseCounterDevice>> {
    let config = HarnessConfig::load(test_data("harness.yaml"))?;
    Ok(Harness::with_config(PulseCounterDevice::new(), &config)?)
}

#[tokio::test(start_paused = true)]
async fn start_then_stop_records_init_and_few_ticks() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let harness = configured_harness()?;

    harness.start().await?;
    harness.stop().await?;

    let storage = harness.storage();
    storage.assert_operation_kind(0, StorageOperationKind::Initialize)?;
    storage.assert_operation_kind(1, StorageOperationKind::Start)?;
    storage.assert_operation_kind(2, StorageOperationKind::Open)?;
    assert!(harness.scheduler().ticks() <= 1);
    assert!(harness.serial().count() <= 5);
    assert_eq!(harness.state(), SchedulerState::Idle);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn configured_interval_sets_tick_rate() -> Result<()> {
    let harness = configured_harness()?;
    assert_eq!(harness.scheduler().interval(), Duration::from_millis(10));

    harness.start().await?;
    tokio::time::sleep(Duration::from_millis(95)).await;
    harness.stop().await?;

    // Ticks at t = 0, 10, .., 90.
    assert_eq!(harness.scheduler().ticks(), 10);
    assert_eq!(harness.serial().count(), 50);
    assert_eq!(harness.verified_messages()?.len(), 50);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn counters_updated_while_running_show_up_in_later_ticks() -> Result<()> {
    let harness = configured_harness()?;
    harness.start().await?;
    harness.serial().wait_for_count(5, Duration::from_secs(1)).await?;

    harness.update_pulse_counters(&[9, 9, 9, 9])?;
    harness.serial().wait_for_count(10, Duration::from_secs(1)).await?;
    harness.stop().await?;

    let last_tick = &harness.verified_messages()?[5..10];
    for message in &last_tick[..4] {
        assert_eq!(message.value_u32(), Some(9));
    }
    assert_eq!(last_tick[4].value_u16(), Some(5));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reload_runs_init_again_and_keeps_counters() -> Result<()> {
    let harness = configured_harness()?;
    harness.update_pulse_counters(&[1, 2, 3, 4])?;

    harness.start().await?;
    tokio::time::sleep(Duration::from_millis(15)).await;
    harness.reload().await?;
    tokio::time::sleep(Duration::from_millis(15)).await;
    harness.stop().await?;

    let opens = harness
        .storage()
        .operations()
        .iter()
        .filter(|op| op.kind() == StorageOperationKind::Open)
        .count();
    assert_eq!(opens, 2);
    assert_eq!(harness.with_device(|d| (d.init_count(), d.model().counters()))?, (2, [1, 2, 3, 4]));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn scripted_device_runs_to_completion_under_scheduler() -> Result<()> {
    let harness = Harness::new(ScriptedDevice::load("counter_replay.yaml")?);
    harness.update_pulse_counters(&[5, 5, 5, 5])?;
    harness.run_until(2, Duration::from_secs(1)).await?;

    harness.serial().assert_count(2)?;
    let expected = harness.with_device(|d| d.model().response_for([5, 5, 5, 5]))?;
    harness.serial().assert_decoded_sequence(&expected)?;
    assert_eq!(harness.with_device(|d| d.model().inits)?, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn waiting_for_transmissions_that_never_come_times_out() -> Result<()> {
    let harness = Harness::new(ScriptedDevice::load("counter_replay.yaml")?);
    harness.update_pulse_counters(&[5, 5, 5, 5])?;
    let result = harness.run_until(3, Duration::from_millis(200)).await;

    assert!(matches!(result, Err(HarnessError::Timeout { .. })));
    // run_until still stopped the scheduler.
    assert_eq!(harness.state(), SchedulerState::Idle);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn real_time_run_on_multi_thread_runtime() -> Result<()> {
    let harness = configured_harness()?;
    harness.start().await?;
    let seen = harness.serial().wait_for_count(15, Duration::from_secs(5)).await?;
    harness.stop().await?;

    assert!(seen >= 15);
    let count = harness.serial().count();
    assert_eq!(count % 5, 0, "the tick in progress always completes");
    assert_eq!(harness.storage().get_all_writes().len(), count);
    Ok(())
}
