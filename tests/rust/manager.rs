// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

mod common;

//==============================================================================
// Imports
//==============================================================================

use ::anyhow::Result;
use ::bgsched::{
    ensure_eq,
    ScheduleItemState,
    ScheduleManager,
    ScheduleState,
    SharedSchedule,
    SharedScheduleItem,
    WorkStatus,
};
use ::std::sync::{
    atomic::{
        AtomicBool,
        Ordering,
    },
    Arc,
};
use common::{
    Probe,
    ProbeLog,
};

//==============================================================================
// Helpers
//==============================================================================

/// Creates a schedule with one item per entry of `items`, each holding the given probes.
fn build_schedule(manager: &ScheduleManager, name: &str, items: Vec<Vec<Probe>>) -> Result<SharedSchedule> {
    let schedule: SharedSchedule = manager.create_schedule(name);
    for (index, probes) in items.into_iter().enumerate() {
        let item: SharedScheduleItem = manager.create_schedule_item(&format!("{}/{}", name, index));
        for probe in probes {
            item.add_work_item(probe.shared())?;
        }
        schedule.add_item(item)?;
    }
    Ok(schedule)
}

//==============================================================================
// Scenarios
//==============================================================================

/// Two work items that finish on the first tick complete their item on that tick.
#[test]
fn parallel_work_completes_in_one_tick() -> Result<()> {
    let log: ProbeLog = ProbeLog::default();
    let item: SharedScheduleItem = SharedScheduleItem::new("pair");
    item.add_work_item(Probe::new("a", &log).finish_on(1).shared())?;
    item.add_work_item(Probe::new("b", &log).finish_on(1).shared())?;

    ensure_eq!(item.update(), WorkStatus::Finished);
    ensure_eq!(item.state(), ScheduleItemState::Completed);
    Ok(())
}

/// A work item failing on the second tick fails its item once the siblings have stopped.
#[test]
fn failing_work_fails_item_after_siblings_stop() -> Result<()> {
    let log: ProbeLog = ProbeLog::default();
    let item: SharedScheduleItem = SharedScheduleItem::new("pair");
    item.add_work_item(Probe::new("a", &log).shared())?;
    item.add_work_item(Probe::new("b", &log).fail_on(2).shared())?;

    ensure_eq!(item.update(), WorkStatus::NotFinished);
    ensure_eq!(item.update(), WorkStatus::NotFinished);
    ensure_eq!(item.state(), ScheduleItemState::Stopping);
    ensure_eq!(item.update(), WorkStatus::Failed);
    ensure_eq!(item.state(), ScheduleItemState::Failed);
    Ok(())
}

/// Items that finish instantly are chained within a single schedule update.
#[test]
fn schedule_chains_instant_items() -> Result<()> {
    let log: ProbeLog = ProbeLog::default();
    let manager: ScheduleManager = ScheduleManager::new();
    let schedule: SharedSchedule = build_schedule(
        &manager,
        "chain",
        vec![
            vec![Probe::new("x", &log).finish_on(1)],
            vec![Probe::new("y", &log).finish_on(1)],
        ],
    )?;

    ensure_eq!(schedule.current_item_index(), 0);
    ensure_eq!(schedule.update(), WorkStatus::Finished);
    ensure_eq!(schedule.current_item_index(), 2);
    Ok(())
}

/// An empty schedule at the head is retired and the next one starts within the same update.
#[test]
fn empty_schedule_drains_in_same_update() -> Result<()> {
    let log: ProbeLog = ProbeLog::default();
    let mut manager: ScheduleManager = ScheduleManager::new();
    let s1: SharedSchedule = manager.create_schedule("s1");
    let s2: SharedSchedule = build_schedule(&manager, "s2", vec![vec![Probe::new("w", &log)]])?;
    manager.submit_schedule(s1.clone())?;
    manager.submit_schedule(s2.clone())?;

    manager.update();
    ensure_eq!(s1.state(), ScheduleState::Completed);
    ensure_eq!(s2.state(), ScheduleState::Processing);
    ensure_eq!(log.count("w:update"), 1);
    ensure_eq!(manager.num_schedules(), 1);
    Ok(())
}

/// A canceled schedule stays stopping while its work refuses to stop, then fails.
#[test]
fn cancel_waits_for_cooperative_stop() -> Result<()> {
    let log: ProbeLog = ProbeLog::default();
    let refuse: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
    let mut manager: ScheduleManager = ScheduleManager::new();
    let schedule: SharedSchedule = build_schedule(
        &manager,
        "stubborn",
        vec![vec![Probe::new("w", &log).refuse_stop_while(&refuse)]],
    )?;
    manager.submit_schedule(schedule.clone())?;

    manager.update();
    ensure_eq!(schedule.state(), ScheduleState::Processing);

    refuse.store(true, Ordering::Relaxed);
    schedule.cancel();
    let mut states: Vec<ScheduleState> = Vec::new();
    for _ in 0..3 {
        manager.update();
        states.push(schedule.state());
    }
    ensure_eq!(
        states,
        vec![ScheduleState::Stopping, ScheduleState::Stopping, ScheduleState::Stopping]
    );

    refuse.store(false, Ordering::Relaxed);
    manager.update();
    ensure_eq!(schedule.state(), ScheduleState::Failed);
    ensure_eq!(schedule.is_canceled(), true);
    ensure_eq!(manager.num_schedules(), 0);
    Ok(())
}

//==============================================================================
// Properties
//==============================================================================

/// Work of a later item never starts before the previous item finished.
#[test]
fn items_run_strictly_in_sequence() -> Result<()> {
    let log: ProbeLog = ProbeLog::default();
    let mut manager: ScheduleManager = ScheduleManager::new();
    let schedule: SharedSchedule = build_schedule(
        &manager,
        "sequence",
        vec![
            vec![Probe::new("a1", &log).finish_on(2), Probe::new("a2", &log).finish_on(4)],
            vec![Probe::new("b1", &log).finish_on(1)],
            vec![Probe::new("c1", &log).finish_on(3)],
        ],
    )?;
    manager.submit_schedule(schedule.clone())?;

    for _ in 0..16 {
        manager.update();
    }
    ensure_eq!(schedule.state(), ScheduleState::Completed);
    ensure_eq!(log.last("a2:update") < log.first("b1:start"), true);
    ensure_eq!(log.last("b1:update") < log.first("c1:start"), true);
    Ok(())
}

/// Schedules behind a failing one are left alone until it is retired, then run normally.
#[test]
fn failure_does_not_leak_into_queued_schedules() -> Result<()> {
    let log: ProbeLog = ProbeLog::default();
    let mut manager: ScheduleManager = ScheduleManager::new();
    let a: SharedSchedule = build_schedule(
        &manager,
        "a",
        vec![vec![Probe::new("a1", &log).fail_on(2), Probe::new("a2", &log).stop_after(2)]],
    )?;
    let b: SharedSchedule = build_schedule(&manager, "b", vec![vec![Probe::new("b1", &log).finish_on(2)]])?;
    manager.submit_schedule(a.clone())?;
    manager.submit_schedule(b.clone())?;

    while a.state() != ScheduleState::Failed {
        ensure_eq!(log.count("b1:start"), 0);
        manager.update();
    }
    ensure_eq!(log.last("a2:stop") < log.first("b1:start"), true);

    while manager.num_schedules() > 0 {
        manager.update();
    }
    ensure_eq!(b.state(), ScheduleState::Completed);
    Ok(())
}

/// Schedule progress never decreases and reaches one on completion.
#[test]
fn progress_is_monotonic() -> Result<()> {
    let log: ProbeLog = ProbeLog::default();
    let mut manager: ScheduleManager = ScheduleManager::new();
    let schedule: SharedSchedule = build_schedule(
        &manager,
        "progress",
        vec![
            vec![Probe::new("a", &log).finish_on(4), Probe::new("b", &log).finish_on(2)],
            vec![Probe::new("c", &log).finish_on(5)],
        ],
    )?;
    manager.submit_schedule(schedule.clone())?;

    let mut last: f32 = schedule.progress();
    while manager.num_schedules() > 0 {
        manager.update();
        let progress: f32 = schedule.progress();
        ensure_eq!(progress >= last, true);
        last = progress;
    }
    ensure_eq!(last, 1.0);
    Ok(())
}

/// Terminal schedules keep reporting the same status without touching their work.
#[test]
fn terminal_schedules_are_idempotent() -> Result<()> {
    let log: ProbeLog = ProbeLog::default();
    let manager: ScheduleManager = ScheduleManager::new();
    let done: SharedSchedule = build_schedule(&manager, "done", vec![vec![Probe::new("d", &log).finish_on(1)]])?;
    let failed: SharedSchedule = build_schedule(&manager, "failed", vec![vec![Probe::new("f", &log).fail_on(1)]])?;
    ensure_eq!(done.update(), WorkStatus::Finished);
    failed.update();
    ensure_eq!(failed.update(), WorkStatus::Failed);

    let calls: usize = log.len();
    for _ in 0..5 {
        ensure_eq!(done.update(), WorkStatus::Finished);
        ensure_eq!(failed.update(), WorkStatus::Failed);
    }
    ensure_eq!(log.len(), calls);
    Ok(())
}

/// References held by the manager are released on retirement, and work items die with their last owner.
#[test]
fn shared_ownership_is_released() -> Result<()> {
    let log: ProbeLog = ProbeLog::default();
    let mut manager: ScheduleManager = ScheduleManager::new();
    let schedule: SharedSchedule = build_schedule(&manager, "owned", vec![vec![Probe::new("w", &log).finish_on(1)]])?;
    let item: Option<SharedScheduleItem> = schedule.item(0);
    manager.submit_schedule(schedule.clone())?;
    ensure_eq!(schedule.strong_count(), 2);

    manager.update();
    ensure_eq!(schedule.strong_count(), 1);
    ensure_eq!(log.count("w:drop"), 0);

    drop(schedule);
    ensure_eq!(item.as_ref().map(|item| item.strong_count()), Some(1));
    drop(item);
    ensure_eq!(log.count("w:drop"), 1);
    Ok(())
}
