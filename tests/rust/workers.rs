// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use ::anyhow::Result;
use ::bgsched::{
    ensure_eq,
    work::{
        FutureWorkItem,
        ProgressReporter,
        ThreadWorkItem,
        TimedWorkItem,
    },
    ScheduleManager,
    ScheduleState,
    SharedSchedule,
    SharedScheduleItem,
    SharedWorkItem,
    TickLoop,
};
use ::crossbeam_channel::{
    self,
    Receiver,
    Sender,
};
use ::futures::future;
use ::std::{
    sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Arc,
    },
    thread,
    time::Duration,
};

//==============================================================================
// Constants
//==============================================================================

const TICK_INTERVAL: Duration = Duration::from_millis(1);

/// This should never be reached but ensures that the tests do not run forever.
const MAX_TICKS: u64 = 10_000;

//==============================================================================
// Tests
//==============================================================================

/// Background threads, futures, and simulated work run side by side in one item.
#[test]
fn mixed_work_items_complete_under_the_tick_loop() -> Result<()> {
    let counter: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    let job_counter: Arc<AtomicUsize> = counter.clone();

    let mut manager: ScheduleManager = ScheduleManager::new();
    let schedule: SharedSchedule = manager.create_schedule("mixed");
    let item: SharedScheduleItem = manager.create_schedule_item("parallel");
    item.add_work_item(SharedWorkItem::new(ThreadWorkItem::new(
        "count",
        move |reporter: ProgressReporter| {
            for step in 1..=10 {
                job_counter.fetch_add(1, Ordering::Relaxed);
                reporter.set_progress(step as f32 / 10.0);
            }
            true
        },
    )))?;
    item.add_work_item(SharedWorkItem::new(FutureWorkItem::new("ready", future::ready(true))))?;
    item.add_work_item(SharedWorkItem::new(TimedWorkItem::new("timed", 3)))?;
    schedule.add_item(item)?;
    manager.submit_schedule(schedule.clone())?;

    TickLoop::new(TICK_INTERVAL)
        .with_max_ticks(MAX_TICKS)
        .run(&mut manager, |manager: &ScheduleManager| manager.num_schedules() == 0);

    ensure_eq!(schedule.state(), ScheduleState::Completed);
    ensure_eq!(schedule.progress(), 1.0);
    ensure_eq!(counter.load(Ordering::Relaxed), 10);
    Ok(())
}

/// A failing sibling cancels a background job, which observes the request and returns.
#[test]
fn failure_cancels_background_job() -> Result<()> {
    let (started_tx, started_rx): (Sender<()>, Receiver<()>) = crossbeam_channel::bounded(1);

    let mut manager: ScheduleManager = ScheduleManager::new();
    let schedule: SharedSchedule = manager.create_schedule("canceled job");
    let item: SharedScheduleItem = manager.create_schedule_item("parallel");
    item.add_work_item(SharedWorkItem::new(ThreadWorkItem::new(
        "spin",
        move |reporter: ProgressReporter| {
            let _ = started_tx.send(());
            while !reporter.is_canceled() {
                thread::sleep(Duration::from_millis(1));
            }
            false
        },
    )))?;
    item.add_work_item(SharedWorkItem::new(
        TimedWorkItem::new("flaky", 10).with_fail_on_tick(Some(2)),
    ))?;
    schedule.add_item(item)?;
    manager.submit_schedule(schedule.clone())?;

    manager.update();
    started_rx.recv_timeout(Duration::from_secs(10))?;

    TickLoop::new(TICK_INTERVAL)
        .with_max_ticks(MAX_TICKS)
        .run(&mut manager, |manager: &ScheduleManager| manager.num_schedules() == 0);

    ensure_eq!(schedule.state(), ScheduleState::Failed);
    ensure_eq!(schedule.is_canceled(), false);
    Ok(())
}

/// A future that never resolves is dropped when its schedule is canceled.
#[test]
fn cancel_drops_pending_future() -> Result<()> {
    let mut manager: ScheduleManager = ScheduleManager::new();
    let schedule: SharedSchedule = manager.create_schedule("pending");
    let item: SharedScheduleItem = manager.create_schedule_item("forever");
    item.add_work_item(SharedWorkItem::new(FutureWorkItem::new(
        "never",
        future::pending::<bool>(),
    )))?;
    schedule.add_item(item)?;
    manager.submit_schedule(schedule.clone())?;

    manager.update();
    manager.update();
    ensure_eq!(schedule.state(), ScheduleState::Processing);

    schedule.cancel();
    manager.update();
    ensure_eq!(schedule.state(), ScheduleState::Failed);
    ensure_eq!(manager.num_schedules(), 0);
    Ok(())
}
