// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! The schedule manager owns submitted schedules and runs them first in, first out. Only the oldest schedule is
//! advanced on each tick; the next one starts once it has finished or failed.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    runtime::fail::Fail,
    scheduler::{
        item::SharedScheduleItem,
        schedule::{
            ScheduleState,
            SharedSchedule,
        },
        work_item::WorkStatus,
    },
};
use ::std::collections::VecDeque;

//======================================================================================================================
// Constants
//======================================================================================================================

/// Default number of ticks that [ScheduleManager::shutdown] spends on stopping canceled schedules.
pub const DEFAULT_SHUTDOWN_TICKS: usize = 64;

//======================================================================================================================
// Structures
//======================================================================================================================

/// Schedule Manager
pub struct ScheduleManager {
    /// Submitted schedules, oldest first.
    schedules: VecDeque<SharedSchedule>,
    shutdown_ticks: usize,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl ScheduleManager {
    pub fn new() -> Self {
        Self::with_shutdown_ticks(DEFAULT_SHUTDOWN_TICKS)
    }

    /// Creates a manager that gives canceled schedules up to `shutdown_ticks` ticks to stop when shutting down.
    pub fn with_shutdown_ticks(shutdown_ticks: usize) -> Self {
        Self {
            schedules: VecDeque::new(),
            shutdown_ticks,
        }
    }

    /// Creates a pending schedule. The schedule is not owned by the manager until submitted.
    pub fn create_schedule(&self, description: &str) -> SharedSchedule {
        SharedSchedule::new(description)
    }

    /// Creates a pending schedule item.
    pub fn create_schedule_item(&self, description: &str) -> SharedScheduleItem {
        SharedScheduleItem::new(description)
    }

    /// Queues a pending schedule behind the ones already submitted.
    pub fn submit_schedule(&mut self, schedule: SharedSchedule) -> Result<(), Fail> {
        let state: ScheduleState = schedule.state();
        if state != ScheduleState::Pending {
            let cause: String = format!(
                "cannot submit schedule in {:?} state (schedule={:?})",
                state,
                schedule.description()
            );
            error!("submit_schedule(): {}", cause);
            return Err(Fail::new(libc::EINVAL, &cause));
        }
        debug!(
            "submit_schedule(): schedule={:?}, queued={:?}",
            schedule.description(),
            self.schedules.len()
        );
        self.schedules.push_back(schedule);
        Ok(())
    }

    pub fn num_schedules(&self) -> usize {
        self.schedules.len()
    }

    /// Gets a queued schedule. Index zero is the one being processed.
    pub fn schedule(&self, index: usize) -> Option<SharedSchedule> {
        self.schedules.get(index).cloned()
    }

    /// Advances the oldest schedule. Schedules that finish or fail are retired and the next one is advanced in the
    /// same tick.
    pub fn update(&mut self) {
        while let Some(schedule) = self.schedules.front() {
            let status: WorkStatus = schedule.update();
            if status == WorkStatus::NotFinished {
                return;
            }
            if let Some(schedule) = self.schedules.pop_front() {
                Self::retire(schedule, status);
            }
        }
    }

    /// Cancels every queued schedule, gives them a bounded number of ticks to stop, and releases them.
    pub fn shutdown(&mut self) {
        if self.schedules.is_empty() {
            return;
        }
        info!("shutdown(): canceling {:?} schedules", self.schedules.len());
        for schedule in self.schedules.iter() {
            schedule.cancel();
        }

        for _ in 0..self.shutdown_ticks {
            self.schedules
                .retain(|schedule: &SharedSchedule| schedule.update() == WorkStatus::NotFinished);
            if self.schedules.is_empty() {
                return;
            }
        }

        for schedule in self.schedules.drain(..) {
            warn!(
                "shutdown(): releasing schedule that did not stop in time (schedule={:?})",
                schedule.description()
            );
        }
    }

    fn retire(schedule: SharedSchedule, status: WorkStatus) {
        match status {
            WorkStatus::Finished => info!("update(): schedule completed (schedule={:?})", schedule.description()),
            _ => warn!(
                "update(): schedule failed (schedule={:?}, canceled={:?})",
                schedule.description(),
                schedule.is_canceled()
            ),
        }
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl Default for ScheduleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScheduleManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
