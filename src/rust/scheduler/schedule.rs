// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! A schedule runs its items strictly one after another. An item starts only once the previous one has finished, and
//! the first item that fails fails the whole schedule.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    runtime::{
        fail::Fail,
        SharedObject,
    },
    scheduler::{
        item::{
            ScheduleItemState,
            SharedScheduleItem,
        },
        work_item::WorkStatus,
    },
};
use ::std::fmt;

//======================================================================================================================
// Structures
//======================================================================================================================

/// States of a schedule.
///
/// There is no dedicated canceled state: a canceled schedule ends up [ScheduleState::Failed] and reports
/// [SharedSchedule::is_canceled].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScheduleState {
    /// Not started yet.
    Pending,
    /// Items are running one after another.
    Processing,
    /// The current item is being stopped after a cancellation.
    Stopping,
    /// An item failed or the schedule was canceled.
    Failed,
    /// All items finished.
    Completed,
}

struct Schedule {
    description: String,
    state: ScheduleState,
    items: Vec<SharedScheduleItem>,
    /// Index of the item being processed. Only moves forward.
    current_item: usize,
    canceled: bool,
    /// Set while the current item is being advanced.
    busy: bool,
}

/// Shared handle to a schedule.
#[derive(Clone)]
pub struct SharedSchedule(SharedObject<Schedule>);

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl Schedule {
    fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            state: ScheduleState::Pending,
            items: Vec::new(),
            current_item: 0,
            canceled: false,
            busy: false,
        }
    }

    fn status(&self) -> WorkStatus {
        match self.state {
            ScheduleState::Completed => WorkStatus::Finished,
            ScheduleState::Failed => WorkStatus::Failed,
            ScheduleState::Pending | ScheduleState::Processing | ScheduleState::Stopping => WorkStatus::NotFinished,
        }
    }

    fn current(&self) -> Option<SharedScheduleItem> {
        self.items.get(self.current_item).cloned()
    }

    fn transition(&mut self, next: ScheduleState) {
        debug!(
            "transition(): schedule={:?}, current={:?}, next={:?}",
            self.description, self.state, next
        );
        self.state = next;
    }
}

impl SharedSchedule {
    pub fn new(description: &str) -> Self {
        Self(SharedObject::new(Schedule::new(description)))
    }

    pub fn description(&self) -> String {
        self.0.lock().description.clone()
    }

    pub fn state(&self) -> ScheduleState {
        self.0.lock().state
    }

    pub fn num_items(&self) -> usize {
        self.0.lock().items.len()
    }

    pub fn item(&self, index: usize) -> Option<SharedScheduleItem> {
        self.0.lock().items.get(index).cloned()
    }

    /// Index of the item being processed. Equals [SharedSchedule::num_items] once every item has finished.
    pub fn current_item_index(&self) -> usize {
        self.0.lock().current_item
    }

    pub fn is_canceled(&self) -> bool {
        self.0.lock().canceled
    }

    /// Fraction of the schedule that is done, counting finished items plus the progress of the current one.
    pub fn progress(&self) -> f32 {
        let (count, index, current): (usize, usize, Option<SharedScheduleItem>) = {
            let schedule = self.0.lock();
            (schedule.items.len(), schedule.current_item, schedule.current())
        };
        match current {
            Some(item) => (index as f32 + item.progress()) / count as f32,
            None => 1.0,
        }
    }

    /// Appends an item. Only pending items can be added to a pending schedule. Items without work are dropped.
    pub fn add_item(&self, item: SharedScheduleItem) -> Result<(), Fail> {
        let item_state: ScheduleItemState = item.state();
        let item_work: usize = item.num_work_items();

        let mut schedule = self.0.lock();
        if schedule.state != ScheduleState::Pending {
            let cause: String = format!(
                "cannot add item to schedule in {:?} state (schedule={:?})",
                schedule.state, schedule.description
            );
            error!("add_item(): {}", cause);
            return Err(Fail::new(libc::EINVAL, &cause));
        }

        if item_state != ScheduleItemState::Pending {
            let cause: String = format!(
                "cannot add schedule item in {:?} state (schedule={:?}, item={:?})",
                item_state,
                schedule.description,
                item.description()
            );
            error!("add_item(): {}", cause);
            return Err(Fail::new(libc::EINVAL, &cause));
        }

        if item_work == 0 {
            debug!(
                "add_item(): dropping item without work (schedule={:?}, item={:?})",
                schedule.description,
                item.description()
            );
            return Ok(());
        }

        schedule.items.push(item);
        Ok(())
    }

    /// Requests cancellation. Acted upon by the next call to [SharedSchedule::update].
    pub fn cancel(&self) {
        let mut schedule = self.0.lock();
        if !schedule.canceled {
            info!("cancel(): schedule={:?}", schedule.description);
        }
        schedule.canceled = true;
    }

    /// Advances the schedule by one tick. Items that finish right away are chained within the same tick. Re-entering
    /// from a work item callback does not advance the schedule again.
    pub fn update(&self) -> WorkStatus {
        {
            let mut schedule = self.0.lock();
            if schedule.busy {
                trace!("update(): already updating (schedule={:?})", schedule.description);
                return schedule.status();
            }
            schedule.busy = true;
        }

        self.advance();

        let mut schedule = self.0.lock();
        schedule.busy = false;
        schedule.status()
    }

    /// Returns the number of live references to this schedule.
    pub fn strong_count(&self) -> usize {
        self.0.strong_count()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.0.ptr_eq(&other.0)
    }

    fn advance(&self) {
        if !self.handle_cancel() {
            return;
        }

        loop {
            let (state, current): (ScheduleState, Option<SharedScheduleItem>) = {
                let schedule = self.0.lock();
                (schedule.state, schedule.current())
            };
            match state {
                ScheduleState::Failed | ScheduleState::Completed => return,
                ScheduleState::Stopping => {
                    // Any terminal status of the current item means that it has stopped.
                    let stopped: bool = match current {
                        Some(item) => item.update() != WorkStatus::NotFinished,
                        None => true,
                    };
                    if stopped {
                        self.0.lock().transition(ScheduleState::Failed);
                    }
                    return;
                },
                ScheduleState::Pending => {
                    let mut schedule = self.0.lock();
                    schedule.current_item = 0;
                    schedule.transition(ScheduleState::Processing);
                },
                ScheduleState::Processing => {
                    let item: SharedScheduleItem = match current {
                        Some(item) => item,
                        None => {
                            self.0.lock().transition(ScheduleState::Completed);
                            return;
                        },
                    };
                    match item.update() {
                        WorkStatus::Finished => {
                            let mut schedule = self.0.lock();
                            trace!(
                                "advance(): item finished (schedule={:?}, index={:?})",
                                schedule.description,
                                schedule.current_item
                            );
                            schedule.current_item += 1;
                        },
                        WorkStatus::Failed => {
                            let mut schedule = self.0.lock();
                            warn!(
                                "advance(): item failed (schedule={:?}, index={:?})",
                                schedule.description, schedule.current_item
                            );
                            schedule.transition(ScheduleState::Failed);
                            return;
                        },
                        WorkStatus::NotFinished => return,
                    }
                },
            }
        }
    }

    /// Acts upon a pending cancellation. Returns false if the schedule failed right away.
    fn handle_cancel(&self) -> bool {
        let stopping: SharedScheduleItem = {
            let mut schedule = self.0.lock();
            if !schedule.canceled {
                return true;
            }
            match (schedule.state, schedule.current()) {
                (ScheduleState::Processing, Some(item)) => {
                    schedule.transition(ScheduleState::Stopping);
                    item
                },
                (ScheduleState::Pending, _) | (ScheduleState::Processing, None) => {
                    schedule.transition(ScheduleState::Failed);
                    return false;
                },
                (ScheduleState::Stopping, _) | (ScheduleState::Failed, _) | (ScheduleState::Completed, _) => return true,
            }
        };
        stopping.request_stop();
        true
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl fmt::Debug for SharedSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schedule = self.0.lock();
        write!(
            f,
            "Schedule({:?}, {:?}, item={}/{})",
            schedule.description,
            schedule.state,
            schedule.current_item,
            schedule.items.len()
        )
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
