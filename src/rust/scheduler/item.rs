// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! A schedule item runs a bag of work items in parallel. All work items are started together and polled together.
//! When one of them fails, its siblings are asked to stop and the item fails once all of them have stopped.
//!
//! The item lock is never held while a work item callback runs, so callbacks may add work to the item that runs them
//! or query its state and progress.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    runtime::{
        fail::Fail,
        SharedObject,
    },
    scheduler::work_item::{
        SharedWorkItem,
        WorkStatus,
    },
};
use ::std::{
    fmt,
    mem,
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// States of a schedule item.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScheduleItemState {
    /// Not started yet.
    Pending,
    /// Work items are running.
    Processing,
    /// Some work failed or a stop was requested, and running work items are being stopped.
    Stopping,
    /// All running work items stopped after a failure or a stop request.
    Failed,
    /// All work items finished.
    Completed,
}

struct ScheduleItem {
    description: String,
    state: ScheduleItemState,
    /// Declared work items. Everything in `processed_work_items` is also in here.
    work_items: Vec<SharedWorkItem>,
    /// Work items declared after processing began. Started on the next processing pass.
    added_work_items: Vec<SharedWorkItem>,
    /// Work items that are currently running.
    processed_work_items: Vec<SharedWorkItem>,
    /// Set while work item callbacks run on behalf of this item.
    busy: bool,
    /// Stop requested from within a callback. Handled once the callbacks return.
    stop_requested: bool,
}

/// Shared handle to a schedule item.
#[derive(Clone)]
pub struct SharedScheduleItem(SharedObject<ScheduleItem>);

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl ScheduleItem {
    fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            state: ScheduleItemState::Pending,
            work_items: Vec::new(),
            added_work_items: Vec::new(),
            processed_work_items: Vec::new(),
            busy: false,
            stop_requested: false,
        }
    }

    fn status(&self) -> WorkStatus {
        match self.state {
            ScheduleItemState::Completed => WorkStatus::Finished,
            ScheduleItemState::Failed => WorkStatus::Failed,
            ScheduleItemState::Pending | ScheduleItemState::Processing | ScheduleItemState::Stopping => {
                WorkStatus::NotFinished
            },
        }
    }

    /// Marks the item busy. Returns false if it already is, which means that a callback re-entered it.
    fn enter(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        true
    }

    /// Clears the busy mark and returns whether a stop was requested in the meantime.
    fn leave(&mut self) -> bool {
        self.busy = false;
        mem::take(&mut self.stop_requested)
    }

    /// Forgets running work items that are in `done`.
    fn release_processed(&mut self, done: &[SharedWorkItem]) {
        self.processed_work_items
            .retain(|work_item: &SharedWorkItem| !done.iter().any(|d: &SharedWorkItem| d.ptr_eq(work_item)));
    }

    fn transition(&mut self, next: ScheduleItemState) {
        debug!(
            "transition(): item={:?}, current={:?}, next={:?}",
            self.description, self.state, next
        );
        self.state = next;
    }
}

impl SharedScheduleItem {
    pub fn new(description: &str) -> Self {
        Self(SharedObject::new(ScheduleItem::new(description)))
    }

    pub fn description(&self) -> String {
        self.0.lock().description.clone()
    }

    pub fn state(&self) -> ScheduleItemState {
        self.0.lock().state
    }

    /// Number of declared work items, including those added after processing began.
    pub fn num_work_items(&self) -> usize {
        let item = self.0.lock();
        item.work_items.len() + item.added_work_items.len()
    }

    /// Gets a declared work item. Work items added after processing began come after the others until they start.
    pub fn work_item(&self, index: usize) -> Option<SharedWorkItem> {
        let item = self.0.lock();
        item.work_items
            .iter()
            .chain(item.added_work_items.iter())
            .nth(index)
            .cloned()
    }

    /// Mean progress of the declared work items. An item without work items, or a completed one, is done.
    pub fn progress(&self) -> f32 {
        let work_items: Vec<SharedWorkItem> = {
            let item = self.0.lock();
            if item.state == ScheduleItemState::Completed {
                return 1.0;
            }
            item.work_items
                .iter()
                .chain(item.added_work_items.iter())
                .cloned()
                .collect()
        };
        if work_items.is_empty() {
            return 1.0;
        }
        let total: f32 = work_items
            .iter()
            .map(|work_item: &SharedWorkItem| work_item.progress())
            .sum();
        total / work_items.len() as f32
    }

    /// Adds a work item. Work items cannot be added once the item has failed or completed. Work added after the item
    /// has started, including work added from a callback of one of its work items, is started on the next processing
    /// pass.
    pub fn add_work_item(&self, work_item: SharedWorkItem) -> Result<(), Fail> {
        let mut item = self.0.lock();
        match item.state {
            ScheduleItemState::Failed | ScheduleItemState::Completed => {
                let cause: String = format!(
                    "cannot add work item to schedule item in {:?} state (item={:?})",
                    item.state, item.description
                );
                error!("add_work_item(): {}", cause);
                Err(Fail::new(libc::EINVAL, &cause))
            },
            ScheduleItemState::Pending if !item.busy => {
                item.work_items.push(work_item);
                Ok(())
            },
            ScheduleItemState::Pending | ScheduleItemState::Processing | ScheduleItemState::Stopping => {
                trace!("add_work_item(): deferring start (item={:?})", item.description);
                item.added_work_items.push(work_item);
                Ok(())
            },
        }
    }

    /// Advances the item by one tick. Re-entering from a work item callback does not advance the item again.
    pub fn update(&self) -> WorkStatus {
        if !self.0.lock().enter() {
            let item = self.0.lock();
            trace!("update(): already updating (item={:?})", item.description);
            return item.status();
        }

        self.advance();

        if self.0.lock().leave() {
            self.request_stop();
        }
        self.0.lock().status()
    }

    /// Asks the item to stop. A pending item fails right away. A processing item stops its running work items and
    /// fails once all of them have stopped, which may take further ticks. A request made from within a work item
    /// callback is handled once the callback returns.
    pub fn request_stop(&self) {
        {
            let mut item = self.0.lock();
            if !item.enter() {
                trace!("request_stop(): deferring (item={:?})", item.description);
                item.stop_requested = true;
                return;
            }
        }

        let state: ScheduleItemState = self.state();
        match state {
            ScheduleItemState::Pending => self.0.lock().transition(ScheduleItemState::Failed),
            ScheduleItemState::Processing => {
                self.0.lock().transition(ScheduleItemState::Stopping);
                if self.stop_processed_work_items() {
                    self.0.lock().transition(ScheduleItemState::Failed);
                }
            },
            ScheduleItemState::Stopping | ScheduleItemState::Failed | ScheduleItemState::Completed => {},
        }

        // Nothing left to do for stop requests made while stopping.
        self.0.lock().leave();
    }

    /// Returns the number of live references to this item.
    pub fn strong_count(&self) -> usize {
        self.0.strong_count()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.0.ptr_eq(&other.0)
    }

    fn advance(&self) {
        loop {
            let state: ScheduleItemState = self.state();
            match state {
                ScheduleItemState::Pending => {
                    if !self.start_work_items() {
                        self.0.lock().transition(ScheduleItemState::Stopping);
                        return;
                    }
                    // Started work is polled in the same tick.
                    self.0.lock().transition(ScheduleItemState::Processing);
                },
                ScheduleItemState::Processing => return self.process_work_items(),
                ScheduleItemState::Stopping => {
                    if self.stop_processed_work_items() {
                        self.0.lock().transition(ScheduleItemState::Failed);
                    }
                    return;
                },
                ScheduleItemState::Failed | ScheduleItemState::Completed => return,
            }
        }
    }

    /// Starts declared work items in order. Returns false as soon as one of them fails to start; the remaining ones
    /// are not started.
    fn start_work_items(&self) -> bool {
        let (description, work_items): (String, Vec<SharedWorkItem>) = {
            let item = self.0.lock();
            (item.description.clone(), item.work_items.clone())
        };

        let mut started: Vec<SharedWorkItem> = Vec::with_capacity(work_items.len());
        let mut all_started: bool = true;
        for work_item in work_items {
            if !work_item.on_start() {
                warn!(
                    "start_work_items(): work item failed to start (item={:?}, work={:?})",
                    description,
                    work_item.description()
                );
                all_started = false;
                break;
            }
            started.push(work_item);
        }

        self.0.lock().processed_work_items = started;
        all_started
    }

    /// Starts late work items and polls every running work item once.
    fn process_work_items(&self) {
        let late: Vec<SharedWorkItem> = {
            let mut item = self.0.lock();
            let late: Vec<SharedWorkItem> = mem::take(&mut item.added_work_items);
            item.work_items.extend(late.iter().cloned());
            late
        };
        for work_item in late.iter() {
            // Late starts are not checked. A late item that could not start reports so from on_update().
            let _ = work_item.on_start();
        }

        let (description, running): (String, Vec<SharedWorkItem>) = {
            let mut item = self.0.lock();
            item.processed_work_items.extend(late);
            (item.description.clone(), item.processed_work_items.clone())
        };

        let mut finished: Vec<SharedWorkItem> = Vec::new();
        let mut failed: bool = false;
        for work_item in running.iter() {
            match work_item.on_update() {
                WorkStatus::NotFinished => {},
                WorkStatus::Finished => finished.push(work_item.clone()),
                WorkStatus::Failed => {
                    warn!(
                        "process_work_items(): work item failed (item={:?}, work={:?})",
                        description,
                        work_item.description()
                    );
                    failed = true;
                    break;
                },
            }
        }

        let mut item = self.0.lock();
        item.release_processed(&finished);
        if failed {
            item.transition(ScheduleItemState::Stopping);
        } else if item.processed_work_items.is_empty() && item.added_work_items.is_empty() {
            item.transition(ScheduleItemState::Completed);
        }
    }

    /// Asks every running work item to stop and forgets those that did. Returns true if none is left running.
    fn stop_processed_work_items(&self) -> bool {
        let running: Vec<SharedWorkItem> = self.0.lock().processed_work_items.clone();
        let mut stopped: Vec<SharedWorkItem> = Vec::with_capacity(running.len());
        for work_item in running {
            if work_item.on_stop() {
                stopped.push(work_item);
            }
        }

        let mut item = self.0.lock();
        item.release_processed(&stopped);
        item.processed_work_items.is_empty()
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl fmt::Debug for SharedScheduleItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let item = self.0.lock();
        write!(f, "ScheduleItem({:?}, {:?})", item.description, item.state)
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
