// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::scheduler::{
    WorkItem,
    WorkStatus,
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Simulated work that takes a fixed number of ticks. It can be scripted to fail to start, to fail on a given tick,
/// and to need several stop requests before it stops.
#[derive(Clone, Debug)]
pub struct TimedWorkItem {
    description: String,
    /// Number of updates until the work finishes.
    ticks: usize,
    fail_on_start: bool,
    fail_on_tick: Option<usize>,
    /// Number of stop requests until the work stops.
    stop_ticks: usize,
    started: bool,
    elapsed: usize,
    stop_requests: usize,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl TimedWorkItem {
    pub fn new(description: &str, ticks: usize) -> Self {
        Self {
            description: description.to_string(),
            ticks,
            fail_on_start: false,
            fail_on_tick: None,
            stop_ticks: 1,
            started: false,
            elapsed: 0,
            stop_requests: 0,
        }
    }

    pub fn with_fail_on_start(mut self, fail: bool) -> Self {
        self.fail_on_start = fail;
        self
    }

    pub fn with_fail_on_tick(mut self, tick: Option<usize>) -> Self {
        self.fail_on_tick = tick;
        self
    }

    pub fn with_stop_ticks(mut self, stop_ticks: usize) -> Self {
        self.stop_ticks = stop_ticks.max(1);
        self
    }

    /// Number of updates received so far.
    pub fn elapsed(&self) -> usize {
        self.elapsed
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl WorkItem for TimedWorkItem {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn progress(&self) -> f32 {
        if self.ticks == 0 {
            return 1.0;
        }
        (self.elapsed as f32 / self.ticks as f32).min(1.0)
    }

    fn on_start(&mut self) -> bool {
        self.started = !self.fail_on_start;
        self.started
    }

    fn on_stop(&mut self) -> bool {
        self.stop_requests += 1;
        self.stop_requests >= self.stop_ticks
    }

    fn on_update(&mut self) -> WorkStatus {
        if !self.started {
            return WorkStatus::Failed;
        }
        self.elapsed += 1;
        if self.fail_on_tick == Some(self.elapsed) {
            return WorkStatus::Failed;
        }
        if self.elapsed >= self.ticks {
            WorkStatus::Finished
        } else {
            WorkStatus::NotFinished
        }
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
