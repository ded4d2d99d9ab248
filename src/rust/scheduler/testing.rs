// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Scripted work items for unit tests.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::scheduler::work_item::{
    SharedWorkItem,
    WorkItem,
    WorkStatus,
};
use ::std::sync::{
    Arc,
    Mutex,
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Ordered record of work item callbacks, shared by all work items of a test.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

/// Hook run by a [ScriptedWorkItem] from within its `on_update` callback.
pub type UpdateHook = Box<dyn FnMut() + Send>;

/// Work item whose behavior is scripted by the test. By default it starts, never finishes, and stops right away.
pub struct ScriptedWorkItem {
    name: String,
    log: CallLog,
    start_fails: bool,
    finish_on: Option<usize>,
    fail_on: Option<usize>,
    stop_on: usize,
    on_update_hook: Option<UpdateHook>,
    updates: usize,
    stops: usize,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl CallLog {
    pub fn record(&self, call: String) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|c| c.as_str() == call).count()
    }

    /// Position of the first occurrence of `call`.
    pub fn position(&self, call: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|c| c.as_str() == call)
    }
}

impl ScriptedWorkItem {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            start_fails: false,
            finish_on: None,
            fail_on: None,
            stop_on: 1,
            on_update_hook: None,
            updates: 0,
            stops: 0,
        }
    }

    pub fn fail_on_start(mut self) -> Self {
        self.start_fails = true;
        self
    }

    /// Finishes on the given update.
    pub fn finish_after(mut self, updates: usize) -> Self {
        self.finish_on = Some(updates);
        self
    }

    /// Fails on the given update.
    pub fn fail_on_update(mut self, update: usize) -> Self {
        self.fail_on = Some(update);
        self
    }

    /// Stops on the given stop request. Use `usize::MAX` for work that never stops.
    pub fn stop_after(mut self, stops: usize) -> Self {
        self.stop_on = stops;
        self
    }

    /// Runs `hook` on every update, before the update is scored.
    pub fn on_update_do<F: FnMut() + Send + 'static>(mut self, hook: F) -> Self {
        self.on_update_hook = Some(Box::new(hook));
        self
    }

    pub fn shared(self) -> SharedWorkItem {
        SharedWorkItem::new(self)
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl WorkItem for ScriptedWorkItem {
    fn description(&self) -> String {
        self.name.clone()
    }

    fn progress(&self) -> f32 {
        match self.finish_on {
            Some(total) => (self.updates as f32 / total as f32).min(1.0),
            None => 0.0,
        }
    }

    fn on_start(&mut self) -> bool {
        self.log.record(format!("{}:start", self.name));
        !self.start_fails
    }

    fn on_stop(&mut self) -> bool {
        self.log.record(format!("{}:stop", self.name));
        self.stops += 1;
        self.stops >= self.stop_on
    }

    fn on_update(&mut self) -> WorkStatus {
        self.log.record(format!("{}:update", self.name));
        if let Some(hook) = self.on_update_hook.as_mut() {
            hook();
        }
        self.updates += 1;
        if self.fail_on == Some(self.updates) {
            return WorkStatus::Failed;
        }
        match self.finish_on {
            Some(total) if self.updates >= total => WorkStatus::Finished,
            _ => WorkStatus::NotFinished,
        }
    }
}
