// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::scheduler::{
    WorkItem,
    WorkStatus,
};
use ::futures::{
    future::BoxFuture,
    task::noop_waker_ref,
    FutureExt,
};
use ::std::{
    future::Future,
    task::{
        Context,
        Poll,
    },
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Adapts a future into a work item. The future is polled once per tick with a no-op waker, so it must not rely on
/// being woken up. It resolves to true on success. Stopping drops the future.
pub struct FutureWorkItem {
    description: String,
    future: Option<BoxFuture<'static, bool>>,
    started: bool,
    outcome: Option<bool>,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl FutureWorkItem {
    pub fn new<F>(description: &str, future: F) -> Self
    where
        F: Future<Output = bool> + Send + 'static,
    {
        Self {
            description: description.to_string(),
            future: Some(future.boxed()),
            started: false,
            outcome: None,
        }
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl WorkItem for FutureWorkItem {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn progress(&self) -> f32 {
        match self.outcome {
            Some(true) => 1.0,
            _ => 0.0,
        }
    }

    fn on_start(&mut self) -> bool {
        self.started = self.future.is_some();
        self.started
    }

    fn on_stop(&mut self) -> bool {
        if self.future.take().is_some() {
            debug!("on_stop(): dropped pending future (work={:?})", self.description);
        }
        true
    }

    fn on_update(&mut self) -> WorkStatus {
        if let Some(outcome) = self.outcome {
            return if outcome { WorkStatus::Finished } else { WorkStatus::Failed };
        }
        let future: &mut BoxFuture<'static, bool> = match (self.started, self.future.as_mut()) {
            (true, Some(future)) => future,
            _ => return WorkStatus::Failed,
        };
        let mut ctx: Context = Context::from_waker(noop_waker_ref());
        match future.poll_unpin(&mut ctx) {
            Poll::Pending => WorkStatus::NotFinished,
            Poll::Ready(outcome) => {
                self.future = None;
                self.outcome = Some(outcome);
                if outcome {
                    WorkStatus::Finished
                } else {
                    WorkStatus::Failed
                }
            },
        }
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
