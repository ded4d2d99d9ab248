// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Work item that runs a job on a background thread. The scheduler thread only polls the job's outcome, so a long job
//! never stalls a tick.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::scheduler::{
    WorkItem,
    WorkStatus,
};
use ::crossbeam_channel::{
    self,
    Receiver,
    Sender,
    TryRecvError,
};
use ::std::{
    sync::{
        atomic::{
            AtomicBool,
            AtomicU32,
            Ordering,
        },
        Arc,
    },
    thread::{
        self,
        JoinHandle,
    },
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Job run by a [ThreadWorkItem]. Returns true on success.
pub type ThreadJob = Box<dyn FnOnce(ProgressReporter) -> bool + Send + 'static>;

/// Handle given to a background job to publish progress and observe stop requests.
#[derive(Clone)]
pub struct ProgressReporter {
    progress: Arc<AtomicU32>,
    cancel: Arc<AtomicBool>,
}

/// Thread Work Item
pub struct ThreadWorkItem {
    description: String,
    job: Option<ThreadJob>,
    reporter: ProgressReporter,
    receiver: Option<Receiver<bool>>,
    handle: Option<JoinHandle<()>>,
    /// Outcome reported by the job, or false if the thread went away without reporting.
    outcome: Option<bool>,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl ProgressReporter {
    fn new() -> Self {
        Self {
            progress: Arc::new(AtomicU32::new(0.0f32.to_bits())),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Publishes progress in `[0, 1]`.
    pub fn set_progress(&self, progress: f32) {
        self.progress.store(progress.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::Relaxed))
    }

    /// Checks if the work item has been asked to stop. Jobs should poll this and return early.
    pub fn is_canceled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }
}

impl ThreadWorkItem {
    pub fn new<F>(description: &str, job: F) -> Self
    where
        F: FnOnce(ProgressReporter) -> bool + Send + 'static,
    {
        Self {
            description: description.to_string(),
            job: Some(Box::new(job)),
            reporter: ProgressReporter::new(),
            receiver: None,
            handle: None,
            outcome: None,
        }
    }

    /// Collects the job's outcome if it has reported back. Returns true once the thread is done.
    fn poll_outcome(&mut self) -> bool {
        if self.outcome.is_some() {
            return true;
        }
        let receiver: &Receiver<bool> = match self.receiver.as_ref() {
            Some(receiver) => receiver,
            None => return false,
        };
        let outcome: bool = match receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => {
                warn!("poll_outcome(): job exited without reporting (work={:?})", self.description);
                false
            },
        };
        self.outcome = Some(outcome);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("poll_outcome(): job panicked (work={:?})", self.description);
            }
        }
        true
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl WorkItem for ThreadWorkItem {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn progress(&self) -> f32 {
        match self.outcome {
            Some(true) => 1.0,
            _ => self.reporter.progress(),
        }
    }

    fn on_start(&mut self) -> bool {
        let job: ThreadJob = match self.job.take() {
            Some(job) => job,
            None => {
                warn!("on_start(): job was already started (work={:?})", self.description);
                return false;
            },
        };
        let (sender, receiver): (Sender<bool>, Receiver<bool>) = crossbeam_channel::bounded(1);
        let reporter: ProgressReporter = self.reporter.clone();
        let spawned = thread::Builder::new().name(self.description.clone()).spawn(move || {
            let outcome: bool = job(reporter);
            // The work item may have been dropped already.
            let _ = sender.send(outcome);
        });
        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                self.receiver = Some(receiver);
                true
            },
            Err(e) => {
                error!("on_start(): failed to spawn thread (work={:?}, error={:?})", self.description, e);
                false
            },
        }
    }

    fn on_stop(&mut self) -> bool {
        self.reporter.cancel();
        if self.receiver.is_none() {
            return true;
        }
        self.poll_outcome()
    }

    fn on_update(&mut self) -> WorkStatus {
        if self.receiver.is_none() {
            return WorkStatus::Failed;
        }
        if !self.poll_outcome() {
            return WorkStatus::NotFinished;
        }
        match self.outcome {
            Some(true) => WorkStatus::Finished,
            _ => WorkStatus::Failed,
        }
    }
}

impl Drop for ThreadWorkItem {
    fn drop(&mut self) {
        // Detach the thread but let the job know that nobody is waiting for it.
        self.reporter.cancel();
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
