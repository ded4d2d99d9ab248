// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use ::std::{
    fmt,
    sync::{
        atomic::{
            AtomicU32,
            Ordering,
        },
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
        TryLockError,
    },
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Result of polling a work item, a schedule item, or a schedule.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorkStatus {
    /// More ticks are needed.
    NotFinished,
    /// The work failed. Failure is final.
    Failed,
    /// The work is done. Completion is final.
    Finished,
}

/// A unit of work that a [crate::scheduler::SharedScheduleItem] runs alongside its siblings.
///
/// All callbacks are invoked from the thread that ticks the schedule manager and must not block. An implementation
/// may hand the actual work to background threads and report on it from [WorkItem::on_update]. Callbacks may call back
/// into the schedule item or schedule that runs them, for instance to add work or to query progress.
pub trait WorkItem: Send {
    /// Human readable description of the work.
    fn description(&self) -> String;

    /// Progress of the work in `[0, 1]`.
    fn progress(&self) -> f32;

    /// Starts the work. Returns false if the work could not be started.
    fn on_start(&mut self) -> bool;

    /// Asks the work to stop. Returns false if stopping needs more time, in which case this is called again on the
    /// next tick.
    fn on_stop(&mut self) -> bool;

    /// Polls the work.
    fn on_update(&mut self) -> WorkStatus;
}

/// Shared handle to a [WorkItem]. The same work item may be held by several schedule items.
#[derive(Clone)]
pub struct SharedWorkItem(Arc<WorkItemCell<dyn WorkItem>>);

struct WorkItemCell<W: ?Sized> {
    description: String,
    /// Progress observed by the last callback or query, as `f32` bits.
    progress: AtomicU32,
    work_item: Mutex<W>,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl SharedWorkItem {
    pub fn new<W: WorkItem + 'static>(work_item: W) -> Self {
        let cell: Arc<WorkItemCell<dyn WorkItem>> = Arc::new(WorkItemCell {
            description: work_item.description(),
            progress: AtomicU32::new(clamp_progress(work_item.progress()).to_bits()),
            work_item: Mutex::new(work_item),
        });
        Self(cell)
    }

    pub fn description(&self) -> String {
        self.0.description.clone()
    }

    /// Progress of the work item. While one of its callbacks is running, the progress seen last is returned.
    pub fn progress(&self) -> f32 {
        let work_item: MutexGuard<'_, dyn WorkItem> = match self.0.work_item.try_lock() {
            Ok(work_item) => work_item,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => return f32::from_bits(self.0.progress.load(Ordering::Relaxed)),
        };
        self.refresh_progress(&*work_item)
    }

    pub fn on_start(&self) -> bool {
        let mut work_item: MutexGuard<'_, dyn WorkItem> = self.lock();
        let started: bool = work_item.on_start();
        self.refresh_progress(&*work_item);
        started
    }

    pub fn on_stop(&self) -> bool {
        let mut work_item: MutexGuard<'_, dyn WorkItem> = self.lock();
        let stopped: bool = work_item.on_stop();
        self.refresh_progress(&*work_item);
        stopped
    }

    pub fn on_update(&self) -> WorkStatus {
        let mut work_item: MutexGuard<'_, dyn WorkItem> = self.lock();
        let status: WorkStatus = work_item.on_update();
        self.refresh_progress(&*work_item);
        status
    }

    /// Returns the number of live references to this work item.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn lock(&self) -> MutexGuard<'_, dyn WorkItem + 'static> {
        self.0.work_item.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh_progress(&self, work_item: &dyn WorkItem) -> f32 {
        let progress: f32 = clamp_progress(work_item.progress());
        self.0.progress.store(progress.to_bits(), Ordering::Relaxed);
        progress
    }
}

fn clamp_progress(progress: f32) -> f32 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl fmt::Debug for SharedWorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkItem({:?})", self.description())
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
