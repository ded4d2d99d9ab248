// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Implementation of our cooperative background schedule manager.
//!
//! Work is organized in three layers. A [SharedScheduleItem] runs a bag of [WorkItem]s in parallel, a [SharedSchedule]
//! runs its items one after another, and the [ScheduleManager] runs submitted schedules first in, first out. Everything is
//! driven by [ScheduleManager::update], which the host calls once per tick; nothing in here blocks or spawns threads.

//======================================================================================================================
// Exports
//======================================================================================================================

mod item;
mod manager;
mod schedule;
mod work_item;

#[cfg(test)]
pub(crate) mod testing;

pub use self::{
    item::{
        ScheduleItemState,
        SharedScheduleItem,
    },
    manager::{
        ScheduleManager,
        DEFAULT_SHUTDOWN_TICKS,
    },
    schedule::{
        ScheduleState,
        SharedSchedule,
    },
    work_item::{
        SharedWorkItem,
        WorkItem,
        WorkStatus,
    },
};
