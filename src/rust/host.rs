// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Glue between a host application and the schedule manager. The host owns the tick and decides when to quit; the
//! manager only reacts to the events it is handed.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::scheduler::ScheduleManager;
use ::std::{
    thread,
    time::Duration,
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Events emitted by a host application.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// The host is idle and gives listeners a tick.
    IdleUpdate,
    /// The host is shutting down.
    Quit,
}

/// Receives host events.
pub trait HostListener {
    fn on_host_event(&mut self, event: HostEvent);
}

/// Host driver that ticks a listener at a fixed interval.
#[derive(Clone, Debug)]
pub struct TickLoop {
    tick_interval: Duration,
    max_ticks: Option<u64>,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl TickLoop {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            max_ticks: None,
        }
    }

    /// Limits the number of ticks. The loop quits once the limit is reached, even if work is left.
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Ticks `listener` until `done` holds or the tick limit is reached, then sends [HostEvent::Quit]. Returns the
    /// number of ticks that were sent.
    pub fn run<L, F>(&self, listener: &mut L, mut done: F) -> u64
    where
        L: HostListener,
        F: FnMut(&L) -> bool,
    {
        let mut ticks: u64 = 0;
        while !done(&*listener) {
            if self.max_ticks.is_some_and(|max_ticks: u64| ticks >= max_ticks) {
                warn!("run(): tick limit reached (ticks={:?})", ticks);
                break;
            }
            listener.on_host_event(HostEvent::IdleUpdate);
            ticks += 1;
            if !self.tick_interval.is_zero() {
                thread::sleep(self.tick_interval);
            }
        }
        listener.on_host_event(HostEvent::Quit);
        ticks
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl HostListener for ScheduleManager {
    fn on_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::IdleUpdate => self.update(),
            HostEvent::Quit => self.shutdown(),
        }
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
