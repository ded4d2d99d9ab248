// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

#![cfg_attr(feature = "strict", deny(warnings))]
#![deny(clippy::all)]

#[macro_use]
extern crate log;

pub mod config;
pub mod host;
pub mod runtime;
pub mod scheduler;
pub mod work;

pub use self::{
    config::Config,
    host::{
        HostEvent,
        HostListener,
        TickLoop,
    },
    runtime::fail::Fail,
    scheduler::{
        ScheduleItemState,
        ScheduleManager,
        ScheduleState,
        SharedSchedule,
        SharedScheduleItem,
        SharedWorkItem,
        WorkItem,
        WorkStatus,
    },
};

//======================================================================================================================
// Macros
//======================================================================================================================

/// Ensures that two expressions are equivalent, bailing out of the enclosing `anyhow::Result` function otherwise.
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr) => {{
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    ::anyhow::bail!(
                        "ensure failed: `(left == right)`\n  left: `{:?}`,\n right: `{:?}` ({}:{})",
                        &*left_val,
                        &*right_val,
                        file!(),
                        line!()
                    );
                }
            },
        }
    }};
}

/// Ensures that two expressions are not equivalent, bailing out of the enclosing `anyhow::Result` function otherwise.
#[macro_export]
macro_rules! ensure_neq {
    ($left:expr, $right:expr) => {{
        match (&$left, &$right) {
            (left_val, right_val) => {
                if *left_val == *right_val {
                    ::anyhow::bail!(
                        "ensure failed: `(left != right)`\n  left: `{:?}`,\n right: `{:?}` ({}:{})",
                        &*left_val,
                        &*right_val,
                        file!(),
                        line!()
                    );
                }
            },
        }
    }};
}
