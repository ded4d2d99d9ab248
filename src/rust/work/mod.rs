// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Ready-made work items.

//======================================================================================================================
// Exports
//======================================================================================================================

mod future;
mod thread;
mod timed;

pub use self::{
    future::FutureWorkItem,
    thread::{
        ProgressReporter,
        ThreadJob,
        ThreadWorkItem,
    },
    timed::TimedWorkItem,
};
