// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Exports
//======================================================================================================================

pub mod fail;
pub mod logging;

//======================================================================================================================
// Imports
//======================================================================================================================

use ::std::{
    fmt,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
    },
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// The SharedObject wraps an object that is shared between the schedule manager, the schedules that reference it, and
/// whoever created it. Cloning takes a reference and dropping releases it; the object is destroyed together with the
/// last reference.
///
/// The reference count is atomic, so handles may be held and queried from any thread. State changes are driven from
/// the thread that ticks the manager, and the lock is only held for short bookkeeping sections, never across a call
/// into another shared object's callbacks.
pub struct SharedObject<T: ?Sized>(Arc<Mutex<T>>);

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl<T> SharedObject<T> {
    pub fn new(object: T) -> Self {
        Self(Arc::new(Mutex::new(object)))
    }
}

impl<T: ?Sized> SharedObject<T> {
    /// Locks the shared object. A panic in a previous holder does not make the object unusable.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the number of live references to the shared object.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Checks if two handles refer to the same object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl<T: ?Sized> Clone for SharedObject<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: ?Sized> fmt::Debug for SharedObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedObject(refs={})", self.strong_count())
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
