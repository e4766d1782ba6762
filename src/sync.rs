//! Poison recovery extension traits for std::sync locks
//!
//! A panicking validator or listener must not wedge the whole engine, so every
//! lock in the crate is taken through these helpers.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Extension trait for Mutex with poison recovery
pub trait MutexExt<T> {
    /// Lock the mutex, recovering from poison errors
    fn lock_recovered(&self) -> MutexGuard<'_, T>;
}

/// Extension trait for RwLock with poison recovery
pub trait RwLockExt<T> {
    /// Acquire a read lock, recovering from poison errors
    fn read_recovered(&self) -> RwLockReadGuard<'_, T>;

    /// Acquire a write lock, recovering from poison errors
    fn write_recovered(&self) -> RwLockWriteGuard<'_, T>;
}

impl<T> MutexExt<T> for Mutex<T> {
    fn lock_recovered(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(|poisoned| {
            log::warn!("Mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl<T> RwLockExt<T> for RwLock<T> {
    fn read_recovered(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap_or_else(|poisoned| {
            log::warn!("RwLock was poisoned (read), recovering");
            poisoned.into_inner()
        })
    }

    fn write_recovered(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap_or_else(|poisoned| {
            log::warn!("RwLock was poisoned (write), recovering");
            poisoned.into_inner()
        })
    }
}
