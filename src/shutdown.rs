//! Ctrl-C handling for relocations in flight.
//!
//! The signal handler only flips a flag. The engine polls it before each
//! entry move, so an interrupted run stops at an entry boundary and rolls
//! back instead of leaving a half-moved folder behind.

use std::sync::atomic::{AtomicBool, Ordering};

static STOP: AtomicBool = AtomicBool::new(false);

/// Ask the running relocation to stop. Async-signal-safe; repeat calls are harmless.
pub fn request() {
    STOP.store(true, Ordering::Relaxed);
}

pub fn is_requested() -> bool {
    STOP.load(Ordering::Relaxed)
}

/// Allow further relocations after an interrupt was handled.
pub fn reset() {
    STOP.store(false, Ordering::Relaxed);
}
