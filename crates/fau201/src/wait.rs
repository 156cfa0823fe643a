//! Blocking wait used between an SPI write and the chip select release.

use std::time::Duration;

/// Something that can block the caller for a given duration.
///
/// Any `FnMut(Duration)` implements it, so tests can pass a closure that
/// records the requested delay instead of sleeping.
pub trait Wait {
    fn wait(&mut self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Wait for ThreadSleep {
    fn wait(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<F> Wait for F
where
    F: FnMut(Duration),
{
    fn wait(&mut self, duration: Duration) {
        self(duration)
    }
}
