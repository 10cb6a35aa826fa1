use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// A small, blocking counting semaphore.
///
/// Bounds the number of workbook reads in flight independently of the pool size.
#[derive(Debug)]
pub struct Semaphore {
    permits: Mutex<usize>,
    cv: Condvar,
}

/// Returns its permit when dropped, including during unwinding.
#[derive(Debug)]
pub struct Permit<'a> {
    sem: &'a Semaphore,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.sem.release();
    }
}

impl Semaphore {
    /// `permits` is clamped to at least 1.
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits.max(1)),
            cv: Condvar::new(),
        }
    }

    /// Acquire one permit, blocking until available.
    ///
    /// Also returns the time spent waiting (zero if no wait was required).
    pub fn acquire(&self) -> (Permit<'_>, Duration) {
        let start = Instant::now();
        let mut waited = false;
        let mut g = self.permits.lock().unwrap_or_else(PoisonError::into_inner);
        while *g == 0 {
            waited = true;
            g = self.cv.wait(g).unwrap_or_else(PoisonError::into_inner);
        }
        *g -= 1;
        let waited = if waited { start.elapsed() } else { Duration::ZERO };
        (Permit { sem: self }, waited)
    }

    /// Permits currently free.
    #[cfg(test)]
    pub fn available(&self) -> usize {
        *self.permits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        let mut g = self.permits.lock().unwrap_or_else(PoisonError::into_inner);
        *g += 1;
        self.cv.notify_one();
    }
}
