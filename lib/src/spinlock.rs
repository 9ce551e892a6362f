//! Non-reentrant busy-wait lock.
//!
//! There is no scheduler underneath the interrupt layer, so waiting means
//! spinning. The lock has no owner tracking: re-acquiring it on the same core
//! deadlocks, and nothing guarantees fairness between cores.

use core::hint::spin_loop;
use core::sync::atomic::{AtomicBool, Ordering};

pub struct Spinlock {
    locked: AtomicBool,
}

/// Releases the lock when dropped.
pub struct SpinlockGuard<'a> {
    lock: &'a Spinlock,
}

impl Spinlock {
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    #[inline(always)]
    pub fn lock(&self) {
        while self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            spin_loop();
        }
    }

    #[inline(always)]
    pub fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    #[inline(always)]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn guard(&self) -> SpinlockGuard<'_> {
        self.lock();
        SpinlockGuard { lock: self }
    }
}

impl Default for Spinlock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SpinlockGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn unlock_releases_a_held_lock() {
        let lock = Spinlock::new();
        lock.lock();
        assert!(lock.is_locked());
        lock.unlock();
        assert!(!lock.is_locked());
        lock.lock();
        assert!(lock.is_locked());
        lock.unlock();
    }

    #[test]
    fn guard_releases_on_drop() {
        let lock = Spinlock::new();
        {
            let _guard = lock.guard();
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
    }

    #[test]
    fn critical_sections_do_not_overlap() {
        struct Shared {
            lock: Spinlock,
            inside: AtomicBool,
        }
        let shared = Arc::new(Shared {
            lock: Spinlock::new(),
            inside: AtomicBool::new(false),
        });

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let _guard = shared.lock.guard();
                        assert!(!shared.inside.swap(true, Ordering::SeqCst));
                        shared.inside.store(false, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert!(!shared.lock.is_locked());
    }
}
