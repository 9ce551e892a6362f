//! Shared timer tick counter.
//!
//! One counter serves every core. Only the boot core resets it, during its
//! bring-up; the timer handler increments it on each expiry.

use core::sync::atomic::{AtomicU64, Ordering};

pub struct TickCounter {
    ticks: AtomicU64,
}

impl TickCounter {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
        }
    }

    pub fn reset(&self) {
        self.ticks.store(0, Ordering::SeqCst);
    }

    /// Count one expiry and return the new total.
    #[inline]
    pub fn tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

pub static TIMER_TICKS: TickCounter = TickCounter::new();

/// Called from the timer interrupt stub.
#[unsafe(no_mangle)]
pub extern "C" fn irq_timer_tick() -> u64 {
    TIMER_TICKS.tick()
}

#[unsafe(no_mangle)]
pub extern "C" fn irq_get_timer_ticks() -> u64 {
    TIMER_TICKS.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_counts_and_reset_clears() {
        let counter = TickCounter::new();
        assert_eq!(counter.tick(), 1);
        assert_eq!(counter.tick(), 2);
        assert_eq!(counter.get(), 2);
        counter.reset();
        assert_eq!(counter.get(), 0);
    }
}
