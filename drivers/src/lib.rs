#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]

pub mod apic;
pub mod hw;
pub mod irq;
pub mod pic;
pub mod pit;
#[cfg(target_arch = "x86_64")]
pub mod serial;

pub use apic::{ApicTimerConfig, LocalApic, TimerCalibration};
pub use irq::{TIMER_TICKS, TickCounter};
pub use pic::{LegacyPic, PicMaskPolicy};
