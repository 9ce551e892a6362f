//! 8254 PIT channel 0 as a periodic tick source.

use pip_abi::arch::x86_64::Port;
use pip_lib::{Platform, klog_info};

use crate::hw::pit_defs::*;

/// Reload divisor for `frequency_hz` off a `base_hz` input clock, and the
/// frequency it really yields.
///
/// A zero rate falls back to the default, a zero clock to the standard
/// 1.193182 MHz one; the divisor is clamped to `1..=0xFFFF`.
pub fn calculate_divisor(mut base_hz: u32, mut frequency_hz: u32) -> (u16, u32) {
    if base_hz == 0 {
        base_hz = PIT_BASE_FREQUENCY_HZ;
    }
    if frequency_hz == 0 {
        frequency_hz = PIT_DEFAULT_FREQUENCY_HZ;
    }
    if frequency_hz > base_hz {
        frequency_hz = base_hz;
    }

    let divisor = (base_hz / frequency_hz).clamp(1, 0xFFFF);
    (divisor as u16, base_hz / divisor)
}

/// Program channel 0 as a square-wave generator. Returns the actual frequency.
pub fn set_frequency(platform: &dyn Platform, base_hz: u32, frequency_hz: u32) -> u32 {
    let (divisor, actual) = calculate_divisor(base_hz, frequency_hz);

    let command = PIT_COMMAND_CHANNEL0
        | PIT_COMMAND_ACCESS_LOHI
        | PIT_COMMAND_MODE_SQUARE
        | PIT_COMMAND_BINARY;
    platform.outb(Port::PIT_COMMAND, command);
    platform.outb(Port::PIT_CHANNEL0, (divisor & 0xFF) as u8);
    platform.outb(Port::PIT_CHANNEL0, (divisor >> 8) as u8);
    platform.outb(Port::POST_DELAY, 0);

    klog_info!("PIT: frequency set to {} Hz (divisor {})", actual, divisor);
    actual
}
