//! 8254 PIT (Programmable Interval Timer) definitions.

// ============================================================================
// Frequency Constants
// ============================================================================

/// PIT base oscillator frequency (Hz)
pub const PIT_BASE_FREQUENCY_HZ: u32 = 1_193_182;
/// PIT input clock on Intel Galileo boards (Hz)
pub const PIT_GALILEO_BASE_FREQUENCY_HZ: u32 = 2_600_000;
/// Default timer frequency (Hz)
pub const PIT_DEFAULT_FREQUENCY_HZ: u32 = 100;

// ============================================================================
// Command Register Bits
// ============================================================================

/// Select channel 0
pub(crate) const PIT_COMMAND_CHANNEL0: u8 = 0x00;
/// Access mode: low byte then high byte
pub(crate) const PIT_COMMAND_ACCESS_LOHI: u8 = 0x30;
/// Operating mode: square wave generator
pub(crate) const PIT_COMMAND_MODE_SQUARE: u8 = 0x06;
/// Binary counting mode
pub(crate) const PIT_COMMAND_BINARY: u8 = 0x00;

// ============================================================================
// IRQ Assignment
// ============================================================================

/// PIT is connected to legacy IRQ 0
pub const PIT_IRQ_LINE: u8 = 0;
