//! Local APIC hardware definitions.

// ============================================================================
// Local APIC Register Offsets
// ============================================================================

/// APIC ID register
pub(crate) const LAPIC_ID: u64 = 0x020;
/// Spurious interrupt vector register
pub(crate) const LAPIC_SPURIOUS: u64 = 0x0F0;
/// Local Vector Table: Timer
pub(crate) const LAPIC_LVT_TIMER: u64 = 0x320;
/// Timer Initial Count Register
pub(crate) const LAPIC_TIMER_ICR: u64 = 0x380;
/// Timer Current Count Register
pub(crate) const LAPIC_TIMER_CCR: u64 = 0x390;
/// Timer Divide Configuration Register
pub(crate) const LAPIC_TIMER_DCR: u64 = 0x3E0;

// ============================================================================
// LAPIC Control Flags
// ============================================================================

/// Software enable bit in the spurious interrupt register
pub(crate) const LAPIC_SPURIOUS_ENABLE: u32 = 1 << 8;
/// Mask flag for LVT entries
pub(crate) const LAPIC_LVT_MASKED: u32 = 1 << 16;

// ============================================================================
// Timer Configuration
// ============================================================================

/// Periodic timer mode
pub(crate) const LAPIC_TIMER_PERIODIC: u32 = 0x0002_0000;
/// Timer divisor of 16
pub(crate) const LAPIC_TIMER_DIV_16: u32 = 0x3;
/// Initial count loaded for the calibration window
pub(crate) const LAPIC_TIMER_CALIBRATION_COUNT: u32 = 0xFFFF_FFFF;

/// No-op iterations spun while the calibration count runs down
pub const LAPIC_CALIBRATION_SPINS: u32 = 100_000_000;
/// Nominal wall-clock length of the calibration spin (ms)
pub const LAPIC_CALIBRATION_INTERVAL_MS: u64 = 10;
