//! IA32_APIC_BASE layout.

use bitflags::bitflags;

bitflags! {
    /// Flag bits in the low half of IA32_APIC_BASE.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ApicBaseMsr: u32 {
        /// Set by hardware on the bootstrap processor.
        const BSP = 1 << 8;
        /// Global APIC enable.
        const GLOBAL_ENABLE = 1 << 11;
    }
}

impl ApicBaseMsr {
    /// Physical base address bits of the low half (4 KiB aligned).
    pub const ADDR_MASK: u32 = 0xFFFF_F000;

    /// Value the register should hold to keep `raw`'s base and enable the APIC.
    #[inline]
    pub const fn enabled_value(raw: u32) -> u32 {
        (raw & Self::ADDR_MASK) | Self::GLOBAL_ENABLE.bits()
    }
}
