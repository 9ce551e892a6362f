//! Model-specific register addresses.

/// Model-specific register address for RDMSR/WRMSR.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Msr(pub u32);

impl Msr {
    /// IA32_APIC_BASE: local APIC physical base and enable bits.
    pub const APIC_BASE: Self = Self(0x1B);

    #[inline]
    pub const fn address(self) -> u32 {
        self.0
    }
}
