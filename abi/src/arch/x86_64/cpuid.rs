//! CPUID leaves and feature bits consulted during interrupt bring-up.

use bitflags::bitflags;

/// CPUID leaf numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct CpuidLeaf(pub u32);

impl CpuidLeaf {
    /// Highest basic leaf and vendor string.
    pub const VENDOR: Self = Self(0);
    /// Family/model and feature flags.
    pub const FEATURES: Self = Self(1);
    /// Highest extended leaf.
    pub const EXTENDED_MAX: Self = Self(0x8000_0000);
    /// First of three processor brand string leaves.
    pub const BRAND_FIRST: Self = Self(0x8000_0002);
    /// Last processor brand string leaf.
    pub const BRAND_LAST: Self = Self(0x8000_0004);
}

bitflags! {
    /// Leaf 1 EDX feature bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CpuidFeaturesEdx: u32 {
        const APIC = 1 << 9;
        const PGE = 1 << 13;
    }
}

bitflags! {
    /// Leaf 1 ECX feature bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CpuidFeaturesEcx: u32 {
        const PCID = 1 << 17;
    }
}

/// CR4.PGE: global page translations.
pub const CR4_PGE: u64 = 1 << 7;
