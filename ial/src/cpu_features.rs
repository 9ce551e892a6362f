//! CPU identification and feature gating.
//!
//! Identification is diagnostic only. Of the probed features, global pages
//! are switched on when present; PCID is reported and left off.

use pip_abi::arch::x86_64::cpuid::CR4_PGE;
use pip_abi::arch::x86_64::{CpuidFeaturesEcx, CpuidFeaturesEdx, CpuidLeaf};
use pip_lib::{CpuidRegs, Platform, klog_info};

/// Vendor and brand strings as reported by CPUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuIdentity {
    vendor: [u8; 12],
    brand: [u8; 48],
}

fn printable(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..end]).map(str::trim).unwrap_or("?")
}

fn copy_words(dst: &mut [u8], words: &[u32]) {
    for (chunk, word) in dst.chunks_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}

impl CpuIdentity {
    pub fn vendor_str(&self) -> &str {
        printable(&self.vendor)
    }

    /// Empty when the CPU has no brand string leaves.
    pub fn brand_str(&self) -> &str {
        printable(&self.brand)
    }
}

/// Read the vendor (leaf 0) and brand (leaves 0x8000_0002..=0x8000_0004) strings.
pub fn identify(platform: &dyn Platform) -> CpuIdentity {
    let mut identity = CpuIdentity {
        vendor: [0; 12],
        brand: [0; 48],
    };

    let leaf0 = platform.cpuid(CpuidLeaf::VENDOR);
    copy_words(&mut identity.vendor, &[leaf0.ebx, leaf0.edx, leaf0.ecx]);

    let max_extended = platform.cpuid(CpuidLeaf::EXTENDED_MAX).eax;
    if max_extended >= CpuidLeaf::BRAND_LAST.0 {
        for (i, leaf) in (CpuidLeaf::BRAND_FIRST.0..=CpuidLeaf::BRAND_LAST.0).enumerate() {
            let CpuidRegs { eax, ebx, ecx, edx } = platform.cpuid(CpuidLeaf(leaf));
            copy_words(&mut identity.brand[i * 16..(i + 1) * 16], &[eax, ebx, ecx, edx]);
        }
    }

    klog_info!(
        "CPU: core {} is {} ({})",
        platform.core_id(),
        identity.vendor_str(),
        identity.brand_str()
    );
    identity
}

/// Leaf 1 features the interrupt layer cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuFeatures {
    pub global_pages: bool,
    pub pcid: bool,
    pub apic: bool,
}

impl CpuFeatures {
    /// Read the feature bits without touching any control register.
    pub fn query(platform: &dyn Platform) -> Self {
        let regs = platform.cpuid(CpuidLeaf::FEATURES);
        let edx = CpuidFeaturesEdx::from_bits_truncate(regs.edx);
        let ecx = CpuidFeaturesEcx::from_bits_truncate(regs.ecx);
        Self {
            global_pages: edx.contains(CpuidFeaturesEdx::PGE),
            pcid: ecx.contains(CpuidFeaturesEcx::PCID),
            apic: edx.contains(CpuidFeaturesEdx::APIC),
        }
    }
}

/// Query features and enable global pages if the CPU has them.
pub fn probe_features(platform: &dyn Platform) -> CpuFeatures {
    let features = CpuFeatures::query(platform);

    if features.global_pages {
        platform.write_cr4(platform.read_cr4() | CR4_PGE);
        klog_info!("CPU: global pages enabled");
    } else {
        klog_info!("CPU: global pages unsupported");
    }

    if features.pcid {
        klog_info!("CPU: PCID supported, left disabled");
    } else {
        klog_info!("CPU: PCID unsupported");
    }

    features
}
