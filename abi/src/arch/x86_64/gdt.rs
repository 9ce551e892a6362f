//! Global Descriptor Table (GDT) selectors.
//!
//! The interrupt layer does not build the GDT; it only needs to name the
//! kernel code segment every gate jumps through. Segment selectors encode the
//! descriptor table index, table indicator (GDT/LDT), and requested privilege
//! level (RPL).

/// x86_64 segment selector.
///
/// Layout (16 bits):
/// - Bits 0-1: Requested Privilege Level (RPL)
/// - Bit 2: Table Indicator (0 = GDT, 1 = LDT)
/// - Bits 3-15: Descriptor index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SegmentSelector(pub u16);

impl SegmentSelector {
    /// Kernel code segment (GDT index 1, RPL 0) = 0x08.
    pub const KERNEL_CODE: Self = Self::new(1, false, 0);

    /// Create a new segment selector.
    ///
    /// # Arguments
    /// * `index` - Descriptor table index (0-8191)
    /// * `ldt` - Use LDT instead of GDT
    /// * `rpl` - Requested privilege level (0-3)
    #[inline]
    pub const fn new(index: u16, ldt: bool, rpl: u8) -> Self {
        let ti = if ldt { 1 << 2 } else { 0 };
        Self((index << 3) | ti | (rpl as u16 & 0x3))
    }

    /// Get the descriptor table index.
    #[inline]
    pub const fn index(self) -> u16 {
        self.0 >> 3
    }

    /// Get the requested privilege level (0-3).
    #[inline]
    pub const fn rpl(self) -> u8 {
        (self.0 & 0x3) as u8
    }

    /// Get the raw selector value.
    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_selector_values() {
        assert_eq!(SegmentSelector::KERNEL_CODE.bits(), 0x08);
        assert_eq!(SegmentSelector::new(2, false, 3).bits(), 0x13);
        assert_eq!(SegmentSelector::KERNEL_CODE.index(), 1);
        assert_eq!(SegmentSelector::KERNEL_CODE.rpl(), 0);
    }
}
