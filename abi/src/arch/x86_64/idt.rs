//! Interrupt descriptor table (IDT) gate layout.
//!
//! Long-mode gates are 16 bytes. The handler address is split across three
//! fields and the type byte packs the present bit, descriptor privilege level
//! and gate type.

use bitflags::bitflags;

use super::gdt::SegmentSelector;
use crate::arch::IDT_ENTRIES;

bitflags! {
    /// Gate type/attribute byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GateAttributes: u8 {
        /// 64-bit interrupt gate (interrupts disabled on entry).
        const INTERRUPT_GATE = 0x0E;
        /// Descriptor privilege level 3: reachable from user `int n`.
        const DPL_USER = 0x60;
        /// Segment present.
        const PRESENT = 0x80;
    }
}

impl GateAttributes {
    /// Present ring-0 interrupt gate (0x8E).
    pub const KERNEL_INTERRUPT: Self =
        Self::from_bits_truncate(Self::PRESENT.bits() | Self::INTERRUPT_GATE.bits());

    /// Present ring-3 interrupt gate (0xEE).
    pub const USER_INTERRUPT: Self = Self::from_bits_truncate(
        Self::PRESENT.bits() | Self::DPL_USER.bits() | Self::INTERRUPT_GATE.bits(),
    );
}

/// Who may trigger a gate through a software interrupt instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeClass {
    /// Only kernel code and hardware.
    Kernel,
    /// Also partitions running at ring 3.
    User,
}

impl PrivilegeClass {
    /// Attribute byte written into the gate for this class.
    #[inline]
    pub const fn attributes(self) -> GateAttributes {
        match self {
            Self::Kernel => GateAttributes::KERNEL_INTERRUPT,
            Self::User => GateAttributes::USER_INTERRUPT,
        }
    }
}

/// One 16-byte long-mode gate descriptor.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdtEntry {
    offset_low: u16,
    selector: u16,
    ist: u8,
    type_attr: u8,
    offset_mid: u16,
    offset_high: u32,
    zero: u32,
}

impl IdtEntry {
    /// Not-present gate with every field cleared.
    pub const ZERO: Self = Self {
        offset_low: 0,
        selector: 0,
        ist: 0,
        type_attr: 0,
        offset_mid: 0,
        offset_high: 0,
        zero: 0,
    };

    /// Build a gate to `handler` through the kernel code segment.
    pub const fn new(handler: u64, privilege: PrivilegeClass) -> Self {
        Self {
            offset_low: handler as u16,
            selector: SegmentSelector::KERNEL_CODE.bits(),
            ist: 0,
            type_attr: privilege.attributes().bits(),
            offset_mid: (handler >> 16) as u16,
            offset_high: (handler >> 32) as u32,
            zero: 0,
        }
    }

    /// Reassembled handler entry address.
    pub const fn handler_address(&self) -> u64 {
        let low = self.offset_low as u64;
        let mid = self.offset_mid as u64;
        let high = self.offset_high as u64;
        low | (mid << 16) | (high << 32)
    }

    pub const fn selector(&self) -> SegmentSelector {
        SegmentSelector(self.selector)
    }

    pub const fn ist(&self) -> u8 {
        self.ist
    }

    /// Raw type/attribute byte.
    pub const fn type_attr(&self) -> u8 {
        self.type_attr
    }

    pub const fn attributes(&self) -> GateAttributes {
        GateAttributes::from_bits_truncate(self.type_attr)
    }

    /// The reserved trailing dword; always zero.
    pub const fn reserved(&self) -> u32 {
        self.zero
    }

    pub const fn is_present(&self) -> bool {
        self.type_attr & GateAttributes::PRESENT.bits() != 0
    }
}

/// Operand of `lidt`: table limit and linear base.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableDescriptor {
    pub limit: u16,
    pub base: u64,
}

impl TableDescriptor {
    /// Limit for a full 256-entry table (4095).
    pub const FULL_LIMIT: u16 = (core::mem::size_of::<IdtEntry>() * IDT_ENTRIES - 1) as u16;

    pub const fn new(base: u64) -> Self {
        Self {
            limit: Self::FULL_LIMIT,
            base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_is_sixteen_bytes() {
        assert_eq!(core::mem::size_of::<IdtEntry>(), 16);
        assert_eq!(TableDescriptor::FULL_LIMIT, 4095);
    }

    #[test]
    fn gate_splits_handler_address() {
        let gate = IdtEntry::new(0xFFFF_8000_DEAD_BEEF, PrivilegeClass::User);
        assert_eq!(gate.handler_address(), 0xFFFF_8000_DEAD_BEEF);
        assert_eq!(gate.selector().bits(), 0x08);
        assert_eq!(gate.type_attr(), 0xEE);
        assert_eq!(gate.ist(), 0);
        assert_eq!(gate.reserved(), 0);
        assert!(gate.is_present());
        assert!(!IdtEntry::ZERO.is_present());
    }

    #[test]
    fn privilege_attribute_bytes() {
        assert_eq!(PrivilegeClass::Kernel.attributes().bits(), 0x8E);
        assert_eq!(PrivilegeClass::User.attributes().bits(), 0xEE);
    }
}
