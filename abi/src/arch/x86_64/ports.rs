//! x86 I/O port addresses.
//!
//! This module provides a type-safe `Port` newtype that consolidates the
//! I/O port addresses the interrupt layer touches, preventing accidentally
//! using other u16 values as port numbers.

/// x86 I/O port address.
///
/// Ports are accessed via IN/OUT instructions. This newtype groups all
/// known port addresses and prevents accidentally using other u16 values.
///
/// # Example
///
/// ```ignore
/// use pip_abi::arch::x86_64::ports::Port;
///
/// platform.outb(Port::PIC1_DATA, 0xFF);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Port(pub u16);

impl Port {
    // =========================================================================
    // Serial (8250/16550 UART)
    // =========================================================================

    /// COM1 serial port base address.
    pub const COM1: Self = Self(0x3F8);

    // =========================================================================
    // Programmable Interval Timer (8254 PIT)
    // =========================================================================

    /// PIT Channel 0 data port.
    pub const PIT_CHANNEL0: Self = Self(0x40);

    /// PIT Command/mode register port.
    pub const PIT_COMMAND: Self = Self(0x43);

    // =========================================================================
    // Legacy PIC (8259)
    // =========================================================================

    /// Master PIC command port.
    pub const PIC1_COMMAND: Self = Self(0x20);

    /// Master PIC data port.
    pub const PIC1_DATA: Self = Self(0x21);

    /// Slave PIC command port.
    pub const PIC2_COMMAND: Self = Self(0xA0);

    /// Slave PIC data port.
    pub const PIC2_DATA: Self = Self(0xA1);

    // =========================================================================
    // Debug Ports
    // =========================================================================

    /// POST diagnostic port, written to for short I/O delays.
    pub const POST_DELAY: Self = Self(0x80);

    // =========================================================================
    // Methods
    // =========================================================================

    /// Get the raw port number for IN/OUT instructions.
    #[inline]
    pub const fn number(self) -> u16 {
        self.0
    }

    /// Create an offset port (e.g., COM1 + register offset).
    #[inline]
    pub const fn offset(self, off: u16) -> Self {
        Self(self.0 + off)
    }
}

// =============================================================================
// Raw Port Address Constants
// =============================================================================

/// COM1 base for drivers that take a bare port number.
pub const COM1_BASE: u16 = Port::COM1.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pic_ports_are_paired() {
        assert_eq!(Port::PIC1_COMMAND.offset(1), Port::PIC1_DATA);
        assert_eq!(Port::PIC2_COMMAND.offset(1), Port::PIC2_DATA);
        assert_eq!(Port::PIC2_DATA.number(), 0xA1);
    }
}
