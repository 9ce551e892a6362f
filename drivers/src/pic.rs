//! Legacy 8259 PIC pair.
//!
//! The master and slave are cascaded through master line 2. Initialization
//! remaps both chips away from the CPU exception vectors; all four ICWs of
//! both chips go out before either mask byte is written.

use pip_abi::arch::IRQ_LINES;
use pip_abi::arch::x86_64::Port;
use pip_lib::{Platform, klog_info, klog_trace};

use crate::hw::pic_defs::*;

/// What the mask registers hold once initialization is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PicMaskPolicy {
    /// Restore whatever masks were programmed before initialization.
    Preserve,
    /// Program these masks.
    Explicit { master: u8, slave: u8 },
    /// Unmask every line.
    Unmasked,
    /// Mask every line.
    #[default]
    Masked,
}

impl PicMaskPolicy {
    /// `Preserve` when the caller wants the existing masks kept, `otherwise` if not.
    pub const fn preserving_or(preserve_existing_mask: bool, otherwise: Self) -> Self {
        if preserve_existing_mask {
            Self::Preserve
        } else {
            otherwise
        }
    }
}

pub struct LegacyPic<'p> {
    platform: &'p dyn Platform,
}

impl<'p> LegacyPic<'p> {
    pub fn new(platform: &'p dyn Platform) -> Self {
        Self { platform }
    }

    #[inline]
    fn io_wait(&self) {
        self.platform.outb(Port::POST_DELAY, 0);
    }

    #[inline]
    fn write(&self, port: Port, value: u8) {
        self.platform.outb(port, value);
        self.io_wait();
    }

    /// Current `(master, slave)` mask bytes.
    pub fn masks(&self) -> (u8, u8) {
        (
            self.platform.inb(Port::PIC1_DATA),
            self.platform.inb(Port::PIC2_DATA),
        )
    }

    /// Cascade and remap both chips, then apply `policy` to the masks.
    pub fn initialize(&self, master_offset: u8, slave_offset: u8, policy: PicMaskPolicy) {
        let saved = self.masks();

        // ICW1: start the initialization sequence in cascade mode.
        self.write(Port::PIC1_COMMAND, ICW1_INIT | ICW1_ICW4);
        self.write(Port::PIC2_COMMAND, ICW1_INIT | ICW1_ICW4);
        // ICW2: vector offsets.
        self.write(Port::PIC1_DATA, master_offset);
        self.write(Port::PIC2_DATA, slave_offset);
        // ICW3: cascade wiring.
        self.write(Port::PIC1_DATA, ICW3_MASTER_SLAVE_ON_IRQ2);
        self.write(Port::PIC2_DATA, ICW3_SLAVE_CASCADE_ID);
        // ICW4: 8086 mode.
        self.write(Port::PIC1_DATA, ICW4_8086);
        self.write(Port::PIC2_DATA, ICW4_8086);

        let (master, slave) = match policy {
            PicMaskPolicy::Preserve => saved,
            PicMaskPolicy::Explicit { master, slave } => (master, slave),
            PicMaskPolicy::Unmasked => (PIC_MASK_NONE, PIC_MASK_NONE),
            PicMaskPolicy::Masked => (PIC_MASK_ALL, PIC_MASK_ALL),
        };
        self.platform.outb(Port::PIC1_DATA, master);
        self.platform.outb(Port::PIC2_DATA, slave);

        klog_info!(
            "PIC: remapped to 0x{:x}/0x{:x}, masks 0x{:02x}/0x{:02x}",
            master_offset,
            slave_offset,
            master,
            slave
        );
    }

    /// Mask every legacy line; the handover step before the local APIC takes over.
    pub fn mask_all(&self) {
        self.platform.outb(Port::PIC1_DATA, PIC_MASK_ALL);
        self.platform.outb(Port::PIC2_DATA, PIC_MASK_ALL);
        klog_trace!("PIC: all lines masked");
    }

    /// Mask or unmask one of the 16 legacy lines. Other lines are ignored.
    pub fn set_line_masked(&self, line: u8, masked: bool) {
        let (port, bit) = if line < PIC_LINES_PER_CHIP {
            (Port::PIC1_DATA, line)
        } else if line < IRQ_LINES {
            (Port::PIC2_DATA, line - PIC_LINES_PER_CHIP)
        } else {
            klog_trace!("PIC: ignoring mask change for line {}", line);
            return;
        };
        let current = self.platform.inb(port);
        let value = if masked {
            current | (1 << bit)
        } else {
            current & !(1 << bit)
        };
        self.platform.outb(port, value);
    }
}
