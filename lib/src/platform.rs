//! Privileged hardware operations behind a single seam.
//!
//! Every driver and IAL routine reaches the CPU through a `&dyn Platform`
//! (or a generic `P: Platform`). On bare metal that is [`BareMetal`]; host
//! tests substitute [`crate::testing::MockPlatform`], which records the
//! traffic instead of executing it.

use pip_abi::arch::x86_64::{CpuidLeaf, Msr, Port, TableDescriptor};

/// Raw register output of one CPUID leaf.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuidRegs {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

pub trait Platform: Sync {
    /// Hardware index of the executing core; 0 is the boot core.
    fn core_id(&self) -> u32;

    fn inb(&self, port: Port) -> u8;
    fn outb(&self, port: Port, value: u8);

    /// Read an MSR as `(low, high)` halves.
    fn read_msr(&self, msr: Msr) -> (u32, u32);
    fn write_msr(&self, msr: Msr, low: u32, high: u32);

    fn cpuid(&self, leaf: CpuidLeaf) -> CpuidRegs;

    fn read_cr4(&self) -> u64;
    fn write_cr4(&self, value: u64);

    /// Load `descriptor` into the executing core's IDTR.
    fn load_descriptor_table(&self, descriptor: &TableDescriptor);

    /// 32-bit access to a physical MMIO register.
    fn mmio_read32(&self, phys: u64) -> u32;
    fn mmio_write32(&self, phys: u64, value: u32);

    /// Busy-wait for `iterations` no-op cycles.
    fn spin_delay(&self, iterations: u32);

    fn disable_interrupts(&self);

    /// Park the executing core forever.
    fn halt_forever(&self) -> !;
}

/// The real machine, running at ring 0.
#[cfg(target_arch = "x86_64")]
pub struct BareMetal {
    hhdm_offset: u64,
}

#[cfg(target_arch = "x86_64")]
impl BareMetal {
    /// # Safety
    ///
    /// The caller must run at CPL 0 with physical memory mapped at
    /// `hhdm_offset`; every trait method executes privileged instructions.
    pub const unsafe fn new(hhdm_offset: u64) -> Self {
        Self { hhdm_offset }
    }

    #[inline]
    fn mmio_ptr(&self, phys: u64) -> *mut u32 {
        (self.hhdm_offset + phys) as *mut u32
    }
}

#[cfg(target_arch = "x86_64")]
impl Platform for BareMetal {
    fn core_id(&self) -> u32 {
        crate::cpu::core_index()
    }

    fn inb(&self, port: Port) -> u8 {
        unsafe { crate::io::inb(port.number()) }
    }

    fn outb(&self, port: Port, value: u8) {
        unsafe { crate::io::outb(port.number(), value) }
    }

    fn read_msr(&self, msr: Msr) -> (u32, u32) {
        let value = unsafe { x86_64::registers::model_specific::Msr::new(msr.address()).read() };
        (value as u32, (value >> 32) as u32)
    }

    fn write_msr(&self, msr: Msr, low: u32, high: u32) {
        let mut reg = x86_64::registers::model_specific::Msr::new(msr.address());
        unsafe { reg.write(((high as u64) << 32) | low as u64) }
    }

    fn cpuid(&self, leaf: CpuidLeaf) -> CpuidRegs {
        let (eax, ebx, ecx, edx) = crate::cpu::cpuid(leaf.0);
        CpuidRegs { eax, ebx, ecx, edx }
    }

    fn read_cr4(&self) -> u64 {
        x86_64::registers::control::Cr4::read_raw()
    }

    fn write_cr4(&self, value: u64) {
        unsafe { x86_64::registers::control::Cr4::write_raw(value) }
    }

    fn load_descriptor_table(&self, descriptor: &TableDescriptor) {
        let pointer = x86_64::structures::DescriptorTablePointer {
            limit: descriptor.limit,
            base: x86_64::VirtAddr::new_truncate(descriptor.base),
        };
        unsafe { x86_64::instructions::tables::lidt(&pointer) }
    }

    fn mmio_read32(&self, phys: u64) -> u32 {
        unsafe { core::ptr::read_volatile(self.mmio_ptr(phys)) }
    }

    fn mmio_write32(&self, phys: u64, value: u32) {
        unsafe { core::ptr::write_volatile(self.mmio_ptr(phys), value) }
    }

    fn spin_delay(&self, iterations: u32) {
        for _ in 0..iterations {
            x86_64::instructions::nop();
        }
    }

    fn disable_interrupts(&self) {
        crate::cpu::disable_interrupts();
    }

    fn halt_forever(&self) -> ! {
        crate::cpu::halt_loop()
    }
}
