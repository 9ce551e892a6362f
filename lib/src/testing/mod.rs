//! Host-side platform double.
//!
//! [`MockPlatform`] implements [`Platform`] over plain memory: port, MSR,
//! CR4, MMIO and descriptor-table traffic is recorded so tests can assert on
//! the exact sequence a driver produced. A halted core is modelled by setting
//! a flag and parking the calling thread forever.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::vec::Vec;

use pip_abi::arch::x86_64::{CpuidLeaf, Msr, Port, TableDescriptor};

use crate::platform::{CpuidRegs, Platform};

#[derive(Default)]
struct PortState {
    writes: Vec<(Port, u8)>,
    latched: HashMap<Port, u8>,
}

#[derive(Default)]
struct MmioState {
    writes: Vec<(u64, u32)>,
    registers: HashMap<u64, u32>,
}

#[derive(Default)]
pub struct MockPlatform {
    core_id: AtomicU32,
    ports: Mutex<PortState>,
    msrs: Mutex<HashMap<u32, (u32, u32)>>,
    cpuid: Mutex<HashMap<u32, CpuidRegs>>,
    cr4: AtomicU64,
    mmio: Mutex<MmioState>,
    descriptors: Mutex<Vec<TableDescriptor>>,
    spins: Mutex<Vec<u32>>,
    interrupts_disabled: AtomicBool,
    halted: AtomicBool,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// A core that reports `core_id` and nothing else.
    pub fn with_core(core_id: u32) -> Self {
        let mock = Self::new();
        mock.set_core_id(core_id);
        mock
    }

    // =========================================================================
    // Setup
    // =========================================================================

    pub fn set_core_id(&self, core_id: u32) {
        self.core_id.store(core_id, Ordering::SeqCst);
    }

    /// Value returned by the next `inb` of `port` until it is written.
    pub fn set_port(&self, port: Port, value: u8) {
        lock(&self.ports).latched.insert(port, value);
    }

    pub fn set_msr(&self, msr: Msr, low: u32, high: u32) {
        lock(&self.msrs).insert(msr.address(), (low, high));
    }

    pub fn set_cpuid(&self, leaf: CpuidLeaf, regs: CpuidRegs) {
        lock(&self.cpuid).insert(leaf.0, regs);
    }

    /// Leaf 1 feature words.
    pub fn set_features(&self, edx: u32, ecx: u32) {
        self.set_cpuid(
            CpuidLeaf::FEATURES,
            CpuidRegs {
                edx,
                ecx,
                ..CpuidRegs::default()
            },
        );
    }

    /// Program leaf 0 and the brand leaves so they spell `vendor` and `brand`.
    pub fn set_identity(&self, vendor: &str, brand: &str) {
        let mut vendor_bytes = [0u8; 12];
        copy_padded(&mut vendor_bytes, vendor.as_bytes());
        let words = le_words(&vendor_bytes);
        self.set_cpuid(
            CpuidLeaf::VENDOR,
            CpuidRegs {
                eax: 1,
                ebx: words[0],
                edx: words[1],
                ecx: words[2],
            },
        );

        let mut brand_bytes = [0u8; 48];
        copy_padded(&mut brand_bytes, brand.as_bytes());
        let words = le_words(&brand_bytes);
        self.set_cpuid(
            CpuidLeaf::EXTENDED_MAX,
            CpuidRegs {
                eax: CpuidLeaf::BRAND_LAST.0,
                ..CpuidRegs::default()
            },
        );
        for (i, chunk) in words.chunks(4).enumerate() {
            self.set_cpuid(
                CpuidLeaf(CpuidLeaf::BRAND_FIRST.0 + i as u32),
                CpuidRegs {
                    eax: chunk[0],
                    ebx: chunk[1],
                    ecx: chunk[2],
                    edx: chunk[3],
                },
            );
        }
    }

    pub fn set_cr4(&self, value: u64) {
        self.cr4.store(value, Ordering::SeqCst);
    }

    pub fn set_mmio(&self, phys: u64, value: u32) {
        lock(&self.mmio).registers.insert(phys, value);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn port_writes(&self) -> Vec<(Port, u8)> {
        lock(&self.ports).writes.clone()
    }

    /// Bytes written to `port`, oldest first.
    pub fn writes_to(&self, port: Port) -> Vec<u8> {
        lock(&self.ports)
            .writes
            .iter()
            .filter(|(p, _)| *p == port)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn port_value(&self, port: Port) -> Option<u8> {
        lock(&self.ports).latched.get(&port).copied()
    }

    pub fn msr(&self, msr: Msr) -> Option<(u32, u32)> {
        lock(&self.msrs).get(&msr.address()).copied()
    }

    pub fn cr4(&self) -> u64 {
        self.cr4.load(Ordering::SeqCst)
    }

    pub fn mmio_value(&self, phys: u64) -> Option<u32> {
        lock(&self.mmio).registers.get(&phys).copied()
    }

    pub fn mmio_writes(&self) -> Vec<(u64, u32)> {
        lock(&self.mmio).writes.clone()
    }

    pub fn loaded_descriptors(&self) -> Vec<TableDescriptor> {
        lock(&self.descriptors).clone()
    }

    pub fn spin_delays(&self) -> Vec<u32> {
        lock(&self.spins).clone()
    }

    pub fn interrupts_disabled(&self) -> bool {
        self.interrupts_disabled.load(Ordering::SeqCst)
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }
}

impl Platform for MockPlatform {
    fn core_id(&self) -> u32 {
        self.core_id.load(Ordering::SeqCst)
    }

    fn inb(&self, port: Port) -> u8 {
        self.port_value(port).unwrap_or(0)
    }

    fn outb(&self, port: Port, value: u8) {
        let mut ports = lock(&self.ports);
        ports.writes.push((port, value));
        ports.latched.insert(port, value);
    }

    fn read_msr(&self, msr: Msr) -> (u32, u32) {
        self.msr(msr).unwrap_or((0, 0))
    }

    fn write_msr(&self, msr: Msr, low: u32, high: u32) {
        self.set_msr(msr, low, high);
    }

    fn cpuid(&self, leaf: CpuidLeaf) -> CpuidRegs {
        lock(&self.cpuid).get(&leaf.0).copied().unwrap_or_default()
    }

    fn read_cr4(&self) -> u64 {
        self.cr4()
    }

    fn write_cr4(&self, value: u64) {
        self.set_cr4(value);
    }

    fn load_descriptor_table(&self, descriptor: &TableDescriptor) {
        lock(&self.descriptors).push(*descriptor);
    }

    fn mmio_read32(&self, phys: u64) -> u32 {
        self.mmio_value(phys).unwrap_or(0)
    }

    fn mmio_write32(&self, phys: u64, value: u32) {
        let mut mmio = lock(&self.mmio);
        mmio.writes.push((phys, value));
        mmio.registers.insert(phys, value);
    }

    fn spin_delay(&self, iterations: u32) {
        lock(&self.spins).push(iterations);
    }

    fn disable_interrupts(&self) {
        self.interrupts_disabled.store(true, Ordering::SeqCst);
    }

    fn halt_forever(&self) -> ! {
        self.halted.store(true, Ordering::SeqCst);
        loop {
            std::thread::park();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn copy_padded(dst: &mut [u8], src: &[u8]) {
    let len = src.len().min(dst.len());
    dst[..len].copy_from_slice(&src[..len]);
}

fn le_words(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_writes_latch_for_reads() {
        let mock = MockPlatform::new();
        assert_eq!(mock.inb(Port::PIC1_DATA), 0);
        mock.outb(Port::PIC1_DATA, 0xFB);
        mock.outb(Port::PIC2_DATA, 0xFF);
        assert_eq!(mock.inb(Port::PIC1_DATA), 0xFB);
        assert_eq!(mock.writes_to(Port::PIC2_DATA), vec![0xFF]);
        assert_eq!(mock.port_writes().len(), 2);
    }

    #[test]
    fn identity_encodes_vendor_register_order() {
        let mock = MockPlatform::new();
        mock.set_identity("GenuineIntel", "Quark");
        let leaf0 = mock.cpuid(CpuidLeaf::VENDOR);
        assert_eq!(&leaf0.ebx.to_le_bytes(), b"Genu");
        assert_eq!(&leaf0.edx.to_le_bytes(), b"ineI");
        assert_eq!(&leaf0.ecx.to_le_bytes(), b"ntel");
        assert_eq!(mock.cpuid(CpuidLeaf(0x1234)), CpuidRegs::default());
    }
}
