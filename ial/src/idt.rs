//! The shared 256-entry dispatch table.
//!
//! Vectors are classified once, as data, in [`VECTOR_LAYOUT`]:
//!
//! | vectors | class                 | privilege |
//! |---------|-----------------------|-----------|
//! | 0-31    | CPU faults            | kernel    |
//! | 32-47   | remapped legacy IRQs  | kernel    |
//! | 48-255  | hypercalls            | user      |
//!
//! Gate targets are range-checked newtypes, so a user-reachable gate below
//! vector 48 cannot be expressed. All cores share one table: the first core to
//! populate it writes every gate, the others wait for that to finish and only
//! load the descriptor into their own IDTR.

use core::fmt;

use spin::{Mutex, Once};

use pip_abi::arch::x86_64::{IdtEntry, PrivilegeClass, TableDescriptor};
use pip_abi::arch::{
    EXCEPTION_VECTORS, HYPERCALL_BASE_VECTOR, IDT_ENTRIES, IRQ_BASE_VECTOR, IRQ_LINES,
};
use pip_abi::{IalError, IalResult};
use pip_lib::{Platform, klog_info, klog_trace};

// =============================================================================
// Vector classification
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorClass {
    Fault,
    LegacyIrq,
    Hypercall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorRange {
    pub first: u8,
    pub last: u8,
    pub class: VectorClass,
    pub privilege: PrivilegeClass,
}

impl VectorRange {
    #[inline]
    pub const fn contains(&self, vector: u8) -> bool {
        vector >= self.first && vector <= self.last
    }
}

/// Every vector falls in exactly one range.
pub static VECTOR_LAYOUT: [VectorRange; 3] = [
    VectorRange {
        first: 0,
        last: EXCEPTION_VECTORS - 1,
        class: VectorClass::Fault,
        privilege: PrivilegeClass::Kernel,
    },
    VectorRange {
        first: IRQ_BASE_VECTOR,
        last: IRQ_BASE_VECTOR + IRQ_LINES - 1,
        class: VectorClass::LegacyIrq,
        privilege: PrivilegeClass::Kernel,
    },
    VectorRange {
        first: HYPERCALL_BASE_VECTOR,
        last: u8::MAX,
        class: VectorClass::Hypercall,
        privilege: PrivilegeClass::User,
    },
];

impl VectorClass {
    pub fn range(self) -> &'static VectorRange {
        match self {
            Self::Fault => &VECTOR_LAYOUT[0],
            Self::LegacyIrq => &VECTOR_LAYOUT[1],
            Self::Hypercall => &VECTOR_LAYOUT[2],
        }
    }

    pub fn of(vector: u8) -> Self {
        VECTOR_LAYOUT
            .iter()
            .find(|range| range.contains(vector))
            .map(|range| range.class)
            .unwrap_or(Self::Hypercall)
    }

    pub fn privilege(self) -> PrivilegeClass {
        self.range().privilege
    }

    pub fn vectors(self) -> core::ops::RangeInclusive<u8> {
        let range = self.range();
        range.first..=range.last
    }
}

// =============================================================================
// Gate targets
// =============================================================================

/// A CPU fault vector, 0-31.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultVector(u8);

/// A legacy IRQ line, 0-15, delivered at vector 32 + line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqLine(u8);

/// A hypercall vector, 48-255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HypercallVector(u8);

impl FaultVector {
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl IrqLine {
    pub const fn line(self) -> u8 {
        self.0
    }

    pub const fn vector(self) -> u8 {
        IRQ_BASE_VECTOR + self.0
    }
}

impl HypercallVector {
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for FaultVector {
    type Error = IalError;

    fn try_from(vector: u8) -> IalResult<Self> {
        if VectorClass::Fault.range().contains(vector) {
            Ok(Self(vector))
        } else {
            Err(IalError::InvalidVector)
        }
    }
}

impl TryFrom<u8> for IrqLine {
    type Error = IalError;

    fn try_from(line: u8) -> IalResult<Self> {
        if line < IRQ_LINES {
            Ok(Self(line))
        } else {
            Err(IalError::InvalidVector)
        }
    }
}

impl TryFrom<u8> for HypercallVector {
    type Error = IalError;

    fn try_from(vector: u8) -> IalResult<Self> {
        if VectorClass::Hypercall.range().contains(vector) {
            Ok(Self(vector))
        } else {
            Err(IalError::InvalidVector)
        }
    }
}

/// Where a gate is installed. The privilege class follows from the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTarget {
    Fault(FaultVector),
    Irq(IrqLine),
    Hypercall(HypercallVector),
}

impl GateTarget {
    /// Classify a raw vector.
    pub fn from_vector(vector: u8) -> Self {
        match VectorClass::of(vector) {
            VectorClass::Fault => Self::Fault(FaultVector(vector)),
            VectorClass::LegacyIrq => Self::Irq(IrqLine(vector - IRQ_BASE_VECTOR)),
            VectorClass::Hypercall => Self::Hypercall(HypercallVector(vector)),
        }
    }

    pub const fn vector(self) -> u8 {
        match self {
            Self::Fault(v) => v.0,
            Self::Irq(line) => line.vector(),
            Self::Hypercall(v) => v.0,
        }
    }

    pub const fn class(self) -> VectorClass {
        match self {
            Self::Fault(_) => VectorClass::Fault,
            Self::Irq(_) => VectorClass::LegacyIrq,
            Self::Hypercall(_) => VectorClass::Hypercall,
        }
    }

    pub fn privilege(self) -> PrivilegeClass {
        self.class().privilege()
    }
}

impl fmt::Display for GateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fault(v) => write!(f, "fault {}", v.0),
            Self::Irq(line) => write!(f, "irq {}", line.0),
            Self::Hypercall(v) => write!(f, "hypercall {}", v.0),
        }
    }
}

// =============================================================================
// Handler entry points
// =============================================================================

/// Which family of entry stubs a handler comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// `isr0`..`isr255`, one per vector.
    Isr,
    /// `irq0`..`irq15`, one per legacy line.
    Irq,
}

/// Supplies the entry address of each externally provided handler.
pub trait HandlerSource: Sync {
    fn handler(&self, kind: HandlerKind, number: u8) -> Option<u64>;
}

impl<F> HandlerSource for F
where
    F: Fn(HandlerKind, u8) -> Option<u64> + Sync,
{
    fn handler(&self, kind: HandlerKind, number: u8) -> Option<u64> {
        self(kind, number)
    }
}

fn require(handlers: &dyn HandlerSource, kind: HandlerKind, number: u8) -> IalResult<u64> {
    handlers
        .handler(kind, number)
        .ok_or(IalError::MissingHandler)
}

/// Linker-provided stub tables of the assembly entry points.
#[cfg(target_os = "none")]
pub struct StubTables;

#[cfg(target_os = "none")]
#[allow(non_upper_case_globals)]
unsafe extern "C" {
    static isr_stub_table: [u64; IDT_ENTRIES];
    static irq_stub_table: [u64; IRQ_LINES as usize];
}

#[cfg(target_os = "none")]
impl HandlerSource for StubTables {
    fn handler(&self, kind: HandlerKind, number: u8) -> Option<u64> {
        let address = match kind {
            HandlerKind::Isr => unsafe { isr_stub_table[number as usize] },
            HandlerKind::Irq => unsafe { *irq_stub_table.get(number as usize)? },
        };
        (address != 0).then_some(address)
    }
}

// =============================================================================
// Dispatch table
// =============================================================================

pub struct DispatchTable {
    entries: Mutex<[IdtEntry; IDT_ENTRIES]>,
    populated: Once<IalResult<()>>,
}

/// The table every core loads.
pub static IDT: DispatchTable = DispatchTable::new();

impl DispatchTable {
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new([IdtEntry::ZERO; IDT_ENTRIES]),
            populated: Once::new(),
        }
    }

    /// Zero every gate.
    pub fn initialize_table(&self) {
        let mut entries = self.entries.lock();
        *entries = [IdtEntry::ZERO; IDT_ENTRIES];
        klog_trace!("IDT: {} entries cleared", IDT_ENTRIES);
    }

    /// Descriptor covering this table: limit 4095, base at the first gate.
    pub fn descriptor(&self) -> TableDescriptor {
        let entries = self.entries.lock();
        TableDescriptor::new(entries.as_ptr() as u64)
    }

    pub fn install_gate(&self, target: GateTarget, handler: u64) {
        let gate = IdtEntry::new(handler, target.privilege());
        self.entries.lock()[target.vector() as usize] = gate;
    }

    pub fn gate(&self, vector: u8) -> IdtEntry {
        self.entries.lock()[vector as usize]
    }

    pub fn snapshot(&self) -> [IdtEntry; IDT_ENTRIES] {
        *self.entries.lock()
    }

    /// Load the descriptor into the calling core's IDTR.
    ///
    /// The table must not move afterwards; on bare metal that means `self`
    /// is a static.
    pub fn flush(&self, platform: &dyn Platform) {
        platform.load_descriptor_table(&self.descriptor());
    }

    /// Kernel gates for the 32 CPU faults.
    pub fn install_fault_gates(
        &self,
        handlers: &dyn HandlerSource,
        platform: &dyn Platform,
    ) -> IalResult<()> {
        for vector in VectorClass::Fault.vectors() {
            let handler = require(handlers, HandlerKind::Isr, vector)?;
            self.install_gate(GateTarget::from_vector(vector), handler);
        }
        self.flush(platform);
        klog_trace!("IDT: fault gates installed");
        Ok(())
    }

    /// Software-interrupt gates for every vector above the faults.
    ///
    /// 32-47 get kernel gates to the per-vector stubs; 48-255 get user gates so
    /// partitions can issue hypercalls.
    pub fn install_softint_gates(
        &self,
        handlers: &dyn HandlerSource,
        platform: &dyn Platform,
    ) -> IalResult<()> {
        for vector in EXCEPTION_VECTORS..=u8::MAX {
            let handler = require(handlers, HandlerKind::Isr, vector)?;
            self.install_gate(GateTarget::from_vector(vector), handler);
        }
        self.flush(platform);
        klog_trace!("IDT: software interrupt gates installed");
        Ok(())
    }

    /// Kernel gates for the 16 legacy IRQ lines, replacing the stubs at 32-47.
    pub fn install_irq_gates(
        &self,
        handlers: &dyn HandlerSource,
        platform: &dyn Platform,
    ) -> IalResult<()> {
        for line in 0..IRQ_LINES {
            let handler = require(handlers, HandlerKind::Irq, line)?;
            self.install_gate(GateTarget::Irq(IrqLine(line)), handler);
        }
        self.flush(platform);
        klog_trace!("IDT: hardware interrupt gates installed");
        Ok(())
    }

    fn build(&self, handlers: &dyn HandlerSource, platform: &dyn Platform) -> IalResult<()> {
        self.initialize_table();
        self.install_fault_gates(handlers, platform)?;
        self.install_softint_gates(handlers, platform)?;
        self.install_irq_gates(handlers, platform)?;
        klog_info!("IDT: populated by core {}", platform.core_id());
        Ok(())
    }

    /// Populate the table once, then load it on the calling core.
    ///
    /// The first caller writes every gate; concurrent callers spin until it is
    /// done. Every caller, including the first, ends by flushing its own IDTR.
    pub fn populate(&self, handlers: &dyn HandlerSource, platform: &dyn Platform) -> IalResult<()> {
        let result = *self.populated.call_once(|| self.build(handlers, platform));
        result?;
        self.flush(platform);
        Ok(())
    }

    pub fn is_populated(&self) -> bool {
        self.populated.is_completed()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}
