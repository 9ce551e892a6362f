//! Architecture-specific constants.
//!
//! Canonical definitions for the interrupt vector layout shared by the
//! dispatch table, the legacy controller remap and the local APIC timer.

pub mod x86_64;

// =============================================================================
// Interrupt Vectors
// =============================================================================

/// Number of entries in the interrupt descriptor table.
pub const IDT_ENTRIES: usize = 256;

/// Number of CPU exception vectors (0-31).
pub const EXCEPTION_VECTORS: u8 = 32;

/// Base vector for hardware IRQs (IRQ0 maps to this vector).
pub const IRQ_BASE_VECTOR: u8 = 32;

/// Number of remapped legacy IRQ lines (two cascaded 8259s).
pub const IRQ_LINES: u8 = 16;

/// First user-triggerable hypercall vector.
pub const HYPERCALL_BASE_VECTOR: u8 = IRQ_BASE_VECTOR + IRQ_LINES;

/// Vector offset programmed into the master PIC.
pub const PIC1_VECTOR_OFFSET: u8 = IRQ_BASE_VECTOR;

/// Vector offset programmed into the slave PIC.
pub const PIC2_VECTOR_OFFSET: u8 = IRQ_BASE_VECTOR + 8;
