//! x86_64 architecture definitions.
//!
//! This module provides type-safe definitions for x86_64 hardware constants
//! used by the interrupt layer: MSR addresses, GDT selectors, gate descriptors,
//! CPUID feature bits and I/O port addresses.
//!
//! # Design Philosophy
//!
//! Raw integer constants are wrapped in newtypes to prevent misuse:
//! - `Msr(u32)` for MSR addresses
//! - `SegmentSelector(u16)` for GDT selectors
//! - `Port(u16)` for I/O port addresses
//! - `GateAttributes` bitflags for descriptor type bytes

pub mod apic;
pub mod cpuid;
pub mod gdt;
pub mod idt;
pub mod msr;
pub mod ports;

// Re-export commonly used types at module level
pub use apic::ApicBaseMsr;
pub use cpuid::{CpuidFeaturesEcx, CpuidFeaturesEdx, CpuidLeaf};
pub use gdt::SegmentSelector;
pub use idt::{GateAttributes, IdtEntry, PrivilegeClass, TableDescriptor};
pub use msr::Msr;
pub use ports::Port;
