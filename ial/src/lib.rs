//! Interrupt abstraction layer of the pipcore multiprocessor kernel.
//!
//! Wires exception, hardware interrupt and hypercall delivery into a shared,
//! privilege-aware dispatch table, brings up the legacy 8259 pair and the
//! per-core local APIC, and sequences all of it differently for the boot core
//! and the secondary cores.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod cpu_features;
pub mod idt;
pub mod init;

pub use config::{IalConfig, TimerMode, TimerStrategy, config_from_cmdline};
pub use cpu_features::{CpuFeatures, CpuIdentity, identify, probe_features};
pub use idt::{
    DispatchTable, FaultVector, GateTarget, HandlerKind, HandlerSource, HypercallVector, IDT,
    IrqLine, VECTOR_LAYOUT, VectorClass,
};
pub use init::{ArmedCore, ArmedTimer, CoreRole, InterruptBringUp};

/// Arm interrupt delivery on the calling core of the real machine.
///
/// Every core calls this once. The boot core also brings up the COM1 log sink
/// and applies the configured log level.
///
/// # Safety
///
/// Must run at CPL 0 with physical memory mapped at `hhdm_offset`, and the
/// linker must provide `isr_stub_table` and `irq_stub_table`.
#[cfg(target_os = "none")]
pub unsafe fn init_interrupts(hhdm_offset: u64, cmdline: Option<&str>) -> ArmedCore {
    use pip_lib::{BareMetal, Platform, klog_set_level};

    let platform = unsafe { BareMetal::new(hhdm_offset) };
    let config = config_from_cmdline(cmdline);

    if CoreRole::from_core_id(platform.core_id()).is_boot() {
        unsafe { pip_drivers::serial::init() };
        klog_set_level(config.log_level);
    }

    InterruptBringUp::new(
        &platform,
        &idt::StubTables,
        &IDT,
        &pip_drivers::TIMER_TICKS,
        config,
    )
    .run()
}
