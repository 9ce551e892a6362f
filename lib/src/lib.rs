#![cfg_attr(not(test), no_std)]
#![allow(unsafe_op_in_unsafe_fn)]

#[cfg(all(feature = "testing", not(test)))]
extern crate std;

#[cfg(target_arch = "x86_64")]
pub mod cpu {
    use core::arch::asm;

    #[inline(always)]
    pub fn hlt() {
        unsafe {
            asm!("hlt", options(nomem, nostack, preserves_flags));
        }
    }

    #[inline(always)]
    pub fn disable_interrupts() {
        unsafe {
            asm!("cli", options(nomem, nostack));
        }
    }

    #[inline(always)]
    pub fn halt_loop() -> ! {
        disable_interrupts();
        loop {
            hlt();
        }
    }

    #[inline(always)]
    pub fn cpuid(leaf: u32) -> (u32, u32, u32, u32) {
        #[allow(unused_unsafe)]
        let res = unsafe { core::arch::x86_64::__cpuid(leaf) };
        (res.eax, res.ebx, res.ecx, res.edx)
    }

    /// Initial local APIC id of the executing core (CPUID.1:EBX[31:24]).
    #[inline(always)]
    pub fn core_index() -> u32 {
        let (_, ebx, _, _) = cpuid(1);
        ebx >> 24
    }
}

#[cfg(target_arch = "x86_64")]
pub mod io {
    use core::arch::asm;

    #[inline(always)]
    pub unsafe fn outb(port: u16, value: u8) {
        unsafe {
            asm!(
                "out dx, al",
                in("dx") port,
                in("al") value,
                options(nomem, nostack, preserves_flags)
            );
        }
    }

    #[inline(always)]
    pub unsafe fn inb(port: u16) -> u8 {
        unsafe {
            let value: u8;
            asm!(
                "in al, dx",
                out("al") value,
                in("dx") port,
                options(nomem, nostack, preserves_flags)
            );
            value
        }
    }
}

pub mod klog;
pub mod platform;
pub mod spinlock;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use klog::{
    KlogLevel, console_puts_sync, klog_attach_sink, klog_get_level, klog_is_enabled, klog_set_level,
};
#[cfg(target_arch = "x86_64")]
pub use platform::BareMetal;
pub use platform::{CpuidRegs, Platform};
pub use spinlock::{Spinlock, SpinlockGuard};
