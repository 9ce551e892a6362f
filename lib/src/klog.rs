//! Levelled kernel log.
//!
//! Records are formatted straight into the registered console sink while the
//! console lock is held, so lines emitted by different cores never interleave.
//! Until a sink is attached, records are dropped.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use spin::Once;

use crate::spinlock::Spinlock;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KlogLevel {
    Critical = 0,
    Info = 1,
    Trace = 2,
}

impl KlogLevel {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => KlogLevel::Critical,
            1 => KlogLevel::Info,
            _ => KlogLevel::Trace,
        }
    }

    /// Parse a level name as used on the kernel command line.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("critical") {
            Some(KlogLevel::Critical)
        } else if name.eq_ignore_ascii_case("info") {
            Some(KlogLevel::Info)
        } else if name.eq_ignore_ascii_case("trace") {
            Some(KlogLevel::Trace)
        } else {
            None
        }
    }
}

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(KlogLevel::Info as u8);
static CONSOLE_LOCK: Spinlock = Spinlock::new();
static SINK: Once<fn(&[u8])> = Once::new();

#[inline(always)]
fn is_enabled(level: KlogLevel) -> bool {
    level as u8 <= CURRENT_LEVEL.load(Ordering::Relaxed)
}

#[inline(always)]
fn write_bytes(bytes: &[u8]) {
    if let Some(sink) = SINK.get() {
        sink(bytes);
    }
}

/// Register the byte sink every record is written to.
///
/// Only the first registration wins; returns whether this call installed `sink`.
pub fn klog_attach_sink(sink: fn(&[u8])) -> bool {
    let mut installed = false;
    SINK.call_once(|| {
        installed = true;
        sink
    });
    installed
}

/// Raw console write, serialized against every other console user.
pub fn console_puts_sync(bytes: &[u8]) {
    let _guard = CONSOLE_LOCK.guard();
    write_bytes(bytes);
}

pub fn log_args(level: KlogLevel, args: fmt::Arguments<'_>) {
    if !is_enabled(level) {
        return;
    }
    struct KlogWriter;
    impl fmt::Write for KlogWriter {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            write_bytes(s.as_bytes());
            Ok(())
        }
    }
    let _guard = CONSOLE_LOCK.guard();
    let _ = fmt::write(&mut KlogWriter, args);
    write_bytes(b"\n");
}

pub fn klog_set_level(level: KlogLevel) {
    CURRENT_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn klog_get_level() -> KlogLevel {
    KlogLevel::from_raw(CURRENT_LEVEL.load(Ordering::Relaxed))
}

pub fn klog_is_enabled(level: KlogLevel) -> bool {
    is_enabled(level)
}

#[macro_export]
macro_rules! klog {
    ($level:expr, $($arg:tt)*) => {{
        $crate::klog::log_args($level, ::core::format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! klog_critical {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Critical, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_info {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Info, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_trace {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Trace, ::core::format_args!($($arg)*))
    };
}
