//! COM1 console sink for the kernel log.

use spin::{Mutex, Once};
use uart_16550::SerialPort;

use pip_abi::arch::x86_64::ports::COM1_BASE;
use pip_lib::klog_attach_sink;

static SERIAL: Once<Mutex<SerialPort>> = Once::new();

fn serial_sink(bytes: &[u8]) {
    if let Some(port) = SERIAL.get() {
        let mut port = port.lock();
        for &b in bytes {
            port.send(b);
        }
    }
}

/// Initialize COM1 and route the kernel log through it.
///
/// # Safety
///
/// COM1 must exist and nothing else may drive its registers.
pub unsafe fn init() {
    SERIAL.call_once(|| {
        let mut port = unsafe { SerialPort::new(COM1_BASE) };
        port.init();
        Mutex::new(port)
    });
    klog_attach_sink(serial_sink);
}
