//! Per-core local APIC.
//!
//! Every core owns exactly one local APIC. It is discovered from the
//! IA32_APIC_BASE MSR, enabled once and never torn down. Registers are 32-bit
//! MMIO words at fixed offsets from the physical base.

use core::time::Duration;

use pip_abi::arch::IRQ_BASE_VECTOR;
use pip_abi::arch::x86_64::{ApicBaseMsr, Msr};
use pip_abi::{IalError, IalResult};
use pip_lib::{Platform, klog_critical, klog_info, klog_trace};

use crate::hw::apic_defs::*;

/// Requested periodic timer programming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApicTimerConfig {
    /// Vector raised on every expiry.
    pub vector: u8,
    /// Desired interval between expiries.
    pub period: Duration,
    /// No-op iterations spun while measuring the timer rate.
    pub calibration_spins: u32,
    /// Wall-clock time the calibration spin is assumed to take.
    pub calibration_interval: Duration,
}

impl Default for ApicTimerConfig {
    fn default() -> Self {
        Self {
            vector: IRQ_BASE_VECTOR,
            period: Duration::from_millis(LAPIC_CALIBRATION_INTERVAL_MS),
            calibration_spins: LAPIC_CALIBRATION_SPINS,
            calibration_interval: Duration::from_millis(LAPIC_CALIBRATION_INTERVAL_MS),
        }
    }
}

/// Outcome of a calibration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerCalibration {
    pub vector: u8,
    /// Ticks the timer counted down during the calibration spin.
    pub measured_ticks: u32,
    /// Initial count programmed for periodic mode.
    pub initial_count: u32,
}

/// Scale ticks measured over `interval` to the count for `period`.
///
/// Never returns zero: a zero initial count stops the timer.
pub fn scale_ticks(measured: u32, period: Duration, interval: Duration) -> u32 {
    let interval_ns = interval.as_nanos();
    if interval_ns == 0 {
        return measured.max(1);
    }
    let scaled = measured as u128 * period.as_nanos() / interval_ns;
    scaled.clamp(1, u32::MAX as u128) as u32
}

pub struct LocalApic<'p> {
    platform: &'p dyn Platform,
    supported: bool,
    base: u64,
}

impl<'p> LocalApic<'p> {
    /// `supported` is the APIC feature bit reported by CPUID.
    pub fn new(platform: &'p dyn Platform, supported: bool) -> Self {
        Self {
            platform,
            supported,
            base: 0,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Physical register base currently programmed in IA32_APIC_BASE.
    pub fn base_address(&self) -> u64 {
        let (low, high) = self.platform.read_msr(Msr::APIC_BASE);
        ((high as u64) << 32) | (low & ApicBaseMsr::ADDR_MASK) as u64
    }

    /// Relocate the register window, keeping the enable and BSP bits.
    pub fn set_base_address(&mut self, base: u64) {
        let (low, _) = self.platform.read_msr(Msr::APIC_BASE);
        let flags = low & !ApicBaseMsr::ADDR_MASK;
        self.platform.write_msr(
            Msr::APIC_BASE,
            (base as u32 & ApicBaseMsr::ADDR_MASK) | flags,
            (base >> 32) as u32,
        );
        self.base = base & !0xFFF;
    }

    pub fn is_bsp(&self) -> bool {
        let (low, _) = self.platform.read_msr(Msr::APIC_BASE);
        ApicBaseMsr::from_bits_truncate(low).contains(ApicBaseMsr::BSP)
    }

    #[inline]
    fn read_register(&self, offset: u64) -> u32 {
        self.platform.mmio_read32(self.base + offset)
    }

    #[inline]
    fn write_register(&self, offset: u64, value: u32) {
        self.platform.mmio_write32(self.base + offset, value);
    }

    pub fn id(&self) -> u32 {
        self.read_register(LAPIC_ID) >> 24
    }

    /// Globally and software-enable the local APIC.
    ///
    /// Without an APIC the core cannot take interrupts at all: this logs,
    /// disables interrupts and parks the core forever.
    pub fn enable(&mut self) {
        if !self.supported {
            klog_critical!(
                "APIC: {} on core {}, halting",
                IalError::ApicUnsupported,
                self.platform.core_id()
            );
            self.platform.disable_interrupts();
            self.platform.halt_forever();
        }

        let (low, high) = self.platform.read_msr(Msr::APIC_BASE);
        let flags = ApicBaseMsr::from_bits_truncate(low);
        self.platform
            .write_msr(Msr::APIC_BASE, ApicBaseMsr::enabled_value(low), high);
        self.base = ((high as u64) << 32) | (low & ApicBaseMsr::ADDR_MASK) as u64;

        let spurious = self.read_register(LAPIC_SPURIOUS) | LAPIC_SPURIOUS_ENABLE;
        self.write_register(LAPIC_SPURIOUS, spurious);

        klog_info!(
            "APIC: enabled at 0x{:x}{}",
            self.base,
            if flags.contains(ApicBaseMsr::BSP) { " (BSP)" } else { "" }
        );
    }

    /// Calibrate the timer against a fixed spin, then arm it in periodic mode.
    ///
    /// The spin is only nominally `calibration_interval` long, so the
    /// resulting period is approximate. Fails without touching any register
    /// until [`LocalApic::enable`] has mapped the register window.
    pub fn configure_periodic_timer(
        &self,
        config: &ApicTimerConfig,
    ) -> IalResult<TimerCalibration> {
        if self.base == 0 {
            klog_critical!(
                "APIC: timer on core {}: {}",
                self.platform.core_id(),
                IalError::ApicDisabled
            );
            return Err(IalError::ApicDisabled);
        }

        self.write_register(LAPIC_TIMER_DCR, LAPIC_TIMER_DIV_16);
        self.write_register(LAPIC_TIMER_ICR, LAPIC_TIMER_CALIBRATION_COUNT);

        self.platform.spin_delay(config.calibration_spins);

        self.write_register(LAPIC_LVT_TIMER, LAPIC_LVT_MASKED);
        let remaining = self.read_register(LAPIC_TIMER_CCR);
        let measured_ticks = LAPIC_TIMER_CALIBRATION_COUNT - remaining;
        let initial_count =
            scale_ticks(measured_ticks, config.period, config.calibration_interval);

        self.write_register(LAPIC_LVT_TIMER, config.vector as u32 | LAPIC_TIMER_PERIODIC);
        self.write_register(LAPIC_TIMER_DCR, LAPIC_TIMER_DIV_16);
        self.write_register(LAPIC_TIMER_ICR, initial_count);

        klog_trace!(
            "APIC: timer measured {} ticks, periodic count {} on vector {}",
            measured_ticks,
            initial_count,
            config.vector
        );

        Ok(TimerCalibration {
            vector: config.vector,
            measured_ticks,
            initial_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pip_lib::testing::MockPlatform;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration as StdDuration;

    const BASE: u64 = 0xFEE0_0000;

    fn mock_with_apic_base() -> MockPlatform {
        let mock = MockPlatform::new();
        mock.set_msr(Msr::APIC_BASE, BASE as u32 | ApicBaseMsr::BSP.bits(), 0);
        mock
    }

    #[test]
    fn enable_sets_global_and_software_enable() {
        let mock = mock_with_apic_base();
        mock.set_mmio(BASE + LAPIC_SPURIOUS, 0xFF);
        let mut apic = LocalApic::new(&mock, true);
        apic.enable();

        assert_eq!(mock.msr(Msr::APIC_BASE), Some((0xFEE0_0800, 0)));
        assert_eq!(mock.mmio_value(BASE + LAPIC_SPURIOUS), Some(0x1FF));
        assert!(!mock.is_halted());
        assert_eq!(apic.base_address(), BASE);
    }

    #[test]
    fn set_base_address_keeps_flag_bits() {
        let mock = mock_with_apic_base();
        let mut apic = LocalApic::new(&mock, true);
        apic.set_base_address(0xFEC0_0000);
        assert_eq!(apic.base_address(), 0xFEC0_0000);
        assert!(apic.is_bsp());
    }

    #[test]
    fn enable_without_apic_never_returns() {
        let mock: &'static MockPlatform = Box::leak(Box::new(MockPlatform::with_core(3)));
        let returned: &'static AtomicBool = Box::leak(Box::new(AtomicBool::new(false)));

        let core = thread::spawn(move || {
            LocalApic::new(mock, false).enable();
            returned.store(true, Ordering::SeqCst);
        });

        while !mock.is_halted() {
            thread::sleep(StdDuration::from_millis(1));
        }
        thread::sleep(StdDuration::from_millis(20));
        assert!(mock.interrupts_disabled());
        assert!(!returned.load(Ordering::SeqCst));
        assert!(!core.is_finished());
        assert_eq!(mock.msr(Msr::APIC_BASE), None);
    }

    #[test]
    fn timer_calibration_scales_measured_ticks() {
        let mock = mock_with_apic_base();
        let mut apic = LocalApic::new(&mock, true);
        apic.enable();
        mock.set_mmio(BASE + LAPIC_TIMER_CCR, 0xFFFF_FFFF - 62_500);

        let config = ApicTimerConfig {
            period: Duration::from_millis(20),
            ..ApicTimerConfig::default()
        };
        let calibration = apic.configure_periodic_timer(&config).unwrap();

        assert_eq!(calibration.measured_ticks, 62_500);
        assert_eq!(calibration.initial_count, 125_000);
        assert_eq!(mock.spin_delays(), vec![LAPIC_CALIBRATION_SPINS]);
        assert_eq!(
            mock.mmio_value(BASE + LAPIC_LVT_TIMER),
            Some(32 | LAPIC_TIMER_PERIODIC)
        );
        assert_eq!(mock.mmio_value(BASE + LAPIC_TIMER_DCR), Some(LAPIC_TIMER_DIV_16));
        assert_eq!(mock.mmio_value(BASE + LAPIC_TIMER_ICR), Some(125_000));

        let timer_writes: Vec<_> = mock
            .mmio_writes()
            .into_iter()
            .filter(|(addr, _)| *addr != BASE + LAPIC_SPURIOUS)
            .collect();
        assert_eq!(
            timer_writes,
            vec![
                (BASE + LAPIC_TIMER_DCR, LAPIC_TIMER_DIV_16),
                (BASE + LAPIC_TIMER_ICR, 0xFFFF_FFFF),
                (BASE + LAPIC_LVT_TIMER, LAPIC_LVT_MASKED),
                (BASE + LAPIC_LVT_TIMER, 32 | LAPIC_TIMER_PERIODIC),
                (BASE + LAPIC_TIMER_DCR, LAPIC_TIMER_DIV_16),
                (BASE + LAPIC_TIMER_ICR, 125_000),
            ]
        );
    }

    #[test]
    fn timer_before_enable_is_rejected() {
        let mock = mock_with_apic_base();
        let apic = LocalApic::new(&mock, true);

        assert_eq!(
            apic.configure_periodic_timer(&ApicTimerConfig::default()),
            Err(IalError::ApicDisabled)
        );
        assert!(mock.mmio_writes().is_empty());
        assert!(mock.spin_delays().is_empty());
    }

    #[test]
    fn scaled_count_is_never_zero() {
        let ten_ms = Duration::from_millis(10);
        assert_eq!(scale_ticks(0, ten_ms, ten_ms), 1);
        assert_eq!(scale_ticks(1000, Duration::from_micros(1), ten_ms), 1);
        assert_eq!(scale_ticks(u32::MAX, Duration::from_secs(10), ten_ms), u32::MAX);
        assert_eq!(scale_ticks(500, Duration::from_millis(5), Duration::ZERO), 500);
    }
}
