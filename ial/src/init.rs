//! Per-core interrupt bring-up.
//!
//! Every core runs [`InterruptBringUp::run`] exactly once. The boot core owns
//! the legacy PIC and the shared tick counter; secondary cores only load the
//! shared table and enable their own local APIC. A failing step is logged at
//! critical level and parks the core: nothing is reported to the caller.

use pip_abi::IalResult;
use pip_abi::arch::{PIC1_VECTOR_OFFSET, PIC2_VECTOR_OFFSET};
use pip_drivers::hw::pit_defs::PIT_IRQ_LINE;
use pip_drivers::{LegacyPic, LocalApic, TickCounter, TimerCalibration, pit};
use pip_lib::{Platform, klog_critical, klog_info};

use crate::config::{IalConfig, TimerStrategy};
use crate::cpu_features::{CpuFeatures, CpuIdentity, identify, probe_features};
use crate::idt::{DispatchTable, HandlerSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreRole {
    /// Core 0.
    Boot,
    /// Any other core, with its hardware index.
    Secondary(u32),
}

impl CoreRole {
    pub const fn from_core_id(core_id: u32) -> Self {
        if core_id == 0 {
            Self::Boot
        } else {
            Self::Secondary(core_id)
        }
    }

    pub const fn is_boot(self) -> bool {
        matches!(self, Self::Boot)
    }
}

/// Periodic source left running by the boot core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmedTimer {
    None,
    LegacyPit { frequency_hz: u32 },
    LocalApic(TimerCalibration),
}

/// Summary of a core whose interrupt delivery is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedCore {
    pub role: CoreRole,
    pub identity: CpuIdentity,
    pub features: CpuFeatures,
    pub timer: ArmedTimer,
}

pub struct InterruptBringUp<'a> {
    platform: &'a dyn Platform,
    handlers: &'a dyn HandlerSource,
    table: &'a DispatchTable,
    ticks: &'a TickCounter,
    config: IalConfig,
}

impl<'a> InterruptBringUp<'a> {
    pub fn new(
        platform: &'a dyn Platform,
        handlers: &'a dyn HandlerSource,
        table: &'a DispatchTable,
        ticks: &'a TickCounter,
        config: IalConfig,
    ) -> Self {
        Self {
            platform,
            handlers,
            table,
            ticks,
            config,
        }
    }

    /// Arm interrupt delivery on the calling core.
    pub fn run(&self) -> ArmedCore {
        let role = CoreRole::from_core_id(self.platform.core_id());
        let result = match role {
            CoreRole::Boot => self.bring_up_boot(),
            CoreRole::Secondary(core_id) => self.bring_up_secondary(core_id),
        };

        match result {
            Ok(armed) => armed,
            Err(err) => {
                klog_critical!(
                    "IAL: interrupt bring-up failed on core {}: {}",
                    self.platform.core_id(),
                    err
                );
                self.platform.disable_interrupts();
                self.platform.halt_forever()
            }
        }
    }

    fn bring_up_boot(&self) -> IalResult<ArmedCore> {
        klog_info!("IAL: boot core bring-up");
        let pic = LegacyPic::new(self.platform);
        pic.initialize(PIC1_VECTOR_OFFSET, PIC2_VECTOR_OFFSET, self.config.pic_mask);

        self.table.populate(self.handlers, self.platform)?;

        let timer = match self.config.timer_strategy() {
            TimerStrategy::Dormant => {
                klog_info!("IAL: periodic timer left dormant");
                ArmedTimer::None
            }
            TimerStrategy::LegacyPit { hz, base_hz } => {
                let frequency_hz = pit::set_frequency(self.platform, base_hz, hz);
                pic.set_line_masked(PIT_IRQ_LINE, false);
                ArmedTimer::LegacyPit { frequency_hz }
            }
            TimerStrategy::LocalApic(timer_config) => {
                pic.mask_all();
                let mut apic =
                    LocalApic::new(self.platform, CpuFeatures::query(self.platform).apic);
                apic.enable();
                ArmedTimer::LocalApic(apic.configure_periodic_timer(&timer_config)?)
            }
        };

        self.ticks.reset();

        let identity = identify(self.platform);
        let features = probe_features(self.platform);
        klog_info!("IAL: boot core armed");

        Ok(ArmedCore {
            role: CoreRole::Boot,
            identity,
            features,
            timer,
        })
    }

    fn bring_up_secondary(&self, core_id: u32) -> IalResult<ArmedCore> {
        klog_info!("IAL: secondary core {} bring-up", core_id);
        self.table.populate(self.handlers, self.platform)?;

        let mut apic = LocalApic::new(self.platform, CpuFeatures::query(self.platform).apic);
        apic.enable();

        let identity = identify(self.platform);
        let features = probe_features(self.platform);
        klog_info!("IAL: core {} armed", core_id);

        Ok(ArmedCore {
            role: CoreRole::Secondary(core_id),
            identity,
            features,
            timer: ArmedTimer::None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TimerMode, config_from_cmdline};
    use crate::idt::HandlerKind;
    use pip_abi::arch::x86_64::{ApicBaseMsr, CpuidFeaturesEdx, Msr, Port};
    use pip_lib::testing::MockPlatform;
    use std::thread;
    use std::time::Duration;

    const LAPIC_BASE: u32 = 0xFEE0_0000;

    fn stubs(kind: HandlerKind, number: u8) -> Option<u64> {
        match kind {
            HandlerKind::Isr => Some(0xFFFF_FFFF_8010_0000 + number as u64 * 0x10),
            HandlerKind::Irq => Some(0xFFFF_FFFF_8020_0000 + number as u64 * 0x10),
        }
    }

    fn core_with_apic(core_id: u32) -> MockPlatform {
        let mock = MockPlatform::with_core(core_id);
        mock.set_identity("GenuineIntel", "Quark SoC");
        mock.set_features(CpuidFeaturesEdx::APIC.bits() | CpuidFeaturesEdx::PGE.bits(), 0);
        let bsp = if core_id == 0 { ApicBaseMsr::BSP.bits() } else { 0 };
        mock.set_msr(Msr::APIC_BASE, LAPIC_BASE | bsp, 0);
        mock
    }

    fn pic_traffic(mock: &MockPlatform) -> usize {
        mock.port_writes()
            .iter()
            .filter(|(port, _)| {
                [Port::PIC1_COMMAND, Port::PIC1_DATA, Port::PIC2_COMMAND, Port::PIC2_DATA]
                    .contains(port)
            })
            .count()
    }

    #[test]
    fn core_role_from_index() {
        assert_eq!(CoreRole::from_core_id(0), CoreRole::Boot);
        assert_eq!(CoreRole::from_core_id(3), CoreRole::Secondary(3));
        assert!(!CoreRole::Secondary(1).is_boot());
    }

    #[test]
    fn boot_core_resets_ticks_and_masks_pic() {
        let mock = core_with_apic(0);
        let table = DispatchTable::new();
        let ticks = TickCounter::new();
        ticks.tick();
        ticks.tick();

        let config = IalConfig::default();
        let armed = InterruptBringUp::new(&mock, &stubs, &table, &ticks, config).run();

        assert_eq!(ticks.get(), 0);
        assert_eq!(armed.role, CoreRole::Boot);
        assert_eq!(armed.timer, ArmedTimer::None);
        assert_eq!(armed.identity.vendor_str(), "GenuineIntel");
        assert!(armed.features.global_pages);
        assert!(table.is_populated());
        assert_eq!(mock.port_value(Port::PIC1_DATA), Some(0xFF));
        assert_eq!(mock.port_value(Port::PIC2_DATA), Some(0xFF));
        assert_eq!(mock.writes_to(Port::PIC1_DATA)[0], PIC1_VECTOR_OFFSET);
        // Dormant: the local APIC is left alone.
        let untouched = LAPIC_BASE | ApicBaseMsr::BSP.bits();
        assert_eq!(mock.msr(Msr::APIC_BASE), Some((untouched, 0)));
    }

    #[test]
    fn secondary_core_leaves_ticks_and_pic_alone() {
        let boot = core_with_apic(0);
        let table = DispatchTable::new();
        let ticks = TickCounter::new();
        InterruptBringUp::new(&boot, &stubs, &table, &ticks, IalConfig::default()).run();

        ticks.tick();
        ticks.tick();
        ticks.tick();
        let boot_snapshot = table.snapshot();

        let ap = core_with_apic(2);
        let config = IalConfig::default();
        let armed = InterruptBringUp::new(&ap, &stubs, &table, &ticks, config).run();

        assert_eq!(armed.role, CoreRole::Secondary(2));
        assert_eq!(ticks.get(), 3);
        assert_eq!(pic_traffic(&ap), 0);
        assert_eq!(table.snapshot(), boot_snapshot);
        assert_eq!(ap.loaded_descriptors(), vec![table.descriptor()]);
        assert_eq!(ap.msr(Msr::APIC_BASE), Some((LAPIC_BASE | 0x800, 0)));
        assert_eq!(ap.cr4() & (1 << 7), 1 << 7);
    }

    #[test]
    fn pit_strategy_programs_pit_and_unmasks_irq0() {
        let mock = core_with_apic(0);
        let table = DispatchTable::new();
        let ticks = TickCounter::new();
        let config = config_from_cmdline(Some("ial.timer=pit ial.timer_hz=1000"));

        let armed = InterruptBringUp::new(&mock, &stubs, &table, &ticks, config).run();

        assert_eq!(armed.timer, ArmedTimer::LegacyPit { frequency_hz: 1000 });
        assert_eq!(mock.writes_to(Port::PIT_COMMAND), vec![0x36]);
        assert_eq!(mock.port_value(Port::PIC1_DATA), Some(0xFE));
    }

    #[test]
    fn apic_strategy_hands_over_from_pic() {
        let mock = core_with_apic(0);
        mock.set_mmio(LAPIC_BASE as u64 + 0x390, 0xFFFF_FFFF - 10_000);
        let table = DispatchTable::new();
        let ticks = TickCounter::new();
        let mut config = config_from_cmdline(Some("ial.pic=unmasked"));
        config.timer = TimerMode::Apic;

        let armed = InterruptBringUp::new(&mock, &stubs, &table, &ticks, config).run();

        let ArmedTimer::LocalApic(calibration) = armed.timer else {
            panic!("expected local APIC timer");
        };
        assert_eq!(calibration.measured_ticks, 10_000);
        assert_eq!(calibration.initial_count, 10_000);
        assert_eq!(mock.port_value(Port::PIC1_DATA), Some(0xFF));
        assert_eq!(mock.port_value(Port::PIC2_DATA), Some(0xFF));
        assert_eq!(mock.msr(Msr::APIC_BASE), Some((LAPIC_BASE | 0x800, 0)));
    }

    #[test]
    fn out_of_range_timer_settings_fall_back_to_defaults() {
        let mock = core_with_apic(0);
        mock.set_mmio(LAPIC_BASE as u64 + 0x390, 0xFFFF_FFFF - 10_000);
        let table = DispatchTable::new();
        let ticks = TickCounter::new();
        let config = config_from_cmdline(Some(
            "ial.timer=apic ial.timer_vector=128 ial.timer_period_ms=0",
        ));

        let armed = InterruptBringUp::new(&mock, &stubs, &table, &ticks, config).run();

        let ArmedTimer::LocalApic(calibration) = armed.timer else {
            panic!("expected local APIC timer");
        };
        assert_eq!(calibration.vector, 32);
        assert_eq!(calibration.initial_count, 10_000);
        // LVT timer: vector 32, periodic.
        assert_eq!(mock.mmio_value(LAPIC_BASE as u64 + 0x320), Some(32 | 0x20000));
    }

    #[test]
    fn pit_strategy_honours_board_clock() {
        let mock = core_with_apic(0);
        let table = DispatchTable::new();
        let ticks = TickCounter::new();
        let config = config_from_cmdline(Some(
            "ial.timer=pit ial.timer_hz=100 ial.pit_base_hz=2600000",
        ));

        let armed = InterruptBringUp::new(&mock, &stubs, &table, &ticks, config).run();

        assert_eq!(armed.timer, ArmedTimer::LegacyPit { frequency_hz: 100 });
        // 2_600_000 / 100 = 26000 = 0x6590
        assert_eq!(mock.writes_to(Port::PIT_CHANNEL0), vec![0x90, 0x65]);
    }

    #[test]
    fn missing_handler_halts_the_core() {
        let mock: &'static MockPlatform = Box::leak(Box::new(core_with_apic(0)));
        let table: &'static DispatchTable = Box::leak(Box::new(DispatchTable::new()));
        let ticks: &'static TickCounter = Box::leak(Box::new(TickCounter::new()));

        fn no_handlers(_: HandlerKind, _: u8) -> Option<u64> {
            None
        }

        let core = thread::spawn(move || {
            InterruptBringUp::new(mock, &no_handlers, table, ticks, IalConfig::default()).run();
        });

        while !mock.is_halted() {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(mock.interrupts_disabled());
        assert!(!core.is_finished());
    }

    #[test]
    fn secondary_without_apic_halts() {
        let mock: &'static MockPlatform = Box::leak(Box::new(MockPlatform::with_core(1)));
        let table: &'static DispatchTable = Box::leak(Box::new(DispatchTable::new()));
        let ticks: &'static TickCounter = Box::leak(Box::new(TickCounter::new()));

        let core = thread::spawn(move || {
            InterruptBringUp::new(mock, &stubs, table, ticks, IalConfig::default()).run();
        });

        while !mock.is_halted() {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(table.is_populated());
        assert!(!core.is_finished());
    }
}
