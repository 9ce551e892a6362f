//! Interrupt layer configuration from the kernel command line.
//!
//! Recognised tokens (whitespace separated, values case-insensitive):
//!
//! - `ial.timer=dormant|pit|apic`
//! - `ial.timer_hz=<n>` PIT frequency
//! - `ial.pit_base_hz=<n>` PIT input clock
//! - `ial.timer_period_ms=<n>` local APIC timer period, at least 1
//! - `ial.timer_vector=<n>` local APIC timer vector, one of the IRQ vectors 32-47
//! - `ial.calibration_spins=<n>`
//! - `ial.pic=masked|unmasked|preserve`
//! - `ial.log=critical|info|trace`
//!
//! Unknown tokens are ignored; unparsable values keep the current setting.

use core::time::Duration;

use pip_abi::arch::IRQ_BASE_VECTOR;
use pip_drivers::hw::apic_defs::{LAPIC_CALIBRATION_INTERVAL_MS, LAPIC_CALIBRATION_SPINS};
use pip_drivers::hw::pit_defs::{PIT_BASE_FREQUENCY_HZ, PIT_DEFAULT_FREQUENCY_HZ};
use pip_drivers::{ApicTimerConfig, PicMaskPolicy};
use pip_lib::KlogLevel;

use crate::idt::VectorClass;

pub const IAL_DEFAULT_TIMER: &str = "dormant";
pub const IAL_DEFAULT_PIT_HZ: u32 = PIT_DEFAULT_FREQUENCY_HZ;
pub const IAL_DEFAULT_PIT_BASE_HZ: u32 = PIT_BASE_FREQUENCY_HZ;
pub const IAL_DEFAULT_TIMER_PERIOD_MS: u64 = LAPIC_CALIBRATION_INTERVAL_MS;
pub const IAL_DEFAULT_TIMER_VECTOR: u8 = IRQ_BASE_VECTOR;
pub const IAL_DEFAULT_CALIBRATION_SPINS: u32 = LAPIC_CALIBRATION_SPINS;
pub const IAL_DEFAULT_PIC_MASK: &str = "masked";
pub const IAL_DEFAULT_LOG_LEVEL: &str = "info";

/// Which periodic source the boot core arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerMode {
    /// No periodic source.
    #[default]
    Dormant,
    /// Legacy PIT on IRQ 0.
    Pit,
    /// Calibrated local APIC timer.
    Apic,
}

/// Resolved timer bring-up step for the boot core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStrategy {
    Dormant,
    LegacyPit { hz: u32, base_hz: u32 },
    LocalApic(ApicTimerConfig),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IalConfig {
    pub timer: TimerMode,
    pub pit_hz: u32,
    pub pit_base_hz: u32,
    pub apic_timer: ApicTimerConfig,
    pub pic_mask: PicMaskPolicy,
    pub log_level: KlogLevel,
}

impl Default for IalConfig {
    fn default() -> Self {
        Self {
            timer: timer_mode_from_string(IAL_DEFAULT_TIMER, TimerMode::Dormant),
            pit_hz: IAL_DEFAULT_PIT_HZ,
            pit_base_hz: IAL_DEFAULT_PIT_BASE_HZ,
            apic_timer: ApicTimerConfig {
                vector: IAL_DEFAULT_TIMER_VECTOR,
                period: Duration::from_millis(IAL_DEFAULT_TIMER_PERIOD_MS),
                calibration_spins: IAL_DEFAULT_CALIBRATION_SPINS,
                calibration_interval: Duration::from_millis(LAPIC_CALIBRATION_INTERVAL_MS),
            },
            pic_mask: pic_mask_from_string(IAL_DEFAULT_PIC_MASK, PicMaskPolicy::Masked),
            log_level: KlogLevel::from_name(IAL_DEFAULT_LOG_LEVEL).unwrap_or(KlogLevel::Info),
        }
    }
}

impl IalConfig {
    pub fn timer_strategy(&self) -> TimerStrategy {
        match self.timer {
            TimerMode::Dormant => TimerStrategy::Dormant,
            TimerMode::Pit => TimerStrategy::LegacyPit {
                hz: self.pit_hz,
                base_hz: self.pit_base_hz,
            },
            TimerMode::Apic => TimerStrategy::LocalApic(self.apic_timer),
        }
    }

    /// Apply every `ial.*` token found in `cmdline`.
    pub fn parse_cmdline(&mut self, cmdline: &str) {
        for token in cmdline.split_whitespace() {
            process_token(self, token);
        }
    }
}

fn timer_mode_from_string(value: &str, current: TimerMode) -> TimerMode {
    if value.eq_ignore_ascii_case("dormant")
        || value.eq_ignore_ascii_case("none")
        || value.eq_ignore_ascii_case("off")
    {
        TimerMode::Dormant
    } else if value.eq_ignore_ascii_case("pit") {
        TimerMode::Pit
    } else if value.eq_ignore_ascii_case("apic") || value.eq_ignore_ascii_case("lapic") {
        TimerMode::Apic
    } else {
        current
    }
}

fn pic_mask_from_string(value: &str, current: PicMaskPolicy) -> PicMaskPolicy {
    if value.eq_ignore_ascii_case("masked") {
        PicMaskPolicy::Masked
    } else if value.eq_ignore_ascii_case("unmasked") {
        PicMaskPolicy::Unmasked
    } else if value.eq_ignore_ascii_case("preserve") {
        PicMaskPolicy::Preserve
    } else {
        current
    }
}

fn process_token(config: &mut IalConfig, token: &str) {
    let Some(setting) = token.strip_prefix("ial.") else {
        return;
    };
    let Some((key, value)) = setting.split_once('=') else {
        return;
    };

    match key {
        "timer" => config.timer = timer_mode_from_string(value, config.timer),
        "timer_hz" => {
            if let Ok(parsed) = value.parse::<u32>() {
                config.pit_hz = parsed;
            }
        }
        "pit_base_hz" => {
            if let Ok(parsed) = value.parse::<u32>() {
                if parsed != 0 {
                    config.pit_base_hz = parsed;
                }
            }
        }
        "timer_period_ms" => {
            if let Ok(parsed) = value.parse::<u64>() {
                // A zero period would reload the timer with a count of 1.
                if parsed != 0 {
                    config.apic_timer.period = Duration::from_millis(parsed);
                }
            }
        }
        "timer_vector" => {
            if let Ok(parsed) = value.parse::<u8>() {
                // Faults and hypercalls own the other vectors.
                if VectorClass::of(parsed) == VectorClass::LegacyIrq {
                    config.apic_timer.vector = parsed;
                }
            }
        }
        "calibration_spins" => {
            if let Ok(parsed) = value.parse::<u32>() {
                config.apic_timer.calibration_spins = parsed;
            }
        }
        "pic" => config.pic_mask = pic_mask_from_string(value, config.pic_mask),
        "log" => {
            if let Some(level) = KlogLevel::from_name(value) {
                config.log_level = level;
            }
        }
        _ => {}
    }
}

/// Defaults overridden by `cmdline`, if there is one.
pub fn config_from_cmdline(cmdline: Option<&str>) -> IalConfig {
    let mut config = IalConfig::default();
    if let Some(cmd) = cmdline {
        config.parse_cmdline(cmd);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_timer_dormant_and_pic_masked() {
        let config = config_from_cmdline(None);
        assert_eq!(config.timer_strategy(), TimerStrategy::Dormant);
        assert_eq!(config.pic_mask, PicMaskPolicy::Masked);
        assert_eq!(config.log_level, KlogLevel::Info);
        assert_eq!(config.apic_timer, ApicTimerConfig::default());
    }

    #[test]
    fn apic_tokens_build_timer_config() {
        let config = config_from_cmdline(Some(concat!(
            "console=ttyS0 ial.timer=APIC ial.timer_period_ms=5 ",
            "ial.timer_vector=40 ial.calibration_spins=1000",
        )));
        let TimerStrategy::LocalApic(timer) = config.timer_strategy() else {
            panic!("expected local APIC timer");
        };
        assert_eq!(timer.vector, 40);
        assert_eq!(timer.period, Duration::from_millis(5));
        assert_eq!(timer.calibration_spins, 1000);
    }

    #[test]
    fn pit_and_pic_tokens() {
        let config = config_from_cmdline(Some(
            "ial.timer_hz=250 ial.timer=pit ial.pit_base_hz=2600000 ial.pic=preserve ial.log=trace",
        ));
        assert_eq!(
            config.timer_strategy(),
            TimerStrategy::LegacyPit {
                hz: 250,
                base_hz: 2_600_000
            }
        );
        assert_eq!(config.pic_mask, PicMaskPolicy::Preserve);
        assert_eq!(config.log_level, KlogLevel::Trace);
    }

    #[test]
    fn bad_values_keep_current_setting() {
        let config = config_from_cmdline(Some(concat!(
            "ial.timer=pit ial.timer=bogus ial.timer_hz=fast ial.timer_vector=300 ",
            "ial.pic=? ial.log=loud ial.unknown=1 ial.timer",
        )));
        assert_eq!(config.timer, TimerMode::Pit);
        assert_eq!(config.pit_hz, IAL_DEFAULT_PIT_HZ);
        assert_eq!(config.apic_timer.vector, IAL_DEFAULT_TIMER_VECTOR);
        assert_eq!(config.pic_mask, PicMaskPolicy::Masked);
        assert_eq!(config.log_level, KlogLevel::Info);
    }

    #[test]
    fn timer_vector_must_be_an_irq_vector() {
        for vector in ["0", "14", "31", "48", "128", "255"] {
            let config = config_from_cmdline(Some(&format!("ial.timer_vector={vector}")));
            assert_eq!(config.apic_timer.vector, IAL_DEFAULT_TIMER_VECTOR, "vector {vector}");
        }
        let config = config_from_cmdline(Some("ial.timer_vector=47"));
        assert_eq!(config.apic_timer.vector, 47);
    }

    #[test]
    fn zero_periods_and_clocks_are_rejected() {
        let config = config_from_cmdline(Some(
            "ial.timer=apic ial.timer_vector=128 ial.timer_period_ms=0 ial.pit_base_hz=0",
        ));
        let TimerStrategy::LocalApic(timer) = config.timer_strategy() else {
            panic!("expected local APIC timer");
        };
        assert_eq!(timer.vector, IAL_DEFAULT_TIMER_VECTOR);
        assert_eq!(timer.period, Duration::from_millis(IAL_DEFAULT_TIMER_PERIOD_MS));
        assert_eq!(config.pit_base_hz, IAL_DEFAULT_PIT_BASE_HZ);
    }
}
