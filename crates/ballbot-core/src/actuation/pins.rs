//! Lowest hardware seam: digital pin levels and PWM duty cycles

use super::ActuationError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Digital output level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    High,
}

/// One call made on a [`LoggingPinBus`]
#[derive(Debug, Clone, PartialEq)]
pub enum PinEvent {
    Level { pin: u32, level: PinLevel },
    Duty { channel: u32, duty_pct: f64 },
    Hold(Duration),
}

/// Writes pin levels and PWM duty cycles
pub trait PinBus {
    fn set_level(&mut self, pin: u32, level: PinLevel) -> Result<(), ActuationError>;

    /// Set a PWM channel's duty cycle in percent (0..=100)
    fn set_duty(&mut self, channel: u32, duty_pct: f64) -> Result<(), ActuationError>;

    /// Keep the current outputs for `duration`
    fn hold(&mut self, duration: Duration);
}

/// Records every call instead of touching hardware. `hold` does not sleep.
#[derive(Debug, Default)]
pub struct LoggingPinBus {
    events: Vec<PinEvent>,
}

impl LoggingPinBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[PinEvent] {
        &self.events
    }

    /// Total time spent in `hold`
    pub fn held(&self) -> Duration {
        self.events
            .iter()
            .filter_map(|e| match e {
                PinEvent::Hold(d) => Some(*d),
                _ => None,
            })
            .sum()
    }
}

impl PinBus for LoggingPinBus {
    fn set_level(&mut self, pin: u32, level: PinLevel) -> Result<(), ActuationError> {
        log::debug!("[pins] pin {} -> {:?}", pin, level);
        self.events.push(PinEvent::Level { pin, level });
        Ok(())
    }

    fn set_duty(&mut self, channel: u32, duty_pct: f64) -> Result<(), ActuationError> {
        log::debug!("[pins] pwm {} -> {:.2}%", channel, duty_pct);
        self.events.push(PinEvent::Duty { channel, duty_pct });
        Ok(())
    }

    fn hold(&mut self, duration: Duration) {
        self.events.push(PinEvent::Hold(duration));
    }
}

/// Linux sysfs GPIO (`/sys/class/gpio`) and PWM (`/sys/class/pwm`) driver.
///
/// Pins are kernel GPIO line numbers, not physical header positions.
#[derive(Debug)]
pub struct SysfsPinBus {
    gpio_root: PathBuf,
    pwm_chip: PathBuf,
    period_ns: u64,
    exported_pins: Vec<u32>,
    enabled_channels: Vec<u32>,
}

impl SysfsPinBus {
    pub fn new(pwm_chip: u32, pwm_frequency_hz: u32) -> Self {
        Self::with_root(Path::new("/sys/class"), pwm_chip, pwm_frequency_hz)
    }

    /// Use a different sysfs mount point
    pub fn with_root(root: &Path, pwm_chip: u32, pwm_frequency_hz: u32) -> Self {
        Self {
            gpio_root: root.join("gpio"),
            pwm_chip: root.join("pwm").join(format!("pwmchip{}", pwm_chip)),
            period_ns: 1_000_000_000 / u64::from(pwm_frequency_hz.max(1)),
            exported_pins: Vec::new(),
            enabled_channels: Vec::new(),
        }
    }

    fn export_pin(&mut self, pin: u32) -> Result<PathBuf, ActuationError> {
        let dir = self.gpio_root.join(format!("gpio{}", pin));
        if !self.exported_pins.contains(&pin) {
            if !dir.exists() {
                fs::write(self.gpio_root.join("export"), pin.to_string())?;
            }
            fs::write(dir.join("direction"), "out")?;
            self.exported_pins.push(pin);
        }
        Ok(dir)
    }

    fn enable_channel(&mut self, channel: u32) -> Result<PathBuf, ActuationError> {
        let dir = self.pwm_chip.join(format!("pwm{}", channel));
        if !self.enabled_channels.contains(&channel) {
            if !dir.exists() {
                fs::write(self.pwm_chip.join("export"), channel.to_string())?;
            }
            fs::write(dir.join("period"), self.period_ns.to_string())?;
            fs::write(dir.join("duty_cycle"), "0")?;
            fs::write(dir.join("enable"), "1")?;
            self.enabled_channels.push(channel);
        }
        Ok(dir)
    }
}

impl PinBus for SysfsPinBus {
    fn set_level(&mut self, pin: u32, level: PinLevel) -> Result<(), ActuationError> {
        let dir = self.export_pin(pin)?;
        let value = match level {
            PinLevel::Low => "0",
            PinLevel::High => "1",
        };
        fs::write(dir.join("value"), value)?;
        Ok(())
    }

    fn set_duty(&mut self, channel: u32, duty_pct: f64) -> Result<(), ActuationError> {
        if !(0.0..=100.0).contains(&duty_pct) {
            return Err(ActuationError::Rejected {
                command: format!("pwm{} duty", channel),
                reason: format!("{:.2}% is outside 0..=100", duty_pct),
            });
        }
        let dir = self.enable_channel(channel)?;
        let duty_ns = (self.period_ns as f64 * duty_pct / 100.0).round() as u64;
        fs::write(dir.join("duty_cycle"), duty_ns.to_string())?;
        Ok(())
    }

    fn hold(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
