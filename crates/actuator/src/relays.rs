//! Relay outputs for the two water lines. The `gpio` feature gates the real
//! rppal driver; without it, a mock implementation logs transitions to
//! stderr and records them so tests can assert on actuation order.
//!
//! Three relays: a shared upstream pump relay plus one valve relay per line.
//! Opening a line energises the pump first, waits out the settling delay,
//! then energises the valve; closing reverses the order (valve, settle,
//! pump). The settle between the two actuations keeps the line from seeing
//! a pressure transient, so the sequence is fixed, not configurable.

use anyhow::{bail, Context, Result};
use std::time::Duration;

#[cfg(feature = "gpio")]
use rppal::gpio::{Gpio, OutputPin};
#[cfg(feature = "gpio")]
use tokio::time::sleep;

/// Pause between the two relay actuations of one line sequence.
pub(crate) const SETTLING_DELAY: Duration = Duration::from_millis(500);

/// The two water lines, each with its own valve relay behind the shared pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Line {
    /// Driven by the temperature-threshold rule.
    Thermal,
    /// Driven by the daily timer rule.
    Scheduled,
}

/// The three physical relay channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Relay {
    Pump,
    ThermalValve,
    ScheduledValve,
}

impl Line {
    fn valve_relay(self) -> Relay {
        match self {
            Line::Thermal => Relay::ThermalValve,
            Line::Scheduled => Relay::ScheduledValve,
        }
    }
}

impl Relay {
    fn name(self) -> &'static str {
        match self {
            Relay::Pump => "pump",
            Relay::ThermalValve => "thermal-valve",
            Relay::ScheduledValve => "scheduled-valve",
        }
    }
}

// ---------------------------------------------------------------------------
// Pin assignment
// ---------------------------------------------------------------------------

/// BCM pin numbers for the three relay channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RelayPins {
    pub(crate) pump: u8,
    pub(crate) thermal: u8,
    pub(crate) scheduled: u8,
}

impl Default for RelayPins {
    fn default() -> Self {
        Self {
            pump: 17,
            thermal: 27,
            scheduled: 22,
        }
    }
}

/// Parse the `RELAY_PINS` environment value into pin assignments.
///
/// Format: three comma-separated BCM numbers, pump first, e.g. `"17,27,22"`.
/// An empty value falls back to the defaults.
pub(crate) fn parse_pins(env_val: &str) -> Result<RelayPins> {
    if env_val.is_empty() {
        return Ok(RelayPins::default());
    }

    let parts: Vec<&str> = env_val.split(',').collect();
    if parts.len() != 3 {
        bail!(
            "RELAY_PINS needs three comma-separated BCM pins (pump,thermal,scheduled), got {}",
            parts.len()
        );
    }

    let mut nums = [0u8; 3];
    for (slot, part) in nums.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse()
            .with_context(|| format!("RELAY_PINS entry '{}' is not a pin number", part.trim()))?;
    }

    Ok(RelayPins {
        pump: nums[0],
        thermal: nums[1],
        scheduled: nums[2],
    })
}

// ---------------------------------------------------------------------------
// Real relay bank (production — requires rppal + Raspberry Pi hardware)
// ---------------------------------------------------------------------------

#[cfg(feature = "gpio")]
pub(crate) struct RelayBank {
    pump: OutputPin,
    thermal: OutputPin,
    scheduled: OutputPin,
    active_low: bool, // many relay boards are active-low
}

#[cfg(feature = "gpio")]
impl RelayBank {
    pub(crate) fn new(pins: RelayPins, active_low: bool) -> Result<Self> {
        let gpio = Gpio::new()?;

        let take = |pin_num: u8| -> Result<OutputPin> {
            let mut pin = gpio.get(pin_num)?.into_output();
            // Fail-safe: ensure "OFF" at startup
            if active_low {
                pin.set_high();
            } else {
                pin.set_low();
            }
            Ok(pin)
        };

        Ok(Self {
            pump: take(pins.pump)?,
            thermal: take(pins.thermal)?,
            scheduled: take(pins.scheduled)?,
            active_low,
        })
    }

    fn set(&mut self, relay: Relay, on: bool) {
        let active_low = self.active_low;
        let pin = match relay {
            Relay::Pump => &mut self.pump,
            Relay::ThermalValve => &mut self.thermal,
            Relay::ScheduledValve => &mut self.scheduled,
        };
        // active-low relay: LOW = ON, HIGH = OFF
        if on != active_low {
            pin.set_high()
        } else {
            pin.set_low()
        }
        eprintln!("relay {} set {}", relay.name(), if on { "ON" } else { "OFF" });
    }

    /// Open a line: pump relay, settle, valve relay.
    pub(crate) async fn open_line(&mut self, line: Line) {
        self.set(Relay::Pump, true);
        sleep(SETTLING_DELAY).await;
        self.set(line.valve_relay(), true);
    }

    /// Close a line: valve relay, settle, pump relay.
    pub(crate) async fn close_line(&mut self, line: Line) {
        self.set(line.valve_relay(), false);
        sleep(SETTLING_DELAY).await;
        self.set(Relay::Pump, false);
    }

    pub(crate) fn all_off(&mut self) {
        self.set(Relay::ThermalValve, false);
        self.set(Relay::ScheduledValve, false);
        self.set(Relay::Pump, false);
    }
}

// ---------------------------------------------------------------------------
// Mock relay bank (development — no hardware, records every actuation)
// ---------------------------------------------------------------------------

/// One entry in the mock's actuation record.
#[cfg(not(feature = "gpio"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RelayEvent {
    Set { relay: Relay, on: bool },
    Settle(Duration),
}

#[cfg(not(feature = "gpio"))]
pub(crate) struct RelayBank {
    pub(super) levels: [bool; 3], // indexed by Relay::index
    pub(super) log: Vec<RelayEvent>,
}

#[cfg(not(feature = "gpio"))]
impl Relay {
    pub(super) fn index(self) -> usize {
        match self {
            Relay::Pump => 0,
            Relay::ThermalValve => 1,
            Relay::ScheduledValve => 2,
        }
    }
}

#[cfg(not(feature = "gpio"))]
impl RelayBank {
    pub(crate) fn new(pins: RelayPins, _active_low: bool) -> Result<Self> {
        eprintln!(
            "[mock-relay] bank initialised (gpio {}/{}/{} — not wired)",
            pins.pump, pins.thermal, pins.scheduled
        );
        Ok(Self {
            levels: [false; 3],
            log: Vec::new(),
        })
    }

    fn set(&mut self, relay: Relay, on: bool) {
        self.levels[relay.index()] = on;
        self.log.push(RelayEvent::Set { relay, on });
        eprintln!(
            "[mock-relay] {} set {}",
            relay.name(),
            if on { "ON" } else { "OFF" }
        );
    }

    /// The mock records the settle instead of sleeping, so tests that drive
    /// full open/close sequences stay instant.
    fn settle(&mut self) {
        self.log.push(RelayEvent::Settle(SETTLING_DELAY));
        eprintln!("[mock-relay] settle {}ms", SETTLING_DELAY.as_millis());
    }

    /// Open a line: pump relay, settle, valve relay.
    pub(crate) async fn open_line(&mut self, line: Line) {
        self.set(Relay::Pump, true);
        self.settle();
        self.set(line.valve_relay(), true);
    }

    /// Close a line: valve relay, settle, pump relay.
    pub(crate) async fn close_line(&mut self, line: Line) {
        self.set(line.valve_relay(), false);
        self.settle();
        self.set(Relay::Pump, false);
    }

    pub(crate) fn all_off(&mut self) {
        self.set(Relay::ThermalValve, false);
        self.set(Relay::ScheduledValve, false);
        self.set(Relay::Pump, false);
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bank() -> RelayBank {
        RelayBank::new(RelayPins::default(), true).unwrap()
    }

    // -- Pin parsing ----------------------------------------------------------

    #[test]
    fn parse_pins_empty_uses_defaults() {
        assert_eq!(parse_pins("").unwrap(), RelayPins::default());
    }

    #[test]
    fn parse_pins_three_values() {
        let pins = parse_pins("5,6,13").unwrap();
        assert_eq!(
            pins,
            RelayPins {
                pump: 5,
                thermal: 6,
                scheduled: 13
            }
        );
    }

    #[test]
    fn parse_pins_tolerates_spaces() {
        let pins = parse_pins(" 5 , 6 , 13 ").unwrap();
        assert_eq!(pins.pump, 5);
    }

    #[test]
    fn parse_pins_wrong_count_rejected() {
        assert!(parse_pins("17,27").is_err());
        assert!(parse_pins("17,27,22,5").is_err());
    }

    #[test]
    fn parse_pins_garbage_rejected() {
        assert!(parse_pins("17,abc,22").is_err());
    }

    // -- Sequencing (mock records order) --------------------------------------

    #[tokio::test]
    async fn open_line_sequences_pump_then_valve() {
        let mut bank = test_bank();
        bank.open_line(Line::Thermal).await;
        assert_eq!(
            bank.log,
            vec![
                RelayEvent::Set {
                    relay: Relay::Pump,
                    on: true
                },
                RelayEvent::Settle(SETTLING_DELAY),
                RelayEvent::Set {
                    relay: Relay::ThermalValve,
                    on: true
                },
            ]
        );
    }

    #[tokio::test]
    async fn close_line_sequences_valve_then_pump() {
        let mut bank = test_bank();
        bank.open_line(Line::Scheduled).await;
        bank.log.clear();

        bank.close_line(Line::Scheduled).await;
        assert_eq!(
            bank.log,
            vec![
                RelayEvent::Set {
                    relay: Relay::ScheduledValve,
                    on: false
                },
                RelayEvent::Settle(SETTLING_DELAY),
                RelayEvent::Set {
                    relay: Relay::Pump,
                    on: false
                },
            ]
        );
    }

    #[test]
    fn settle_is_half_a_second() {
        assert_eq!(SETTLING_DELAY, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn open_then_close_levels_return_to_off() {
        let mut bank = test_bank();
        bank.open_line(Line::Thermal).await;
        assert!(bank.levels[Relay::Pump.index()]);
        assert!(bank.levels[Relay::ThermalValve.index()]);

        bank.close_line(Line::Thermal).await;
        assert_eq!(bank.levels, [false; 3]);
    }

    #[tokio::test]
    async fn all_off_deenergises_everything() {
        let mut bank = test_bank();
        bank.open_line(Line::Scheduled).await;
        bank.all_off();
        assert_eq!(bank.levels, [false; 3]);
    }

    #[test]
    fn new_bank_starts_all_off() {
        let bank = test_bank();
        assert_eq!(bank.levels, [false; 3]);
        assert!(bank.log.is_empty());
    }
}
