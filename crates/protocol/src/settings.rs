//! Configuration values carried by the settings frame.

use std::time::Duration;

/// Wall-clock snapshot as last communicated by the controller. The actuator
/// has no clock of its own; this is "current time" for schedule comparison
/// until the next frame overwrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockTime {
    pub hour: u8,
    pub minute: u8,
}

/// One daily time-of-day trigger. No date dimension; it fires every day the
/// clock matches hour and minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerEntry {
    pub hour: u8,
    pub minute: u8,
    pub enabled: bool,
}

/// The full actuator configuration carried by one settings frame. Applied
/// wholesale: a received frame replaces every field at once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Thermal valve opens at or above this temperature (Celsius).
    pub threshold: f32,
    pub clock: ClockTime,
    /// Minutes the scheduled valve stays open per run.
    pub duration_min: u8,
    pub timers: [TimerEntry; 3],
}

impl Settings {
    /// Length of one scheduled run.
    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(60 * u64::from(self.duration_min))
    }
}

impl Default for Settings {
    /// Startup state before the first frame arrives: threshold parked above
    /// any reachable reading, all timers disabled, clock at 00:00.
    fn default() -> Self {
        Self {
            threshold: f32::INFINITY,
            clock: ClockTime::default(),
            duration_min: 1,
            timers: [TimerEntry::default(); 3],
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cannot_trigger_anything() {
        let s = Settings::default();
        // Hotter than any sensor can report, including the DS18B20 max of
        // +125 C, so the thermal rule stays off until a frame lands.
        assert!(s.threshold > 125.0);
        assert!(s.timers.iter().all(|t| !t.enabled));
        assert_eq!(s.duration_min, 1);
        assert_eq!(s.clock, ClockTime { hour: 0, minute: 0 });
    }

    #[test]
    fn run_duration_converts_minutes() {
        let s = Settings {
            duration_min: 3,
            ..Settings::default()
        };
        assert_eq!(s.run_duration(), Duration::from_secs(180));
    }

    #[test]
    fn run_duration_zero_minutes_is_zero() {
        let s = Settings {
            duration_min: 0,
            ..Settings::default()
        };
        assert_eq!(s.run_duration(), Duration::ZERO);
    }

    #[test]
    fn run_duration_max_minutes() {
        let s = Settings {
            duration_min: 255,
            ..Settings::default()
        };
        assert_eq!(s.run_duration(), Duration::from_secs(255 * 60));
    }
}
