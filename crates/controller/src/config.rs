//! TOML config file loading and validation for the settings the controller
//! pushes to the actuator.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use spray_protocol::{ClockTime, Settings, TimerEntry};

// ---------------------------------------------------------------------------
// Config file structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct Config {
    pub(crate) threshold: f32,
    pub(crate) duration_min: i64,
    #[serde(default)]
    pub(crate) timers: Vec<TimerCfg>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TimerCfg {
    pub(crate) hour: i64,
    pub(crate) minute: i64,
    pub(crate) enabled: bool,
}

/// Reporting range of the DS18B20 probe. A threshold outside it either can
/// never trigger or can never release.
const PROBE_MIN_C: f32 = -55.0;
const PROBE_MAX_C: f32 = 125.0;

/// Timer slots in the settings frame.
const MAX_TIMERS: usize = 3;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Config {
    /// Validate all config entries. Returns `Ok(())` or an error describing
    /// every violation found (not just the first one).
    pub(crate) fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if !self.threshold.is_finite() {
            errors.push(format!(
                "threshold {} is not a finite number",
                self.threshold
            ));
        } else if !(PROBE_MIN_C..=PROBE_MAX_C).contains(&self.threshold) {
            errors.push(format!(
                "threshold {} out of probe range [{PROBE_MIN_C}, {PROBE_MAX_C}]",
                self.threshold
            ));
        }

        if !(1..=255).contains(&self.duration_min) {
            errors.push(format!(
                "duration_min must be between 1 and 255, got {}",
                self.duration_min
            ));
        }

        if self.timers.len() > MAX_TIMERS {
            errors.push(format!(
                "{} timers configured, the settings frame carries at most {MAX_TIMERS}",
                self.timers.len()
            ));
        }

        for (i, t) in self.timers.iter().enumerate() {
            if !(0..=23).contains(&t.hour) {
                errors.push(format!("timer {}: hour {} out of range [0, 23]", i + 1, t.hour));
            }
            if !(0..=59).contains(&t.minute) {
                errors.push(format!(
                    "timer {}: minute {} out of range [0, 59]",
                    i + 1,
                    t.minute
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "config validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }

    /// Build the settings frame payload, stamping in the current wall clock.
    /// Slots without a configured timer stay disabled. Casts are in range
    /// once `validate` has passed.
    pub(crate) fn to_settings(&self, clock: ClockTime) -> Settings {
        let mut timers = [TimerEntry::default(); 3];
        for (slot, t) in timers.iter_mut().zip(&self.timers) {
            *slot = TimerEntry {
                hour: t.hour as u8,
                minute: t.minute as u8,
                enabled: t.enabled,
            };
        }
        Settings {
            threshold: self.threshold,
            clock,
            duration_min: self.duration_min as u8,
            timers,
        }
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Read, parse, and validate a TOML config file.
pub(crate) fn load(path: &str) -> Result<Config> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("failed to read config: {path}"))?;
    let config: Config =
        toml::from_str(&contents).with_context(|| format!("failed to parse config: {path}"))?;
    config
        .validate()
        .with_context(|| format!("invalid config: {path}"))?;
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================
