//! Stateful ambient temperature simulator for local development.
//!
//! Models a DS18B20 probe in open air near the spray line:
//! - Temporal coherence via random walk with mean reversion
//! - Scenario-specific warming drift
//! - Per-reading sensor noise
//! - Diurnal (day/night) cycle
//! - Closed-loop cooling response (readings fall while the spray runs)

use std::fmt;

// ---------------------------------------------------------------------------
// Gaussian approximation (no extra dependency)
// ---------------------------------------------------------------------------

/// Approximate a sample from N(0,1) using the Irwin-Hall method:
/// sum of 12 uniform [0,1) values minus 6.
fn approx_std_normal() -> f64 {
    let mut sum: f64 = 0.0;
    for _ in 0..12 {
        sum += fastrand::f64();
    }
    sum - 6.0
}

/// Sample from N(mean, sigma).
fn gaussian(mean: f64, sigma: f64) -> f64 {
    mean + sigma * approx_std_normal()
}

// ---------------------------------------------------------------------------
// Scenario presets
// ---------------------------------------------------------------------------

/// Pre-configured simulation profiles selectable via `SIM_SCENARIO` env var.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scenario {
    /// Holds around 22 °C. Stays far below any sensible threshold; good for
    /// exercising the timers without thermal interference.
    Mild,
    /// Starts warm and climbs toward ~48 °C. Opens the thermal valve once a
    /// threshold in the forties is configured, then the cooling feedback
    /// pulls the reading back down.
    Heatwave,
    /// Wanders around the mid-forties with wide noise. Exercises open/close
    /// cycling right at the threshold.
    Swing,
}

impl Scenario {
    pub(crate) fn from_str_lossy(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "heatwave" => Self::Heatwave,
            "swing" => Self::Swing,
            _ => Self::Mild, // default
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mild => write!(f, "mild"),
            Self::Heatwave => write!(f, "heatwave"),
            Self::Swing => write!(f, "swing"),
        }
    }
}

// ---------------------------------------------------------------------------
// Main simulator
// ---------------------------------------------------------------------------

/// Stateful simulator producing realistic air temperature readings in °C.
pub(crate) struct AmbientSim {
    /// Current "true" air temperature. Evolves each tick.
    base: f64,

    // Random walk parameters
    drift_per_sample: f64,
    walk_sigma: f64,
    mean_reversion: f64,
    center: f64,

    /// Per-reading sensor noise sigma.
    noise_sigma: f64,

    // Diurnal cycle
    diurnal_amplitude: f64,
    diurnal_period_s: f64,

    // Spray response
    cooling: bool,
    cool_rate: f64,
}

impl AmbientSim {
    /// Create a new simulator.
    ///
    /// `diurnal_period_s` controls the day/night cycle length. Use 600
    /// (10 min) for fast dev iteration or 86400 for real-time.
    pub(crate) fn new(scenario: Scenario, diurnal_period_s: f64) -> Self {
        let (start, drift, walk_sigma, mean_rev, center, noise_sigma, diurnal_amp) = match scenario
        {
            Scenario::Mild => (22.0, 0.0, 0.08, 0.02, 22.0, 0.15, 2.0),
            Scenario::Heatwave => (30.0, 0.02, 0.10, 0.015, 48.0, 0.20, 2.5),
            Scenario::Swing => (42.0, 0.0, 0.25, 0.04, 45.5, 0.30, 4.0),
        };

        Self {
            base: start,
            drift_per_sample: drift,
            walk_sigma,
            mean_reversion: mean_rev,
            center,
            noise_sigma,
            diurnal_amplitude: diurnal_amp,
            diurnal_period_s,
            cooling: false,
            cool_rate: -0.15,
        }
    }

    /// Inform the simulator whether the thermal spray is currently running.
    pub(crate) fn set_cooling(&mut self, active: bool) {
        self.cooling = active;
    }

    /// Produce the next temperature reading.
    ///
    /// Call this once per control cycle. The internal base value evolves
    /// with each call, so the call frequency matters.
    pub(crate) fn sample(&mut self) -> f32 {
        // -- Evolve the base value ----------------------------------------

        // Mean reversion: pull toward the scenario centre
        let pull = self.mean_reversion * (self.center - self.base);

        // Random walk step
        let walk = gaussian(0.0, self.walk_sigma);

        // Spray effect: evaporative cooling while the thermal valve is open
        let cool = if self.cooling { self.cool_rate } else { 0.0 };

        self.base = (self.base + self.drift_per_sample + pull + walk + cool).clamp(-10.0, 55.0);

        // -- Build the instantaneous reading ------------------------------

        // Diurnal offset: sinusoidal, peaks once per period.
        let now_s = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        let phase = 2.0 * std::f64::consts::PI * now_s / self.diurnal_period_s;
        let diurnal = self.diurnal_amplitude * phase.sin();

        // Sensor noise
        let noise = gaussian(0.0, self.noise_sigma);

        // Clamp to a plausible open-air range and narrow to the sensor's
        // reporting width.
        (self.base + diurnal + noise).clamp(-10.0, 55.0) as f32
    }
}

// ===========================================================================
// Tests
// ===========================================================================
