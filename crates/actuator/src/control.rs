//! Valve control: the temperature rule and the daily timer rule, evaluated
//! once per control cycle against the latest settings snapshot and sensor
//! reading.
//!
//! The two valves are mutually exclusive, so one combined state covers both:
//!
//! ```text
//! Idle ──[temp >= threshold]──▶ ThermalOpen ──[temp < threshold]──▶ Idle
//! Idle ──[pending set]────────▶ ScheduleOpen ──[duration elapsed]──▶ Idle
//! ```
//!
//! A timer match arms the `pending` flag; the scheduled valve opens only
//! from `Idle`, so a match that lands while the thermal valve is open waits
//! for it to close. The flag stays set through the whole scheduled run and
//! clears when the run completes. That is what makes a match fire once per
//! episode instead of re-arming every cycle the clock still shows the same
//! minute.

use spray_protocol::{ClockTime, Settings, TimerEntry};
use tokio::time::Instant;
use tracing::info;

use crate::relays::{Line, RelayBank};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Combined valve state. Both valves open at once is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValveState {
    /// Both valves closed.
    Idle,
    /// Thermal line open; closes when the reading falls below threshold.
    ThermalOpen,
    /// Scheduled line open; closes once the configured duration elapses.
    ScheduleOpen { since: Instant },
}

pub(crate) struct ValveControl {
    state: ValveState,
    pending: bool,
}

impl ValveControl {
    /// Fresh start: everything closed, no pending episode. Valve state is
    /// never persisted across restarts.
    pub(crate) fn new() -> Self {
        Self {
            state: ValveState::Idle,
            pending: false,
        }
    }

    /// Run one control cycle. The thermal rule is evaluated first, so when
    /// both rules become eligible in the same cycle the thermal valve wins
    /// and the schedule match waits in `pending`.
    pub(crate) async fn tick(&mut self, temp_c: f32, settings: &Settings, relays: &mut RelayBank) {
        self.thermal_rule(temp_c, settings, relays).await;
        self.schedule_rule(settings, relays).await;
    }

    async fn thermal_rule(&mut self, temp_c: f32, settings: &Settings, relays: &mut RelayBank) {
        match self.state {
            ValveState::Idle if temp_c >= settings.threshold => {
                info!(
                    temp = format!("{temp_c:.1}"),
                    threshold = format!("{:.1}", settings.threshold),
                    "thermal: opening"
                );
                relays.open_line(Line::Thermal).await;
                self.state = ValveState::ThermalOpen;
            }
            ValveState::ThermalOpen if temp_c < settings.threshold => {
                info!(
                    temp = format!("{temp_c:.1}"),
                    threshold = format!("{:.1}", settings.threshold),
                    "thermal: closing"
                );
                relays.close_line(Line::Thermal).await;
                self.state = ValveState::Idle;
            }
            _ => {}
        }
    }

    async fn schedule_rule(&mut self, settings: &Settings, relays: &mut RelayBank) {
        // Arm at most once per episode. While a run is active the flag is
        // still set, so a minute that stays matched cannot re-arm it.
        if !self.pending {
            if let Some(ix) = matching_timer(settings.clock, &settings.timers) {
                self.pending = true;
                info!(
                    timer = ix + 1,
                    hour = settings.clock.hour,
                    minute = settings.clock.minute,
                    "schedule: armed"
                );
            }
        }

        match self.state {
            ValveState::Idle if self.pending => {
                info!(duration_min = settings.duration_min, "schedule: opening");
                relays.open_line(Line::Scheduled).await;
                self.state = ValveState::ScheduleOpen {
                    since: Instant::now(),
                };
            }
            // Duration is re-read from the current settings, so a frame that
            // changes it mid-run applies to this check immediately.
            ValveState::ScheduleOpen { since } if since.elapsed() >= settings.run_duration() => {
                info!("schedule: run complete, closing");
                relays.close_line(Line::Scheduled).await;
                self.pending = false;
                self.state = ValveState::Idle;
            }
            _ => {}
        }
    }

    pub(crate) fn thermal_open(&self) -> bool {
        matches!(self.state, ValveState::ThermalOpen)
    }

    pub(crate) fn scheduled_open(&self) -> bool {
        matches!(self.state, ValveState::ScheduleOpen { .. })
    }

    pub(crate) fn pending(&self) -> bool {
        self.pending
    }
}

/// First enabled timer matching the clock, in entry order. When two entries
/// collide on the same minute only the first arms; the flag blocks the rest.
fn matching_timer(clock: ClockTime, timers: &[TimerEntry; 3]) -> Option<usize> {
    timers
        .iter()
        .position(|t| t.enabled && t.hour == clock.hour && t.minute == clock.minute)
}

// ===========================================================================
// Tests
// ===========================================================================
