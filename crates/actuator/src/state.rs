//! Shared actuator state: the active settings, the latest temperature
//! reading, and a few counters for the diagnostic dump.
//!
//! The bus task writes settings into it and reads status out of it; the
//! control loop writes the temperature and snapshots the settings once per
//! cycle. A frame either replaces the whole settings block or leaves it
//! untouched.

use std::sync::Arc;

use spray_protocol::{decode_settings, encode_status, FrameError, Settings, STATUS_FRAME_LEN};
use tokio::sync::RwLock;

pub(crate) type SharedState = Arc<RwLock<ActuatorState>>;

pub(crate) struct ActuatorState {
    pub(crate) settings: Settings,
    pub(crate) temp_c: f32,
    pub(crate) frames_applied: u64,
    pub(crate) frames_rejected: u64,
    pub(crate) reads_served: u64,
}

impl ActuatorState {
    /// Power-on defaults: threshold unreachable, one-minute duration, all
    /// timers disabled, clock at 00:00. Nothing actuates until a settings
    /// frame arrives.
    pub(crate) fn new() -> Self {
        Self {
            settings: Settings::default(),
            temp_c: 0.0,
            frames_applied: 0,
            frames_rejected: 0,
            reads_served: 0,
        }
    }

    /// Decode an incoming settings frame and swap it in. A malformed frame
    /// leaves the previous settings in force.
    pub(crate) fn apply_frame(&mut self, frame: &[u8]) -> Result<(), FrameError> {
        match decode_settings(frame) {
            Ok(settings) => {
                self.settings = settings;
                self.frames_applied += 1;
                Ok(())
            }
            Err(e) => {
                self.frames_rejected += 1;
                Err(e)
            }
        }
    }

    /// Encode the latest temperature for a status read.
    pub(crate) fn status_frame(&mut self) -> [u8; STATUS_FRAME_LEN] {
        self.reads_served += 1;
        encode_status(self.temp_c)
    }
}

pub(crate) fn shared() -> SharedState {
    Arc::new(RwLock::new(ActuatorState::new()))
}

// ===========================================================================
// Tests
// ===========================================================================
