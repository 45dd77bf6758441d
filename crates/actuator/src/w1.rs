//! DS18B20 temperature probe via the kernel w1 sysfs interface.
//!
//! Reading `w1_slave` triggers a conversion on the bus and can block for
//! most of a second; on hardware that read is the pacing element of the
//! control loop. Any failure (missing device, bad CRC, mangled payload) is
//! reported as the disconnected sentinel rather than an error, and the
//! control loop treats it like any cold reading.

use std::fs;
use std::path::PathBuf;

use tracing::warn;

/// Reading reported when the probe is missing or the payload cannot be
/// trusted.
pub(crate) const DISCONNECTED_C: f32 = -127.0;

pub(crate) struct Ds18b20 {
    path: PathBuf,
}

impl Ds18b20 {
    /// `device_id` is the bus address as it appears under
    /// `/sys/bus/w1/devices`, e.g. `28-0316a2794a3b`.
    pub(crate) fn new(device_id: &str) -> Self {
        Self {
            path: PathBuf::from(format!("/sys/bus/w1/devices/{device_id}/w1_slave")),
        }
    }

    pub(crate) fn sample(&mut self) -> f32 {
        match fs::read_to_string(&self.path) {
            Ok(text) => match parse_w1_payload(&text) {
                Some(c) => c,
                None => {
                    warn!(path = %self.path.display(), "w1: unparseable reading");
                    DISCONNECTED_C
                }
            },
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "w1: read failed");
                DISCONNECTED_C
            }
        }
    }
}

/// Parse the two-line `w1_slave` payload:
///
/// ```text
/// 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
/// 72 01 4b 46 7f ff 0e 10 57 t=23125
/// ```
///
/// The first line carries the CRC verdict, the second the reading in
/// millidegrees.
fn parse_w1_payload(text: &str) -> Option<f32> {
    let mut lines = text.lines();
    if !lines.next()?.trim_end().ends_with("YES") {
        return None;
    }
    let (_, milli) = lines.next()?.split_once("t=")?;
    let milli: i32 = milli.trim().parse().ok()?;
    Some(milli as f32 / 1000.0)
}

// ===========================================================================
// Tests
// ===========================================================================
