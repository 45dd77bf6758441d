//! Frame pack/unpack for the two bus exchanges.
//!
//! Settings frame, 16 bytes, floats little-endian:
//!
//! ```text
//! 0..4    threshold (f32 LE)
//! 4       clock hour
//! 5       clock minute
//! 6       duration (minutes)
//! 7..10   timer 1: hour, minute, enabled (0/1)
//! 10..13  timer 2: hour, minute, enabled
//! 13..16  timer 3: hour, minute, enabled
//! ```
//!
//! Status frame, 4 bytes: temperature as f32 LE.
//!
//! Decoding checks length only. Field values are not range-validated; the
//! pair trusts its own producer, and a garbage hour or threshold simply
//! never matches or never trips. A write of any other byte count is rejected
//! whole so a short or corrupt frame can never leave half-applied settings.

use thiserror::Error;

use crate::settings::{ClockTime, Settings, TimerEntry};

pub const SETTINGS_FRAME_LEN: usize = 16;
pub const STATUS_FRAME_LEN: usize = 4;

/// Byte offset of the first timer entry; each entry is 3 bytes.
const TIMERS_OFFSET: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("settings frame must be {SETTINGS_FRAME_LEN} bytes, got {0}")]
    SettingsLen(usize),
    #[error("status frame must be {STATUS_FRAME_LEN} bytes, got {0}")]
    StatusLen(usize),
}

/// Pack settings into the wire layout above.
pub fn encode_settings(s: &Settings) -> [u8; SETTINGS_FRAME_LEN] {
    let mut buf = [0u8; SETTINGS_FRAME_LEN];
    buf[0..4].copy_from_slice(&s.threshold.to_le_bytes());
    buf[4] = s.clock.hour;
    buf[5] = s.clock.minute;
    buf[6] = s.duration_min;
    for (i, t) in s.timers.iter().enumerate() {
        let base = TIMERS_OFFSET + i * 3;
        buf[base] = t.hour;
        buf[base + 1] = t.minute;
        buf[base + 2] = t.enabled as u8;
    }
    buf
}

/// Unpack a settings frame. Rejects any byte count other than
/// [`SETTINGS_FRAME_LEN`] without producing a value.
pub fn decode_settings(bytes: &[u8]) -> Result<Settings, FrameError> {
    if bytes.len() != SETTINGS_FRAME_LEN {
        return Err(FrameError::SettingsLen(bytes.len()));
    }

    let threshold = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

    let mut timers = [TimerEntry::default(); 3];
    for (i, t) in timers.iter_mut().enumerate() {
        let base = TIMERS_OFFSET + i * 3;
        *t = TimerEntry {
            hour: bytes[base],
            minute: bytes[base + 1],
            // The producer writes 0 or 1; anything else counts as disabled.
            enabled: bytes[base + 2] == 1,
        };
    }

    Ok(Settings {
        threshold,
        clock: ClockTime {
            hour: bytes[4],
            minute: bytes[5],
        },
        duration_min: bytes[6],
        timers,
    })
}

/// Pack the latest temperature sample into a status frame.
pub fn encode_status(temp_c: f32) -> [u8; STATUS_FRAME_LEN] {
    temp_c.to_le_bytes()
}

/// Unpack a status frame.
pub fn decode_status(bytes: &[u8]) -> Result<f32, FrameError> {
    if bytes.len() != STATUS_FRAME_LEN {
        return Err(FrameError::StatusLen(bytes.len()));
    }
    Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// A settings value with every field distinct from its neighbours, so a
    /// swapped offset would show up in the round-trip.
    fn full_settings() -> Settings {
        Settings {
            threshold: 45.6,
            clock: ClockTime {
                hour: 13,
                minute: 37,
            },
            duration_min: 5,
            timers: [
                TimerEntry {
                    hour: 8,
                    minute: 0,
                    enabled: true,
                },
                TimerEntry {
                    hour: 12,
                    minute: 30,
                    enabled: false,
                },
                TimerEntry {
                    hour: 21,
                    minute: 15,
                    enabled: true,
                },
            ],
        }
    }

    // -- Settings frame -----------------------------------------------------

    #[test]
    fn settings_round_trip() {
        let s = full_settings();
        let decoded = decode_settings(&encode_settings(&s)).unwrap();
        assert_eq!(decoded, s);
    }

    #[test]
    fn settings_default_round_trip() {
        let s = Settings::default();
        let decoded = decode_settings(&encode_settings(&s)).unwrap();
        assert_eq!(decoded, s);
    }

    #[test]
    fn settings_layout_matches_offsets() {
        let buf = encode_settings(&full_settings());
        assert_eq!(&buf[0..4], &45.6_f32.to_le_bytes());
        assert_eq!(buf[4], 13); // clock hour
        assert_eq!(buf[5], 37); // clock minute
        assert_eq!(buf[6], 5); // duration
        assert_eq!(&buf[7..10], &[8, 0, 1]); // timer 1
        assert_eq!(&buf[10..13], &[12, 30, 0]); // timer 2
        assert_eq!(&buf[13..16], &[21, 15, 1]); // timer 3
    }

    #[test]
    fn settings_rejects_short_frame() {
        let err = decode_settings(&[0u8; 10]).unwrap_err();
        assert_eq!(err, FrameError::SettingsLen(10));
    }

    #[test]
    fn settings_rejects_long_frame() {
        let err = decode_settings(&[0u8; 17]).unwrap_err();
        assert_eq!(err, FrameError::SettingsLen(17));
    }

    #[test]
    fn settings_rejects_empty_frame() {
        let err = decode_settings(&[]).unwrap_err();
        assert_eq!(err, FrameError::SettingsLen(0));
    }

    #[test]
    fn enabled_byte_other_than_one_is_disabled() {
        let mut buf = encode_settings(&full_settings());
        buf[9] = 2; // timer 1 enabled byte
        let decoded = decode_settings(&buf).unwrap();
        assert!(!decoded.timers[0].enabled);
    }

    #[test]
    fn infinity_threshold_survives_round_trip() {
        let s = Settings {
            threshold: f32::INFINITY,
            ..Settings::default()
        };
        let decoded = decode_settings(&encode_settings(&s)).unwrap();
        assert_eq!(decoded.threshold, f32::INFINITY);
    }

    // -- Status frame ---------------------------------------------------------

    #[test]
    fn status_round_trip() {
        let frame = encode_status(23.125);
        assert_eq!(decode_status(&frame).unwrap(), 23.125);
    }

    #[test]
    fn status_is_little_endian() {
        assert_eq!(encode_status(46.0), 46.0_f32.to_le_bytes());
    }

    #[test]
    fn status_negative_sentinel_round_trip() {
        // -127.0 is what a disconnected DS18B20 reports; it must pass
        // through the codec unchanged.
        let frame = encode_status(-127.0);
        assert_eq!(decode_status(&frame).unwrap(), -127.0);
    }

    #[test]
    fn status_rejects_wrong_length() {
        assert_eq!(decode_status(&[0u8; 3]), Err(FrameError::StatusLen(3)));
        assert_eq!(decode_status(&[0u8; 5]), Err(FrameError::StatusLen(5)));
        assert_eq!(decode_status(&[]), Err(FrameError::StatusLen(0)));
    }
}
