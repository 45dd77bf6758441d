//! Wire types shared by both ends of the spray pair: the controller (bus
//! master, owns the clock and the persisted settings) and the actuator (bus
//! peripheral, owns the temperature sensor and the two valves).
//!
//! The pair exchanges exactly two frames: a 16-byte settings frame pushed
//! master→peripheral and a 4-byte status frame read back on demand. Both
//! binaries link against this crate, so the layout and byte order are defined
//! in one place and cannot drift between the two ends.

pub mod codec;
pub mod settings;

pub use codec::{
    decode_settings, decode_status, encode_settings, encode_status, FrameError,
    SETTINGS_FRAME_LEN, STATUS_FRAME_LEN,
};
pub use settings::{ClockTime, Settings, TimerEntry};

/// Fixed peripheral address the actuator answers on the two-wire bus.
pub const ACTUATOR_ADDR: u16 = 0x08;

// ── Bench link ───────────────────────────────────────────────────────────────
//
// On a development host the two-wire bus is stood in for by a loopback TCP
// connection (controller dials, actuator listens). Each exchange is one
// opcode byte; a settings write carries a length byte plus the payload, a
// status read answers with the 4-byte status frame.

/// Opcode for a master→peripheral settings write: `'W' <len> <payload>`.
pub const OP_WRITE_SETTINGS: u8 = b'W';
/// Opcode for a status read: `'R'`, answered with the status frame.
pub const OP_READ_STATUS: u8 = b'R';
/// Port the actuator listens on when no bind address is configured.
pub const DEFAULT_BENCH_PORT: u16 = 9980;
