//! Client side of the settings/status link.
//!
//! The default build talks to the actuator's bench server over TCP, with a
//! one-byte opcode in front of each operation. With the `i2c` feature the
//! same two operations go over the two-wire bus instead, where the bus
//! write/read direction takes the place of the opcodes.

use anyhow::{Context, Result};
use spray_protocol::{decode_status, encode_settings, Settings, STATUS_FRAME_LEN};

#[cfg(not(feature = "i2c"))]
use spray_protocol::{OP_READ_STATUS, OP_WRITE_SETTINGS};
#[cfg(not(feature = "i2c"))]
use tokio::io::{AsyncReadExt, AsyncWriteExt};
#[cfg(not(feature = "i2c"))]
use tokio::net::TcpStream;
#[cfg(not(feature = "i2c"))]
use tracing::debug;

#[cfg(feature = "i2c")]
use rppal::i2c::I2c;
#[cfg(feature = "i2c")]
use spray_protocol::ACTUATOR_ADDR;

// ---------------------------------------------------------------------------
// Bench link (TCP)
// ---------------------------------------------------------------------------

#[cfg(not(feature = "i2c"))]
pub(crate) struct BusLink {
    addr: String,
    stream: Option<TcpStream>,
}

#[cfg(not(feature = "i2c"))]
impl BusLink {
    pub(crate) fn new(addr: String) -> Self {
        Self { addr, stream: None }
    }

    /// Connect lazily, on first use and again after any link error.
    async fn connect(&mut self) -> Result<&mut TcpStream> {
        if self.stream.is_none() {
            let stream = TcpStream::connect(&self.addr)
                .await
                .with_context(|| format!("connect to actuator at {}", self.addr))?;
            debug!(addr = %self.addr, "bus: connected");
            self.stream = Some(stream);
        }
        self.stream.as_mut().context("not connected")
    }

    pub(crate) async fn write_settings(&mut self, settings: &Settings) -> Result<()> {
        let frame = encode_settings(settings);
        let mut msg = Vec::with_capacity(frame.len() + 2);
        msg.push(OP_WRITE_SETTINGS);
        msg.push(frame.len() as u8);
        msg.extend_from_slice(&frame);

        let stream = self.connect().await?;
        if let Err(e) = stream.write_all(&msg).await {
            self.stream = None;
            return Err(e).context("settings write failed");
        }
        Ok(())
    }

    pub(crate) async fn read_status(&mut self) -> Result<f32> {
        let stream = self.connect().await?;
        let mut reply = [0u8; STATUS_FRAME_LEN];
        if let Err(e) = exchange(stream, &mut reply).await {
            self.stream = None;
            return Err(e).context("status read failed");
        }
        Ok(decode_status(&reply)?)
    }
}

#[cfg(not(feature = "i2c"))]
async fn exchange(stream: &mut TcpStream, reply: &mut [u8]) -> std::io::Result<()> {
    stream.write_all(&[OP_READ_STATUS]).await?;
    stream.read_exact(reply).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Two-wire link (Raspberry Pi)
// ---------------------------------------------------------------------------

#[cfg(feature = "i2c")]
pub(crate) struct BusLink {
    i2c: I2c,
}

#[cfg(feature = "i2c")]
impl BusLink {
    pub(crate) fn new(bus: u8) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus).with_context(|| format!("open i2c bus {bus}"))?;
        i2c.set_slave_address(ACTUATOR_ADDR)?;

        tracing::info!(
            addr = format_args!("0x{ACTUATOR_ADDR:02x}"),
            bus,
            "i2c link initialised"
        );

        Ok(Self { i2c })
    }

    pub(crate) async fn write_settings(&mut self, settings: &Settings) -> Result<()> {
        let frame = encode_settings(settings);
        self.i2c.write(&frame).context("settings write failed")?;
        Ok(())
    }

    pub(crate) async fn read_status(&mut self) -> Result<f32> {
        let mut reply = [0u8; STATUS_FRAME_LEN];
        self.i2c.read(&mut reply).context("status read failed")?;
        Ok(decode_status(&reply)?)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
