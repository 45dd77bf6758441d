//! Bench link server for the settings/status bus.
//!
//! On hardware the controller addresses the actuator over the two-wire bus
//! at address `0x08`. On a workbench the same two operations run over a TCP
//! socket with a one-byte opcode in front:
//!
//! ```text
//! 'W' <len> <payload>   settings write, no reply
//! 'R'                   status read, replies with the 4-byte status frame
//! ```
//!
//! There is a single controller on the link, so connections are served one
//! at a time.

use std::io::ErrorKind;

use anyhow::Result;
use spray_protocol::{OP_READ_STATUS, OP_WRITE_SETTINGS};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use crate::state::SharedState;

pub(crate) async fn serve(listener: TcpListener, shared: SharedState) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "bus: accept failed");
                continue;
            }
        };
        debug!(peer = %peer, "bus: controller connected");
        if let Err(e) = handle_connection(stream, &shared).await {
            warn!(error = %e, "bus: connection error");
        }
    }
}

async fn handle_connection(mut stream: TcpStream, shared: &SharedState) -> Result<()> {
    loop {
        let op = match stream.read_u8().await {
            Ok(op) => op,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!("bus: controller disconnected");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        match op {
            OP_WRITE_SETTINGS => {
                let len = stream.read_u8().await? as usize;
                let mut frame = vec![0u8; len];
                stream.read_exact(&mut frame).await?;

                let mut st = shared.write().await;
                match st.apply_frame(&frame) {
                    Ok(()) => debug!(
                        threshold = format!("{:.1}", st.settings.threshold),
                        duration_min = st.settings.duration_min,
                        "bus: settings frame applied"
                    ),
                    Err(e) => warn!(error = %e, "bus: settings frame discarded"),
                }
            }
            OP_READ_STATUS => {
                let reply = shared.write().await.status_frame();
                stream.write_all(&reply).await?;
            }
            op => {
                warn!(opcode = op, "bus: unknown opcode, dropping connection");
                return Ok(());
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use spray_protocol::{decode_status, encode_settings, Settings};
    use std::net::SocketAddr;

    async fn start_server() -> (SocketAddr, SharedState) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = crate::state::shared();
        tokio::spawn(serve(listener, shared.clone()));
        (addr, shared)
    }

    fn write_msg(frame: &[u8]) -> Vec<u8> {
        let mut msg = vec![OP_WRITE_SETTINGS, frame.len() as u8];
        msg.extend_from_slice(frame);
        msg
    }

    /// A status read on the same connection proves the preceding write was
    /// handled, since operations are processed in order.
    async fn read_status(stream: &mut TcpStream) -> f32 {
        stream.write_all(&[OP_READ_STATUS]).await.unwrap();
        let mut reply = [0u8; 4];
        stream.read_exact(&mut reply).await.unwrap();
        decode_status(&reply).unwrap()
    }

    #[tokio::test]
    async fn settings_write_lands_in_shared_state() {
        let (addr, shared) = start_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let settings = Settings {
            threshold: 30.0,
            ..Settings::default()
        };
        stream
            .write_all(&write_msg(&encode_settings(&settings)))
            .await
            .unwrap();
        read_status(&mut stream).await;

        let st = shared.read().await;
        assert_eq!(st.settings.threshold, 30.0);
        assert_eq!(st.frames_applied, 1);
    }

    #[tokio::test]
    async fn short_frame_is_discarded_and_prior_settings_survive() {
        let (addr, shared) = start_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let good = Settings {
            threshold: 30.0,
            ..Settings::default()
        };
        stream
            .write_all(&write_msg(&encode_settings(&good)))
            .await
            .unwrap();
        stream.write_all(&write_msg(&[0u8; 7])).await.unwrap();
        read_status(&mut stream).await;

        let st = shared.read().await;
        assert_eq!(st.settings.threshold, 30.0);
        assert_eq!(st.frames_applied, 1);
        assert_eq!(st.frames_rejected, 1);
    }

    #[tokio::test]
    async fn status_read_returns_latest_reading() {
        let (addr, shared) = start_server().await;
        shared.write().await.temp_c = -127.0;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        assert_eq!(read_status(&mut stream).await, -127.0);
        assert_eq!(shared.read().await.reads_served, 1);
    }

    #[tokio::test]
    async fn unknown_opcode_drops_connection() {
        let (addr, _shared) = start_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(&[b'X']).await.unwrap();

        let mut buf = [0u8; 1];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(n, 0, "server should close the connection");
    }

    #[tokio::test]
    async fn next_controller_is_served_after_disconnect() {
        let (addr, shared) = start_server().await;

        {
            let mut first = TcpStream::connect(addr).await.unwrap();
            read_status(&mut first).await;
        }

        let mut second = TcpStream::connect(addr).await.unwrap();
        read_status(&mut second).await;
        assert_eq!(shared.read().await.reads_served, 2);
    }
}
