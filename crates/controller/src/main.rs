mod bus;
mod config;

use anyhow::Result;
use chrono::Timelike;
use spray_protocol::ClockTime;
#[cfg(not(feature = "i2c"))]
use spray_protocol::DEFAULT_BENCH_PORT;
use std::{env, time::Duration};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bus::BusLink;

/// Wall-clock hour and minute, as stamped into every settings frame. The
/// actuator has no clock of its own and only knows what the last frame told
/// it.
fn now_clock() -> ClockTime {
    let now = chrono::Local::now();
    ClockTime {
        hour: now.hour() as u8,
        minute: now.minute() as u8,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ── Env config ──────────────────────────────────────────────────
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let send_every_s: u64 = env::var("SEND_EVERY_S")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);
    let poll_every_s: u64 = env::var("POLL_EVERY_S")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);

    // ── Config file ─────────────────────────────────────────────────
    let cfg = config::load(&config_path)?;
    eprintln!(
        "config loaded: threshold {}, {} min runs, {} timer(s)",
        cfg.threshold,
        cfg.duration_min,
        cfg.timers.len()
    );

    // ── Bus link ────────────────────────────────────────────────────
    #[cfg(not(feature = "i2c"))]
    let mut link = {
        let addr = env::var("SPRAY_ACTUATOR_ADDR")
            .unwrap_or_else(|_| format!("127.0.0.1:{DEFAULT_BENCH_PORT}"));
        eprintln!("driving actuator at {addr}");
        BusLink::new(addr)
    };
    #[cfg(feature = "i2c")]
    let mut link = {
        let i2c_bus: u8 = env::var("I2C_BUS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);
        BusLink::new(i2c_bus)?
    };

    // ── Send/poll loop ──────────────────────────────────────────────
    // Start at the send threshold so the first cycle pushes settings
    // immediately; the actuator boots with nothing armed.
    let mut since_send = send_every_s;
    loop {
        if since_send >= send_every_s {
            let settings = cfg.to_settings(now_clock());
            match link.write_settings(&settings).await {
                Ok(()) => info!(
                    clock = format!("{:02}:{:02}", settings.clock.hour, settings.clock.minute),
                    threshold = format!("{:.1}", settings.threshold),
                    "settings sent"
                ),
                Err(e) => warn!(error = format!("{e:#}"), "settings send failed"),
            }
            since_send = 0;
        }

        match link.read_status().await {
            Ok(temp_c) => info!(temp = format!("{temp_c:.1}"), "actuator status"),
            Err(e) => warn!(error = format!("{e:#}"), "status read failed"),
        }

        sleep(Duration::from_secs(poll_every_s)).await;
        since_send += poll_every_s;
    }
}

// ===========================================================================
// Tests
// ===========================================================================
