mod bus;
mod control;
mod relays;
#[cfg(all(feature = "sim", not(feature = "w1")))]
mod sim;
mod state;
#[cfg(feature = "w1")]
mod w1;

#[cfg(not(any(feature = "sim", feature = "w1")))]
compile_error!("enable either the `sim` feature (default) or `w1` for a real probe");

use anyhow::{Context, Result};
use spray_protocol::DEFAULT_BENCH_PORT;
use std::{env, time::Duration};
use tokio::net::TcpListener;
use tokio::time::sleep;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use control::ValveControl;
use relays::RelayBank;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ── Env config ──────────────────────────────────────────────────
    let bind = env::var("SPRAY_BIND").unwrap_or_else(|_| format!("127.0.0.1:{DEFAULT_BENCH_PORT}"));
    let cycle_ms: u64 = env::var("CYCLE_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(500);
    // Many common relay boards are active-low. If yours is active-high, set false.
    let active_low = env::var("RELAY_ACTIVE_LOW")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(true);
    let pins = relays::parse_pins(&env::var("RELAY_PINS").unwrap_or_default())?;

    // ── Relays ──────────────────────────────────────────────────────
    let mut relays = RelayBank::new(pins, active_low)?;
    relays.all_off();

    // ── Temperature probe ───────────────────────────────────────────
    #[cfg(feature = "w1")]
    let mut sensor = {
        let device =
            env::var("W1_DEVICE").context("W1_DEVICE must name the probe, e.g. 28-0316a2794a3b")?;
        eprintln!("reading probe {device}");
        w1::Ds18b20::new(&device)
    };
    #[cfg(all(feature = "sim", not(feature = "w1")))]
    let mut sensor = {
        if let Some(seed) = env::var("SIM_SEED").ok().and_then(|s| s.parse().ok()) {
            fastrand::seed(seed);
        }
        let scenario = sim::Scenario::from_str_lossy(&env::var("SIM_SCENARIO").unwrap_or_default());
        let day_s: f64 = env::var("SIM_DAY_S")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(600.0);
        eprintln!("simulated probe: scenario={scenario}");
        sim::AmbientSim::new(scenario, day_s)
    };

    // ── Bench link ──────────────────────────────────────────────────
    let shared = state::shared();
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("bind bench link on {bind}"))?;
    eprintln!("bench link listening on {bind}");
    tokio::spawn(bus::serve(listener, shared.clone()));

    // ── Control loop ────────────────────────────────────────────────
    let mut ctrl = ValveControl::new();
    let cycle = Duration::from_millis(cycle_ms);

    loop {
        let temp_c = sensor.sample();

        let mut st = shared.write().await;
        st.temp_c = temp_c;
        let settings = st.settings;
        let (applied, rejected, served) = (st.frames_applied, st.frames_rejected, st.reads_served);
        drop(st);

        ctrl.tick(temp_c, &settings, &mut relays).await;

        #[cfg(all(feature = "sim", not(feature = "w1")))]
        sensor.set_cooling(ctrl.thermal_open());

        debug!(
            temp = format!("{temp_c:.1}"),
            threshold = format!("{:.1}", settings.threshold),
            clock = format!("{:02}:{:02}", settings.clock.hour, settings.clock.minute),
            duration_min = settings.duration_min,
            timers = ?settings.timers,
            thermal = ctrl.thermal_open(),
            scheduled = ctrl.scheduled_open(),
            pending = ctrl.pending(),
            frames_applied = applied,
            frames_rejected = rejected,
            reads_served = served,
            "control cycle"
        );

        sleep(cycle).await;
    }
}
