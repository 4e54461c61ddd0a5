//! Thermostat simulation: a noisy temperature sensor, filtered and fed to a
//! PID heater and a bang-bang fan, driven by a simulated clock.
//!
//! Run with: cargo run --example thermostat -- [config.toml|config.json] [ticks]

use anyhow::Context;
use hybridflow::clock::ManualClock;
use hybridflow::config::FlowConfig;
use hybridflow::consumer::Poller;
use hybridflow::control::{bang_bang, pid, Command};
use hybridflow::ops::{exponential_moving_average, inspect, map, throttle};
use hybridflow::source::{constant, from_fn};
use std::cell::Cell;
use std::env;
use std::rc::Rc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const TICK: Duration = Duration::from_millis(100);
const AMBIENT: f64 = 12.0;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hybridflow=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => FlowConfig::load(path).with_context(|| format!("loading {}", path))?,
        None => {
            let mut config = FlowConfig::default();
            config.bang_bang.target = 21.0;
            config.pid.gains.ki = 0.02;
            config
        }
    };
    let ticks: usize = match args.get(2) {
        Some(n) => n.parse().context("tick count must be a number")?,
        None => 600,
    };
    tracing::info!(?config, ticks, "starting thermostat simulation");

    let clock = ManualClock::new(Duration::ZERO);
    let room = Rc::new(Cell::new(AMBIENT));
    let heater = Rc::new(Cell::new(0.0f64));
    let fan_on = Rc::new(Cell::new(false));

    // Deterministic sensor noise so runs are reproducible.
    let sensor = {
        let room = room.clone();
        let sample = Rc::new(Cell::new(0u32));
        from_fn(move || {
            let n = sample.get();
            sample.set(n.wrapping_add(1));
            room.get() + 0.3 * (n as f64 * 1.7).sin()
        })
    };
    let filtered = sensor.pipe(exponential_moving_average(
        config.filter.ema_time_constant(),
        clock.source(),
    ));

    let setpoint = config.bang_bang.setpoint();
    let heater_output = Poller::new(&pid(
        filtered.clone(),
        constant(setpoint.target),
        constant(config.pid.gains),
        clock.source(),
        config.pid.output_limits,
    ));
    let fan_command = Poller::new(&bang_bang(
        filtered.clone().pipe(map(|t: f64| t - 1.0)),
        constant(setpoint),
    ));
    let display = Poller::new(
        &filtered
            .pipe(throttle(Duration::from_secs(5), clock.source()))
            .pipe(inspect(|t: &f64| tracing::info!("display: {:.2} °C", t))),
    );

    for _ in 0..ticks {
        clock.advance(TICK);
        if let Some(output) = heater_output.poll() {
            heater.set(output.max(0.0));
        }
        if let Some(command) = fan_command.poll() {
            fan_on.set(command == Command::Down);
        }
        display.poll();

        let cooling = if fan_on.get() { 0.08 } else { 0.02 };
        let next = room.get() + 0.01 * heater.get() - cooling * (room.get() - AMBIENT);
        room.set(next);
    }

    println!(
        "after {:.1}s: room {:.2} (target {:.2}), heater {:.2}, fan {}",
        (TICK * ticks as u32).as_secs_f64(),
        room.get(),
        setpoint.target,
        heater.get(),
        if fan_on.get() { "on" } else { "off" }
    );
    Ok(())
}
