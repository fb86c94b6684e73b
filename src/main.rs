// src/main.rs - headless runner (and optional SDL2 window) for the intersection
use carrefour::constants::SNAPSHOT_LOG_INTERVAL;
use carrefour::{start_simulation, LightState, SimulationConfig, SimulationHandle};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct Options {
    config_path: Option<String>,
    json: bool,
    gui: bool,
}

fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("carrefour=info")),
        )
        .init();

    let options = parse_args(env::args().skip(1))?;
    let config = match &options.config_path {
        Some(path) => SimulationConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => SimulationConfig::default(),
    };

    if !options.json {
        print_banner(&config);
    }

    let handle = if options.gui {
        run_gui(config)?
    } else {
        let handle = start_simulation(config).map_err(|e| e.to_string())?;
        run_headless(&handle);
        handle
    };

    let report = handle.shutdown();
    let snapshot = handle.snapshot();

    if options.json {
        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())?;
        println!("{}", json);
    } else {
        snapshot.statistics.display(handle.elapsed());
        println!(
            "Light flips: {}  |  vehicles joined: {}  |  cancelled: {}",
            report.light_flips, report.vehicles_joined, report.vehicles_cancelled
        );
    }

    if report.errors.is_empty() {
        Ok(())
    } else {
        Err(format!("{} task(s) failed; see log", report.errors.len()))
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options {
        config_path: None,
        json: false,
        gui: false,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config needs a file path")?;
                options.config_path = Some(path);
            }
            "--json" => options.json = true,
            "--gui" => options.gui = true,
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
    }
    Ok(options)
}

fn print_usage() {
    println!("usage: carrefour [--config FILE] [--json] [--gui]");
    println!("  --config FILE  JSON simulation config (missing keys use defaults)");
    println!("  --json         print the final snapshot as JSON");
    println!("  --gui          open the SDL2 window (requires the `gui` feature)");
}

fn print_banner(config: &SimulationConfig) {
    println!("=== Carrefour - two-approach traffic light simulation ===");
    println!("Vehicles per approach: {}", config.vehicle_count_per_approach);
    println!("Spawn interval:        {} ms", config.spawn_interval_ms);
    println!("Light tick:            {} ms", config.tick_interval_ms);
    println!("Crossing duration:     {} ms", config.crossing_duration_ms);
    println!("Set RUST_LOG=carrefour=debug for per-vehicle detail\n");
}

fn run_headless(handle: &SimulationHandle) {
    handle.on_light_change(|state| {
        let green = state.green();
        info!(%green, "green light");
    });

    while !handle.wait_for_completion(SNAPSHOT_LOG_INTERVAL) {
        if !handle.is_running() {
            warn!("simulation stopped before every vehicle finished");
            break;
        }
        let snapshot = handle.snapshot();
        let stats = snapshot.statistics;
        info!(
            light = light_label(snapshot.light),
            next_tick_ms = snapshot.ms_until_next_tick,
            crossed_a = stats.crossed_a,
            crossed_b = stats.crossed_b,
            waiting_a = stats.waiting_a,
            waiting_b = stats.waiting_b,
            avg_wait_ms = stats.avg_wait_ms_overall,
            "progress"
        );
    }
}

fn light_label(state: LightState) -> &'static str {
    match state {
        LightState::AGreen => "A green",
        LightState::BGreen => "B green",
    }
}

#[cfg(feature = "gui")]
fn run_gui(config: SimulationConfig) -> Result<SimulationHandle, String> {
    carrefour::rendering::run(config)
}

#[cfg(not(feature = "gui"))]
fn run_gui(_config: SimulationConfig) -> Result<SimulationHandle, String> {
    Err("built without the `gui` feature; rebuild with --features gui".to_string())
}
