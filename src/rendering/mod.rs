//! SDL2 window for watching a running simulation.
//!
//! The core never calls into this module. It reads [`SimulationHandle`]
//! snapshots and a [`StageBoard`] fed through the vehicle observer hooks.

pub mod board;
mod road_renderer;
mod stats_display;

pub use board::{StageBoard, VehicleSprite};

use crate::config::SimulationConfig;
use crate::simulation::{start_simulation_with_observer, SimulationHandle};
use road_renderer::RoadRenderer;
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const SCENE_SIZE: u32 = 700;
pub const PANEL_WIDTH: u32 = 260;
pub const FONT_PATH: &str = "assets/fonts/font.ttf";
const FRAME_DURATION: Duration = Duration::from_millis(1000 / 60);
const FINISHED_LINGER: Duration = Duration::from_secs(2);

const CENTER: i32 = SCENE_SIZE as i32 / 2;
const ROAD_WIDTH: i32 = 90;
const HALF_ROAD: i32 = ROAD_WIDTH / 2;
const CAR_LENGTH: i32 = 40;
const CAR_WIDTH: i32 = 26;
const CAR_GAP: i32 = 8;
// Pixels per second once a car has left the intersection.
const EXIT_SPEED: f32 = 240.0;

/// Starts the simulation, runs the window until it is closed, and hands the
/// still-running simulation back for shutdown.
pub fn run(config: SimulationConfig) -> Result<SimulationHandle, String> {
    let board = Arc::new(StageBoard::default());
    let crossing = config.crossing_duration();
    let tick_ms = config.tick_interval_ms.max(1) as f32;
    let handle = start_simulation_with_observer(config, board.clone()).map_err(|e| e.to_string())?;

    let sdl_context = sdl2::init()?;
    let video_subsystem = sdl_context.video()?;
    let window = video_subsystem
        .window("Carrefour - traffic light intersection", SCENE_SIZE + PANEL_WIDTH, SCENE_SIZE)
        .position_centered()
        .build()
        .map_err(|e| e.to_string())?;
    let mut canvas = window
        .into_canvas()
        .accelerated()
        .present_vsync()
        .build()
        .map_err(|e| e.to_string())?;

    let ttf_context = sdl2::ttf::init().map_err(|e| e.to_string())?;
    let font = match ttf_context.load_font(FONT_PATH, 15) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!(path = FONT_PATH, error = %e, "could not load font; statistics panel has no text");
            None
        }
    };

    let mut event_pump = sdl_context.event_pump()?;
    info!("window open; press Esc to stop");

    'running: loop {
        let frame_start = Instant::now();
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => break 'running,
                _ => {}
            }
        }

        let snapshot = handle.snapshot();
        let sprites = board.sprites(FINISHED_LINGER);

        RoadRenderer::render_background(&mut canvas);
        RoadRenderer::render_road_surface(&mut canvas)?;
        RoadRenderer::render_stop_lines(&mut canvas)?;
        RoadRenderer::render_lights(
            &mut canvas,
            snapshot.light,
            snapshot.ms_until_next_tick as f32 / tick_ms,
        )?;
        RoadRenderer::render_vehicles(&mut canvas, &sprites, crossing)?;
        stats_display::render_stats_panel(&mut canvas, &snapshot, font.as_ref())?;
        canvas.present();

        let frame_time = frame_start.elapsed();
        if frame_time < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - frame_time);
        }
    }

    Ok(handle)
}
