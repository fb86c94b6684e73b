use super::{PANEL_WIDTH, SCENE_SIZE};
use crate::controller::LightState;
use crate::simulation::SimulationSnapshot;
use sdl2::pixels::Color;
use sdl2::rect::Rect;
use sdl2::render::{Canvas, TextureQuery};
use sdl2::ttf::Font;
use sdl2::video::Window;

const HEADER_COLOR: Color = Color::RGB(50, 50, 150);
const VALUE_COLOR: Color = Color::RGB(20, 20, 20);

enum Line {
    Header(&'static str),
    Value(String, Color),
    Gap,
}

fn stats_lines(snapshot: &SimulationSnapshot) -> Vec<Line> {
    let stats = &snapshot.statistics;
    let countdown_s = (snapshot.ms_until_next_tick + 999) / 1000;
    let countdown_color = match countdown_s {
        0..=2 => Color::RGB(200, 0, 0),
        3..=5 => Color::RGB(230, 140, 0),
        _ => Color::RGB(0, 0, 200),
    };
    let light = match snapshot.light {
        LightState::AGreen => "Approach A - GREEN",
        LightState::BGreen => "Approach B - GREEN",
    };

    vec![
        Line::Header("Vehicle Counts"),
        Line::Value(format!("Total Crossed: {}", stats.total_crossed()), VALUE_COLOR),
        Line::Value(format!("A Crossed: {}", stats.crossed_a), VALUE_COLOR),
        Line::Value(format!("B Crossed: {}", stats.crossed_b), VALUE_COLOR),
        Line::Gap,
        Line::Header("Current Status"),
        Line::Value(format!("A Waiting: {}", stats.waiting_a), VALUE_COLOR),
        Line::Value(format!("B Waiting: {}", stats.waiting_b), VALUE_COLOR),
        Line::Gap,
        Line::Header("Average Wait Times"),
        Line::Value(format!("A Avg: {:.1} ms", stats.avg_wait_ms_a), VALUE_COLOR),
        Line::Value(format!("B Avg: {:.1} ms", stats.avg_wait_ms_b), VALUE_COLOR),
        Line::Value(format!("Overall Avg: {:.1} ms", stats.avg_wait_ms_overall), VALUE_COLOR),
        Line::Gap,
        Line::Header("Traffic Light Status"),
        Line::Value(format!("Status: {}", light), Color::RGB(0, 150, 0)),
        Line::Value(format!("Countdown: {}s", countdown_s), countdown_color),
        Line::Value(format!("Switches: {}", snapshot.light_flips), VALUE_COLOR),
    ]
}

pub fn render_stats_panel(
    canvas: &mut Canvas<Window>,
    snapshot: &SimulationSnapshot,
    font: Option<&Font>,
) -> Result<(), String> {
    let panel = Rect::new(SCENE_SIZE as i32, 0, PANEL_WIDTH, SCENE_SIZE);
    canvas.set_draw_color(Color::RGB(240, 240, 240));
    canvas.fill_rect(panel)?;
    canvas.set_draw_color(Color::RGB(64, 64, 64));
    canvas.draw_rect(panel)?;

    // Without a font the panel stays blank; the window is still usable.
    let Some(font) = font else {
        return Ok(());
    };

    let texture_creator = canvas.texture_creator();
    let x = panel.x() + 15;
    let mut y_offset = 20;
    for line in stats_lines(snapshot) {
        let (text, color) = match line {
            Line::Gap => {
                y_offset += 12;
                continue;
            }
            Line::Header(text) => (text.to_string(), HEADER_COLOR),
            Line::Value(text, color) => (text, color),
        };

        let surface = font
            .render(&text)
            .blended(color)
            .map_err(|e| e.to_string())?;
        let texture = texture_creator
            .create_texture_from_surface(&surface)
            .map_err(|e| e.to_string())?;
        let TextureQuery { width, height, .. } = texture.query();

        canvas.copy(&texture, None, Some(Rect::new(x, y_offset, width, height)))?;
        y_offset += height as i32 + 4;
    }

    Ok(())
}
