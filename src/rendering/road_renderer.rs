use super::board::VehicleSprite;
use super::*;
use crate::approach::Approach;
use crate::controller::LightState;
use crate::observer::{Stage, VehicleId};
use sdl2::pixels::Color;
use sdl2::rect::Rect;
use sdl2::render::Canvas;
use sdl2::video::Window;
use std::time::Duration;

pub struct RoadRenderer;

impl RoadRenderer {
    pub fn render_background(canvas: &mut Canvas<Window>) {
        canvas.set_draw_color(Color::RGB(50, 205, 50));
        canvas.clear();
    }

    pub fn render_road_surface(canvas: &mut Canvas<Window>) -> Result<(), String> {
        canvas.set_draw_color(Color::RGB(51, 51, 51));
        // Approach A runs top to bottom, approach B left to right.
        canvas.fill_rect(Rect::new(
            CENTER - HALF_ROAD,
            0,
            ROAD_WIDTH as u32,
            SCENE_SIZE,
        ))?;
        canvas.fill_rect(Rect::new(
            0,
            CENTER - HALF_ROAD,
            SCENE_SIZE,
            ROAD_WIDTH as u32,
        ))?;
        Ok(())
    }

    pub fn render_stop_lines(canvas: &mut Canvas<Window>) -> Result<(), String> {
        canvas.set_draw_color(Color::RGB(255, 255, 255));
        let stop = CENTER - HALF_ROAD;
        canvas.draw_line((CENTER - HALF_ROAD, stop), (CENTER + HALF_ROAD, stop))?;
        canvas.draw_line((stop, CENTER - HALF_ROAD), (stop, CENTER + HALF_ROAD))?;
        Ok(())
    }

    /// Draws both signal heads; the countdown bar shrinks toward the next tick.
    pub fn render_lights(
        canvas: &mut Canvas<Window>,
        state: LightState,
        remaining: f32,
    ) -> Result<(), String> {
        for approach in Approach::ALL {
            let (x, y) = match approach {
                Approach::A => (CENTER + HALF_ROAD + 10, CENTER - HALF_ROAD - 70),
                Approach::B => (CENTER - HALF_ROAD - 70, CENTER + HALF_ROAD + 10),
            };
            let green = state.green() == approach;

            canvas.set_draw_color(Color::RGB(20, 20, 20));
            canvas.fill_rect(Rect::new(x, y, 30, 60))?;

            canvas.set_draw_color(if green { Color::RGB(90, 20, 20) } else { Color::RGB(230, 30, 30) });
            canvas.fill_rect(Rect::new(x + 5, y + 5, 20, 20))?;
            canvas.set_draw_color(if green { Color::RGB(30, 230, 60) } else { Color::RGB(20, 70, 20) });
            canvas.fill_rect(Rect::new(x + 5, y + 35, 20, 20))?;

            if green {
                let width = (30.0 * remaining.clamp(0.0, 1.0)) as u32;
                if width > 0 {
                    canvas.set_draw_color(Color::RGB(255, 200, 0));
                    canvas.fill_rect(Rect::new(x, y + 64, width, 4))?;
                }
            }
        }
        Ok(())
    }

    /// Places each car by stage: queued behind the stop line, inside the box
    /// while crossing, driving away once finished.
    pub fn render_vehicles(
        canvas: &mut Canvas<Window>,
        sprites: &[(VehicleId, VehicleSprite)],
        crossing: Duration,
    ) -> Result<(), String> {
        let mut queued = [0i32; 2];
        for (_, sprite) in sprites {
            let offset = match sprite.stage {
                Stage::Created | Stage::WaitingLane | Stage::WaitingLight => {
                    let slot = &mut queued[sprite.approach.index()];
                    let offset = -(*slot + 1) * (CAR_LENGTH + CAR_GAP);
                    *slot += 1;
                    offset
                }
                Stage::Crossing => {
                    let progress = progress(sprite.since.elapsed(), crossing);
                    (progress * (ROAD_WIDTH + CAR_LENGTH) as f32) as i32 - CAR_LENGTH
                }
                Stage::Finished => {
                    let travelled = sprite.since.elapsed().as_secs_f32() * EXIT_SPEED;
                    ROAD_WIDTH + travelled as i32
                }
            };

            // Offset runs along the direction of travel from the stop line.
            if offset < -(SCENE_SIZE as i32) || offset > SCENE_SIZE as i32 {
                continue;
            }
            let along = CENTER - HALF_ROAD + offset;
            let rect = match sprite.approach {
                Approach::A => Rect::new(CENTER - CAR_WIDTH / 2, along, CAR_WIDTH as u32, CAR_LENGTH as u32),
                Approach::B => Rect::new(along, CENTER - CAR_WIDTH / 2, CAR_LENGTH as u32, CAR_WIDTH as u32),
            };
            canvas.set_draw_color(sprite.color);
            canvas.fill_rect(rect)?;
        }
        Ok(())
    }
}

fn progress(elapsed: Duration, total: Duration) -> f32 {
    if total.is_zero() {
        1.0
    } else {
        (elapsed.as_secs_f32() / total.as_secs_f32()).min(1.0)
    }
}
