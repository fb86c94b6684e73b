use crate::approach::Approach;
use crate::observer::{Stage, VehicleId, VehicleObserver};
use crate::sync::lock;
use rand::Rng;
use sdl2::pixels::Color;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// What the window knows about one vehicle. Outlives the vehicle task
/// while the car drives off screen.
#[derive(Debug, Clone, Copy)]
pub struct VehicleSprite {
    pub approach: Approach,
    pub stage: Stage,
    pub since: Instant,
    pub color: Color,
}

/// Stage board fed by vehicle tasks and read by the render loop.
#[derive(Default)]
pub struct StageBoard {
    sprites: Mutex<BTreeMap<VehicleId, VehicleSprite>>,
}

impl StageBoard {
    /// Copies the current sprites, dropping cars that finished more than `linger` ago.
    pub fn sprites(&self, linger: Duration) -> Vec<(VehicleId, VehicleSprite)> {
        let mut sprites = lock(&self.sprites);
        sprites.retain(|_, sprite| {
            sprite.stage != Stage::Finished || sprite.since.elapsed() < linger
        });
        sprites.iter().map(|(id, sprite)| (*id, *sprite)).collect()
    }

    fn random_color() -> Color {
        let mut rng = rand::thread_rng();
        Color::RGB(
            rng.gen_range(60..=255),
            rng.gen_range(60..=255),
            rng.gen_range(60..=255),
        )
    }
}

impl VehicleObserver for StageBoard {
    fn stage_changed(&self, vehicle: VehicleId, approach: Approach, stage: Stage) {
        let now = Instant::now();
        lock(&self.sprites)
            .entry(vehicle)
            .and_modify(|sprite| {
                sprite.stage = stage;
                sprite.since = now;
            })
            .or_insert_with(|| VehicleSprite {
                approach,
                stage,
                since: now,
                color: Self::random_color(),
            });
    }

    fn cancelled(&self, vehicle: VehicleId, _approach: Approach, _stage: Stage) {
        lock(&self.sprites).remove(&vehicle);
    }
}
