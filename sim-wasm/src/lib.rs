use wasm_bindgen::prelude::*;

pub mod agent;
pub mod cell;
pub mod config;
pub mod error;
pub mod flock;
pub mod grid;
pub mod math;

pub use agent::{Agent, AgentId};
pub use cell::{Cell, CellId, CellIndex};
pub use config::{FlockConfig, ForceMode, VisibleRange, WorldBounds};
pub use error::SimError;
pub use flock::Flock;
pub use grid::Grid;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
}

#[wasm_bindgen]
pub struct Sim {
    flock: Flock,
}

#[wasm_bindgen]
impl Sim {
    #[wasm_bindgen(constructor)]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        count: usize,
        seed: u32,
        subdivisions: usize,
        min_x: f32,
        min_y: f32,
        min_z: f32,
        max_x: f32,
        max_y: f32,
        max_z: f32,
    ) -> Result<Sim, JsError> {
        let bounds = WorldBounds::new([min_x, min_y, min_z], [max_x, max_y, max_z])?;
        Self::with_bounds(bounds, count, seed, subdivisions)
    }

    /// Cube world centered on the origin.
    pub fn cube(
        count: usize,
        seed: u32,
        subdivisions: usize,
        half_extent: f32,
    ) -> Result<Sim, JsError> {
        Self::with_bounds(WorldBounds::cube(half_extent)?, count, seed, subdivisions)
    }

    pub fn step(&mut self) -> Result<(), JsError> {
        self.flock.step()?;
        Ok(())
    }

    pub fn reset(&mut self, seed: u32) -> Result<(), JsError> {
        self.flock.reset(u64::from(seed))?;
        Ok(())
    }

    pub fn reset_random(&mut self) -> Result<(), JsError> {
        let seed = entropy_seed()?;
        self.flock.reset(seed)?;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.flock.len()
    }

    pub fn tick(&self) -> f64 {
        self.flock.tick() as f64
    }

    pub fn is_halted(&self) -> bool {
        self.flock.is_halted()
    }

    // Valid until the next step or reset.
    pub fn positions_ptr(&self) -> *const f32 {
        self.flock.positions().as_ptr()
    }

    pub fn positions_len(&self) -> usize {
        self.flock.positions().len()
    }

    pub fn positions(&self) -> Vec<f32> {
        self.flock.positions().to_vec()
    }

    /// `[min_x, min_y, min_z, max_x, max_y, max_z]`
    pub fn bounds(&self) -> Vec<f32> {
        let bounds = self.flock.bounds();
        let mut packed = Vec::with_capacity(6);
        packed.extend_from_slice(&bounds.min);
        packed.extend_from_slice(&bounds.max);
        packed
    }

    pub fn center(&self) -> Vec<f32> {
        self.flock.bounds().center().to_vec()
    }

    pub fn world_size(&self) -> f32 {
        self.flock.bounds().size()
    }

    pub fn config(&self) -> Result<JsValue, JsError> {
        serde_wasm_bindgen::to_value(self.flock.config())
            .map_err(|err| JsError::new(&err.to_string()))
    }

    /// Accepts a partial object; missing fields fall back to defaults.
    pub fn set_config(&mut self, value: JsValue) -> Result<(), JsError> {
        let config: FlockConfig = serde_wasm_bindgen::from_value(value)
            .map_err(|err| JsError::new(&err.to_string()))?;
        self.flock.set_config(config)?;
        Ok(())
    }
}

impl Sim {
    fn with_bounds(
        bounds: WorldBounds,
        count: usize,
        seed: u32,
        subdivisions: usize,
    ) -> Result<Sim, JsError> {
        let flock = Flock::new(
            bounds,
            count,
            subdivisions,
            FlockConfig::default(),
            u64::from(seed),
        )?;
        Ok(Sim { flock })
    }

    pub fn flock(&self) -> &Flock {
        &self.flock
    }
}

fn entropy_seed() -> Result<u64, JsError> {
    let mut bytes = [0u8; 8];
    getrandom::fill(&mut bytes).map_err(|err| JsError::new(&err.to_string()))?;
    Ok(u64::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::Sim;

    #[test]
    fn sim_exposes_render_state() {
        let Ok(mut sim) = Sim::cube(64, 11, 10, 50.0) else {
            panic!("cube world should build");
        };
        assert_eq!(sim.count(), 64);
        assert_eq!(sim.positions_len(), 64 * 3);
        assert_eq!(sim.bounds(), vec![-50.0, -50.0, -50.0, 50.0, 50.0, 50.0]);
        assert_eq!(sim.center(), vec![0.0, 0.0, 0.0]);
        assert_eq!(sim.world_size(), 100.0);

        let before = sim.positions();
        assert!(sim.step().is_ok());
        assert_eq!(sim.tick(), 1.0);
        assert_ne!(before, sim.positions());
        assert_eq!(sim.flock().positions(), &sim.positions()[..]);
        assert!(sim.flock().validate_state().is_ok());

        assert!(sim.reset(11).is_ok());
        assert_eq!(sim.tick(), 0.0);
        assert_eq!(before, sim.positions());
    }
}
