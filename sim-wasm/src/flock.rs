use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::agent::{Agent, AgentId};
use crate::config::{FlockConfig, ForceMode, WorldBounds};
use crate::error::SimError;
use crate::grid::Grid;
use crate::math::{add3, distance3, normalize_or_default, scale3, sub3, Vec3, ZERO};

pub struct Flock {
    config: FlockConfig,
    grid: Grid,
    agents: Vec<Agent>,
    count: usize,
    tick: u64,
    render_positions: Vec<f32>,
    neighbors_visited_last_step: usize,
    rebuckets_last_step: usize,
    fault: Option<SimError>,
}

impl Flock {
    pub fn new(
        bounds: WorldBounds,
        count: usize,
        subdivisions: usize,
        config: FlockConfig,
        seed: u64,
    ) -> Result<Self, SimError> {
        let config = prepare_config(config)?;
        let grid = Grid::new(bounds, subdivisions)?;

        let mut flock = Self::empty(config, grid, count);
        flock.spawn(seed)?;

        log::info!(
            "flock ready: {} agents, {} occupied cells, seed {seed}",
            flock.agents.len(),
            flock.grid.occupied_cells()
        );
        Ok(flock)
    }

    // Ids follow slice order.
    pub fn with_agents(
        bounds: WorldBounds,
        subdivisions: usize,
        config: FlockConfig,
        agents: &[(Vec3, Vec3)],
    ) -> Result<Self, SimError> {
        let config = prepare_config(config)?;
        let grid = Grid::new(bounds, subdivisions)?;

        let mut flock = Self::empty(config, grid, agents.len());
        for (id, &(position, velocity)) in agents.iter().enumerate() {
            flock.push_agent(position, velocity)?;
            debug_assert_eq!(flock.agents[id].id().index(), id);
        }
        flock.sync_render_buffers();
        Ok(flock)
    }

    fn empty(config: FlockConfig, grid: Grid, count: usize) -> Self {
        Self {
            config,
            grid,
            agents: Vec::with_capacity(count),
            count,
            tick: 0,
            render_positions: Vec::with_capacity(count * 3),
            neighbors_visited_last_step: 0,
            rebuckets_last_step: 0,
            fault: None,
        }
    }

    pub fn reset(&mut self, seed: u64) -> Result<(), SimError> {
        self.agents.clear();
        self.grid.clear();
        self.tick = 0;
        self.neighbors_visited_last_step = 0;
        self.rebuckets_last_step = 0;
        self.fault = None;
        self.spawn(seed)?;

        log::info!("flock reset: {} agents, seed {seed}", self.agents.len());
        Ok(())
    }

    fn spawn(&mut self, seed: u64) -> Result<(), SimError> {
        let mut rng = SmallRng::seed_from_u64(seed);
        // Keep new agents out of the reflect band so the first tick cannot
        // carry them through a wall.
        let area = self.grid.bounds().shrunk(self.config.reflect_threshold);

        for _ in 0..self.count {
            let position = [
                rng.random_range(area.min[0]..area.max[0]),
                rng.random_range(area.min[1]..area.max[1]),
                rng.random_range(area.min[2]..area.max[2]),
            ];
            let direction = normalize_or_default(
                [
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                ],
                [1.0, 0.0, 0.0],
            );
            let speed =
                rng.random_range(self.config.spawn_speed_min..=self.config.spawn_speed_max);
            self.push_agent(position, scale3(direction, speed))?;
        }

        self.sync_render_buffers();
        Ok(())
    }

    fn push_agent(&mut self, position: Vec3, velocity: Vec3) -> Result<(), SimError> {
        let id = AgentId(self.agents.len() as u32);
        let mut agent = Agent::new(id, position, velocity);
        self.grid.rebucket(&mut agent)?;
        self.agents.push(agent);
        Ok(())
    }

    /// Advances every agent by one tick, in id order, in a single pass.
    /// Agents later in the order are still seen at their previous-tick state.
    pub fn step(&mut self) -> Result<(), SimError> {
        if let Some(fault) = &self.fault {
            return Err(SimError::Halted(Box::new(fault.clone())));
        }

        self.neighbors_visited_last_step = 0;
        self.rebuckets_last_step = 0;

        for i in 0..self.agents.len() {
            if let Err(err) = self.step_agent(i) {
                log::error!("tick {}: {err}", self.tick);
                self.fault = Some(err.clone());
                return Err(err);
            }
        }

        self.tick += 1;
        self.sync_render_buffers();
        self.debug_validate_state();

        log::trace!(
            "tick {}: {} rebuckets, {} neighbor candidates",
            self.tick,
            self.rebuckets_last_step,
            self.neighbors_visited_last_step
        );
        Ok(())
    }

    fn step_agent(&mut self, i: usize) -> Result<(), SimError> {
        let config = self.config;
        let mode = config.force_mode;
        let mut boid = self.agents[i];

        boid.integrate(&config);
        if self.grid.rebucket(&mut boid)? {
            self.rebuckets_last_step += 1;
        }

        let own_id = boid.id();
        let agents = &self.agents;
        let mut visited = 0usize;
        let mut neighbor_count = 0usize;
        let mut position_sum = ZERO;
        let mut velocity_sum = ZERO;

        self.grid.for_each_visible_agent(
            boid.position,
            config.sight_distance,
            config.visible_range,
            |other_id| {
                if other_id == own_id {
                    return;
                }
                visited += 1;

                let other = &agents[other_id.index()];
                let distance = distance3(boid.position, other.position);
                if distance >= config.sight_distance {
                    return;
                }

                neighbor_count += 1;
                position_sum = add3(position_sum, other.position);
                velocity_sum = add3(velocity_sum, other.velocity);

                if distance < config.min_separation {
                    let away = sub3(boid.position, other.position);
                    boid.apply_force(scale3(away, config.separation_scale), mode);
                }
            },
        );
        self.neighbors_visited_last_step += visited;

        if neighbor_count > 0 {
            let inv_count = 1.0 / neighbor_count as f32;
            let average_position = scale3(position_sum, inv_count);
            let average_velocity = scale3(velocity_sum, inv_count);

            let cohesion = scale3(sub3(average_position, boid.position), config.cohesion_scale);
            let alignment = scale3(
                sub3(average_velocity, boid.velocity),
                config.alignment_scale,
            );
            boid.apply_force(cohesion, mode);
            boid.apply_force(alignment, mode);
        }

        self.contain(&mut boid);
        self.agents[i] = boid;
        Ok(())
    }

    // Forces the velocity on each axis to point inward once the agent is
    // within the reflect threshold of a wall.
    fn contain(&self, boid: &mut Agent) {
        let bounds = self.grid.bounds();
        let threshold = self.config.reflect_threshold;
        let clamp_acceleration = self.config.force_mode == ForceMode::Acceleration;

        for axis in 0..3 {
            if boid.position[axis] - bounds.min[axis] <= threshold {
                boid.velocity[axis] = boid.velocity[axis].abs();
                if clamp_acceleration && boid.acceleration[axis] < 0.0 {
                    boid.acceleration[axis] = 0.0;
                }
            } else if bounds.max[axis] - boid.position[axis] <= threshold {
                boid.velocity[axis] = -boid.velocity[axis].abs();
                if clamp_acceleration && boid.acceleration[axis] > 0.0 {
                    boid.acceleration[axis] = 0.0;
                }
            }
        }
    }

    fn sync_render_buffers(&mut self) {
        self.render_positions.clear();
        for agent in &self.agents {
            self.render_positions.extend_from_slice(&agent.position);
        }
    }

    fn debug_validate_state(&self) {
        if cfg!(debug_assertions) {
            if let Err(err) = self.validate_state() {
                panic!("flock state is inconsistent after tick {}: {err}", self.tick);
            }
        }
    }

    pub fn validate_state(&self) -> Result<(), SimError> {
        for agent in &self.agents {
            let expected = self
                .grid
                .cell_index_for(agent.position)
                .map(|index| self.grid.cell_id(index));
            if expected != agent.cell() {
                return Err(SimError::StaleCell {
                    agent: agent.id(),
                    cached: agent.cell(),
                    expected,
                });
            }
            if let Some(cell) = agent.cell().and_then(|id| self.grid.cell(id)) {
                if !cell.contains(agent.id()) {
                    return Err(SimError::MembershipMismatch { cell: cell.id() });
                }
            }
        }

        for cell in self.grid.cells() {
            let foreign = cell.iter().any(|member| {
                self.agents
                    .get(member.index())
                    .map_or(true, |agent| agent.cell() != Some(cell.id()))
            });
            if foreign {
                return Err(SimError::MembershipMismatch { cell: cell.id() });
            }
        }
        Ok(())
    }

    pub fn set_config(&mut self, config: FlockConfig) -> Result<(), SimError> {
        self.config = prepare_config(config)?;
        log::debug!("flock config updated: {:?}", self.config);
        Ok(())
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Result<&Agent, SimError> {
        self.agents.get(id.index()).ok_or(SimError::UnknownAgent(id))
    }

    pub fn bounds(&self) -> &WorldBounds {
        self.grid.bounds()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn positions(&self) -> &[f32] {
        &self.render_positions
    }

    pub fn neighbors_visited_last_step(&self) -> usize {
        self.neighbors_visited_last_step
    }

    pub fn rebuckets_last_step(&self) -> usize {
        self.rebuckets_last_step
    }

    pub fn is_halted(&self) -> bool {
        self.fault.is_some()
    }
}

fn prepare_config(mut config: FlockConfig) -> Result<FlockConfig, SimError> {
    if config.sanitize() {
        log::warn!("flock config contained out-of-range values; clamped to {config:?}");
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::Flock;
    use crate::agent::AgentId;
    use crate::config::{FlockConfig, ForceMode, WorldBounds};
    use crate::error::SimError;

    fn bounds() -> WorldBounds {
        WorldBounds::cube(50.0).unwrap()
    }

    #[test]
    fn spawns_requested_population_inside_reflect_band() {
        let config = FlockConfig::default();
        let flock = Flock::new(bounds(), 150, 10, config, 7).unwrap();

        assert_eq!(flock.len(), 150);
        assert_eq!(flock.grid().population(), 150);
        assert_eq!(flock.positions().len(), 450);
        let inner = bounds().shrunk(config.reflect_threshold);
        for agent in flock.agents() {
            assert!(inner.contains(agent.position));
            assert!(agent.speed() <= config.spawn_speed_max + 1.0e-5);
        }
        flock.validate_state().unwrap();
    }

    #[test]
    fn same_seed_gives_same_flock() {
        let mut a = Flock::new(bounds(), 40, 8, FlockConfig::default(), 99).unwrap();
        let mut b = Flock::new(bounds(), 40, 8, FlockConfig::default(), 99).unwrap();
        for _ in 0..20 {
            a.step().unwrap();
            b.step().unwrap();
        }
        assert_eq!(a.positions(), b.positions());
    }

    #[test]
    fn rejects_inconsistent_config() {
        let config = FlockConfig {
            min_separation: 20.0,
            sight_distance: 5.0,
            ..FlockConfig::default()
        };
        assert!(matches!(
            Flock::new(bounds(), 10, 10, config, 1),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn with_agents_rejects_positions_outside_the_world() {
        let result = Flock::with_agents(
            bounds(),
            10,
            FlockConfig::default(),
            &[([0.0; 3], [0.0; 3]), ([0.0, 75.0, 0.0], [0.0; 3])],
        );
        assert!(matches!(
            result,
            Err(SimError::OutOfBounds {
                agent: AgentId(1),
                ..
            })
        ));
    }

    #[test]
    fn escaped_agent_halts_the_flock_until_reset() {
        // A threshold of zero with a fast agent next to the wall violates the
        // containment assumption on purpose.
        let config = FlockConfig {
            reflect_threshold: 0.0,
            max_speed: 0.0,
            min_speed: 0.0,
            spawn_speed_min: 0.0,
            spawn_speed_max: 0.0,
            ..FlockConfig::default()
        };
        let mut flock =
            Flock::with_agents(bounds(), 10, config, &[([49.5, 0.0, 0.0], [1.0, 0.0, 0.0])])
                .unwrap();

        assert!(matches!(flock.step(), Err(SimError::OutOfBounds { .. })));
        assert!(flock.is_halted());
        assert!(matches!(flock.step(), Err(SimError::Halted(_))));

        flock.reset(3).unwrap();
        assert!(!flock.is_halted());
        assert_eq!(flock.tick(), 0);
        assert_eq!(flock.len(), 1);
    }

    #[test]
    fn set_config_validates_and_applies() {
        let mut flock = Flock::new(bounds(), 5, 4, FlockConfig::default(), 0).unwrap();

        let faster = FlockConfig {
            force_mode: ForceMode::Acceleration,
            ..FlockConfig::default()
        };
        flock.set_config(faster).unwrap();
        assert_eq!(flock.config().force_mode, ForceMode::Acceleration);

        let broken = FlockConfig {
            min_speed: 2.0,
            max_speed: 1.0,
            ..FlockConfig::default()
        };
        assert!(flock.set_config(broken).is_err());
        assert_eq!(flock.config().force_mode, ForceMode::Acceleration);
    }

    #[test]
    fn unknown_agent_lookup_fails() {
        let flock = Flock::new(bounds(), 3, 4, FlockConfig::default(), 0).unwrap();
        assert!(flock.agent(AgentId(2)).is_ok());
        assert_eq!(
            flock.agent(AgentId(3)).unwrap_err(),
            SimError::UnknownAgent(AgentId(3))
        );
    }
}
