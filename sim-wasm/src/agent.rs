use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::CellId;
use crate::config::{FlockConfig, ForceMode};
use crate::math::{add3, length3, scale3, Vec3, ZERO};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl AgentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A point-mass boid. The grid owns cell membership; `cell` only caches the
/// last cell this agent was bucketed into so a move can be detected cheaply.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Agent {
    id: AgentId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub(crate) cell: Option<CellId>,
}

impl Agent {
    pub fn new(id: AgentId, position: Vec3, velocity: Vec3) -> Self {
        Self {
            id,
            position,
            velocity,
            acceleration: ZERO,
            cell: None,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn cell(&self) -> Option<CellId> {
        self.cell
    }

    pub fn speed(&self) -> f32 {
        length3(self.velocity)
    }

    /// One Euler step with a unit time step.
    pub fn integrate(&mut self, config: &FlockConfig) {
        if config.force_mode == ForceMode::Acceleration {
            self.velocity = add3(self.velocity, self.acceleration);
            self.acceleration = ZERO;
        }

        let speed = self.speed();
        if speed < config.min_speed {
            self.velocity = scale3(self.velocity, config.speed_up);
        } else if speed > config.max_speed {
            self.velocity = scale3(self.velocity, config.slow_down);
        }

        self.position = add3(self.position, self.velocity);
    }

    pub fn apply_force(&mut self, force: Vec3, mode: ForceMode) {
        match mode {
            ForceMode::Impulse => self.velocity = add3(self.velocity, force),
            ForceMode::Acceleration => self.acceleration = add3(self.acceleration, force),
        }
    }
}
