use thiserror::Error;

use crate::agent::AgentId;
use crate::cell::CellId;
use crate::math::Vec3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// An agent's position no longer maps to any grid cell. The reflect
    /// threshold is smaller than the per-tick displacement.
    #[error("agent {agent} left the world at {position:?}")]
    OutOfBounds { agent: AgentId, position: Vec3 },

    #[error("invalid world bounds: {0}")]
    InvalidBounds(&'static str),

    #[error("grid subdivisions must be between 1 and 128 per axis, got {0}")]
    InvalidSubdivisions(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("agent {agent} caches {cached:?} but its position maps to {expected:?}")]
    StaleCell {
        agent: AgentId,
        cached: Option<CellId>,
        expected: Option<CellId>,
    },

    #[error("{cell} membership disagrees with the agents' cached cells")]
    MembershipMismatch { cell: CellId },

    #[error("no agent with id {0}")]
    UnknownAgent(AgentId),

    #[error("simulation halted after an earlier fault: {0}")]
    Halted(Box<SimError>),
}
