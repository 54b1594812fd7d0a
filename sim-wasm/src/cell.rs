use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agent::AgentId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellId(pub u32);

impl CellId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell {}", self.0)
    }
}

/// Integer coordinates of a cell along x, y, z.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellIndex {
    pub i: usize,
    pub j: usize,
    pub k: usize,
}

impl CellIndex {
    pub fn new(i: usize, j: usize, k: usize) -> Self {
        Self { i, j, k }
    }
}

// Ordered so neighbor visits, and the float sums built from them, come out
// the same on every run.
#[derive(Clone, Debug)]
pub struct Cell {
    id: CellId,
    index: CellIndex,
    members: BTreeSet<AgentId>,
}

impl Cell {
    pub fn new(id: CellId, index: CellIndex) -> Self {
        Self {
            id,
            index,
            members: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn index(&self) -> CellIndex {
        self.index
    }

    pub fn insert(&mut self, agent: AgentId) -> bool {
        self.members.insert(agent)
    }

    pub fn remove(&mut self, agent: AgentId) -> bool {
        self.members.remove(&agent)
    }

    pub fn contains(&self, agent: AgentId) -> bool {
        self.members.contains(&agent)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.members.iter().copied()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }
}
