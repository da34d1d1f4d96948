//! Collaborators driven by the solver but implemented outside of it.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::mesh::Mesh;
use crate::rigid::RigidBody;

/// Contact geometry refresh, run once per state update.
pub trait ContactUpdater {
    fn update(&mut self, mesh: &Mesh) -> Result<()>;
}

/// Model state output.
pub trait PlotWriter {
    fn write(&mut self, mesh: &Mesh, bodies: &[RigidBody], time: f64) -> Result<()>;
}

/// Which solution states are handed to the plot writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotLevel {
    Never,
    /// Every converged step
    #[default]
    MajorIterations,
    /// Every state update, converged or not
    MinorIterations,
    /// Only the last converged step
    Final,
}
