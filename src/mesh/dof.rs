use serde::{Deserialize, Serialize};
use std::fmt;

/// Nodal degree of freedom kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dof {
    X,
    Y,
    Z,
    Rx,
    Ry,
    Rz,
    Pressure,
    Concentration,
}

/// Number of DOF slots carried by every node
pub const NODE_DOFS: usize = 8;

impl Dof {
    pub const ALL: [Dof; NODE_DOFS] = [
        Dof::X,
        Dof::Y,
        Dof::Z,
        Dof::Rx,
        Dof::Ry,
        Dof::Rz,
        Dof::Pressure,
        Dof::Concentration,
    ];
    pub const TRANSLATIONS: [Dof; 3] = [Dof::X, Dof::Y, Dof::Z];
    pub const ROTATIONS: [Dof; 3] = [Dof::Rx, Dof::Ry, Dof::Rz];
    pub const SCALARS: [Dof; 2] = [Dof::Pressure, Dof::Concentration];

    /// Slot in the node's equation table
    pub fn index(self) -> usize {
        self as usize
    }

    /// Vector component for translations and rotations
    pub fn component(self) -> Option<usize> {
        match self {
            Dof::X | Dof::Rx => Some(0),
            Dof::Y | Dof::Ry => Some(1),
            Dof::Z | Dof::Rz => Some(2),
            Dof::Pressure | Dof::Concentration => None,
        }
    }

    pub fn is_translation(self) -> bool {
        matches!(self, Dof::X | Dof::Y | Dof::Z)
    }

    pub fn is_scalar(self) -> bool {
        matches!(self, Dof::Pressure | Dof::Concentration)
    }
}

impl fmt::Display for Dof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dof::X => "x",
            Dof::Y => "y",
            Dof::Z => "z",
            Dof::Rx => "rx",
            Dof::Ry => "ry",
            Dof::Rz => "rz",
            Dof::Pressure => "p",
            Dof::Concentration => "c",
        };
        f.write_str(s)
    }
}

/// Equation assignment of one degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Equation {
    /// Row/column in the global system
    Active(usize),
    /// Not part of the system; value never changes
    #[default]
    Fixed,
    /// Driven by the prescribed boundary condition with this index
    Prescribed(usize),
    /// Master of the linear constraint with this index
    Constrained(usize),
    /// Follows the rigid body with this index
    Rigid(usize),
}

impl Equation {
    pub fn active(self) -> Option<usize> {
        match self {
            Equation::Active(n) => Some(n),
            _ => None,
        }
    }
}

/// Reference to one degree of freedom of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DofRef {
    pub node: usize,
    pub dof: Dof,
}

impl DofRef {
    pub fn new(node: usize, dof: Dof) -> Self {
        DofRef { node, dof }
    }
}

/// Physics module; decides which DOFs a node carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    #[default]
    Solid,
    Poroelastic,
    Multiphasic,
}

impl Module {
    pub fn dofs(self, rotations: bool) -> Vec<Dof> {
        let mut dofs = Dof::TRANSLATIONS.to_vec();
        if rotations {
            dofs.extend(Dof::ROTATIONS);
        }
        match self {
            Module::Solid => {}
            Module::Poroelastic => dofs.push(Dof::Pressure),
            Module::Multiphasic => dofs.extend(Dof::SCALARS),
        }
        dofs
    }

    pub fn has_scalar_fields(self) -> bool {
        !matches!(self, Module::Solid)
    }
}
