//! Boundary conditions, nodal loads and linear constraints.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mesh::{Dof, DofRef, Mesh, Node};
use crate::prelude::*;

//------------------------------------------------------------------------------
// Boundary conditions
//------------------------------------------------------------------------------

/// Component targeted by a prescribed condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BcTarget {
    /// A single nodal DOF
    Dof(Dof),
    /// Displacement along the node's reference direction in the y-z plane
    Radial,
}

impl BcTarget {
    /// DOFs the condition takes out of the equation system
    pub fn dofs(self) -> Vec<Dof> {
        match self {
            BcTarget::Dof(dof) => vec![dof],
            BcTarget::Radial => vec![Dof::Y, Dof::Z],
        }
    }

    /// Scalar field targets are re-applied with the field update
    pub fn is_scalar(self) -> bool {
        matches!(self, BcTarget::Dof(dof) if dof.is_scalar())
    }
}

/// DOF held at its reference value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedBc {
    pub node: usize,
    pub dof: Dof,
}

/// DOF driven by `scale * curve(t)` relative to its reference value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrescribedBc {
    pub node: usize,
    pub target: BcTarget,
    pub curve: usize,
    pub scale: f64,
    #[serde(default = "active_default")]
    pub active: bool,
}

fn active_default() -> bool {
    true
}

impl PrescribedBc {
    pub fn new(node: usize, target: BcTarget, curve: usize, scale: f64) -> Self {
        PrescribedBc {
            node,
            target,
            curve,
            scale,
            active: true,
        }
    }

    /// Overwrite the targeted component with the driven value `g`
    pub fn apply(&self, node: &mut Node, g: f64) {
        match self.target {
            BcTarget::Dof(dof) => node.set_value(dof, node.reference(dof) + g),
            BcTarget::Radial => {
                let mut dr = node.r0;
                dr.x = 0.;
                // Nodes on the axis have no radial direction
                if let Some(dir) = dr.try_normalize(f64::EPSILON) {
                    node.rt.y = node.r0.y + dir.y * g;
                    node.rt.z = node.r0.z + dir.z * g;
                }
            }
        }
    }
}

/// Concentrated nodal load `scale * curve(t)` on one DOF.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodalLoad {
    pub node: usize,
    pub dof: Dof,
    pub curve: usize,
    pub scale: f64,
}

/// All nodal boundary conditions and loads of a model.
#[derive(Debug, Clone, Default)]
pub struct BoundaryConditions {
    pub fixed: Vec<FixedBc>,
    pub prescribed: Vec<PrescribedBc>,
    pub loads: Vec<NodalLoad>,
}

impl BoundaryConditions {
    pub fn fix(&mut self, node: usize, dofs: &[Dof]) {
        self.fixed
            .extend(dofs.iter().map(|&dof| FixedBc { node, dof }));
    }

    /// Fix `dofs` on every node of a named node set
    pub fn fix_node_set(&mut self, mesh: &Mesh, set: &str, dofs: &[Dof]) -> Result<()> {
        for &node in mesh.node_set(set)? {
            self.fix(node, dofs);
        }
        Ok(())
    }

    pub fn prescribe(&mut self, bc: PrescribedBc) -> usize {
        self.prescribed.push(bc);
        self.prescribed.len() - 1
    }

    /// Prescribe the same condition on every node of a named node set
    pub fn prescribe_node_set(
        &mut self,
        mesh: &Mesh,
        set: &str,
        target: BcTarget,
        curve: usize,
        scale: f64,
    ) -> Result<()> {
        for &node in mesh.node_set(set)? {
            self.prescribe(PrescribedBc::new(node, target, curve, scale));
        }
        Ok(())
    }

    pub fn load(&mut self, load: NodalLoad) {
        self.loads.push(load);
    }

    /// Check node and curve references
    pub fn validate(&self, mesh: &Mesh, num_curves: usize) -> Result<()> {
        let check_curve = |lc: usize| {
            if lc < num_curves {
                Ok(())
            } else {
                Err(Error::InvalidCurve(lc))
            }
        };
        for bc in self.fixed.iter() {
            mesh.check_node(bc.node)?;
        }
        for bc in self.prescribed.iter() {
            mesh.check_node(bc.node)?;
            check_curve(bc.curve)?;
        }
        for load in self.loads.iter() {
            mesh.check_node(load.node)?;
            check_curve(load.curve)?;
        }
        Ok(())
    }
}

//------------------------------------------------------------------------------
// Linear constraints
//------------------------------------------------------------------------------

/// Master DOF displacement equals the weighted sum of slave displacements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConstraint {
    pub master: DofRef,
    pub slaves: Vec<(DofRef, f64)>,
}

impl LinearConstraint {
    pub fn new(master: DofRef, slaves: &[(DofRef, f64)]) -> Self {
        LinearConstraint {
            master,
            slaves: slaves.to_vec(),
        }
    }

    /// Weighted sum of slave displacements
    pub fn value(&self, nodes: &[Node]) -> f64 {
        self.slaves
            .iter()
            .map(|(s, w)| w * nodes[s.node].displacement(s.dof))
            .sum()
    }
}

/// Arena of linear constraints with master -> slave adjacency.
#[derive(Debug, Clone, Default)]
pub struct LinearConstraintSet {
    constraints: Vec<LinearConstraint>,
    master_of: HashMap<DofRef, usize>,
    /// evaluation order, slaves' own constraints first
    order: Vec<usize>,
}

impl LinearConstraintSet {
    pub fn add(&mut self, lc: LinearConstraint) -> usize {
        self.constraints.push(lc);
        self.constraints.len() - 1
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn get(&self, index: usize) -> &LinearConstraint {
        &self.constraints[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinearConstraint> {
        self.constraints.iter()
    }

    /// Constraint that has `dof` as its master
    pub fn master_of(&self, dof: &DofRef) -> Option<usize> {
        self.master_of.get(dof).copied()
    }

    /// Validate references, reject scalar-field DOFs, duplicate masters and
    /// cycles, and fix the evaluation order
    pub fn prepare(&mut self, mesh: &Mesh) -> Result<()> {
        self.master_of.clear();
        for (i, lc) in self.constraints.iter().enumerate() {
            mesh.check_node(lc.master.node)?;
            // Scalar fields are updated after the constraint pass
            if let Some(d) = std::iter::once(&lc.master)
                .chain(lc.slaves.iter().map(|(s, _)| s))
                .find(|d| d.dof.is_scalar())
            {
                return Err(Error::Setup(format!(
                    "linear constraint {} references scalar dof {} of node {}",
                    i, d.dof, d.node
                )));
            }
            for (s, _) in lc.slaves.iter() {
                mesh.check_node(s.node)?;
                if *s == lc.master {
                    return Err(Error::ConstraintCycle {
                        node: s.node,
                        dof: s.dof,
                    });
                }
            }
            if self.master_of.insert(lc.master, i).is_some() {
                return Err(Error::Setup(format!(
                    "node {} dof {} is the master of more than one linear constraint",
                    lc.master.node, lc.master.dof
                )));
            }
        }

        // Depth first post-order over constraint dependencies
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Visiting,
            Done,
        }
        let mut marks = vec![Mark::New; self.constraints.len()];
        let mut order = Vec::with_capacity(self.constraints.len());
        for root in 0..self.constraints.len() {
            if marks[root] != Mark::New {
                continue;
            }
            // Stack of (constraint, next slave to visit)
            let mut stack = vec![(root, 0usize)];
            marks[root] = Mark::Visiting;
            while let Some(&mut (c, ref mut next)) = stack.last_mut() {
                let slaves = &self.constraints[c].slaves;
                if *next < slaves.len() {
                    let s = slaves[*next].0;
                    *next += 1;
                    if let Some(&dep) = self.master_of.get(&s) {
                        match marks[dep] {
                            Mark::Visiting => {
                                return Err(Error::ConstraintCycle {
                                    node: s.node,
                                    dof: s.dof,
                                })
                            }
                            Mark::New => {
                                marks[dep] = Mark::Visiting;
                                stack.push((dep, 0));
                            }
                            Mark::Done => {}
                        }
                    }
                } else {
                    marks[c] = Mark::Done;
                    order.push(c);
                    stack.pop();
                }
            }
        }
        self.order = order;
        Ok(())
    }

    /// Overwrite every master with its reference value plus the slave combination
    pub fn apply(&self, nodes: &mut [Node]) {
        for &i in self.order.iter() {
            let lc = &self.constraints[i];
            let d = lc.value(nodes);
            let master = &mut nodes[lc.master.node];
            master.set_value(lc.master.dof, master.reference(lc.master.dof) + d);
        }
    }

    /// Largest violation |master - sum| over all constraints
    pub fn max_violation(&self, nodes: &[Node]) -> f64 {
        self.constraints
            .iter()
            .map(|lc| (nodes[lc.master.node].displacement(lc.master.dof) - lc.value(nodes)).abs())
            .fold(0., f64::max)
    }
}
