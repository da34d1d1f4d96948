//! The model aggregate handed to every solver stage.

use tracing::info;

use crate::bc::{BoundaryConditions, LinearConstraintSet};
use crate::config::AnalysisConfig;
use crate::curve::Curve;
use crate::error::{Error, Result};
use crate::interface::{ContactUpdater, PlotWriter};
use crate::mesh::{Dof, Equation, Mesh};
use crate::rigid::{RigidBody, RigidJoint};

/// Everything an analysis reads and mutates, owned in one place.
///
/// Collaborators live in their own fields so the update stage can borrow the
/// mesh and the plot writer at the same time.
pub struct SimulationState {
    pub config: AnalysisConfig,
    pub mesh: Mesh,
    pub bodies: Vec<RigidBody>,
    pub joints: Vec<RigidJoint>,
    pub bcs: BoundaryConditions,
    pub constraints: LinearConstraintSet,
    pub curves: Vec<Box<dyn Curve>>,
    pub contact: Option<Box<dyn ContactUpdater>>,
    pub plot: Option<Box<dyn PlotWriter>>,
    /// current time
    pub time: f64,
    /// current step size
    pub dt: f64,
    neq: usize,
}

impl SimulationState {
    pub fn new(config: AnalysisConfig, mesh: Mesh) -> Self {
        let dt = config.step_size;
        SimulationState {
            config,
            mesh,
            bodies: Vec::new(),
            joints: Vec::new(),
            bcs: BoundaryConditions::default(),
            constraints: LinearConstraintSet::default(),
            curves: Vec::new(),
            contact: None,
            plot: None,
            time: 0.,
            dt,
            neq: 0,
        }
    }

    pub fn add_curve(&mut self, curve: impl Curve + 'static) -> usize {
        self.curves.push(Box::new(curve));
        self.curves.len() - 1
    }

    pub fn add_rigid_body(&mut self, body: RigidBody) -> usize {
        self.bodies.push(body);
        self.bodies.len() - 1
    }

    /// Attach nodes to a rigid body
    pub fn attach(&mut self, body: usize, nodes: &[usize]) -> Result<()> {
        if body >= self.bodies.len() {
            return Err(Error::InvalidRigidBody(body));
        }
        for &n in nodes {
            self.mesh.check_node(n)?;
            self.mesh.nodes[n].rigid_body = Some(body);
        }
        Ok(())
    }

    pub fn add_joint(&mut self, joint: RigidJoint) -> usize {
        self.joints.push(joint);
        self.joints.len() - 1
    }

    pub fn curve_value(&self, curve: usize) -> f64 {
        self.curves[curve].value(self.time)
    }

    /// Number of equations in the global system
    pub fn neq(&self) -> usize {
        self.neq
    }

    /// Validate the model and number the equations.
    ///
    /// Nodes are numbered first in node and DOF order, then every free
    /// component of each active rigid body.
    pub fn init(&mut self) -> Result<()> {
        self.config.validate()?;
        let num_curves = self.curves.len();
        self.bcs.validate(&self.mesh, num_curves)?;
        self.constraints.prepare(&self.mesh)?;
        for rb in self.bodies.iter() {
            for d in rb.drivers.iter().flatten() {
                if let Some(lc) = d.curve.filter(|&lc| lc >= num_curves) {
                    return Err(Error::InvalidCurve(lc));
                }
            }
        }
        for j in self.joints.iter() {
            for b in [j.body_a, j.body_b] {
                if b >= self.bodies.len() {
                    return Err(Error::InvalidRigidBody(b));
                }
            }
        }

        let dofs = self.config.module.dofs(self.config.rotations);
        for node in self.mesh.nodes.iter_mut() {
            if let Some(b) = node.rigid_body {
                if b >= self.bodies.len() {
                    return Err(Error::InvalidRigidBody(b));
                }
            }
            for dof in Dof::ALL {
                node.id[dof.index()] = match node.rigid_body {
                    Some(b) if !dof.is_scalar() && dofs.contains(&dof) => Equation::Rigid(b),
                    _ if dofs.contains(&dof) => Equation::Active(0),
                    _ => Equation::Fixed,
                };
            }
        }

        let mark = |mesh: &mut Mesh, node: usize, dof: Dof, eq: Equation| -> Result<()> {
            let slot = &mut mesh.nodes[node].id[dof.index()];
            match *slot {
                Equation::Active(_) => {
                    *slot = eq;
                    Ok(())
                }
                Equation::Fixed if eq == Equation::Fixed => Ok(()),
                other => Err(Error::Setup(format!(
                    "node {} dof {} is already {:?}",
                    node, dof, other
                ))),
            }
        };
        for bc in self.bcs.fixed.iter() {
            if self.mesh.nodes[bc.node].equation(bc.dof) != Equation::Fixed {
                mark(&mut self.mesh, bc.node, bc.dof, Equation::Fixed)?;
            }
        }
        // Inactive conditions leave their DOFs free
        for (i, bc) in self.bcs.prescribed.iter().enumerate().filter(|(_, bc)| bc.active) {
            for dof in bc.target.dofs() {
                mark(&mut self.mesh, bc.node, dof, Equation::Prescribed(i))?;
            }
        }
        for (i, lc) in self.constraints.iter().enumerate() {
            mark(
                &mut self.mesh,
                lc.master.node,
                lc.master.dof,
                Equation::Constrained(i),
            )?;
        }

        let mut neq = 0;
        for node in self.mesh.nodes.iter_mut() {
            for id in node.id.iter_mut() {
                if let Equation::Active(_) = id {
                    *id = Equation::Active(neq);
                    neq += 1;
                }
            }
        }
        for rb in self.bodies.iter_mut() {
            rb.lm = [None; 6];
            if !rb.active {
                continue;
            }
            for k in 0..6 {
                if rb.drivers[k].is_none() {
                    rb.lm[k] = Some(neq);
                    neq += 1;
                }
            }
        }
        self.neq = neq;

        self.mesh.reset();
        self.dt = self.config.step_size;
        info!(
            nodes = self.mesh.num_nodes(),
            bodies = self.bodies.len(),
            equations = neq,
            "model initialized"
        );
        Ok(())
    }

    /// Accept the current state as converged
    pub fn commit(&mut self) {
        self.mesh.commit();
        for rb in self.bodies.iter_mut() {
            rb.commit();
        }
        for j in self.joints.iter_mut() {
            j.commit();
        }
    }

    /// Return to the last converged state
    pub fn restore(&mut self) {
        for node in self.mesh.nodes.iter_mut() {
            node.restore();
        }
        for rb in self.bodies.iter_mut() {
            rb.restore();
        }
        for j in self.joints.iter_mut() {
            j.restore();
            j.update(&self.bodies);
        }
    }
}
