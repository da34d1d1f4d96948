//! Rigid bodies, rigid joints and their kinematic update.

#![allow(non_snake_case)]

use serde::{Deserialize, Serialize};

use crate::curve::Curve;
use crate::error::{Error, Result};
use crate::mesh::{Dof, Node};
use crate::prelude::*;

/// Prescribed motion of one rigid body component.
///
/// The component's displacement since the reference state is
/// `scale * curve(t)`, for rotations as well as translations, where it is the
/// rotation vector component in radians. Without a curve the component is held
/// at its step-start value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidDriver {
    pub curve: Option<usize>,
    #[serde(default = "unit_scale")]
    pub scale: f64,
}

fn unit_scale() -> f64 {
    1.
}

impl RigidDriver {
    pub fn fixed() -> Self {
        RigidDriver {
            curve: None,
            scale: 1.,
        }
    }

    pub fn curve(curve: usize, scale: f64) -> Self {
        RigidDriver {
            curve: Some(curve),
            scale,
        }
    }
}

/// Body component slot (x, y, z, rx, ry, rz) of a DOF
fn component(dof: Dof) -> Result<usize> {
    match dof {
        Dof::Pressure | Dof::Concentration => Err(Error::Setup(format!(
            "rigid bodies have no '{}' degree of freedom",
            dof
        ))),
        _ => Ok(dof.index()),
    }
}

/// Transfer matrix `[I | -ã]` mapping body increments (du, dθ) to the
/// displacement of a point at offset `a` from the body center.
pub fn transfer(a: &Vector3) -> Matrix3x6 {
    let mut G = Matrix3x6::zeros();
    G.fixed_view_mut::<3, 3>(0, 0).fill_with_identity();
    G.fixed_view_mut::<3, 3>(0, 3).copy_from(&(-a.tilde()));
    G
}

//------------------------------------------------------------------------------
// Rigid body
//------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RigidBody {
    /// reference center of mass
    pub r0: Vector3,
    /// current center of mass
    pub rt: Vector3,
    /// center of mass at the last converged step
    pub rp: Vector3,
    /// current orientation
    pub qt: UnitQuaternion,
    /// orientation at the last converged step
    pub qp: UnitQuaternion,
    /// generalized displacements at the last converged step
    pub Up: Vector6,
    /// current generalized displacements
    pub Ut: Vector6,
    /// increment since the last converged step
    pub du: Vector6,
    /// equation per component, `None` when prescribed or held
    pub lm: [Option<usize>; 6],
    pub drivers: [Option<RigidDriver>; 6],
    pub active: bool,
}

impl RigidBody {
    pub fn new(r0: Vector3) -> Self {
        RigidBody {
            r0,
            rt: r0,
            rp: r0,
            qt: UnitQuaternion::identity(),
            qp: UnitQuaternion::identity(),
            Up: Vector6::zeros(),
            Ut: Vector6::zeros(),
            du: Vector6::zeros(),
            lm: [None; 6],
            drivers: [None; 6],
            active: true,
        }
    }

    /// Rigid body centered on the centroid of the given nodes
    pub fn from_nodes(nodes: &[Node], ids: &[usize]) -> Result<Self> {
        if ids.is_empty() {
            return Err(Error::Setup("rigid body without nodes".into()));
        }
        let mut c = Vector3::zeros();
        for &i in ids {
            c += nodes.get(i).ok_or(Error::InvalidNode(i))?.r0;
        }
        Ok(RigidBody::new(c / ids.len() as f64))
    }

    pub fn prescribe(&mut self, dof: Dof, driver: RigidDriver) -> Result<()> {
        self.drivers[component(dof)?] = Some(driver);
        Ok(())
    }

    /// Hold every component
    pub fn fix_all(&mut self) {
        self.drivers = [Some(RigidDriver::fixed()); 6];
    }

    /// Transfer matrix for a point currently at `x`
    pub fn transfer_at(&self, x: &Vector3) -> Matrix3x6 {
        transfer(&(x - self.rt))
    }

    /// Current position of a point given in the reference configuration
    pub fn place(&self, x0: &Vector3) -> Vector3 {
        self.rt + self.qt * (x0 - self.r0)
    }

    /// Advance the body from the step-start state with the increment `du`
    fn advance(&mut self, du: Vector6) {
        self.du = du;
        self.rt = self.rp + du.fixed_rows::<3>(0);
        let dq = Vector3::from(du.fixed_rows::<3>(3)).as_rotation();
        self.qt = UnitQuaternion::new_normalize((dq * self.qp).into_inner());
        self.Ut = self.Up + du;
    }

    pub fn commit(&mut self) {
        self.rp = self.rt;
        self.qp = self.qt;
        self.Up = self.Ut;
        self.du = Vector6::zeros();
    }

    pub fn restore(&mut self) {
        self.rt = self.rp;
        self.qt = self.qp;
        self.Ut = self.Up;
        self.du = Vector6::zeros();
    }
}

//------------------------------------------------------------------------------
// Rigid joint
//------------------------------------------------------------------------------

/// Spherical joint between two rigid bodies, enforced by augmented Lagrangian.
#[derive(Debug, Clone)]
pub struct RigidJoint {
    pub body_a: usize,
    pub body_b: usize,
    /// anchor offset from body a's reference center
    pub qa0: Vector3,
    /// anchor offset from body b's reference center
    pub qb0: Vector3,
    /// penalty factor
    pub eps: f64,
    /// accumulated multiplier
    pub L: Vector3,
    /// multiplier at the last converged step
    pub Lp: Vector3,
    /// current constraint force
    pub F: Vector3,
}

impl RigidJoint {
    /// Joint at the reference point `anchor`
    pub fn new(
        bodies: &[RigidBody],
        body_a: usize,
        body_b: usize,
        anchor: Vector3,
        eps: f64,
    ) -> Result<Self> {
        let a = bodies.get(body_a).ok_or(Error::InvalidRigidBody(body_a))?;
        let b = bodies.get(body_b).ok_or(Error::InvalidRigidBody(body_b))?;
        if body_a == body_b {
            return Err(Error::Setup(format!(
                "rigid joint connects body {} to itself",
                body_a
            )));
        }
        if eps <= 0. {
            return Err(Error::Setup("rigid joint penalty must be positive".into()));
        }
        Ok(RigidJoint {
            body_a,
            body_b,
            qa0: anchor - a.r0,
            qb0: anchor - b.r0,
            eps,
            L: Vector3::zeros(),
            Lp: Vector3::zeros(),
            F: Vector3::zeros(),
        })
    }

    /// Current anchor offsets from each body's center
    pub fn arms(&self, bodies: &[RigidBody]) -> (Vector3, Vector3) {
        (
            bodies[self.body_a].qt * self.qa0,
            bodies[self.body_b].qt * self.qb0,
        )
    }

    /// Anchor of body a minus anchor of body b
    pub fn gap(&self, bodies: &[RigidBody]) -> Vector3 {
        let (qa, qb) = self.arms(bodies);
        bodies[self.body_a].rt + qa - bodies[self.body_b].rt - qb
    }

    pub fn update(&mut self, bodies: &[RigidBody]) {
        self.F = self.L + self.gap(bodies) * self.eps;
    }

    /// Accept the current force as the new multiplier
    pub fn augment(&mut self) {
        self.L = self.F;
    }

    /// Gap gradients with respect to each body's six components
    pub fn gradients(&self, bodies: &[RigidBody]) -> (Matrix3x6, Matrix3x6) {
        let (qa, qb) = self.arms(bodies);
        (transfer(&qa), -transfer(&qb))
    }

    /// Generalized residual forces on body a and body b
    pub fn forces(&self, bodies: &[RigidBody]) -> (Vector6, Vector6) {
        let (Ga, Gb) = self.gradients(bodies);
        (-Ga.transpose() * self.F, -Gb.transpose() * self.F)
    }

    pub fn commit(&mut self) {
        self.Lp = self.L;
    }

    pub fn restore(&mut self) {
        self.L = self.Lp;
    }
}

//------------------------------------------------------------------------------
// Update
//------------------------------------------------------------------------------

/// Rigid body part of the state update.
///
/// Bodies move first, then their attached nodes, then the joint forces are
/// recomputed from the new body transforms.
#[allow(clippy::too_many_arguments)]
pub fn update_rigid_bodies(
    bodies: &mut [RigidBody],
    joints: &mut [RigidJoint],
    nodes: &mut [Node],
    curves: &[Box<dyn Curve>],
    time: f64,
    Ui: &VectorD,
    ui: &VectorD,
    s: f64,
) {
    for rb in bodies.iter_mut().filter(|rb| rb.active) {
        let mut du = Vector6::zeros();
        for k in 0..6 {
            du[k] = match (rb.lm[k], rb.drivers[k]) {
                (Some(eq), _) => Ui[eq] + s * ui[eq],
                (None, Some(RigidDriver { curve: Some(lc), scale })) => {
                    scale * curves[lc].value(time) - rb.Up[k]
                }
                _ => 0.,
            };
        }
        rb.advance(du);
    }

    for node in nodes.iter_mut() {
        if let Some(rb) = node.rigid_body.map(|b| &bodies[b]) {
            if rb.active {
                node.rt = rb.place(&node.r0);
            }
        }
    }

    for joint in joints.iter_mut() {
        joint.update(bodies);
    }
}
