use crate::prelude::*;

use super::dof::{Dof, Equation, NODE_DOFS};

/// Mesh node: reference, current and previous-step kinematics plus its equation table.
#[derive(Debug, Clone)]
pub struct Node {
    /// reference position
    pub r0: Vector3,
    /// current position
    pub rt: Vector3,
    /// position at the last converged step
    pub rp: Vector3,
    /// current velocity
    pub vt: Vector3,
    /// velocity at the last converged step
    pub vp: Vector3,
    /// current acceleration
    pub at: Vector3,
    /// acceleration at the last converged step
    pub ap: Vector3,
    /// reference rotational (director) values
    pub d0: Vector3,
    /// current rotational (director) values
    pub dt: Vector3,
    /// current fluid pressure
    pub pt: f64,
    /// current solute concentration
    pub ct: f64,
    /// equation assignment per DOF slot
    pub id: [Equation; NODE_DOFS],
    /// rigid body this node is attached to
    pub rigid_body: Option<usize>,
}

impl Node {
    pub fn new(r0: Vector3) -> Self {
        Node {
            r0,
            rt: r0,
            rp: r0,
            vt: Vector3::zeros(),
            vp: Vector3::zeros(),
            at: Vector3::zeros(),
            ap: Vector3::zeros(),
            d0: Vector3::zeros(),
            dt: Vector3::zeros(),
            pt: 0.,
            ct: 0.,
            id: [Equation::Fixed; NODE_DOFS],
            rigid_body: None,
        }
    }

    pub fn equation(&self, dof: Dof) -> Equation {
        self.id[dof.index()]
    }

    /// Current value of a DOF
    pub fn value(&self, dof: Dof) -> f64 {
        match dof {
            Dof::X | Dof::Y | Dof::Z => self.rt[dof.index()],
            Dof::Rx | Dof::Ry | Dof::Rz => self.dt[dof.index() - 3],
            Dof::Pressure => self.pt,
            Dof::Concentration => self.ct,
        }
    }

    /// Reference value of a DOF; scalar fields start from zero
    pub fn reference(&self, dof: Dof) -> f64 {
        match dof {
            Dof::X | Dof::Y | Dof::Z => self.r0[dof.index()],
            Dof::Rx | Dof::Ry | Dof::Rz => self.d0[dof.index() - 3],
            Dof::Pressure | Dof::Concentration => 0.,
        }
    }

    pub fn set_value(&mut self, dof: Dof, value: f64) {
        match dof {
            Dof::X | Dof::Y | Dof::Z => self.rt[dof.index()] = value,
            Dof::Rx | Dof::Ry | Dof::Rz => self.dt[dof.index() - 3] = value,
            Dof::Pressure => self.pt = value,
            Dof::Concentration => self.ct = value,
        }
    }

    /// Current value minus reference value
    pub fn displacement(&self, dof: Dof) -> f64 {
        self.value(dof) - self.reference(dof)
    }

    /// Snapshot the current kinematics as the converged state
    pub fn commit(&mut self) {
        self.rp = self.rt;
        self.vp = self.vt;
        self.ap = self.at;
    }

    /// Return to the last converged kinematics
    pub fn restore(&mut self) {
        self.rt = self.rp;
        self.vt = self.vp;
        self.at = self.ap;
    }
}
