#![allow(non_snake_case)]

use crate::prelude::*;

// MaterialPoint holds the integration point state used by constitutive evaluation.
// It is allocated with its element and never shared between elements.
#[derive(Debug, Clone)]
pub struct MaterialPoint {
    /// reference position of the point
    pub x0: Vector3,
    /// current position of the point
    pub xt: Vector3,
    /// deformation gradient
    pub F: Matrix3,
    /// determinant of the deformation gradient
    pub J: f64,
    /// Cauchy stress
    pub stress: Matrix3,
    /// internal variables at the current trial state
    pub history: Vec<f64>,
    /// internal variables at the last converged step
    pub history_prev: Vec<f64>,
}

impl Default for MaterialPoint {
    fn default() -> Self {
        MaterialPoint {
            x0: Vector3::zeros(),
            xt: Vector3::zeros(),
            F: Matrix3::identity(),
            J: 1.,
            stress: Matrix3::zeros(),
            history: Vec::new(),
            history_prev: Vec::new(),
        }
    }
}

impl MaterialPoint {
    pub fn new(num_history: usize) -> Self {
        MaterialPoint {
            history: vec![0.; num_history],
            history_prev: vec![0.; num_history],
            ..Default::default()
        }
    }

    /// Return to the undeformed, stress free state
    pub fn reset(&mut self) {
        self.xt = self.x0;
        self.F = Matrix3::identity();
        self.J = 1.;
        self.stress.fill(0.);
        self.history.fill(0.);
        self.history_prev.fill(0.);
    }

    /// Accept the trial internal variables at step convergence
    pub fn commit(&mut self) {
        self.history_prev.copy_from_slice(&self.history);
    }

    /// Left Cauchy-Green tensor b = F F^T
    pub fn left_cauchy_green(&self) -> Matrix3 {
        self.F * self.F.transpose()
    }

    /// Right Cauchy-Green tensor C = F^T F
    pub fn right_cauchy_green(&self) -> Matrix3 {
        self.F.transpose() * self.F
    }

    /// Green-Lagrange strain E = (C - I) / 2
    pub fn green_strain(&self) -> Matrix3 {
        (self.right_cauchy_green() - Matrix3::identity()) * 0.5
    }
}
