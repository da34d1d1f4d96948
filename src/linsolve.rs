//! Linear solvers for the Newton system.

use nalgebra::{Dyn, LU};
use sprs::CsMat;

use crate::error::{Error, Result};
use crate::prelude::*;

/// Factor once, solve many times until the next reformation.
pub trait LinearSolver {
    fn factor(&mut self, K: &CsMat<f64>) -> Result<()>;

    fn solve(&self, R: &VectorD) -> Result<VectorD>;
}

/// Dense copy of a sparse matrix
#[allow(non_snake_case)]
pub fn to_dense(K: &CsMat<f64>) -> MatrixD {
    let mut dense = MatrixD::zeros(K.rows(), K.cols());
    for (i, row) in K.outer_iterator().enumerate() {
        for (j, &v) in row.iter() {
            if K.is_csr() {
                dense[(i, j)] += v;
            } else {
                dense[(j, i)] += v;
            }
        }
    }
    dense
}

/// Direct solver: dense LU of the assembled matrix, kept between reformations.
#[derive(Default)]
pub struct DirectSolver {
    lu: Option<LU<f64, Dyn, Dyn>>,
}

impl DirectSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[allow(non_snake_case)]
impl LinearSolver for DirectSolver {
    fn factor(&mut self, K: &CsMat<f64>) -> Result<()> {
        let lu = to_dense(K).lu();
        if !lu.is_invertible() {
            self.lu = None;
            return Err(Error::SingularMatrix);
        }
        self.lu = Some(lu);
        Ok(())
    }

    fn solve(&self, R: &VectorD) -> Result<VectorD> {
        self.lu
            .as_ref()
            .and_then(|lu| lu.solve(R))
            .ok_or(Error::SingularMatrix)
    }
}
