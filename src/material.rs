//! Constitutive capability consumed by the element domains.
//!
//! The engine only needs stress and tangent at a material point; the two hyperelastic
//! laws here are reference implementations used by the solid domain and the tests.

#![allow(non_snake_case)]

use serde::{Deserialize, Serialize};

use crate::element::material_point::MaterialPoint;
use crate::error::{Error, Result};
use crate::prelude::*;

/// Stress and tangent at a material point.
pub trait StressEvaluator: Send + Sync {
    /// Cauchy stress
    fn stress(&self, mp: &MaterialPoint) -> Result<Matrix3>;

    /// Spatial elasticity tensor in Voigt order [xx, yy, zz, xy, yz, xz]
    fn tangent(&self, mp: &MaterialPoint) -> Result<Matrix6>;

    /// Advance internal variables from `history_prev` to the trial state
    fn update_history(&self, _mp: &mut MaterialPoint) {}

    /// Number of internal variables each material point stores
    fn history_len(&self) -> usize {
        0
    }

    /// Mass density in the reference configuration
    fn density(&self) -> f64 {
        0.
    }
}

/// Lamé parameters from Young's modulus and Poisson's ratio, validated.
fn lame(E: f64, nu: f64) -> Result<(f64, f64)> {
    if E <= 0. {
        return Err(Error::Material("Young's modulus must be positive".into()));
    }
    if nu <= -1. || nu >= 0.5 {
        return Err(Error::Material(
            "Poisson's ratio must be in range (-1, 0.5)".into(),
        ));
    }
    let mu = E / (2. * (1. + nu));
    let lambda = E * nu / ((1. + nu) * (1. - 2. * nu));
    Ok((lambda, mu))
}

fn positive_jacobian(mp: &MaterialPoint) -> Result<f64> {
    if mp.J <= 0. {
        Err(Error::Material(format!("non-positive volume ratio {:.3e}", mp.J)))
    } else {
        Ok(mp.J)
    }
}

//------------------------------------------------------------------------------
// Neo-Hookean
//------------------------------------------------------------------------------

/// Compressible neo-Hookean solid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeoHookean {
    pub lambda: f64,
    pub mu: f64,
    pub density: f64,
}

impl NeoHookean {
    pub fn new(E: f64, nu: f64) -> Result<Self> {
        let (lambda, mu) = lame(E, nu)?;
        Ok(NeoHookean {
            lambda,
            mu,
            density: 0.,
        })
    }

    pub fn with_density(mut self, density: f64) -> Result<Self> {
        if density < 0. {
            return Err(Error::Material("density must not be negative".into()));
        }
        self.density = density;
        Ok(self)
    }
}

impl StressEvaluator for NeoHookean {
    fn stress(&self, mp: &MaterialPoint) -> Result<Matrix3> {
        let J = positive_jacobian(mp)?;
        let b = mp.left_cauchy_green();
        let I = Matrix3::identity();
        Ok((b - I) * (self.mu / J) + I * (self.lambda * J.ln() / J))
    }

    fn tangent(&self, mp: &MaterialPoint) -> Result<Matrix6> {
        let J = positive_jacobian(mp)?;
        let lam = self.lambda / J;
        let mu = (self.mu - self.lambda * J.ln()) / J;
        let mut D = Matrix6::zeros();
        D.fixed_view_mut::<3, 3>(0, 0).fill(lam);
        for i in 0..3 {
            D[(i, i)] += 2. * mu;
            D[(i + 3, i + 3)] = mu;
        }
        Ok(D)
    }

    fn density(&self) -> f64 {
        self.density
    }
}

//------------------------------------------------------------------------------
// St. Venant-Kirchhoff
//------------------------------------------------------------------------------

/// Voigt index pairs
const VOIGT: [(usize, usize); 6] = [(0, 0), (1, 1), (2, 2), (0, 1), (1, 2), (0, 2)];

/// Isotropic elastic material with a linear Green-Lagrange / 2nd Piola-Kirchhoff law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StVenantKirchhoff {
    pub lambda: f64,
    pub mu: f64,
    pub density: f64,
}

impl StVenantKirchhoff {
    pub fn new(E: f64, nu: f64) -> Result<Self> {
        let (lambda, mu) = lame(E, nu)?;
        Ok(StVenantKirchhoff {
            lambda,
            mu,
            density: 0.,
        })
    }

    /// Material elasticity tensor component C_IJKL
    fn c(&self, i: usize, j: usize, k: usize, l: usize) -> f64 {
        let d = |a: usize, b: usize| if a == b { 1. } else { 0. };
        self.lambda * d(i, j) * d(k, l) + self.mu * (d(i, k) * d(j, l) + d(i, l) * d(j, k))
    }
}

impl StressEvaluator for StVenantKirchhoff {
    fn stress(&self, mp: &MaterialPoint) -> Result<Matrix3> {
        let J = positive_jacobian(mp)?;
        let E = mp.green_strain();
        let S = Matrix3::identity() * (self.lambda * E.trace()) + E * (2. * self.mu);
        Ok(mp.F * S * mp.F.transpose() / J)
    }

    fn tangent(&self, mp: &MaterialPoint) -> Result<Matrix6> {
        let J = positive_jacobian(mp)?;
        let F = &mp.F;
        // Push forward c_ijkl = F_iI F_jJ F_kK F_lL C_IJKL / J
        let mut D = Matrix6::zeros();
        for (a, &(i, j)) in VOIGT.iter().enumerate() {
            for (b, &(k, l)) in VOIGT.iter().enumerate() {
                let mut v = 0.;
                for I in 0..3 {
                    for JJ in 0..3 {
                        for K in 0..3 {
                            for L in 0..3 {
                                v += F[(i, I)]
                                    * F[(j, JJ)]
                                    * F[(k, K)]
                                    * F[(l, L)]
                                    * self.c(I, JJ, K, L);
                            }
                        }
                    }
                }
                D[(a, b)] = v / J;
            }
        }
        Ok(D)
    }

    fn density(&self) -> f64 {
        self.density
    }
}
