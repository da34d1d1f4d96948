#![allow(non_snake_case)]

use crate::material::StressEvaluator;
use crate::mesh::Node;
use crate::prelude::*;

use super::{material_point::MaterialPoint, shape::ElementRule};

/// Non-positive Jacobian at an integration point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegenerateElement {
    pub point: usize,
    pub det: f64,
}

/// Outcome of a per-element evaluation
pub enum ElementError {
    Degenerate(DegenerateElement),
    Material(crate::error::Error),
}

//------------------------------------------------------------------------------
// Element
//------------------------------------------------------------------------------

/// Solid element: node connectivity plus one material point per integration point.
#[derive(Debug, Clone)]
pub struct SolidElement {
    pub nodes: Vec<usize>,
    pub points: Vec<MaterialPoint>,
}

/// Spatial quantities at one integration point
struct PointGeometry {
    /// spatial shape function gradients (nodes x 3)
    G: MatrixXx3,
    /// deformation gradient
    F: Matrix3,
    /// current volume weight detJt * w
    dv: f64,
}

impl SolidElement {
    pub fn new(nodes: &[usize], rule: &ElementRule, num_history: usize) -> Self {
        SolidElement {
            nodes: nodes.to_vec(),
            points: (0..rule.num_points())
                .map(|_| MaterialPoint::new(num_history))
                .collect(),
        }
    }

    /// Reference (current = false) or current nodal coordinates (3 x nodes)
    pub fn coords(&self, nodes: &[Node], current: bool) -> Matrix3xX {
        Matrix3xX::from_columns(
            &self
                .nodes
                .iter()
                .map(|&n| if current { nodes[n].rt } else { nodes[n].r0 })
                .collect_vec(),
        )
    }

    /// Reset material points to the undeformed state
    pub fn reset(&mut self, rule: &ElementRule, nodes: &[Node]) {
        let X = self.coords(nodes, false);
        for (mp, n) in self.points.iter_mut().zip(rule.n.iter()) {
            mp.x0 = &X * n;
            mp.reset();
        }
    }

    fn point_geometry(
        &self,
        rule: &ElementRule,
        X: &Matrix3xX,
        x: &Matrix3xX,
        point: usize,
    ) -> Result<PointGeometry, DegenerateElement> {
        let dN = &rule.dn[point];
        let J0: Matrix3 = X * dN;
        let Jt: Matrix3 = x * dN;
        let det0 = J0.determinant();
        let dett = Jt.determinant();
        if det0 <= 0. || dett <= 0. {
            return Err(DegenerateElement {
                point,
                det: f64::min(det0, dett),
            });
        }
        let (J0i, Jti) = match (J0.try_inverse(), Jt.try_inverse()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(DegenerateElement { point, det: 0. }),
        };
        Ok(PointGeometry {
            G: dN * Jti,
            F: Jt * J0i,
            dv: dett * rule.quadrature.weights[point],
        })
    }

    /// Recompute deformation and stress at every integration point
    pub fn update_stresses(
        &mut self,
        rule: &ElementRule,
        nodes: &[Node],
        material: &dyn StressEvaluator,
    ) -> Result<(), ElementError> {
        let X = self.coords(nodes, false);
        let x = self.coords(nodes, true);
        for i in 0..self.points.len() {
            let geom = self
                .point_geometry(rule, &X, &x, i)
                .map_err(ElementError::Degenerate)?;
            let mp = &mut self.points[i];
            mp.F = geom.F;
            mp.J = geom.F.determinant();
            mp.xt = &x * &rule.n[i];
            material.update_history(mp);
            mp.stress = material.stress(mp).map_err(ElementError::Material)?;
        }
        Ok(())
    }

    /// Internal force vector (3 * nodes), from the stored point stresses
    pub fn internal_forces(
        &self,
        rule: &ElementRule,
        nodes: &[Node],
    ) -> Result<VectorD, DegenerateElement> {
        let X = self.coords(nodes, false);
        let x = self.coords(nodes, true);
        let mut fe = VectorD::zeros(3 * self.nodes.len());
        for (i, mp) in self.points.iter().enumerate() {
            let geom = self.point_geometry(rule, &X, &x, i)?;
            for a in 0..self.nodes.len() {
                let Ga: Vector3 = geom.G.row(a).transpose();
                fe.fixed_rows_mut::<3>(3 * a)
                    .add_assign(mp.stress * Ga * geom.dv);
            }
        }
        Ok(fe)
    }

    /// Updated Lagrangian stiffness: material plus initial stress parts
    pub fn stiffness(
        &self,
        rule: &ElementRule,
        nodes: &[Node],
        material: &dyn StressEvaluator,
    ) -> Result<MatrixD, ElementError> {
        let X = self.coords(nodes, false);
        let x = self.coords(nodes, true);
        let nn = self.nodes.len();
        let mut ke = MatrixD::zeros(3 * nn, 3 * nn);
        for (i, mp) in self.points.iter().enumerate() {
            let geom = self
                .point_geometry(rule, &X, &x, i)
                .map_err(ElementError::Degenerate)?;
            let D = material.tangent(mp).map_err(ElementError::Material)?;
            let B = (0..nn).map(|a| strain_displacement(&geom.G, a)).collect_vec();
            for a in 0..nn {
                let DBa: Matrix6x3 = D * B[a];
                let sGa: Vector3 = mp.stress * geom.G.row(a).transpose();
                for b in 0..nn {
                    let kab: Matrix3 = B[b].transpose() * DBa;
                    let kg = geom.G.row(b).dot(&sGa.transpose());
                    let mut Kab = ke.fixed_view_mut::<3, 3>(3 * a, 3 * b);
                    Kab.add_assign((kab.transpose() + Matrix3::identity() * kg) * geom.dv);
                }
            }
        }
        Ok(ke)
    }

    /// Consistent mass matrix (3 * nodes square)
    pub fn mass(&self, rule: &ElementRule, nodes: &[Node], density: f64) -> MatrixD {
        let X = self.coords(nodes, false);
        let nn = self.nodes.len();
        let mut me = MatrixD::zeros(3 * nn, 3 * nn);
        for (i, N) in rule.n.iter().enumerate() {
            let J0: Matrix3 = &X * &rule.dn[i];
            let dV = J0.determinant() * rule.quadrature.weights[i];
            for a in 0..nn {
                for b in 0..nn {
                    let m = density * N[a] * N[b] * dV;
                    for c in 0..3 {
                        me[(3 * a + c, 3 * b + c)] += m;
                    }
                }
            }
        }
        me
    }

    /// Nodal forces of a uniform body acceleration `g`
    pub fn body_force(&self, rule: &ElementRule, nodes: &[Node], density: f64, g: &Vector3) -> VectorD {
        let X = self.coords(nodes, false);
        let mut fe = VectorD::zeros(3 * self.nodes.len());
        for (i, N) in rule.n.iter().enumerate() {
            let J0: Matrix3 = &X * &rule.dn[i];
            let dV = J0.determinant() * rule.quadrature.weights[i];
            for a in 0..self.nodes.len() {
                fe.fixed_rows_mut::<3>(3 * a)
                    .add_assign(g * (density * N[a] * dV));
            }
        }
        fe
    }

    /// Reference or current element volume
    pub fn volume(&self, rule: &ElementRule, nodes: &[Node], current: bool) -> f64 {
        let x = self.coords(nodes, current);
        rule.dn
            .iter()
            .zip(rule.quadrature.weights.iter())
            .map(|(dN, w)| {
                let J: Matrix3 = &x * dN;
                J.determinant() * w
            })
            .sum()
    }
}

/// Voigt strain-displacement block of node `a` from spatial gradients
fn strain_displacement(G: &MatrixXx3, a: usize) -> Matrix6x3 {
    let (gx, gy, gz) = (G[(a, 0)], G[(a, 1)], G[(a, 2)]);
    Matrix6x3::new(
        gx, 0., 0., //
        0., gy, 0., //
        0., 0., gz, //
        gy, gx, 0., //
        0., gz, gy, //
        gz, 0., gx, //
    )
}
