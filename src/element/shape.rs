use crate::prelude::*;

use super::{
    interp::{gauss_legendre_lobatto_points, lagrange_basis},
    quadrature::Quadrature,
};

//------------------------------------------------------------------------------
// Hexahedral Lagrange shape functions
//------------------------------------------------------------------------------

/// Tensor product Lagrange hexahedron. Nodes are numbered lexicographically,
/// x fastest: node `i + (order+1)*(j + (order+1)*k)` sits at `(xi_i, xi_j, xi_k)`.
#[derive(Debug, Clone)]
pub struct HexShape {
    pub order: usize,
    xi_1d: Vec<f64>,
}

impl HexShape {
    pub fn new(order: usize) -> Self {
        HexShape {
            order,
            xi_1d: gauss_legendre_lobatto_points(order),
        }
    }

    pub fn num_nodes(&self) -> usize {
        (self.order + 1).pow(3)
    }

    /// Natural coordinates of the element nodes
    pub fn node_coords(&self) -> Vec<Vector3> {
        let n = self.order + 1;
        (0..self.num_nodes())
            .map(|a| {
                Vector3::new(
                    self.xi_1d[a % n],
                    self.xi_1d[(a / n) % n],
                    self.xi_1d[a / (n * n)],
                )
            })
            .collect()
    }

    /// Local node ids of the eight corners in VTK hexahedron order
    pub fn corners(&self) -> [usize; 8] {
        let n = self.order + 1;
        let p = self.order;
        let id = |i: usize, j: usize, k: usize| i + n * (j + n * k);
        [
            id(0, 0, 0),
            id(p, 0, 0),
            id(p, p, 0),
            id(0, p, 0),
            id(0, 0, p),
            id(p, 0, p),
            id(p, p, p),
            id(0, p, p),
        ]
    }

    /// Shape function values and natural derivatives (nodes x 3) at `xi`
    pub fn eval(&self, xi: &Vector3) -> (VectorQ, MatrixXx3) {
        let n = self.order + 1;
        let (nx, dx) = lagrange_basis(xi.x, &self.xi_1d);
        let (ny, dy) = lagrange_basis(xi.y, &self.xi_1d);
        let (nz, dz) = lagrange_basis(xi.z, &self.xi_1d);
        let mut values = VectorQ::zeros(self.num_nodes());
        let mut derivs = MatrixXx3::zeros(self.num_nodes());
        for k in 0..n {
            for j in 0..n {
                for i in 0..n {
                    let a = i + n * (j + n * k);
                    values[a] = nx[i] * ny[j] * nz[k];
                    derivs[(a, 0)] = dx[i] * ny[j] * nz[k];
                    derivs[(a, 1)] = nx[i] * dy[j] * nz[k];
                    derivs[(a, 2)] = nx[i] * ny[j] * dz[k];
                }
            }
        }
        (values, derivs)
    }
}

//------------------------------------------------------------------------------
// Shape functions at quadrature points
//------------------------------------------------------------------------------

/// Shape function data shared by every element of a domain.
#[derive(Debug, Clone)]
pub struct ElementRule {
    pub shape: HexShape,
    pub quadrature: Quadrature,
    /// shape function values per quadrature point
    pub n: Vec<VectorQ>,
    /// natural derivatives (nodes x 3) per quadrature point
    pub dn: Vec<MatrixXx3>,
}

impl ElementRule {
    pub fn new(shape: HexShape, quadrature: Quadrature) -> Self {
        let (n, dn): (Vec<VectorQ>, Vec<MatrixXx3>) =
            quadrature.points.iter().map(|xi| shape.eval(xi)).unzip();
        ElementRule {
            shape,
            quadrature,
            n,
            dn,
        }
    }

    /// 8-node hexahedron with 2x2x2 Gauss integration
    pub fn hex8() -> Self {
        ElementRule::new(HexShape::new(1), Quadrature::gauss_hex(2))
    }

    /// 27-node hexahedron with 3x3x3 Gauss integration
    pub fn hex27() -> Self {
        ElementRule::new(HexShape::new(2), Quadrature::gauss_hex(3))
    }

    pub fn num_nodes(&self) -> usize {
        self.shape.num_nodes()
    }

    pub fn num_points(&self) -> usize {
        self.quadrature.len()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn test_kronecker_property() {
        let shape = HexShape::new(2);
        for (a, xi) in shape.node_coords().iter().enumerate() {
            let (n, _) = shape.eval(xi);
            for b in 0..shape.num_nodes() {
                let expected = if a == b { 1. } else { 0. };
                assert_relative_eq!(n[b], expected, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_hex8_derivatives() {
        let shape = HexShape::new(1);
        let (n, dn) = shape.eval(&Vector3::zeros());
        assert_relative_eq!(n.sum(), 1.);
        for a in 0..8 {
            assert_relative_eq!(n[a], 0.125);
        }
        // Column sums vanish (constant field has zero gradient)
        for c in 0..3 {
            assert_relative_eq!(dn.column(c).sum(), 0., epsilon = 1e-15);
        }
        assert_relative_eq!(dn[(0, 0)], -0.125);
        assert_relative_eq!(dn[(7, 2)], 0.125);
    }

    #[test]
    fn test_corners() {
        assert_eq!(HexShape::new(1).corners(), [0, 1, 3, 2, 4, 5, 7, 6]);
        assert_eq!(HexShape::new(2).corners()[6], 26);
    }
}
