use crate::prelude::*;

/// Integration rule on the reference cube [-1, 1]^3.
#[derive(Debug, Clone)]
pub struct Quadrature {
    pub points: Vec<Vector3>,
    pub weights: VectorQ,
}

impl Quadrature {
    /// One dimensional Gauss-Legendre rule, points ascending
    pub fn gauss_1d(order: usize) -> (Vec<f64>, Vec<f64>) {
        let gl_rule = gauss_quad::GaussLegendre::init(order);
        let mut pw = gl_rule
            .nodes
            .into_iter()
            .zip(gl_rule.weights)
            .collect_vec();
        pw.sort_by(|a, b| a.0.total_cmp(&b.0));
        pw.into_iter().unzip()
    }

    /// Tensor product Gauss-Legendre rule with `order` points per direction
    pub fn gauss_hex(order: usize) -> Self {
        let (xi, w) = Self::gauss_1d(order);
        let mut points = Vec::with_capacity(order.pow(3));
        let mut weights = Vec::with_capacity(order.pow(3));
        for k in 0..order {
            for j in 0..order {
                for i in 0..order {
                    points.push(Vector3::new(xi[i], xi[j], xi[k]));
                    weights.push(w[i] * w[j] * w[k]);
                }
            }
        }
        Quadrature {
            points,
            weights: VectorQ::from_vec(weights),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
