//! Element domains: homogeneous element collections sharing one material.

use rayon::prelude::*;

use crate::assembly::{ElementMatrix, ElementVector};
use crate::element::{
    shape::ElementRule,
    solid::{ElementError, SolidElement},
};
use crate::error::{Error, Result};
use crate::material::StressEvaluator;
use crate::mesh::Node;
use crate::prelude::*;

/// Contribution contract of one physics domain to the global system.
///
/// Element loops run in parallel; every method only reads nodal state.
pub trait Domain: Send + Sync {
    fn name(&self) -> &str;

    fn elements(&self) -> &[SolidElement];

    fn rule(&self) -> &ElementRule;

    /// Reset every material point to the reference state
    fn reset(&mut self, nodes: &[Node]);

    /// Recompute deformation and stress at every material point
    fn update_stresses(&mut self, index: usize, nodes: &[Node]) -> Result<()>;

    /// Element internal force vectors
    fn internal_forces(&self, index: usize, nodes: &[Node]) -> Result<Vec<ElementVector>>;

    /// Element tangent stiffness matrices
    fn stiffness(&self, index: usize, nodes: &[Node]) -> Result<Vec<ElementMatrix>>;

    /// Element mass matrices, empty when the domain is massless
    fn mass(&self, nodes: &[Node]) -> Vec<ElementMatrix>;

    /// Element forces of a uniform body acceleration
    fn body_forces(&self, nodes: &[Node], g: &Vector3) -> Vec<ElementVector>;

    /// Accept material point history at step convergence
    fn commit(&mut self);

    /// Total reference or current volume
    fn volume(&self, nodes: &[Node], current: bool) -> f64;
}

/// Hyperelastic solid domain.
pub struct ElasticSolidDomain {
    name: String,
    rule: ElementRule,
    material: Box<dyn StressEvaluator>,
    elements: Vec<SolidElement>,
}

impl ElasticSolidDomain {
    pub fn new(
        name: &str,
        rule: ElementRule,
        material: Box<dyn StressEvaluator>,
        connectivity: &[Vec<usize>],
    ) -> Result<Self> {
        let nn = rule.num_nodes();
        if let Some(bad) = connectivity.iter().position(|c| c.len() != nn) {
            return Err(Error::Setup(format!(
                "domain '{}': element {} has {} nodes, expected {}",
                name,
                bad,
                connectivity[bad].len(),
                nn
            )));
        }
        let elements = connectivity
            .iter()
            .map(|c| SolidElement::new(c, &rule, material.history_len()))
            .collect();
        Ok(ElasticSolidDomain {
            name: name.to_string(),
            rule,
            material,
            elements,
        })
    }

    pub fn material(&self) -> &dyn StressEvaluator {
        self.material.as_ref()
    }
}

fn element_error(domain: usize, element: usize, e: ElementError) -> Error {
    match e {
        ElementError::Degenerate(d) => Error::NegativeJacobian {
            domain,
            element,
            point: d.point,
            det: d.det,
        },
        ElementError::Material(e) => e,
    }
}

impl Domain for ElasticSolidDomain {
    fn name(&self) -> &str {
        &self.name
    }

    fn elements(&self) -> &[SolidElement] {
        &self.elements
    }

    fn rule(&self) -> &ElementRule {
        &self.rule
    }

    fn reset(&mut self, nodes: &[Node]) {
        let rule = &self.rule;
        self.elements
            .iter_mut()
            .for_each(|el| el.reset(rule, nodes));
    }

    fn update_stresses(&mut self, index: usize, nodes: &[Node]) -> Result<()> {
        let ElasticSolidDomain {
            rule,
            material,
            elements,
            ..
        } = self;
        let rule: &ElementRule = rule;
        let material: &dyn StressEvaluator = material.as_ref();
        elements
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(i, el)| {
                el.update_stresses(rule, nodes, material)
                    .map_err(|e| element_error(index, i, e))
            })
    }

    fn internal_forces(&self, index: usize, nodes: &[Node]) -> Result<Vec<ElementVector>> {
        self.elements
            .par_iter()
            .enumerate()
            .map(|(i, el)| {
                let values = el.internal_forces(&self.rule, nodes).map_err(|d| {
                    element_error(index, i, ElementError::Degenerate(d))
                })?;
                Ok(ElementVector::new(&el.nodes, values))
            })
            .collect()
    }

    fn stiffness(&self, index: usize, nodes: &[Node]) -> Result<Vec<ElementMatrix>> {
        let material = self.material.as_ref();
        self.elements
            .par_iter()
            .enumerate()
            .map(|(i, el)| {
                let values = el
                    .stiffness(&self.rule, nodes, material)
                    .map_err(|e| element_error(index, i, e))?;
                Ok(ElementMatrix::new(&el.nodes, values))
            })
            .collect()
    }

    fn mass(&self, nodes: &[Node]) -> Vec<ElementMatrix> {
        let density = self.material.density();
        if density == 0. {
            return Vec::new();
        }
        self.elements
            .par_iter()
            .map(|el| ElementMatrix::new(&el.nodes, el.mass(&self.rule, nodes, density)))
            .collect()
    }

    fn body_forces(&self, nodes: &[Node], g: &Vector3) -> Vec<ElementVector> {
        let density = self.material.density();
        if density == 0. || g.norm() == 0. {
            return Vec::new();
        }
        self.elements
            .par_iter()
            .map(|el| {
                ElementVector::new(&el.nodes, el.body_force(&self.rule, nodes, density, g))
            })
            .collect()
    }

    fn commit(&mut self) {
        for mp in self.elements.iter_mut().flat_map(|el| el.points.iter_mut()) {
            mp.commit();
        }
    }

    fn volume(&self, nodes: &[Node], current: bool) -> f64 {
        self.elements
            .par_iter()
            .map(|el| el.volume(&self.rule, nodes, current))
            .sum()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use approx::assert_relative_eq;

    use crate::material::NeoHookean;

    fn two_cubes() -> (Vec<Node>, ElasticSolidDomain) {
        // 2 x 1 x 1 block of hex8 elements, lexicographic node grid 3 x 2 x 2
        let mut nodes = Vec::new();
        for k in 0..2 {
            for j in 0..2 {
                for i in 0..3 {
                    nodes.push(Node::new(Vector3::new(i as f64, j as f64, k as f64)));
                }
            }
        }
        let id = |i: usize, j: usize, k: usize| i + 3 * (j + 2 * k);
        let conn = (0..2)
            .map(|e| {
                let mut c = Vec::new();
                for k in 0..2 {
                    for j in 0..2 {
                        for i in 0..2 {
                            c.push(id(e + i, j, k));
                        }
                    }
                }
                c
            })
            .collect_vec();
        let mat = NeoHookean::new(10., 0.25).unwrap().with_density(1.).unwrap();
        let mut dom =
            ElasticSolidDomain::new("block", ElementRule::hex8(), Box::new(mat), &conn).unwrap();
        dom.reset(&nodes);
        (nodes, dom)
    }

    #[test]
    fn test_bad_connectivity() {
        let mat = NeoHookean::new(10., 0.25).unwrap();
        let r = ElasticSolidDomain::new("d", ElementRule::hex8(), Box::new(mat), &[vec![0, 1]]);
        assert!(matches!(r, Err(Error::Setup(_))));
    }

    #[test]
    fn test_domain_contract() {
        let (mut nodes, mut dom) = two_cubes();
        assert_relative_eq!(dom.volume(&nodes, false), 2., epsilon = 1e-12);
        for n in nodes.iter_mut() {
            n.rt.z *= 1.05;
        }
        dom.update_stresses(0, &nodes).unwrap();
        assert_relative_eq!(dom.volume(&nodes, true), 2.1, epsilon = 1e-12);
        assert_eq!(dom.internal_forces(0, &nodes).unwrap().len(), 2);
        assert_eq!(dom.stiffness(0, &nodes).unwrap()[1].values.nrows(), 24);
        assert_eq!(dom.mass(&nodes).len(), 2);
        assert!(dom.body_forces(&nodes, &Vector3::zeros()).is_empty());
    }

    #[test]
    fn test_negative_jacobian_reports_location() {
        let (mut nodes, mut dom) = two_cubes();
        // Push the middle top nodes of the second element past its right face
        for n in nodes.iter_mut().filter(|n| n.r0.x == 2.) {
            n.rt.x = 0.5;
        }
        match dom.update_stresses(3, &nodes) {
            Err(Error::NegativeJacobian { domain, element, .. }) => {
                assert_eq!(domain, 3);
                assert_eq!(element, 1);
            }
            _ => panic!("expected negative jacobian"),
        }
    }
}
