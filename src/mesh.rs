//! Nodes, domains and named node sets.

mod dof;
mod node;

pub use dof::{Dof, DofRef, Equation, Module, NODE_DOFS};
pub use node::Node;

use std::collections::HashMap;

use rayon::prelude::*;

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::prelude::*;

/// Mesh owns the nodes and the element domains built on them.
#[derive(Default)]
pub struct Mesh {
    pub nodes: Vec<Node>,
    pub domains: Vec<Box<dyn Domain>>,
    node_sets: HashMap<String, Vec<usize>>,
}

impl Mesh {
    pub fn new(positions: &[Vector3]) -> Self {
        Mesh {
            nodes: positions.iter().map(|&r| Node::new(r)).collect(),
            domains: Vec::new(),
            node_sets: HashMap::new(),
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn add_domain(&mut self, domain: Box<dyn Domain>) -> Result<usize> {
        for el in domain.elements() {
            if let Some(&n) = el.nodes.iter().find(|&&n| n >= self.nodes.len()) {
                return Err(Error::InvalidNode(n));
            }
        }
        self.domains.push(domain);
        Ok(self.domains.len() - 1)
    }

    pub fn add_node_set(&mut self, name: &str, nodes: &[usize]) -> Result<()> {
        if let Some(&n) = nodes.iter().find(|&&n| n >= self.nodes.len()) {
            return Err(Error::InvalidNode(n));
        }
        self.node_sets.insert(name.to_string(), nodes.to_vec());
        Ok(())
    }

    pub fn node_set(&self, name: &str) -> Result<&[usize]> {
        self.node_sets
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| Error::InvalidNodeSet(name.to_string()))
    }

    pub fn check_node(&self, node: usize) -> Result<()> {
        if node < self.nodes.len() {
            Ok(())
        } else {
            Err(Error::InvalidNode(node))
        }
    }

    /// Reset every domain's material points
    pub fn reset(&mut self) {
        let Mesh { nodes, domains, .. } = self;
        for dom in domains.iter_mut() {
            dom.reset(nodes);
        }
    }

    /// Recompute stresses in every domain from the current nodal positions
    pub fn update_stresses(&mut self) -> Result<()> {
        let Mesh { nodes, domains, .. } = self;
        let nodes: &[Node] = nodes;
        domains
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(i, dom)| dom.update_stresses(i, nodes))
    }

    /// Accept material point history in every domain
    pub fn commit(&mut self) {
        for node in self.nodes.iter_mut() {
            node.commit();
        }
        for dom in self.domains.iter_mut() {
            dom.commit();
        }
    }

    //--------------------------------------------------------------------------
    // Geometry
    //--------------------------------------------------------------------------

    /// Reference bounding box as (min, max) corners
    pub fn bounding_box(&self) -> Option<(Vector3, Vector3)> {
        let first = self.nodes.first()?.r0;
        Some(self.nodes.iter().fold((first, first), |(lo, hi), n| {
            (lo.inf(&n.r0), hi.sup(&n.r0))
        }))
    }

    /// Translate the reference configuration so the bounding box is centered at the origin
    pub fn center(&mut self) {
        if let Some((lo, hi)) = self.bounding_box() {
            let c = (lo + hi) * 0.5;
            for node in self.nodes.iter_mut() {
                node.r0 -= c;
                node.rt -= c;
                node.rp -= c;
            }
        }
    }

    /// Total volume over all domains
    pub fn volume(&self, current: bool) -> f64 {
        self.domains
            .iter()
            .map(|d| d.volume(&self.nodes, current))
            .sum()
    }
}
