//! Element-to-global assembly of the residual vector and tangent matrix.
//!
//! Local element DOFs are routed to global equations through [`DofMap`]:
//! - active DOFs map to their own equation,
//! - fixed and prescribed DOFs are eliminated,
//! - linear constraint masters are redistributed onto their slaves,
//! - rigid-attached DOFs are transferred to the six components of their body.

#![allow(non_snake_case)]

use rayon::prelude::*;
use sprs::{CsMat, TriMat};

use crate::bc::LinearConstraintSet;
use crate::error::Result;
use crate::mesh::{Dof, DofRef, Equation, Node};
use crate::prelude::*;
use crate::rigid::RigidBody;
use crate::state::SimulationState;

//------------------------------------------------------------------------------
// Element buffers
//------------------------------------------------------------------------------

/// Element vector over the translational DOFs of its nodes.
#[derive(Debug, Clone)]
pub struct ElementVector {
    pub nodes: Vec<usize>,
    pub values: VectorD,
}

impl ElementVector {
    pub fn new(nodes: &[usize], values: VectorD) -> Self {
        debug_assert_eq!(values.len(), 3 * nodes.len());
        ElementVector {
            nodes: nodes.to_vec(),
            values,
        }
    }
}

/// Element matrix over the translational DOFs of its nodes.
#[derive(Debug, Clone)]
pub struct ElementMatrix {
    pub nodes: Vec<usize>,
    pub values: MatrixD,
}

impl ElementMatrix {
    pub fn new(nodes: &[usize], values: MatrixD) -> Self {
        debug_assert_eq!(values.nrows(), 3 * nodes.len());
        ElementMatrix {
            nodes: nodes.to_vec(),
            values,
        }
    }
}

//------------------------------------------------------------------------------
// DOF map
//------------------------------------------------------------------------------

/// Weighted global equations receiving one nodal DOF
pub type Targets = Vec<(usize, f64)>;

/// Read-only view of the equation tables used while scattering.
pub struct DofMap<'a> {
    nodes: &'a [Node],
    bodies: &'a [RigidBody],
    constraints: &'a LinearConstraintSet,
}

impl<'a> DofMap<'a> {
    pub fn new(state: &'a SimulationState) -> Self {
        DofMap {
            nodes: &state.mesh.nodes,
            bodies: &state.bodies,
            constraints: &state.constraints,
        }
    }

    pub fn targets(&self, dof: DofRef) -> Targets {
        let mut targets = Targets::new();
        self.collect(dof, 1., &mut targets);
        targets
    }

    fn collect(&self, dof: DofRef, w: f64, out: &mut Targets) {
        let node = &self.nodes[dof.node];
        match node.equation(dof.dof) {
            Equation::Active(eq) => out.push((eq, w)),
            Equation::Fixed | Equation::Prescribed(_) => {}
            // Chains terminate since cycles are rejected at setup
            Equation::Constrained(lc) => {
                for &(slave, ws) in self.constraints.get(lc).slaves.iter() {
                    self.collect(slave, w * ws, out);
                }
            }
            Equation::Rigid(b) => {
                let rb = &self.bodies[b];
                match dof.dof.component() {
                    Some(c) if dof.dof.is_translation() => {
                        let G = rb.transfer_at(&node.rt);
                        for (k, lm) in rb.lm.iter().enumerate() {
                            if let Some(eq) = *lm {
                                if G[(c, k)] != 0. {
                                    out.push((eq, w * G[(c, k)]));
                                }
                            }
                        }
                    }
                    Some(c) => {
                        if let Some(eq) = rb.lm[3 + c] {
                            out.push((eq, w));
                        }
                    }
                    None => {}
                }
            }
        }
    }

    /// Targets of the three translations of every element node
    pub fn element_targets(&self, nodes: &[usize]) -> Vec<Targets> {
        nodes
            .iter()
            .flat_map(|&n| Dof::TRANSLATIONS.map(|dof| self.targets(DofRef::new(n, dof))))
            .collect()
    }

    /// R += scale * fe
    pub fn scatter_vector(&self, R: &mut VectorD, fe: &ElementVector, scale: f64) {
        for (targets, &v) in izip!(self.element_targets(&fe.nodes), fe.values.iter()) {
            for (eq, w) in targets {
                R[eq] += scale * w * v;
            }
        }
    }

    /// R += value on one nodal DOF
    pub fn scatter_dof(&self, R: &mut VectorD, dof: DofRef, value: f64) {
        for (eq, w) in self.targets(dof) {
            R[eq] += w * value;
        }
    }

    /// Triplets of scale * ke
    pub fn matrix_triplets(&self, ke: &ElementMatrix, scale: f64) -> Vec<(usize, usize, f64)> {
        let targets = self.element_targets(&ke.nodes);
        let mut triplets = Vec::with_capacity(ke.values.len());
        for (i, ti) in targets.iter().enumerate() {
            for (j, tj) in targets.iter().enumerate() {
                let k = ke.values[(i, j)];
                if k == 0. {
                    continue;
                }
                for &(ei, wi) in ti {
                    for &(ej, wj) in tj {
                        triplets.push((ei, ej, scale * wi * wj * k));
                    }
                }
            }
        }
        triplets
    }
}

/// R[lm] += f on the free components of a rigid body
fn scatter_body(R: &mut VectorD, rb: &RigidBody, f: &Vector6) {
    for (k, lm) in rb.lm.iter().enumerate() {
        if let Some(eq) = *lm {
            R[eq] += f[k];
        }
    }
}

/// Element inertial forces M * a from the current nodal accelerations
fn inertial_force(me: &ElementMatrix, nodes: &[Node]) -> ElementVector {
    let a = VectorD::from_iterator(
        3 * me.nodes.len(),
        me.nodes.iter().flat_map(|&n| nodes[n].at.iter().copied().collect_vec()),
    );
    ElementVector::new(&me.nodes, &me.values * a)
}

/// Newmark factor of the mass matrix in the tangent
fn mass_factor(dt: f64) -> f64 {
    4. / (dt * dt)
}

//------------------------------------------------------------------------------
// Global system
//------------------------------------------------------------------------------

/// Out-of-balance force `R = F_ext - F_int - M a` at the current state.
///
/// Degenerate elements surface as recoverable errors.
pub fn residual(state: &SimulationState) -> Result<VectorD> {
    let map = DofMap::new(state);
    let nodes = &state.mesh.nodes;
    let g = state.config.gravity;
    let mut R = VectorD::zeros(state.neq());

    for (i, dom) in state.mesh.domains.iter().enumerate() {
        for fe in dom.internal_forces(i, nodes)? {
            map.scatter_vector(&mut R, &fe, -1.);
        }
        for fe in dom.body_forces(nodes, &g) {
            map.scatter_vector(&mut R, &fe, 1.);
        }
        if state.config.is_dynamic() {
            let inertia = dom
                .mass(nodes)
                .par_iter()
                .map(|me| inertial_force(me, nodes))
                .collect::<Vec<_>>();
            for fe in inertia.iter() {
                map.scatter_vector(&mut R, fe, -1.);
            }
        }
    }

    for load in state.bcs.loads.iter() {
        let value = load.scale * state.curve_value(load.curve);
        map.scatter_dof(&mut R, DofRef::new(load.node, load.dof), value);
    }

    for joint in state.joints.iter() {
        let (fa, fb) = joint.forces(&state.bodies);
        scatter_body(&mut R, &state.bodies[joint.body_a], &fa);
        scatter_body(&mut R, &state.bodies[joint.body_b], &fb);
    }

    Ok(R)
}

/// Tangent stiffness at the current state in CSR form.
///
/// Equations that receive no contribution at all (e.g. scalar fields without a
/// physics domain) get a unit diagonal so the system stays solvable.
pub fn stiffness(state: &SimulationState) -> Result<CsMat<f64>> {
    let map = DofMap::new(state);
    let nodes = &state.mesh.nodes;
    let neq = state.neq();

    let mut blocks: Vec<(ElementMatrix, f64)> = Vec::new();
    for (i, dom) in state.mesh.domains.iter().enumerate() {
        blocks.extend(dom.stiffness(i, nodes)?.into_iter().map(|ke| (ke, 1.)));
        if state.config.is_dynamic() {
            let c = mass_factor(state.dt);
            blocks.extend(dom.mass(nodes).into_iter().map(|me| (me, c)));
        }
    }

    // Each element produces its own triplet list, merged serially below
    let local_triplets: Vec<Vec<(usize, usize, f64)>> = blocks
        .par_iter()
        .map(|(ke, scale)| map.matrix_triplets(ke, *scale))
        .collect();

    let mut triplets = TriMat::new((neq, neq));
    let mut touched = vec![false; neq];
    for (i, j, v) in local_triplets.into_iter().flatten() {
        touched[i] = true;
        triplets.add_triplet(i, j, v);
    }

    for joint in state.joints.iter() {
        let (Ga, Gb) = joint.gradients(&state.bodies);
        let bodies = [
            (&state.bodies[joint.body_a], Ga),
            (&state.bodies[joint.body_b], Gb),
        ];
        for (rb_i, Gi) in bodies.iter() {
            for (rb_j, Gj) in bodies.iter() {
                let k: Matrix6 = Gi.transpose() * Gj * joint.eps;
                for (a, lm_a) in rb_i.lm.iter().enumerate() {
                    for (b, lm_b) in rb_j.lm.iter().enumerate() {
                        if let (Some(ea), Some(eb)) = (*lm_a, *lm_b) {
                            touched[ea] = true;
                            triplets.add_triplet(ea, eb, k[(a, b)]);
                        }
                    }
                }
            }
        }
    }

    for eq in (0..neq).filter(|&eq| !touched[eq]) {
        triplets.add_triplet(eq, eq, 1.);
    }

    Ok(triplets.to_csr())
}

#[cfg(test)]
mod tests {

    use super::*;

    use approx::assert_relative_eq;

    use crate::bc::LinearConstraint;
    use crate::config::AnalysisConfig;
    use crate::mesh::Mesh;

    fn state(n: usize) -> SimulationState {
        let mesh = Mesh::new(&(0..n).map(|i| Vector3::new(i as f64, 0., 0.)).collect_vec());
        SimulationState::new(AnalysisConfig::default(), mesh)
    }

    #[test]
    fn test_active_and_eliminated() {
        let mut st = state(2);
        st.bcs.fix(0, &Dof::TRANSLATIONS);
        st.init().unwrap();
        let map = DofMap::new(&st);
        assert!(map.targets(DofRef::new(0, Dof::X)).is_empty());
        assert_eq!(map.targets(DofRef::new(1, Dof::Y)), vec![(1, 1.)]);

        let mut R = VectorD::zeros(st.neq());
        let fe = ElementVector::new(&[0, 1], VectorD::from_vec(vec![1., 2., 3., 4., 5., 6.]));
        map.scatter_vector(&mut R, &fe, -1.);
        assert_relative_eq!(R, VectorD::from_vec(vec![-4., -5., -6.]));
    }

    #[test]
    fn test_constrained_master_routed_to_slaves() {
        let mut st = state(3);
        st.constraints.add(LinearConstraint::new(
            DofRef::new(0, Dof::X),
            &[(DofRef::new(1, Dof::X), 0.5), (DofRef::new(2, Dof::X), 2.)],
        ));
        st.init().unwrap();
        let map = DofMap::new(&st);
        let (e1, e2) = (
            st.mesh.nodes[1].equation(Dof::X).active().unwrap(),
            st.mesh.nodes[2].equation(Dof::X).active().unwrap(),
        );
        assert_eq!(map.targets(DofRef::new(0, Dof::X)), vec![(e1, 0.5), (e2, 2.)]);
    }

    #[test]
    fn test_rigid_transfer() {
        let mut st = state(2);
        st.add_rigid_body(RigidBody::new(Vector3::zeros()));
        st.attach(0, &[1]).unwrap();
        st.init().unwrap();
        let lm = st.bodies[0].lm.map(|e| e.unwrap());
        let map = DofMap::new(&st);
        // Node at x = 1: its y motion comes from body y and rotation about z
        assert_eq!(
            map.targets(DofRef::new(1, Dof::Y)),
            vec![(lm[1], 1.), (lm[5], 1.)]
        );

        // A unit y force on the node is a force plus a moment about z
        let mut R = VectorD::zeros(st.neq());
        map.scatter_dof(&mut R, DofRef::new(1, Dof::Y), 1.);
        assert_relative_eq!(R[lm[1]], 1.);
        assert_relative_eq!(R[lm[5]], 1.);
    }

    #[test]
    fn test_stiffness_fills_untouched_equations() {
        let mut st = state(1);
        st.init().unwrap();
        let K = stiffness(&st).unwrap();
        assert_eq!(K.nnz(), 3);
        assert_eq!(K.get(2, 2), Some(&1.));
    }

    #[test]
    fn test_joint_contribution_is_symmetric() {
        let mut st = state(0);
        st.add_rigid_body(RigidBody::new(Vector3::new(-1., 0., 0.)));
        st.add_rigid_body(RigidBody::new(Vector3::new(1., 0., 0.)));
        let joint = crate::rigid::RigidJoint::new(&st.bodies, 0, 1, Vector3::zeros(), 5.).unwrap();
        st.add_joint(joint);
        st.init().unwrap();
        let K = crate::linsolve::to_dense(&stiffness(&st).unwrap());
        assert_relative_eq!(K.clone(), K.transpose(), epsilon = 1e-12);
        assert_relative_eq!(K[(0, 0)], 5.);
        assert_relative_eq!(K[(0, 6)], -5.);
    }
}
