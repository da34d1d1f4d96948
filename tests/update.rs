mod common;

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;

use biofem::bc::{BcTarget, LinearConstraint, PrescribedBc};
use biofem::config::{AnalysisConfig, AnalysisType};
use biofem::error::{Error, Result};
use biofem::interface::{ContactUpdater, PlotLevel, PlotWriter};
use biofem::mesh::{Dof, DofRef, Equation, Mesh, Module};
use biofem::prelude::*;
use biofem::rigid::RigidBody;
use biofem::solver::SolidSolver;
use biofem::state::SimulationState;

use common::*;

fn positions(state: &SimulationState) -> Vec<Vector3> {
    state.mesh.nodes.iter().map(|n| n.rt).collect()
}

#[test]
fn test_free_node_takes_trial_increment() {
    // Node A fixed, node B free with equations 0, 1, 2
    let mesh = Mesh::new(&[Vector3::zeros(), Vector3::new(1., 0., 0.)]);
    let mut state = SimulationState::new(AnalysisConfig::default(), mesh);
    state.bcs.fix(0, &Dof::TRANSLATIONS);
    state.init().unwrap();
    assert_eq!(state.mesh.nodes[1].id[..3], [
        Equation::Active(0),
        Equation::Active(1),
        Equation::Active(2)
    ]);

    let mut solver = SolidSolver::new(&state);
    solver.Ut[0] = 0.25;
    let ui = VectorD::from_vec(vec![0.1, 0., 0.]);
    solver.update(&mut state, &ui, 1.).unwrap();

    assert_relative_eq!(state.mesh.nodes[1].rt, Vector3::new(1.35, 0., 0.), epsilon = 1e-15);
    assert_eq!(state.mesh.nodes[0].rt, Vector3::zeros());

    // Scaled trial on top of the step increment
    solver.Ui[1] = 0.5;
    solver.update(&mut state, &ui, 0.5).unwrap();
    assert_relative_eq!(state.mesh.nodes[1].rt, Vector3::new(1.3, 0.5, 0.), epsilon = 1e-15);
}

#[test]
fn test_fixed_dofs_never_move_and_update_is_idempotent() {
    let mut state = SimulationState::new(
        strict_config(),
        block([2, 1, 1], Vector3::new(2., 1., 1.), rubber()),
    );
    let mesh = &state.mesh;
    state.bcs.fix_node_set(mesh, "x0", &Dof::TRANSLATIONS).unwrap();
    state.init().unwrap();
    let solver = SolidSolver::new(&state);

    let ui = VectorD::from_iterator(state.neq(), (0..state.neq()).map(|i| 0.01 * (i % 5) as f64));
    solver.update(&mut state, &ui, 0.7).unwrap();
    let first = positions(&state);
    let stress = state.mesh.domains[0].elements()[1].points[3].stress;
    solver.update(&mut state, &ui, 0.7).unwrap();
    assert_eq!(positions(&state), first);
    assert_eq!(state.mesh.domains[0].elements()[1].points[3].stress, stress);

    for _ in 0..3 {
        solver.update(&mut state, &(&ui * -2.), 1.).unwrap();
        for &n in state.mesh.node_set("x0").unwrap() {
            let node = &state.mesh.nodes[n];
            assert_eq!(node.rt, node.r0);
        }
    }
}

#[test]
fn test_prescribed_conditions_follow_their_curves() {
    let mesh = Mesh::new(&[Vector3::new(0., 3., 4.), Vector3::new(1., 0., 0.)]);
    let mut state = SimulationState::new(AnalysisConfig::default(), mesh);
    let ramp = state.add_curve(|t: f64| 2. * t);
    state
        .bcs
        .prescribe(PrescribedBc::new(0, BcTarget::Radial, ramp, 0.5));
    state
        .bcs
        .prescribe(PrescribedBc::new(1, BcTarget::Dof(Dof::X), ramp, -1.));
    let mut inactive = PrescribedBc::new(1, BcTarget::Dof(Dof::Z), ramp, 1.);
    inactive.active = false;
    state.bcs.prescribe(inactive);
    state.init().unwrap();
    let solver = SolidSolver::new(&state);

    state.time = 0.5;
    let z = VectorD::zeros(state.neq());
    solver.update(&mut state, &z, 1.).unwrap();
    // g = 0.5 * 2 * 0.5 = 0.5 along (0, 0.6, 0.8)
    assert_relative_eq!(state.mesh.nodes[0].rt, Vector3::new(0., 3.3, 4.4), epsilon = 1e-14);
    assert_relative_eq!(state.mesh.nodes[1].rt.x, 0.);
    assert_relative_eq!(state.mesh.nodes[1].rt.z, 0.);
}

#[test]
fn test_inactive_prescribed_dof_stays_free() {
    let mesh = Mesh::new(&[Vector3::zeros(), Vector3::new(1., 0., 0.)]);
    let mut state = SimulationState::new(AnalysisConfig::default(), mesh);
    let lc = state.add_curve(|t: f64| t);
    state.bcs.fix(0, &Dof::TRANSLATIONS);
    let mut bc = PrescribedBc::new(1, BcTarget::Dof(Dof::X), lc, 1.);
    bc.active = false;
    state.bcs.prescribe(bc);
    state.init().unwrap();
    assert_eq!(state.neq(), 3);
    let x = state.mesh.nodes[1].equation(Dof::X).active().unwrap();

    let solver = SolidSolver::new(&state);
    let ui = VectorD::from_element(state.neq(), 0.2);
    state.time = 0.5;
    solver.update(&mut state, &ui, 1.).unwrap();
    assert_relative_eq!(state.mesh.nodes[1].rt.x, 1. + ui[x]);
}

#[test]
fn test_constraints_on_scalar_fields_rejected() {
    let mut config = AnalysisConfig::default();
    config.module = Module::Poroelastic;
    let mesh = || Mesh::new(&[Vector3::zeros(), Vector3::x()]);

    let mut state = SimulationState::new(config.clone(), mesh());
    state.constraints.add(LinearConstraint::new(
        DofRef::new(0, Dof::X),
        &[(DofRef::new(1, Dof::Pressure), 1.)],
    ));
    assert!(matches!(state.init(), Err(Error::Setup(_))));

    let mut state = SimulationState::new(config, mesh());
    state.constraints.add(LinearConstraint::new(
        DofRef::new(0, Dof::Pressure),
        &[(DofRef::new(1, Dof::X), 1.)],
    ));
    assert!(matches!(state.init(), Err(Error::Setup(_))));
}

#[test]
fn test_linear_constraints_hold_after_update() {
    let mut state = SimulationState::new(
        strict_config(),
        block([2, 1, 1], Vector3::new(2., 1., 1.), rubber()),
    );
    let x = |n: usize, dof: Dof| DofRef::new(n, dof);
    // Chain defined master-first so the evaluation order matters
    state.constraints.add(LinearConstraint::new(
        x(2, Dof::X),
        &[(x(1, Dof::X), 1.5), (x(4, Dof::Y), -0.5)],
    ));
    state
        .constraints
        .add(LinearConstraint::new(x(1, Dof::X), &[(x(0, Dof::X), 0.5)]));
    state.init().unwrap();
    let solver = SolidSolver::new(&state);

    let ui = VectorD::from_iterator(state.neq(), (0..state.neq()).map(|i| 0.02 * (i as f64).sin()));
    solver.update(&mut state, &ui, 1.).unwrap();

    let nodes = &state.mesh.nodes;
    for lc in state.constraints.iter() {
        let master = nodes[lc.master.node].displacement(lc.master.dof);
        let sum: f64 = lc
            .slaves
            .iter()
            .map(|(s, w)| w * nodes[s.node].displacement(s.dof))
            .sum();
        assert_relative_eq!(master, sum, epsilon = 1e-14);
    }
    assert_relative_eq!(state.constraints.max_violation(nodes), 0., epsilon = 1e-14);
}

#[test]
fn test_dynamic_update_without_increment_keeps_velocity() {
    let mut config = AnalysisConfig::default();
    config.analysis = AnalysisType::Dynamic;
    let mut state = SimulationState::new(config, Mesh::new(&[Vector3::new(1., 2., 3.)]));
    state.init().unwrap();
    let solver = SolidSolver::new(&state);

    solver.update(&mut state, &VectorD::zeros(3), 1.).unwrap();
    let node = &state.mesh.nodes[0];
    assert_eq!(node.vt, node.vp);
    assert_eq!(node.at, node.ap);

    // A moving node keeps its velocity and acceleration when nothing changes
    let node = &mut state.mesh.nodes[0];
    node.vp = Vector3::new(1., 0., 0.);
    node.ap = Vector3::new(0., -2., 0.);
    let dt = state.dt;
    let mut solver = SolidSolver::new(&state);
    // Increment matching constant acceleration over the step
    let du = Vector3::new(1., 0., 0.) * dt + Vector3::new(0., -2., 0.) * (0.5 * dt * dt);
    solver.Ui = VectorD::from_column_slice(du.as_slice());
    solver.update(&mut state, &VectorD::zeros(3), 1.).unwrap();
    let node = &state.mesh.nodes[0];
    assert_relative_eq!(node.at, node.ap, epsilon = 1e-10);
    assert_relative_eq!(node.vt, node.vp + node.ap * dt, epsilon = 1e-10);
}

#[test]
fn test_scalar_field_update() {
    let mut config = AnalysisConfig::default();
    config.module = Module::Poroelastic;
    config.step_size = 0.5;
    let mesh = Mesh::new(&[Vector3::zeros(), Vector3::x()]);
    let mut state = SimulationState::new(config, mesh);
    let lc = state.add_curve(|t: f64| t);
    state
        .bcs
        .prescribe(PrescribedBc::new(1, BcTarget::Dof(Dof::Pressure), lc, 10.));
    state.init().unwrap();
    let p0 = state.mesh.nodes[0].equation(Dof::Pressure).active().unwrap();
    let x0 = state.mesh.nodes[0].equation(Dof::X).active().unwrap();
    let mut solver = SolidSolver::new(&state);
    solver.Ut[p0] = 1.;

    let mut ui = VectorD::zeros(state.neq());
    ui[p0] = 2.;
    ui[x0] = 0.1;
    state.time = 0.3;
    solver.update(&mut state, &ui, 0.5).unwrap();

    let nodes = &state.mesh.nodes;
    assert_relative_eq!(nodes[0].pt, 2.);
    assert_relative_eq!(nodes[1].pt, 3.);
    // Backward difference velocity over the step
    assert_relative_eq!(nodes[0].vt.x, 0.05 / 0.5, epsilon = 1e-14);
}

struct CountingContact(Rc<RefCell<usize>>);

impl ContactUpdater for CountingContact {
    fn update(&mut self, _mesh: &Mesh) -> Result<()> {
        *self.0.borrow_mut() += 1;
        Ok(())
    }
}

struct RecordingPlot(Rc<RefCell<Vec<f64>>>);

impl PlotWriter for RecordingPlot {
    fn write(&mut self, _mesh: &Mesh, _bodies: &[RigidBody], time: f64) -> Result<()> {
        self.0.borrow_mut().push(time);
        Ok(())
    }
}

#[test]
fn test_collaborators_run_once_per_update() {
    let contact_calls = Rc::new(RefCell::new(0));
    let plots = Rc::new(RefCell::new(Vec::new()));

    let mut state = SimulationState::new(AnalysisConfig::default(), unit_cube(rubber()));
    state.contact = Some(Box::new(CountingContact(contact_calls.clone())));
    state.plot = Some(Box::new(RecordingPlot(plots.clone())));
    state.init().unwrap();
    let solver = SolidSolver::new(&state);
    let ui = VectorD::zeros(state.neq());

    solver.update(&mut state, &ui, 1.).unwrap();
    solver.update(&mut state, &ui, 1.).unwrap();
    assert_eq!(*contact_calls.borrow(), 2);
    assert!(plots.borrow().is_empty());

    state.config.plot_level = PlotLevel::MinorIterations;
    state.time = 0.25;
    solver.update(&mut state, &ui, 1.).unwrap();
    assert_eq!(*plots.borrow(), vec![0.25]);
}

#[test]
fn test_inverted_element_is_recoverable() {
    let mut state = SimulationState::new(AnalysisConfig::default(), unit_cube(rubber()));
    let mesh = &state.mesh;
    state.bcs.fix_node_set(mesh, "x0", &Dof::TRANSLATIONS).unwrap();
    state.init().unwrap();
    let solver = SolidSolver::new(&state);

    let mut ui = VectorD::zeros(state.neq());
    for &n in state.mesh.node_set("x1").unwrap() {
        let eq = state.mesh.nodes[n].equation(Dof::X).active().unwrap();
        ui[eq] = -2.;
    }
    let err = solver.update(&mut state, &ui, 1.).unwrap_err();
    assert!(matches!(err, Error::NegativeJacobian { domain: 0, element: 0, .. }));
    assert!(err.is_recoverable());

    // A smaller step of the same increment is fine
    solver.update(&mut state, &ui, 0.25).unwrap();
}
