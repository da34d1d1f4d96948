mod common;

use approx::assert_relative_eq;

use biofem::bc::{BcTarget, NodalLoad};
use biofem::config::{AnalysisConfig, AnalysisType};
use biofem::curve::LoadCurve;
use biofem::error::Error;
use biofem::mesh::Dof;
use biofem::prelude::*;
use biofem::solver::{SolidSolver, TimeStepper};
use biofem::state::SimulationState;

use common::*;

/// Unit cube on symmetry planes with its x1 face pulled to `stretch`
fn uniaxial(config: AnalysisConfig, stretch: f64) -> SimulationState {
    let mut state = SimulationState::new(config, unit_cube(rubber()));
    let lc = state.add_curve(LoadCurve::ramp(1., stretch - 1.));
    symmetry(&mut state);
    let mesh = &state.mesh;
    state
        .bcs
        .prescribe_node_set(mesh, "x1", BcTarget::Dof(Dof::X), lc, 1.)
        .unwrap();
    state.init().unwrap();
    state
}

fn run(state: &mut SimulationState) -> (SolidSolver, TimeStepper) {
    let mut solver = SolidSolver::new(state);
    let mut stepper = TimeStepper::new(state);
    stepper.run(&mut solver, state).unwrap();
    (solver, stepper)
}

fn corner(state: &SimulationState) -> Vector3 {
    // Node (1, 1, 1) of the unit cube
    state.mesh.nodes[7].rt
}

#[test]
fn test_uniaxial_stretch_is_homogeneous() {
    let mut state = uniaxial(strict_config(), 1.2);
    let (solver, stepper) = run(&mut state);

    assert_eq!(stepper.history().len(), 1);
    assert_eq!(solver.stats().time_steps, 1);
    let c = corner(&state);
    assert_relative_eq!(c.x, 1.2, epsilon = 1e-12);
    assert!(c.y < 1.);
    assert_relative_eq!(c.y, c.z, epsilon = 1e-10);

    for el in state.mesh.domains[0].elements() {
        for mp in el.points.iter() {
            assert!(mp.stress[(0, 0)] > 0.);
            assert_relative_eq!(mp.stress[(1, 1)], 0., epsilon = 1e-6);
            assert_relative_eq!(mp.stress[(2, 2)], 0., epsilon = 1e-6);
            assert_relative_eq!(mp.stress[(0, 1)], 0., epsilon = 1e-6);
        }
    }
}

#[test]
fn test_nodal_loads_balance_stress() {
    let mut config = strict_config();
    config.time_steps = 2;
    config.step_size = 0.5;
    config.stepper.auto = false;
    let mut state = SimulationState::new(config, unit_cube(rubber()));
    let lc = state.add_curve(LoadCurve::ramp(1., 1.));
    symmetry(&mut state);
    let p = 5.;
    let x1 = state.mesh.node_set("x1").unwrap().to_vec();
    for node in x1 {
        state.bcs.load(NodalLoad {
            node,
            dof: Dof::X,
            curve: lc,
            scale: p / 4.,
        });
    }
    state.init().unwrap();
    let (solver, stepper) = run(&mut state);

    assert_eq!(stepper.history().len(), 2);
    assert_eq!(solver.stats().time_steps, 2);
    let c = corner(&state);
    assert!(c.x > 1.);
    let area = c.y * c.z;
    for mp in state.mesh.domains[0].elements()[0].points.iter() {
        assert_relative_eq!(mp.stress[(0, 0)] * area, p, epsilon = 1e-6);
    }
}

#[test]
fn test_stepper_reaches_end_time() {
    let mut config = strict_config();
    config.time_steps = 4;
    config.step_size = 0.25;
    config.stepper.auto = false;
    let mut state = uniaxial(config, 1.3);
    let (solver, stepper) = run(&mut state);

    let times = stepper.history().iter().map(|&(t, _)| t).collect_vec();
    assert_eq!(times.len(), 4);
    for (t, expected) in times.iter().zip([0.25, 0.5, 0.75, 1.]) {
        assert_relative_eq!(*t, expected, epsilon = 1e-12);
    }
    let stats = solver.stats();
    assert_eq!(stats.time_steps, 4);
    assert_eq!(stats.failed_steps, 0);
    assert!(stats.iterations >= 4);
    assert!(stats.rhs_evaluations > stats.iterations);
    assert_relative_eq!(corner(&state).x, 1.3, epsilon = 1e-12);
}

#[test]
fn test_automatic_steps_do_not_overshoot() {
    let mut config = strict_config();
    config.time_steps = 10;
    config.step_size = 0.1;
    config.stepper.dt_max = Some(0.35);
    let mut state = uniaxial(config, 1.1);
    let (_, stepper) = run(&mut state);

    assert!(stepper.history().len() < 10);
    assert_relative_eq!(state.time, 1., epsilon = 1e-12);
    let dts = stepper
        .history()
        .iter()
        .scan(0., |t, &(time, _)| {
            let dt = time - *t;
            *t = time;
            Some(dt)
        })
        .collect_vec();
    assert!(dts.iter().all(|&dt| dt <= 0.35 + 1e-12));
}

#[test]
fn test_failed_steps_are_cut_then_abandoned() {
    let mut config = strict_config();
    config.newton.max_iterations = 1;
    config.stepper.max_retries = 2;
    let mut state = uniaxial(config, 1.5);
    let mut solver = SolidSolver::new(&state);
    let mut stepper = TimeStepper::new(&state);

    let err = stepper.step(&mut solver, &mut state).unwrap_err();
    assert!(matches!(err, Error::StepFailed { retries: 3, .. }));
    assert_eq!(solver.stats().failed_steps, 3);
    assert_relative_eq!(stepper.dt(), 0.25);
    assert_eq!(state.time, 0.);
    for node in state.mesh.nodes.iter() {
        assert_eq!(node.rt, node.r0);
    }
    assert_eq!(solver.Ui, VectorD::zeros(state.neq()));
}

#[test]
fn test_modified_newton_matches_full_newton() {
    let mut config = strict_config();
    config.time_steps = 2;
    config.step_size = 0.5;
    config.stepper.auto = false;
    config.newton.max_iterations = 60;

    let mut full = uniaxial(config.clone(), 1.25);
    let (full_solver, _) = run(&mut full);

    config.newton.reform_interval = 3;
    let mut modified = uniaxial(config, 1.25);
    let (solver, _) = run(&mut modified);

    let stats = solver.stats();
    assert!(stats.reformations < stats.iterations);
    assert!(stats.iterations >= full_solver.stats().iterations);
    for (a, b) in full.mesh.nodes.iter().zip(modified.mesh.nodes.iter()) {
        assert_relative_eq!(a.rt, b.rt, epsilon = 1e-7);
    }
}

#[test]
fn test_free_fall_follows_trapezoidal_rule() {
    let mut config = strict_config();
    config.analysis = AnalysisType::Dynamic;
    config.time_steps = 3;
    config.step_size = 0.1;
    config.stepper.auto = false;
    config.gravity = Vector3::new(0., 0., -9.81);
    let material = rubber().with_density(2.).unwrap();
    let mut state = SimulationState::new(config, unit_cube(material));
    state.init().unwrap();
    let (_, stepper) = run(&mut state);
    assert_eq!(stepper.history().len(), 3);

    // Starting from rest with zero acceleration
    let (g, dt) = (-9.81, 0.1);
    let (mut u, mut v, mut a) = (0., 0., 0.);
    for _ in 0..3 {
        u += dt * v + 0.25 * dt * dt * (a + g);
        v += 0.5 * dt * (a + g);
        a = g;
    }
    for node in state.mesh.nodes.iter() {
        assert_relative_eq!(node.rt - node.r0, Vector3::new(0., 0., u), epsilon = 1e-9);
        assert_relative_eq!(node.vt, Vector3::new(0., 0., v), epsilon = 1e-9);
        assert_relative_eq!(node.at, Vector3::new(0., 0., a), epsilon = 1e-9);
    }
}
