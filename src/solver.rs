//! Nonlinear solid solver: state update, Newton iteration, line search and
//! time stepping.

#![allow(non_snake_case)]

mod line_search;
mod newton;
mod stepper;
mod update;

pub use stepper::TimeStepper;

use tracing::warn;

use crate::error::{Error, Result};
use crate::linsolve::{DirectSolver, LinearSolver};
use crate::prelude::*;
use crate::state::SimulationState;

/// Why a Newton solve gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    MaxIterations,
    MaxReformations,
    /// Residual is no longer finite
    Diverged,
    /// No positive line search step keeps every element valid
    NegativeJacobian,
    SingularMatrix,
}

/// Result of one Newton solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Converged {
        iterations: usize,
        reformations: usize,
        augmentations: usize,
    },
    Failed(FailureReason),
}

impl StepOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, StepOutcome::Converged { .. })
    }
}

/// Running totals over the analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    /// converged time steps
    pub time_steps: usize,
    /// equilibrium iterations, failed steps included
    pub iterations: usize,
    /// residual evaluations
    pub rhs_evaluations: usize,
    /// stiffness reformations
    pub reformations: usize,
    /// Newton solves that did not converge
    pub failed_steps: usize,
}

/// Solution vectors of the global system.
///
/// Nodal values are `reference + Ut + Ui + s * ui` for every active equation.
pub struct SolidSolver {
    /// converged increment up to the start of the step
    pub Ut: VectorD,
    /// accumulated increment within the step
    pub Ui: VectorD,
    /// trial increment of the current iteration
    pub ui: VectorD,
    linear: Box<dyn LinearSolver>,
    stats: SolverStats,
}

impl SolidSolver {
    /// Solver sized for an initialized state
    pub fn new(state: &SimulationState) -> Self {
        Self::with_linear_solver(state, Box::new(DirectSolver::new()))
    }

    pub fn with_linear_solver(state: &SimulationState, linear: Box<dyn LinearSolver>) -> Self {
        let neq = state.neq();
        SolidSolver {
            Ut: VectorD::zeros(neq),
            Ui: VectorD::zeros(neq),
            ui: VectorD::zeros(neq),
            linear,
            stats: SolverStats::default(),
        }
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    /// Drop the increment of a rejected step
    pub fn restore(&mut self) {
        self.Ui.fill(0.);
        self.ui.fill(0.);
    }

    /// Accept the step increment
    fn commit(&mut self) {
        self.Ut += &self.Ui;
        self.Ui.fill(0.);
        self.ui.fill(0.);
    }

    /// Residual at the current state
    fn residual(&mut self, state: &SimulationState) -> Result<VectorD> {
        self.stats.rhs_evaluations += 1;
        crate::assembly::residual(state)
    }

    /// Assemble and factor the tangent at the current state
    fn reform(&mut self, state: &SimulationState) -> Result<()> {
        self.stats.reformations += 1;
        let K = crate::assembly::stiffness(state)?;
        self.linear.factor(&K)
    }
}

/// Turn recoverable errors into a failed step, pass the rest on
fn failure(e: Error) -> Result<StepOutcome> {
    let reason = match e {
        Error::NegativeJacobian { .. } => FailureReason::NegativeJacobian,
        Error::SingularMatrix => FailureReason::SingularMatrix,
        e => return Err(e),
    };
    warn!(error = %e, "newton solve failed");
    Ok(StepOutcome::Failed(reason))
}
