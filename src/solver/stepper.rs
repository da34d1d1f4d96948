use tracing::{error, info, warn};

use crate::config::StepperConfig;
use crate::error::{Error, Result};
use crate::interface::PlotLevel;
use crate::state::SimulationState;

use super::{SolidSolver, StepOutcome};

/// Advances time from step to step, cutting the step size on failure.
pub struct TimeStepper {
    config: StepperConfig,
    end_time: f64,
    dt: f64,
    retries: usize,
    /// (time, iterations) of every converged step
    history: Vec<(f64, usize)>,
}

impl TimeStepper {
    pub fn new(state: &SimulationState) -> Self {
        TimeStepper {
            config: state.config.stepper.clone(),
            end_time: state.time + state.config.end_time(),
            dt: state.config.step_size,
            retries: 0,
            history: Vec::new(),
        }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn history(&self) -> &[(f64, usize)] {
        &self.history
    }

    /// Run steps until the end time
    pub fn run(&mut self, solver: &mut SolidSolver, state: &mut SimulationState) -> Result<()> {
        if state.config.plot_level != PlotLevel::Never {
            if let Some(plot) = state.plot.as_mut() {
                plot.write(&state.mesh, &state.bodies, state.time)?;
            }
        }
        while self.end_time - state.time > 1e-9 * self.end_time.abs().max(1.) {
            self.step(solver, state)?;
        }
        if state.config.plot_level == PlotLevel::Final {
            if let Some(plot) = state.plot.as_mut() {
                plot.write(&state.mesh, &state.bodies, state.time)?;
            }
        }
        info!(stats = ?solver.stats(), "analysis finished");
        Ok(())
    }

    /// Advance by one step, retrying with smaller steps until it converges
    pub fn step(&mut self, solver: &mut SolidSolver, state: &mut SimulationState) -> Result<()> {
        let t_prev = state.time;
        loop {
            let dt = self.dt.min(self.end_time - t_prev);
            state.dt = dt;
            state.time = t_prev + dt;

            match solver.solve_step(state)? {
                StepOutcome::Converged { iterations, .. } => {
                    self.retries = 0;
                    self.history.push((state.time, iterations));
                    if self.config.auto {
                        self.grow(iterations);
                    }
                    return Ok(());
                }
                StepOutcome::Failed(reason) => {
                    state.restore();
                    solver.restore();
                    state.time = t_prev;
                    state.dt = dt;
                    self.retries += 1;
                    let cut = (dt * 0.5).max(self.config.dt_min);
                    if self.retries > self.config.max_retries || cut >= dt {
                        error!(time = t_prev + dt, retries = self.retries, ?reason, "step failed");
                        return Err(Error::StepFailed {
                            time: t_prev + dt,
                            retries: self.retries,
                        });
                    }
                    warn!(time = t_prev + dt, ?reason, dt = cut, "cutting step");
                    self.dt = cut;
                }
            }
        }
    }

    /// Scale the step toward the target iteration count
    fn grow(&mut self, iterations: usize) {
        let factor = (self.config.opt_iterations as f64 / iterations.max(1) as f64).sqrt();
        let mut dt = (self.dt * factor).max(self.config.dt_min);
        if let Some(dt_max) = self.config.dt_max {
            dt = dt.min(dt_max);
        }
        self.dt = dt;
    }
}
