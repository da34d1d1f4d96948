use tracing::{debug, info, warn};

use crate::error::Result;
use crate::interface::PlotLevel;
use crate::prelude::*;
use crate::state::SimulationState;

use super::{failure, FailureReason, SolidSolver, StepOutcome};

/// Norms of the first iteration, convergence is measured against them
struct InitialNorms {
    /// squared residual norm
    R: f64,
    /// energy |ui . R|
    E: f64,
}

impl SolidSolver {
    /// Solve for equilibrium at `state.time`.
    ///
    /// Non-convergence is returned as [`StepOutcome::Failed`] and leaves the
    /// state at the last trial; the caller restores it before retrying.
    pub fn solve_step(&mut self, state: &mut SimulationState) -> Result<StepOutcome> {
        let outcome = self.newton(state);
        if let Ok(StepOutcome::Failed(_)) = outcome {
            self.stats.failed_steps += 1;
        }
        outcome
    }

    fn newton(&mut self, state: &mut SimulationState) -> Result<StepOutcome> {
        let cfg = state.config.newton.clone();
        let neq = state.neq();
        self.Ui = VectorD::zeros(neq);
        self.ui = VectorD::zeros(neq);

        // Bring prescribed values and drivers to the new time
        if let Err(e) = self.update(state, &VectorD::zeros(neq), 0.) {
            return failure(e);
        }
        let mut R = match self.residual(state) {
            Ok(R) => R,
            Err(e) => return failure(e),
        };
        if let Err(e) = self.reform(state) {
            return failure(e);
        }

        let mut reformations = 1;
        let mut since_reform = 0;
        let mut augmentations = 0;
        let mut initial: Option<InitialNorms> = None;

        for iter in 0..cfg.max_iterations {
            self.stats.iterations += 1;

            self.ui = match self.linear.solve(&R) {
                Ok(ui) => ui,
                Err(e) => return failure(e),
            };
            let norms = initial.get_or_insert_with(|| InitialNorms {
                R: R.norm_squared(),
                E: self.ui.dot(&R).abs(),
            });
            let (normRi, normEi) = (norms.R, norms.E);

            let (s, R1) = match self.line_search(state, &R)? {
                Some(accepted) => accepted,
                None => {
                    warn!(iter, "line search found no valid step");
                    return Ok(StepOutcome::Failed(FailureReason::NegativeJacobian));
                }
            };
            self.Ui.axpy(s, &self.ui, 1.);

            let normR1 = R1.norm_squared();
            let normE1 = (self.ui.dot(&R1) * s).abs();
            let normu = s * s * self.ui.norm_squared();
            let normU = self.Ui.norm_squared();
            debug!(
                time = state.time,
                iter,
                s,
                residual = normR1,
                energy = normE1,
                displacement = normu,
                "equilibrium iteration"
            );

            if !normR1.is_finite() {
                warn!(iter, "residual diverged");
                return Ok(StepOutcome::Failed(FailureReason::Diverged));
            }

            let dconv = cfg.dtol <= 0. || normu <= cfg.dtol * cfg.dtol * normU;
            let econv = cfg.etol <= 0. || normE1 <= cfg.etol * normEi;
            let rconv = cfg.rtol <= 0. || normR1 <= cfg.rtol * normRi;
            let converged = (dconv && econv && rconv) || normR1 <= cfg.min_residual;
            R = R1;

            if converged {
                let gap = state
                    .joints
                    .iter()
                    .map(|j| j.gap(&state.bodies).norm())
                    .fold(0., f64::max);
                if gap > cfg.aug_tol && augmentations < cfg.max_augmentations {
                    augmentations += 1;
                    debug!(iter, gap, augmentations, "augmenting joint multipliers");
                    for joint in state.joints.iter_mut() {
                        joint.augment();
                        joint.update(&state.bodies);
                    }
                    R = match self.residual(state) {
                        Ok(R) => R,
                        Err(e) => return failure(e),
                    };
                    initial = None;
                    continue;
                }

                self.commit();
                state.commit();
                self.stats.time_steps += 1;
                info!(
                    time = state.time,
                    iterations = iter + 1,
                    reformations,
                    "step converged"
                );
                if state.config.plot_level == PlotLevel::MajorIterations {
                    if let Some(plot) = state.plot.as_mut() {
                        plot.write(&state.mesh, &state.bodies, state.time)?;
                    }
                }
                return Ok(StepOutcome::Converged {
                    iterations: iter + 1,
                    reformations,
                    augmentations,
                });
            }

            since_reform += 1;
            if since_reform >= cfg.reform_interval {
                if reformations >= cfg.max_reformations {
                    warn!(reformations, "reformation budget exhausted");
                    return Ok(StepOutcome::Failed(FailureReason::MaxReformations));
                }
                if let Err(e) = self.reform(state) {
                    return failure(e);
                }
                reformations += 1;
                since_reform = 0;
            }
        }

        warn!(time = state.time, "maximum iterations reached");
        Ok(StepOutcome::Failed(FailureReason::MaxIterations))
    }
}
