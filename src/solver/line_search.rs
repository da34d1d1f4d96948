use tracing::{trace, warn};

use crate::error::Result;
use crate::prelude::*;
use crate::state::SimulationState;

use super::SolidSolver;

impl SolidSolver {
    /// Energy line search along `ui` from the residual `R0` at `s = 0`.
    ///
    /// Secant iterations drive `r(s) = ui . R(s)` toward zero until
    /// `|r(s)| <= lstol |r(0)|`. A trial that inverts an element halves `s`.
    /// Returns the accepted step with its residual, or `None` when every step
    /// down to `ls_min` inverts an element.
    pub(super) fn line_search(
        &mut self,
        state: &mut SimulationState,
        R0: &VectorD,
    ) -> Result<Option<(f64, VectorD)>> {
        let cfg = &state.config.newton;
        let (lstol, ls_min, max_searches) = (cfg.lstol, cfg.ls_min, cfg.ls_max_iterations);
        let r0 = self.ui.dot(R0);

        let mut s = 1.;
        let mut searches = 0;
        loop {
            let R1 = match self.trial(state, s) {
                Ok(R1) => R1,
                Err(e) if e.is_recoverable() => {
                    s *= 0.5;
                    warn!(error = %e, s, "trial step rejected, halving");
                    if s < ls_min || s < f64::EPSILON {
                        return Ok(None);
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };
            if lstol <= 0. || searches >= max_searches {
                return Ok(Some((s, R1)));
            }

            let r1 = self.ui.dot(&R1);
            trace!(s, r0, r1, "line search");
            if r1.abs() <= lstol * r0.abs() {
                return Ok(Some((s, R1)));
            }

            // Root of the secant through (0, r0) and (s, r1)
            let next = s * r0 / (r0 - r1);
            let next = if next.is_finite() {
                next.clamp(ls_min, 1.)
            } else {
                ls_min
            };
            if (next - s).abs() <= f64::EPSILON * s.max(1.) {
                return Ok(Some((s, R1)));
            }
            s = next;
            searches += 1;
        }
    }

    /// Residual after updating the state to `s * ui`
    fn trial(&mut self, state: &mut SimulationState, s: f64) -> Result<VectorD> {
        self.update(state, &self.ui, s)?;
        self.residual(state)
    }
}
