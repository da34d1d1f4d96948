use tracing::trace;

use crate::error::Result;
use crate::interface::PlotLevel;
use crate::mesh::{Dof, Equation};
use crate::prelude::*;
use crate::rigid::update_rigid_bodies;
use crate::state::SimulationState;

use super::SolidSolver;

impl SolidSolver {
    /// Synchronize the model with the trial increment `s * ui`.
    ///
    /// The stages run in a fixed order since each consumes the previous one's
    /// output: rigid bodies, free nodal DOFs, prescribed conditions, linear
    /// constraints, dynamics, scalar fields, contact, stresses, plot. The same
    /// `(ui, s)` always produces the same state, so a line search may call
    /// this any number of times.
    pub fn update(&self, state: &mut SimulationState, ui: &VectorD, s: f64) -> Result<()> {
        let SimulationState {
            config,
            mesh,
            bodies,
            joints,
            bcs,
            constraints,
            curves,
            contact,
            plot,
            time,
            dt,
            ..
        } = state;
        let (time, dt) = (*time, *dt);
        let (Ut, Ui) = (&self.Ut, &self.Ui);

        update_rigid_bodies(bodies, joints, &mut mesh.nodes, curves, time, Ui, ui, s);

        for node in mesh.nodes.iter_mut() {
            for dof in Dof::TRANSLATIONS.into_iter().chain(Dof::ROTATIONS) {
                if let Equation::Active(n) = node.equation(dof) {
                    node.set_value(dof, node.reference(dof) + Ut[n] + Ui[n] + s * ui[n]);
                }
            }
        }

        for bc in bcs.prescribed.iter().filter(|bc| bc.active && !bc.target.is_scalar()) {
            let g = bc.scale * curves[bc.curve].value(time);
            bc.apply(&mut mesh.nodes[bc.node], g);
        }

        constraints.apply(&mut mesh.nodes);

        if config.is_dynamic() {
            let a = 4. / dt;
            let b = a / dt;
            for node in mesh.nodes.iter_mut() {
                node.at = (node.rt - node.rp) * b - node.vp * a - node.ap;
                node.vt = node.vp + (node.ap + node.at) * (dt * 0.5);
            }
        }

        if config.module.has_scalar_fields() {
            for node in mesh.nodes.iter_mut() {
                for dof in Dof::SCALARS {
                    if let Equation::Active(n) = node.equation(dof) {
                        node.set_value(dof, node.reference(dof) + Ut[n] + Ui[n] + s * ui[n]);
                    }
                }
                if !config.is_dynamic() {
                    node.vt = (node.rt - node.rp) / dt;
                }
            }
            for bc in bcs.prescribed.iter().filter(|bc| bc.active && bc.target.is_scalar()) {
                let g = bc.scale * curves[bc.curve].value(time);
                bc.apply(&mut mesh.nodes[bc.node], g);
            }
        }

        if let Some(contact) = contact.as_mut() {
            contact.update(mesh)?;
        }

        mesh.update_stresses()?;

        if config.plot_level == PlotLevel::MinorIterations {
            if let Some(plot) = plot.as_mut() {
                plot.write(mesh, bodies, time)?;
            }
        }

        trace!(time, s, "state updated");
        Ok(())
    }
}
