//! Analysis settings, loaded from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::interface::PlotLevel;
use crate::mesh::Module;
use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    /// Quasi-static equilibrium
    #[default]
    Static,
    /// Implicit dynamics with trapezoidal (Newmark) integration
    Dynamic,
}

/// Newton iteration controls.
///
/// Tolerances are relative: a zero tolerance disables that criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonConfig {
    pub max_iterations: usize,
    /// Iterations between stiffness reformations, 1 for full Newton
    pub reform_interval: usize,
    pub max_reformations: usize,
    /// displacement tolerance
    pub dtol: f64,
    /// energy tolerance
    pub etol: f64,
    /// residual tolerance
    pub rtol: f64,
    /// line search tolerance, zero disables the line search
    pub lstol: f64,
    /// smallest line search step
    pub ls_min: f64,
    pub ls_max_iterations: usize,
    /// largest rigid joint gap accepted without another augmentation
    pub aug_tol: f64,
    pub max_augmentations: usize,
    /// residual norm below which the iteration is converged outright
    pub min_residual: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        NewtonConfig {
            max_iterations: 25,
            reform_interval: 1,
            max_reformations: 15,
            dtol: 0.001,
            etol: 0.01,
            rtol: 0.,
            lstol: 0.9,
            ls_min: 0.01,
            ls_max_iterations: 5,
            aug_tol: 0.01,
            max_augmentations: 10,
            min_residual: 1e-20,
        }
    }
}

/// Time step controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepperConfig {
    /// Adapt the step size to the iteration count
    pub auto: bool,
    pub dt_min: f64,
    /// Largest step size, unbounded when absent
    pub dt_max: Option<f64>,
    /// Consecutive step cuts before the analysis aborts
    pub max_retries: usize,
    /// Target Newton iterations per step
    pub opt_iterations: usize,
}

impl Default for StepperConfig {
    fn default() -> Self {
        StepperConfig {
            auto: true,
            dt_min: 1e-6,
            dt_max: None,
            max_retries: 5,
            opt_iterations: 10,
        }
    }
}

/// Settings of one analysis step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub analysis: AnalysisType,
    pub module: Module,
    /// Nodes carry rotational (shell) DOFs
    pub rotations: bool,
    pub time_steps: usize,
    pub step_size: f64,
    pub plot_level: PlotLevel,
    /// Uniform body acceleration
    pub gravity: Vector3,
    pub newton: NewtonConfig,
    pub stepper: StepperConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            analysis: AnalysisType::Static,
            module: Module::Solid,
            rotations: false,
            time_steps: 10,
            step_size: 0.1,
            plot_level: PlotLevel::MajorIterations,
            gravity: Vector3::zeros(),
            newton: NewtonConfig::default(),
            stepper: StepperConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// End time of the analysis
    pub fn end_time(&self) -> f64 {
        self.time_steps as f64 * self.step_size
    }

    pub fn is_dynamic(&self) -> bool {
        self.analysis == AnalysisType::Dynamic
    }

    pub fn validate(&self) -> Result<()> {
        if self.step_size <= 0. {
            return Err(Error::Setup("step size must be positive".into()));
        }
        if self.newton.max_iterations == 0 || self.newton.reform_interval == 0 {
            return Err(Error::Setup(
                "max_iterations and reform_interval must be at least 1".into(),
            ));
        }
        if !(0. ..=1.).contains(&self.newton.ls_min) {
            return Err(Error::Setup("ls_min must be in range [0, 1]".into()));
        }
        if let Some(dt_max) = self.stepper.dt_max {
            if self.stepper.dt_min > dt_max {
                return Err(Error::Setup("dt_min exceeds dt_max".into()));
            }
        }
        Ok(())
    }
}
