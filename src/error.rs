//! Error types for model setup and solution.

use thiserror::Error;

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while setting up or advancing an analysis.
///
/// Newton non-convergence is not an error; it is reported to the stepper as a
/// [`crate::solver::StepOutcome::Failed`] value.
#[derive(Error, Debug)]
pub enum Error {
    /// A node id outside the mesh.
    #[error("invalid node reference {0}")]
    InvalidNode(usize),

    /// A node set name that the mesh does not define.
    #[error("invalid node set '{0}'")]
    InvalidNodeSet(String),

    /// A load curve id outside the curve table.
    #[error("invalid load curve {0}")]
    InvalidCurve(usize),

    /// A rigid body id outside the rigid body table.
    #[error("invalid rigid body {0}")]
    InvalidRigidBody(usize),

    /// Linear constraints whose master/slave chain loops back on itself.
    #[error("cyclic linear constraint chain through node {node} dof {dof}")]
    ConstraintCycle { node: usize, dof: crate::mesh::Dof },

    /// Any other inconsistency found while building the model.
    #[error("setup error: {0}")]
    Setup(String),

    /// Non-positive Jacobian found while evaluating an element.
    #[error("negative jacobian {det:.3e} in domain {domain}, element {element}, point {point}")]
    NegativeJacobian {
        domain: usize,
        element: usize,
        point: usize,
        det: f64,
    },

    /// Factorization of the global stiffness failed.
    #[error("singular stiffness matrix")]
    SingularMatrix,

    /// Constitutive evaluation failed.
    #[error("material error: {0}")]
    Material(String),

    /// The stepper exhausted its retries.
    #[error("step failed at t={time} after {retries} consecutive cuts")]
    StepFailed { time: f64, retries: usize },

    /// Plot output failed.
    #[error("plot error: {0}")]
    Plot(String),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration (de)serialization errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Errors the Newton loop treats as a failed trial rather than a fatal condition.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NegativeJacobian { .. } | Error::SingularMatrix)
    }
}
