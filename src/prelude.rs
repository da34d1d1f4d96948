use nalgebra;
use nalgebra::Dyn;

pub use itertools::{izip, Itertools};
pub use std::ops::AddAssign;

//------------------------------------------------------------------------------
// Types
//------------------------------------------------------------------------------

/// Matrix (3 x 3)
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// Matrix (6 x 6), Voigt-ordered material tangents
pub type Matrix6 = nalgebra::Matrix6<f64>;

/// Matrix (6 x 3), Voigt strain-displacement block of one node
pub type Matrix6x3 = nalgebra::Matrix6x3<f64>;

/// Matrix (3 x 6), rigid body transfer block of one node
pub type Matrix3x6 = nalgebra::Matrix3x6<f64>;

/// Matrix (DOFs x DOFs)
pub type MatrixD = nalgebra::OMatrix<f64, Dyn, Dyn>;

pub type Matrix3xX = nalgebra::Matrix3xX<f64>;
pub type MatrixXx3 = nalgebra::MatrixXx3<f64>;

pub type Vector3 = nalgebra::Vector3<f64>;
pub type Vector6 = nalgebra::Vector6<f64>;

/// Column vector (Degrees of Freedom)
pub type VectorD = nalgebra::DVector<f64>;

/// Column vector (Quadrature Points)
pub type VectorQ = nalgebra::DVector<f64>;

pub type UnitQuaternion = nalgebra::UnitQuaternion<f64>;

//------------------------------------------------------------------------------
// Traits
//------------------------------------------------------------------------------

pub trait RotVecExt {
    fn tilde(&self) -> Matrix3;
    fn as_rotation(&self) -> UnitQuaternion;
}

impl RotVecExt for Vector3 {
    fn tilde(&self) -> Matrix3 {
        Matrix3::new(
            0.0, -self[2], self[1], self[2], 0.0, -self[0], -self[1], self[0], 0.0,
        )
    }
    /// Rotation vector (angle = magnitude) to unit quaternion
    fn as_rotation(&self) -> UnitQuaternion {
        if self.magnitude() == 0. {
            UnitQuaternion::identity()
        } else {
            UnitQuaternion::from_scaled_axis(*self)
        }
    }
}

pub trait QuatExt {
    fn is_unit(&self, eps: f64) -> bool;
}

impl QuatExt for UnitQuaternion {
    fn is_unit(&self, eps: f64) -> bool {
        (self.quaternion().norm() - 1.).abs() <= eps
    }
}

/// Symmetric 3x3 tensor to Voigt vector [xx, yy, zz, xy, yz, xz]
pub fn voigt(s: &Matrix3) -> Vector6 {
    Vector6::new(s[(0, 0)], s[(1, 1)], s[(2, 2)], s[(0, 1)], s[(1, 2)], s[(0, 2)])
}
