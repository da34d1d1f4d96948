pub mod interp;
pub mod material_point;
pub mod quadrature;
pub mod shape;
pub mod solid;
