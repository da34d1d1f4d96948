pub mod assembly;
pub mod bc;
pub mod config;
pub mod curve;
pub mod domain;
pub mod element;
pub mod error;
pub mod interface;
pub mod linsolve;
pub mod material;
pub mod mesh;
pub mod plot;
pub mod prelude;
pub mod rigid;
pub mod solver;
pub mod state;
