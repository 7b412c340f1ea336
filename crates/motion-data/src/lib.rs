pub mod model;
pub mod motion;
pub mod scene;

pub use model::*;
