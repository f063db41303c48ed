pub mod error;
pub mod geometry;
pub mod logic;
pub mod math;
pub mod operations;
pub mod scene;
pub mod tessellation;

pub use error::{Result, SplinesError};
