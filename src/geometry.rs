pub mod clip;
pub mod polygon;
pub mod sphere;
