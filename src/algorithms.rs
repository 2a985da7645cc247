pub mod upbound;
pub mod xgrid;
