pub mod fractions;
pub mod mosaic;
pub mod ocean;
pub mod single_pair;
