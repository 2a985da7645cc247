pub mod cell_store;
pub mod grid;
