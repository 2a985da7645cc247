//!
//! First-order exchange grids between logically rectangular grids on the sphere.
//!
//! An exchange grid lists every `(source cell, destination cell, overlap area)` of two
//! grids, the weights of a conservative piecewise-constant remap. Building one takes
//! three steps per tile pair: the destination cell outlines
//! ([`GridCellStruct`](storage::cell_store::GridCellStruct)), a pass bounding the
//! destination cells each source cell can touch
//! ([`get_upbound_nxcells_2dx2d`](algorithms::upbound::get_upbound_nxcells_2dx2d)), and
//! the clipping pass itself
//! ([`create_xgrid_2dx2d_order1`](algorithms::xgrid::create_xgrid_2dx2d_order1)).
//! [`MosaicCoupler`](coupler::mosaic::MosaicCoupler) runs them over every
//! atmosphere/land and atmosphere/ocean tile pair of a coupled mosaic.
//!
pub mod algorithms;
pub mod config;
pub mod coupler;
pub mod errors;
pub mod geometry;
pub mod residency;
pub mod serialization;
pub mod storage;

pub use algorithms::xgrid::InterpPerInputTile;
pub use config::{CouplerConfig, XgridConfig};
pub use coupler::mosaic::{couple_mosaic, CouplingReport, DestinationXgrid, MosaicCoupler};
pub use coupler::single_pair::{create_xgrid_order1, SinglePairSlot};
pub use errors::XGError;
pub use storage::grid::{Component, Grid, GridData};
