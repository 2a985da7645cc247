use std::f64::consts::TAU;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::trace;

use crate::config::XgridConfig;
use crate::errors::XGError;
use crate::geometry::clip::lon_ranges_intersect;
use crate::geometry::sphere::cell_polygon;
use crate::storage::cell_store::{CellBoundary, CellsView, GridCellStruct, RowExtent};
use crate::storage::grid::Grid;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BoundsPhase
{
    /// Zeroed, ready for an estimate.
    Reset,
    /// Filled by an estimate over the recorded destination row window.
    Estimated { jstart: usize, jend: usize, ndst: usize },
}

///
/// Per-source-cell scratch for one destination tile: an upper bound on the overlaps of
/// each source cell, and the slice `ij2_start[i]..ij2_end[i]` of the candidate buffer
/// holding the destination cells it may touch.
///
/// The buffers are reused across destination tiles. They must be [`reset`](Self::reset)
/// before each estimate; the estimator and builder refuse them otherwise.
///
#[derive(Clone, Debug)]
pub struct OverlapBounds
{
    approx_nxcells: Vec<usize>,
    ij2_start: Vec<usize>,
    ij2_end: Vec<usize>,
    candidates: Vec<usize>,
    phase: BoundsPhase,
}

impl OverlapBounds
{
    pub fn new(ncells_src: usize) -> Result<Self, XGError>
    {
        let zeroed = |n: usize| -> Result<Vec<usize>, XGError> {
            let mut v = Vec::new();
            v.try_reserve_exact(n)?;
            v.resize(n, 0);
            Ok(v)
        };
        Ok(Self {
            approx_nxcells: zeroed(ncells_src)?,
            ij2_start: zeroed(ncells_src)?,
            ij2_end: zeroed(ncells_src)?,
            candidates: Vec::new(),
            phase: BoundsPhase::Reset,
        })
    }

    pub fn reset(&mut self)
    {
        self.approx_nxcells.fill(0);
        self.ij2_start.fill(0);
        self.ij2_end.fill(0);
        self.candidates.clear();
        self.phase = BoundsPhase::Reset;
    }

    pub fn phase(&self) -> BoundsPhase
    {
        self.phase
    }

    /// Number of source cells covered.
    pub fn len(&self) -> usize
    {
        self.approx_nxcells.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.approx_nxcells.is_empty()
    }

    pub fn approx_nxcells(&self) -> &[usize]
    {
        &self.approx_nxcells
    }

    pub fn ij2_start(&self) -> &[usize]
    {
        &self.ij2_start
    }

    /// Exclusive end of each source cell's candidate slice.
    pub fn ij2_end(&self) -> &[usize]
    {
        &self.ij2_end
    }

    /// Destination cells that source cell `src` may overlap.
    #[inline]
    pub fn candidates(&self, src: usize) -> &[usize]
    {
        &self.candidates[self.ij2_start[src]..self.ij2_end[src]]
    }

    /// Sum of the per-cell bounds.
    pub fn upbound(&self) -> usize
    {
        self.candidates.len()
    }

    /// Bytes held by the fixed per-source arrays.
    pub fn memory_bytes(&self) -> usize
    {
        3 * self.approx_nxcells.len() * std::mem::size_of::<usize>()
    }

    /// Bytes held by the candidate buffer.
    pub fn candidate_bytes(&self) -> usize
    {
        self.candidates.len() * std::mem::size_of::<usize>()
    }
}

/// Widening (radians) of the bisection window, so rounding never drops a cell the full test keeps.
const WINDOW_MARGIN: f64 = 1.0e-9;

///
/// Indices, ascending, of the cells of a sorted row whose longitude extent can reach `lon`
/// under some shift by a multiple of 2π. A superset of what the full longitude test keeps.
///
fn lon_window(row: &[CellBoundary], extent: &RowExtent, lon: (f64, f64), slack: f64) -> Vec<usize>
{
    let reach = slack + WINDOW_MARGIN;
    let kmin = ((lon.0 - reach - extent.lon_max) / TAU).floor() as i64;
    let kmax = ((lon.1 + reach - extent.lon_min) / TAU).ceil() as i64;
    let mut window = Vec::new();
    for k in kmin..=kmax
    {
        let shift = k as f64 * TAU;
        let lo = lon.0 - reach - shift - extent.max_width;
        let hi = lon.1 + reach - shift;
        let start = row.partition_point(|c| c.lon_min < lo);
        let end = row.partition_point(|c| c.lon_min <= hi);
        window.extend(start..end.max(start));
    }
    window.sort_unstable();
    window.dedup();
    window
}

fn candidates_for(src: &Grid, cell: usize, dst: &Grid, view: &CellsView, jstart: usize, jend: usize, slack: f64) -> Vec<usize>
{
    if !src.is_active(cell)
    {
        return Vec::new();
    }
    let polygon = cell_polygon(src, cell % src.nx, cell / src.nx);
    let lat = polygon.lat_bounds();
    let lon = polygon.lon_bounds();
    let src_wraps = polygon.encloses_pole();
    let mut found = Vec::new();
    for j in jstart..=jend
    {
        let extent = view.row_extent(j);
        if extent.lat_min > lat.1 + slack || extent.lat_max < lat.0 - slack
        {
            continue;
        }
        let base = j * dst.nx;
        let row = view.row(j);
        let keep = |i: usize| {
            let candidate = &row[i];
            dst.is_active(base + i)
                && candidate.lat_min <= lat.1 + slack
                && candidate.lat_max >= lat.0 - slack
                && (src_wraps || candidate.flags.encloses_pole() || lon_ranges_intersect(lon, candidate.lon_range(), slack))
        };
        if src_wraps || !extent.sorted
        {
            found.extend((0..row.len()).filter(|&i| keep(i)).map(|i| base + i));
        }
        else
        {
            found.extend(lon_window(row, extent, lon, slack).into_iter().filter(|&i| keep(i)).map(|i| base + i));
        }
    }
    found
}

///
/// Fills `bounds` with, for every active source cell, the destination cells in rows
/// `jstart..=jend` whose bounding boxes can intersect the source cell's bounding box.
/// Returns the total, an upper bound on the size of the exchange grid.
///
/// The estimate never undercounts: cell outlines are straight in the (lon, lat) plane and
/// so lie inside their boxes. Masked source and destination cells get no candidates. Rows
/// whose cells run eastward in order are searched by bisection on the western cell edges;
/// other rows are scanned in full.
///
pub fn get_upbound_nxcells_2dx2d(src: &Grid, dst: &Grid, jstart: usize, jend: usize, dst_cells: &GridCellStruct,
    bounds: &mut OverlapBounds, config: &XgridConfig) -> Result<usize, XGError>
{
    src.validate()?;
    dst.validate()?;
    if bounds.phase != BoundsPhase::Reset
    {
        return Err(XGError::StaleScratch);
    }
    if bounds.len() != src.ncells()
    {
        return Err(XGError::shape("overlap bounds", src.ncells(), bounds.len()));
    }
    if jstart > jend || jend >= dst.ny
    {
        return Err(XGError::InvalidRowWindow { jstart, jend, ny: dst.ny });
    }
    src.check_cell_spans()?;
    let view = dst_cells.view()?;
    if view.nx() != dst.nx || view.ny() != dst.ny
    {
        return Err(XGError::shape("destination cells", dst.ncells(), view.len()));
    }

    let per_cell: Vec<Vec<usize>> = (0..src.ncells()).into_par_iter()
        .map(|c| candidates_for(src, c, dst, &view, jstart, jend, config.bbox_slack))
        .collect();

    let total: usize = per_cell.iter().map(Vec::len).sum();
    bounds.candidates.try_reserve_exact(total)?;
    for (c, found) in per_cell.into_iter().enumerate()
    {
        bounds.approx_nxcells[c] = found.len();
        bounds.ij2_start[c] = bounds.candidates.len();
        bounds.candidates.extend_from_slice(&found);
        bounds.ij2_end[c] = bounds.candidates.len();
    }
    bounds.phase = BoundsPhase::Estimated { jstart, jend, ndst: dst.ncells() };
    trace!(nsrc = src.ncells(), ndst = dst.ncells(), jstart, jend, upbound = total, "estimated overlap bounds");
    Ok(total)
}
