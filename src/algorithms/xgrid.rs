use std::io::Write;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::algorithms::upbound::{BoundsPhase, OverlapBounds};
use crate::config::XgridConfig;
use crate::errors::XGError;
use crate::geometry::clip::overlap_unit_area;
use crate::geometry::sphere::{cell_polygon, polygon_area};
use crate::serialization::{deserialize, serialize, SerializationFormat};
use crate::storage::cell_store::{CellsView, GridCellStruct};
use crate::storage::grid::Grid;

///
/// Sparse exchange grid between one source tile and one destination tile. Entry `k` says
/// source cell `input_parent_cell_index[k]` overlaps destination cell
/// `output_parent_cell_index[k]` over `xcell_area[k]` (> 0). The three arrays always have
/// the same length.
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InterpPerInputTile
{
    pub input_tile: usize,
    pub output_tile: usize,
    pub input_parent_cell_index: Vec<usize>,
    pub output_parent_cell_index: Vec<usize>,
    pub xcell_area: Vec<f64>,
}

impl InterpPerInputTile
{
    fn with_capacity(n: usize) -> Result<Self, XGError>
    {
        let mut r = Self::default();
        r.input_parent_cell_index.try_reserve_exact(n)?;
        r.output_parent_cell_index.try_reserve_exact(n)?;
        r.xcell_area.try_reserve_exact(n)?;
        Ok(r)
    }

    /// Number of exchange cells.
    #[inline]
    pub fn nxgrid(&self) -> usize
    {
        self.xcell_area.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.xcell_area.is_empty()
    }

    pub fn tagged(mut self, input_tile: usize, output_tile: usize) -> Self
    {
        self.input_tile = input_tile;
        self.output_tile = output_tile;
        self
    }

    /// `(source cell, destination cell, area)` triples in order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_
    {
        self.input_parent_cell_index.iter()
            .zip(&self.output_parent_cell_index)
            .zip(&self.xcell_area)
            .map(|((&i, &o), &a)| (i, o, a))
    }

    pub fn total_area(&self) -> f64
    {
        self.xcell_area.iter().sum()
    }

    /// Splits the source indices into `(i, j)` for a source grid `nx` cells wide.
    pub fn input_ij(&self, nx: usize) -> (Vec<usize>, Vec<usize>)
    {
        self.input_parent_cell_index.iter().map(|&c| (c % nx, c / nx)).unzip()
    }

    /// Splits the destination indices into `(i, j)` for a destination grid `nx` cells wide.
    pub fn output_ij(&self, nx: usize) -> (Vec<usize>, Vec<usize>)
    {
        self.output_parent_cell_index.iter().map(|&c| (c % nx, c / nx)).unzip()
    }

    ///
    /// Renumbers destination cells after dropping `rows` leading rows of a destination
    /// grid `nx` cells wide. Every entry must lie past those rows.
    ///
    pub fn drop_output_rows(&mut self, nx: usize, rows: usize)
    {
        let offset = nx * rows;
        for c in &mut self.output_parent_cell_index
        {
            debug_assert!(*c >= offset);
            *c -= offset;
        }
    }

    fn push(&mut self, input: usize, output: usize, area: f64)
    {
        self.input_parent_cell_index.push(input);
        self.output_parent_cell_index.push(output);
        self.xcell_area.push(area);
    }

    pub fn to_bytes(&self, format: SerializationFormat) -> Result<Vec<u8>, XGError>
    {
        serialize(self, format)
    }

    ///
    /// True when the three arrays have the same length and every area is finite and
    /// positive.
    ///
    pub fn is_consistent(&self) -> bool
    {
        let n = self.xcell_area.len();
        self.input_parent_cell_index.len() == n
            && self.output_parent_cell_index.len() == n
            && self.xcell_area.iter().all(|a| a.is_finite() && *a > 0.0)
    }

    /// Decodes an exchange grid. A record that is not [consistent](Self::is_consistent) is refused.
    pub fn from_bytes(bytes: &[u8], format: SerializationFormat) -> Result<Self, XGError>
    {
        let xgrid: Self = deserialize(bytes, format)?;
        if !xgrid.is_consistent()
        {
            return Err(XGError::DeserializationFailed);
        }
        Ok(xgrid)
    }

    ///
    /// Writes the exchange grid to `path` (bincode, LZ4 compressed).
    ///
    pub fn save(&self, path: &str) -> Result<(), XGError>
    {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path).map_err(|_|XGError::FileIOError)?);
        let buffer = self.to_bytes(SerializationFormat::BincodeLz4)?;
        file.write_all(&buffer).map_err(|_|XGError::WriteBufferFailed)?;
        Ok(())
    }

    pub fn read_buffer(buffer: &[u8]) -> Result<Self, XGError>
    {
        Self::from_bytes(buffer, SerializationFormat::BincodeLz4)
    }

    pub fn read<Reader: std::io::Read>(mut reader: Reader) -> Result<Self, XGError>
    {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(|_|XGError::ReadBufferFailed)?;
        Self::read_buffer(&bytes)
    }
}

///
/// What happened to the candidate pairs of one build.
///
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapDiagnostics
{
    /// Candidate pairs examined.
    pub candidates: usize,
    /// Candidates whose outlines turned out not to intersect.
    pub empty: usize,
    /// Overlaps at or below the area ratio threshold, dropped.
    pub degenerate: usize,
    /// Candidates skipped because a cell is masked.
    pub masked: usize,
}

impl std::ops::AddAssign for OverlapDiagnostics
{
    fn add_assign(&mut self, rhs: Self) {
        self.candidates += rhs.candidates;
        self.empty += rhs.empty;
        self.degenerate += rhs.degenerate;
        self.masked += rhs.masked;
    }
}

type CellOverlaps = (Vec<(usize, f64)>, OverlapDiagnostics);

fn overlaps_for(src: &Grid, cell: usize, dst: &Grid, view: &CellsView, bounds: &OverlapBounds, config: &XgridConfig) -> CellOverlaps
{
    let mut diagnostics = OverlapDiagnostics::default();
    let candidates = bounds.candidates(cell);
    if candidates.is_empty()
    {
        return (Vec::new(), diagnostics);
    }
    if !src.is_active(cell)
    {
        diagnostics.masked += candidates.len();
        return (Vec::new(), diagnostics);
    }
    let polygon = cell_polygon(src, cell % src.nx, cell / src.nx);
    let src_area = polygon_area(&polygon, config.radius);
    let mut found = Vec::new();
    for &d in candidates
    {
        diagnostics.candidates += 1;
        if !dst.is_active(d)
        {
            diagnostics.masked += 1;
            continue;
        }
        let target = view.cell(d);
        let area = overlap_unit_area(&polygon, &target.polygon) * config.radius * config.radius;
        if area <= 0.0
        {
            diagnostics.empty += 1;
        }
        else if area / src_area.min(target.area) <= config.area_ratio_thresh
        {
            diagnostics.degenerate += 1;
        }
        else
        {
            found.push((d, area));
        }
    }
    (found, diagnostics)
}

///
/// Order-1 exchange grid from the candidates left by
/// [`get_upbound_nxcells_2dx2d`](crate::algorithms::upbound::get_upbound_nxcells_2dx2d).
///
/// Every active source cell is clipped against each of its active candidate destination
/// cells. Overlaps at or below `area_ratio_thresh` of the smaller parent are dropped and
/// counted as degenerate. The entries come out ordered by source cell, then by candidate
/// order, independent of how the work was spread over threads.
///
pub fn create_xgrid_2dx2d_order1_with_diagnostics(src: &Grid, dst: &Grid, jstart: usize, jend: usize, upbound: usize,
    dst_cells: &GridCellStruct, bounds: &OverlapBounds, config: &XgridConfig) -> Result<(usize, InterpPerInputTile, OverlapDiagnostics), XGError>
{
    src.validate()?;
    dst.validate()?;
    if bounds.phase() != (BoundsPhase::Estimated { jstart, jend, ndst: dst.ncells() }) || bounds.len() != src.ncells()
    {
        return Err(XGError::StaleScratch);
    }
    let view = dst_cells.view()?;
    if view.nx() != dst.nx || view.ny() != dst.ny
    {
        return Err(XGError::shape("destination cells", dst.ncells(), view.len()));
    }

    let per_cell: Vec<CellOverlaps> = (0..src.ncells()).into_par_iter()
        .map(|c| overlaps_for(src, c, dst, &view, bounds, config))
        .collect();

    let nxgrid: usize = per_cell.iter().map(|(found, _)| found.len()).sum();
    if nxgrid > upbound
    {
        return Err(XGError::BoundExceeded { nxgrid, upbound });
    }
    let mut interp = InterpPerInputTile::with_capacity(nxgrid)?;
    let mut diagnostics = OverlapDiagnostics::default();
    for (c, (found, cell_diagnostics)) in per_cell.into_iter().enumerate()
    {
        diagnostics += cell_diagnostics;
        for (d, area) in found
        {
            interp.push(c, d, area);
        }
    }
    trace!(nxgrid, upbound, degenerate = diagnostics.degenerate, "built exchange grid");
    Ok((nxgrid, interp, diagnostics))
}

/// As [`create_xgrid_2dx2d_order1_with_diagnostics`], without the diagnostics.
pub fn create_xgrid_2dx2d_order1(src: &Grid, dst: &Grid, jstart: usize, jend: usize, upbound: usize,
    dst_cells: &GridCellStruct, bounds: &OverlapBounds, config: &XgridConfig) -> Result<(usize, InterpPerInputTile), XGError>
{
    let (nxgrid, interp, _) = create_xgrid_2dx2d_order1_with_diagnostics(src, dst, jstart, jend, upbound, dst_cells, bounds, config)?;
    Ok((nxgrid, interp))
}
