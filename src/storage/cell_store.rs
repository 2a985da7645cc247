use bitfield_struct::bitfield;
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

use crate::errors::XGError;
use crate::geometry::polygon::CellPolygon;
use crate::geometry::sphere::{cell_polygon, polygon_area};
use crate::storage::grid::Grid;

#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct CellFlags
{
    pub active: bool,
    pub touches_pole: bool,
    pub encloses_pole: bool,
    #[bits(5)]
    pub _empty: u8,
}

///
/// Boundary of one grid cell plus everything the search needs without revisiting corners.
///
#[derive(Copy, Clone, Debug)]
pub struct CellBoundary
{
    pub polygon: CellPolygon,
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
    pub area: f64,
    pub flags: CellFlags,
}

impl CellBoundary
{
    pub fn new(grid: &Grid, cell: usize, radius: f64) -> Self
    {
        let polygon = cell_polygon(grid, cell % grid.nx, cell / grid.nx);
        let (lon_min, lon_max) = polygon.lon_bounds();
        let (lat_min, lat_max) = polygon.lat_bounds();
        let flags = CellFlags::new()
            .with_active(grid.is_active(cell))
            .with_touches_pole(polygon.touches_pole())
            .with_encloses_pole(polygon.encloses_pole());
        Self { polygon, lon_min, lon_max, lat_min, lat_max, area: polygon_area(&polygon, radius), flags }
    }

    #[inline]
    pub fn lon_range(&self) -> (f64, f64)
    {
        (self.lon_min, self.lon_max)
    }
}

///
/// Extent of one row of cells. `sorted` rows have finite bounds, `lon_min` non-decreasing
/// along the row and no cell enclosing a pole, so the cells reaching a longitude interval
/// can be found by bisection on `lon_min`.
///
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RowExtent
{
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
    /// Widest `lon_max - lon_min` of any cell in the row.
    pub max_width: f64,
    pub sorted: bool,
}

impl RowExtent
{
    fn new(row: &[CellBoundary]) -> Self
    {
        let mut extent = Self {
            lat_min: f64::INFINITY,
            lat_max: f64::NEG_INFINITY,
            lon_min: f64::INFINITY,
            lon_max: f64::NEG_INFINITY,
            max_width: 0.0,
            sorted: true,
        };
        let mut previous = f64::NEG_INFINITY;
        for c in row
        {
            extent.lat_min = extent.lat_min.min(c.lat_min);
            extent.lat_max = extent.lat_max.max(c.lat_max);
            extent.lon_min = extent.lon_min.min(c.lon_min);
            extent.lon_max = extent.lon_max.max(c.lon_max);
            extent.max_width = extent.max_width.max(c.lon_max - c.lon_min);
            extent.sorted &= c.lon_min.is_finite() && c.lon_max.is_finite() && c.lon_min >= previous && !c.flags.encloses_pole();
            previous = c.lon_min;
        }
        extent
    }
}

#[derive(Clone, Debug)]
struct CellData
{
    cells: Vec<CellBoundary>,
    rows: Vec<RowExtent>,
}

///
/// Per-cell boundary outlines of one grid, built once per destination tile and released
/// when the tile pair is done. A released store refuses every further use.
///
#[derive(Clone, Debug)]
pub struct GridCellStruct
{
    nx: usize,
    ny: usize,
    data: Option<CellData>,
}

///
/// Read access to a live [`GridCellStruct`].
///
#[derive(Copy, Clone, Debug)]
pub struct CellsView<'a>
{
    nx: usize,
    ny: usize,
    data: &'a CellData,
}

impl GridCellStruct
{
    ///
    /// Derives the outline of every cell of `grid`. Cells with an edge spanning a full turn
    /// of longitude are refused with [`XGError::InvalidCellSpan`]; cells that fold over
    /// themselves produce whatever area the outline gives.
    ///
    pub fn build(grid: &Grid, radius: f64) -> Result<Self, XGError>
    {
        grid.validate()?;
        grid.check_cell_spans()?;
        let n = grid.ncells();
        let mut cells = Vec::new();
        cells.try_reserve_exact(n)?;
        (0..n).into_par_iter()
            .map(|c| CellBoundary::new(grid, c, radius))
            .collect_into_vec(&mut cells);

        let mut rows = Vec::new();
        rows.try_reserve_exact(grid.ny)?;
        rows.extend(cells.chunks_exact(grid.nx).map(RowExtent::new));
        Ok(Self { nx: grid.nx, ny: grid.ny, data: Some(CellData { cells, rows }) })
    }

    pub fn view(&self) -> Result<CellsView<'_>, XGError>
    {
        self.data.as_ref()
            .map(|data| CellsView { nx: self.nx, ny: self.ny, data })
            .ok_or(XGError::ReleasedCells)
    }

    /// Frees all cell storage. Returns the number of bytes released.
    pub fn release(&mut self) -> usize
    {
        let bytes = self.memory_bytes();
        self.data = None;
        bytes
    }

    pub fn is_released(&self) -> bool
    {
        self.data.is_none()
    }

    pub fn shape(&self) -> (usize, usize)
    {
        (self.nx, self.ny)
    }

    pub fn memory_bytes(&self) -> usize
    {
        self.data.as_ref().map_or(0, |d| {
            d.cells.len() * std::mem::size_of::<CellBoundary>() + d.rows.len() * std::mem::size_of::<RowExtent>()
        })
    }
}

impl<'a> CellsView<'a>
{
    #[inline]
    pub fn cell(&self, index: usize) -> &'a CellBoundary
    {
        &self.data.cells[index]
    }

    #[inline]
    pub fn cells(&self) -> &'a [CellBoundary]
    {
        &self.data.cells
    }

    /// Cells of row `j`.
    #[inline]
    pub fn row(&self, j: usize) -> &'a [CellBoundary]
    {
        &self.data.cells[j * self.nx..(j + 1) * self.nx]
    }

    /// Latitude extent of row `j` over all of its cells.
    #[inline]
    pub fn row_lat_range(&self, j: usize) -> (f64, f64)
    {
        let row = &self.data.rows[j];
        (row.lat_min, row.lat_max)
    }

    #[inline]
    pub fn row_extent(&self, j: usize) -> &'a RowExtent
    {
        &self.data.rows[j]
    }

    pub fn nx(&self) -> usize
    {
        self.nx
    }

    pub fn ny(&self) -> usize
    {
        self.ny
    }

    pub fn len(&self) -> usize
    {
        self.data.cells.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.data.cells.is_empty()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::storage::grid::GridData;

    #[test]
    fn build_records_bounds_and_flags()
    {
        let mut mask = vec![1.0; 8];
        mask[5] = 0.0;
        let data = GridData::regular_lonlat(4, 2, [0.0, 360.0], [0.0, 90.0]).with_mask(mask);
        let cells = GridCellStruct::build(&data.as_grid(), 1.0).unwrap();
        let view = cells.view().unwrap();
        assert_eq!(view.len(), 8);
        assert_eq!(cells.shape(), (4, 2));

        let c = view.cell(1);
        assert!((c.lon_min - 90f64.to_radians()).abs() < 1e-12);
        assert!((c.lat_max - 45f64.to_radians()).abs() < 1e-12);
        assert!(c.flags.active());
        assert!(!c.flags.touches_pole());

        assert!(!view.cell(5).flags.active());
        assert!(view.cell(6).flags.touches_pole());
        assert!(!view.cell(6).flags.encloses_pole());

        let (lo, hi) = view.row_lat_range(1);
        assert!((lo - 45f64.to_radians()).abs() < 1e-12);
        assert!((hi - 90f64.to_radians()).abs() < 1e-12);

        let extent = view.row_extent(0);
        assert!(extent.sorted);
        assert!(extent.lon_min.abs() < 1e-15);
        assert!((extent.lon_max - 360f64.to_radians()).abs() < 1e-12);
        assert!((extent.max_width - 90f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn descending_rows_are_not_sorted()
    {
        let data = GridData::regular_lonlat(4, 1, [40.0, 0.0], [0.0, 10.0]);
        let cells = GridCellStruct::build(&data.as_grid(), 1.0).unwrap();
        assert!(!cells.view().unwrap().row_extent(0).sorted);

        let cap = GridData::regular_lonlat(3, 1, [0.0, 360.0], [80.0, 90.0]);
        let cells = GridCellStruct::build(&cap.as_grid(), 1.0).unwrap();
        assert!(cells.view().unwrap().row_extent(0).sorted);
    }

    #[test]
    fn released_store_fails_fast()
    {
        let data = GridData::regular_lonlat(2, 2, [0.0, 20.0], [0.0, 20.0]);
        let mut cells = GridCellStruct::build(&data.as_grid(), 1.0).unwrap();
        assert!(cells.memory_bytes() > 0);
        let freed = cells.release();
        assert!(freed > 0);
        assert!(cells.is_released());
        assert_eq!(cells.memory_bytes(), 0);
        assert_eq!(cells.view().unwrap_err(), XGError::ReleasedCells);
    }
}
