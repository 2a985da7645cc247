use serde::{Deserialize, Serialize};

use crate::errors::XGError;
use crate::geometry::polygon::spans_full_turn;

///
/// Borrowed view of one logically rectangular grid: `nx * ny` cells, corner
/// coordinates (radians) stored row-major with `nx + 1` corners per row, and one
/// mask value per cell (zero is inactive).
///
#[derive(Copy, Clone, Debug)]
pub struct Grid<'a>
{
    pub nx: usize,
    pub ny: usize,
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub mask: &'a [f64],
}

impl<'a> Grid<'a>
{
    pub fn new(nx: usize, ny: usize, x: &'a [f64], y: &'a [f64], mask: &'a [f64]) -> Result<Self, XGError>
    {
        let grid = Self { nx, ny, x, y, mask };
        grid.validate()?;
        Ok(grid)
    }

    #[inline]
    pub fn ncells(&self) -> usize
    {
        self.nx * self.ny
    }

    #[inline]
    pub fn ncorners(&self) -> usize
    {
        (self.nx + 1) * (self.ny + 1)
    }

    #[inline]
    pub fn is_active(&self, cell: usize) -> bool
    {
        self.mask[cell] != 0.0
    }

    /// Corner `(i, j)` as `(lon, lat)`.
    #[inline]
    pub fn corner(&self, i: usize, j: usize) -> (f64, f64)
    {
        let k = j * (self.nx + 1) + i;
        (self.x[k], self.y[k])
    }

    ///
    /// Checks the array lengths against `nx` and `ny`.
    ///
    pub fn validate(&self) -> Result<(), XGError>
    {
        if self.nx == 0 || self.ny == 0
        {
            return Err(XGError::shape("cell count", 1, 0));
        }
        let npts = self.ncorners();
        if self.x.len() != npts
        {
            return Err(XGError::shape("x corners", npts, self.x.len()));
        }
        if self.y.len() != npts
        {
            return Err(XGError::shape("y corners", npts, self.y.len()));
        }
        if self.mask.len() != self.ncells()
        {
            return Err(XGError::shape("mask", self.ncells(), self.mask.len()));
        }
        Ok(())
    }

    ///
    /// Checks that no edge between adjacent corners steps a full turn of longitude, which
    /// would leave the cells on either side without a shortest-path outline. Reports the
    /// first offending cell.
    ///
    pub fn check_cell_spans(&self) -> Result<(), XGError>
    {
        for j in 0..=self.ny
        {
            let row = j.min(self.ny - 1);
            for i in 0..=self.nx
            {
                let here = self.corner(i, j);
                let col = i.min(self.nx - 1);
                if i < self.nx && spans_full_turn(here, self.corner(i + 1, j))
                {
                    return Err(XGError::InvalidCellSpan { cell: row * self.nx + i });
                }
                if j < self.ny && spans_full_turn(here, self.corner(i, j + 1))
                {
                    return Err(XGError::InvalidCellSpan { cell: j * self.nx + col });
                }
            }
        }
        Ok(())
    }
}

///
/// Owned grid arrays, for grids built or modified in memory.
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GridData
{
    pub nx: usize,
    pub ny: usize,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub mask: Vec<f64>,
}

impl GridData
{
    pub fn new(nx: usize, ny: usize, x: Vec<f64>, y: Vec<f64>, mask: Vec<f64>) -> Result<Self, XGError>
    {
        let data = Self { nx, ny, x, y, mask };
        data.as_grid().validate()?;
        Ok(data)
    }

    ///
    /// Regular longitude/latitude grid. Bounds are given in degrees and stored in radians,
    /// every cell active.
    ///
    pub fn regular_lonlat(nx: usize, ny: usize, lon: [f64; 2], lat: [f64; 2]) -> Self
    {
        let mut x = Vec::with_capacity((nx + 1) * (ny + 1));
        let mut y = Vec::with_capacity((nx + 1) * (ny + 1));
        let dlon = (lon[1] - lon[0]) / nx.max(1) as f64;
        let dlat = (lat[1] - lat[0]) / ny.max(1) as f64;
        for j in 0..=ny
        {
            for i in 0..=nx
            {
                x.push((lon[0] + i as f64 * dlon).to_radians());
                y.push((lat[0] + j as f64 * dlat).to_radians());
            }
        }
        Self { nx, ny, x, y, mask: vec![1.0; nx * ny] }
    }

    pub fn with_mask(mut self, mask: Vec<f64>) -> Self
    {
        self.mask = mask;
        self
    }

    pub fn as_grid(&self) -> Grid<'_>
    {
        Grid { nx: self.nx, ny: self.ny, x: &self.x, y: &self.y, mask: &self.mask }
    }
}

///
/// One tile of one model component. Owned by the caller for the duration of a coupling pass.
///
#[derive(Copy, Clone, Debug)]
pub struct Component<'a>
{
    pub itile: usize,
    pub grid: Grid<'a>,
    pub area: Option<&'a [f64]>,
}

impl<'a> Component<'a>
{
    pub fn new(itile: usize, grid: Grid<'a>) -> Self
    {
        Self { itile, grid, area: None }
    }

    pub fn with_area(mut self, area: &'a [f64]) -> Self
    {
        self.area = Some(area);
        self
    }

    pub fn validate(&self) -> Result<(), XGError>
    {
        self.grid.validate()?;
        if let Some(area) = self.area
        {
            if area.len() != self.grid.ncells()
            {
                return Err(XGError::shape("cell area", self.grid.ncells(), area.len()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn regular_grid_shape()
    {
        let data = GridData::regular_lonlat(4, 3, [0.0, 40.0], [-30.0, 30.0]);
        let grid = data.as_grid();
        assert!(grid.validate().is_ok());
        assert_eq!(grid.ncells(), 12);
        assert_eq!(grid.ncorners(), 20);
        let (lon, lat) = grid.corner(4, 3);
        assert!((lon - 40f64.to_radians()).abs() < 1e-15);
        assert!((lat - 30f64.to_radians()).abs() < 1e-15);
    }

    #[test]
    fn full_turn_cells_are_rejected()
    {
        let band = GridData::regular_lonlat(1, 2, [0.0, 360.0], [-30.0, 30.0]);
        assert_eq!(band.as_grid().check_cell_spans(), Err(XGError::InvalidCellSpan { cell: 0 }));

        let halves = GridData::regular_lonlat(2, 2, [0.0, 360.0], [-30.0, 30.0]);
        assert!(halves.as_grid().check_cell_spans().is_ok());

        // a full turn between two pole corners is just the pole
        let cap = GridData::regular_lonlat(1, 1, [0.0, 360.0], [90.0, 90.0]);
        assert!(cap.as_grid().check_cell_spans().is_ok());

        let mut twisted = GridData::regular_lonlat(2, 2, [0.0, 40.0], [0.0, 20.0]);
        twisted.x[7] += std::f64::consts::TAU;
        assert_eq!(twisted.as_grid().check_cell_spans(), Err(XGError::InvalidCellSpan { cell: 3 }));
    }

    #[test]
    fn mismatched_lengths_are_rejected()
    {
        let data = GridData::regular_lonlat(2, 2, [0.0, 2.0], [0.0, 2.0]);
        let short_mask = vec![1.0; 3];
        let err = Grid::new(2, 2, &data.x, &data.y, &short_mask).unwrap_err();
        assert_eq!(err, XGError::InvalidGridShape { what: "mask", expected: 4, found: 3 });

        let err = Grid::new(2, 2, &data.x[..8], &data.y, &data.mask).unwrap_err();
        assert_eq!(err, XGError::InvalidGridShape { what: "x corners", expected: 9, found: 8 });

        let area = vec![1.0; 5];
        let component = Component::new(0, data.as_grid()).with_area(&area);
        assert!(matches!(component.validate(), Err(XGError::InvalidGridShape { what: "cell area", .. })));
    }

    #[test]
    fn empty_grid_is_rejected()
    {
        assert!(Grid::new(0, 3, &[], &[], &[]).is_err());
    }
}
