use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

use crate::errors::XGError;
use crate::geometry::polygon::{CellPolygon, Polygon};
use crate::storage::grid::Grid;

/// Latitude differences below this use the along-latitude form of the edge integral.
const FLAT_EDGE: f64 = 1.0e-10;

///
/// Area of an outline on the unit sphere.
///
/// Each edge is a straight segment in the (lon, lat) plane and contributes the exact
/// line integral of `sin(lat) dlon` along it:
/// `-dlon * sin(mean_lat) * sin(dlat/2) / (dlat/2)`. The integral is additive, so the
/// pieces of a cell cut along straight segments sum to the area of the cell.
///
pub fn unit_area(lon: &[f64], lat: &[f64]) -> f64
{
    let n = lon.len();
    let mut area = 0.0;
    for k in 0..n
    {
        let kp = (k + 1) % n;
        let dx = lon[kp] - lon[k];
        if dx == 0.0
        {
            continue;
        }
        let (lat1, lat2) = (lat[kp], lat[k]);
        let mean = 0.5 * (lat1 + lat2);
        if (lat1 - lat2).abs() < FLAT_EDGE
        {
            area -= dx * mean.sin();
        }
        else
        {
            let dy = 0.5 * (lat1 - lat2);
            area -= dx * mean.sin() * dy.sin() / dy;
        }
    }
    area.abs()
}

/// Area of a polygon on a sphere of the given radius.
#[inline]
pub fn polygon_area<const N: usize>(polygon: &Polygon<N>, radius: f64) -> f64
{
    unit_area(polygon.lon(), polygon.lat()) * radius * radius
}

/// Outline of cell `(i, j)` of `grid`, corners in winding order.
#[inline]
pub fn cell_polygon(grid: &Grid, i: usize, j: usize) -> CellPolygon
{
    let corners = [grid.corner(i, j), grid.corner(i + 1, j), grid.corner(i + 1, j + 1), grid.corner(i, j + 1)];
    let lon = corners.map(|c| c.0);
    let lat = corners.map(|c| c.1);
    CellPolygon::from_corners(&lon, &lat)
}

///
/// Areas of every cell of `grid` (row-major, `nx * ny` entries), masked cells included.
///
pub fn grid_area(grid: &Grid, radius: f64) -> Result<Vec<f64>, XGError>
{
    grid.validate()?;
    grid.check_cell_spans()?;
    let nx = grid.nx;
    let mut area = Vec::new();
    area.try_reserve_exact(grid.ncells())?;
    (0..grid.ncells()).into_par_iter()
        .map(|c| polygon_area(&cell_polygon(grid, c % nx, c / nx), radius))
        .collect_into_vec(&mut area);
    Ok(area)
}
