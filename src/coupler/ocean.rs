use std::f64::consts::FRAC_PI_2;

use crate::errors::XGError;
use crate::storage::grid::GridData;

/// An ocean grid whose southern edge is within this (radians) of the pole is not extended.
pub const SOUTH_EDGE_TOLERANCE: f64 = 1.0e-7;

///
/// Prepends a row of masked cells reaching the south pole, so that an ocean grid
/// ending north of the pole still covers the whole atmosphere. The new corner row
/// repeats the longitudes of the first row. Returns the grid unchanged, and `false`,
/// when its first corner is already at the pole.
///
pub fn extend_south(grid: &GridData) -> (GridData, bool)
{
    let south = -FRAC_PI_2;
    if grid.y.first().map_or(true, |&lat| lat <= south + SOUTH_EDGE_TOLERANCE)
    {
        return (grid.clone(), false);
    }
    let nxp = grid.nx + 1;
    let mut x = Vec::with_capacity(grid.x.len() + nxp);
    x.extend_from_slice(&grid.x[..nxp]);
    x.extend_from_slice(&grid.x);
    let mut y = vec![south; nxp];
    y.extend_from_slice(&grid.y);
    let mut mask = vec![0.0; grid.nx];
    mask.extend_from_slice(&grid.mask);
    (GridData { nx: grid.nx, ny: grid.ny + 1, x, y, mask }, true)
}

///
/// Extends every tile of an ocean mosaic, or none of them. The decision is taken on the
/// first tile.
///
pub fn extend_mosaic_south(tiles: &[GridData]) -> (Vec<GridData>, bool)
{
    match tiles.first().map(extend_south)
    {
        Some((_, true)) => (tiles.iter().map(|t| extend_south(t).0).collect(), true),
        _ => (tiles.to_vec(), false),
    }
}

///
/// Ocean mask from bathymetry: 1 where `depth` lies below `sea_level`, 0 elsewhere.
/// With `extended_south` a masked row is prepended to match [`extend_south`].
///
pub fn mask_from_depth(depth: &[f64], nx: usize, sea_level: f64, extended_south: bool) -> Result<Vec<f64>, XGError>
{
    if nx == 0 || depth.len() % nx != 0
    {
        return Err(XGError::shape("depth", nx * (depth.len() / nx.max(1) + 1), depth.len()));
    }
    let mut mask = Vec::new();
    mask.try_reserve_exact(depth.len() + nx)?;
    if extended_south
    {
        mask.resize(nx, 0.0);
    }
    mask.extend(depth.iter().map(|&d| if d > sea_level { 1.0 } else { 0.0 }));
    Ok(mask)
}

/// The complement of an ocean mask, i.e. the land part of the ocean grid.
pub fn invert_mask(mask: &[f64]) -> Vec<f64>
{
    mask.iter().map(|m| 1.0 - m).collect()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn southern_row_is_added_once()
    {
        let grid = GridData::regular_lonlat(3, 2, [0.0, 360.0], [-70.0, 70.0]);
        let (ext, extended) = extend_south(&grid);
        assert!(extended);
        assert_eq!((ext.nx, ext.ny), (3, 3));
        assert!(ext.as_grid().validate().is_ok());
        assert_eq!(&ext.x[..4], &grid.x[..4]);
        assert_eq!(&ext.x[4..], &grid.x[..]);
        assert!(ext.y[..4].iter().all(|&lat| lat == -FRAC_PI_2));
        assert_eq!(&ext.mask[..3], &[0.0; 3]);

        let (again, extended) = extend_south(&ext);
        assert!(!extended);
        assert_eq!(again, ext);
    }

    #[test]
    fn mosaic_follows_first_tile()
    {
        let tiles = vec![
            GridData::regular_lonlat(2, 2, [0.0, 180.0], [-90.0, 0.0]),
            GridData::regular_lonlat(2, 2, [180.0, 360.0], [-60.0, 0.0]),
        ];
        let (out, extended) = extend_mosaic_south(&tiles);
        assert!(!extended);
        assert_eq!(out, tiles);

        let (out, extended) = extend_mosaic_south(&tiles[1..]);
        assert!(extended);
        assert_eq!(out[0].ny, 3);
    }

    #[test]
    fn depth_mask()
    {
        let depth = [-5.0, 0.0, 10.0, 3.0];
        assert_eq!(mask_from_depth(&depth, 2, 0.0, false).unwrap(), vec![0.0, 0.0, 1.0, 1.0]);
        assert_eq!(mask_from_depth(&depth, 2, 0.0, true).unwrap(), vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
        assert!(mask_from_depth(&depth, 3, 0.0, false).is_err());
        assert_eq!(invert_mask(&[1.0, 0.0, 1.0]), vec![0.0, 1.0, 0.0]);
    }
}
