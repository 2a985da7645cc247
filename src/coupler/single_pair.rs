use tracing::debug;

use crate::algorithms::upbound::{get_upbound_nxcells_2dx2d, OverlapBounds};
use crate::algorithms::xgrid::{create_xgrid_2dx2d_order1, InterpPerInputTile};
use crate::config::XgridConfig;
use crate::errors::{StaleAccess, XGError};
use crate::storage::cell_store::GridCellStruct;
use crate::storage::grid::Grid;

///
/// Exchange grid between one source grid and one destination grid, searched over every
/// destination row. The result is owned by the caller; nothing is kept between calls.
///
pub fn create_xgrid_order1(src: &Grid, dst: &Grid, config: &XgridConfig) -> Result<InterpPerInputTile, XGError>
{
    src.validate()?;
    dst.validate()?;
    let mut cells = GridCellStruct::build(dst, config.radius)?;
    let mut bounds = OverlapBounds::new(src.ncells())?;
    let jend = dst.ny - 1;
    let upbound = get_upbound_nxcells_2dx2d(src, dst, 0, jend, &cells, &mut bounds, config)?;
    let (nxgrid, xgrid) = create_xgrid_2dx2d_order1(src, dst, 0, jend, upbound, &cells, &bounds, config)?;
    cells.release();
    debug!(upbound, nxgrid, "single pair exchange grid");
    Ok(xgrid)
}

///
/// Holder for at most one pending single-pair result, built by
/// [`build_single_pair_overlap`](Self::build_single_pair_overlap) and handed out by
/// [`drain_single_pair_result`](Self::drain_single_pair_result). Building again before
/// draining, or draining with nothing pending, is a [`XGError::StaleResultAccess`].
///
#[derive(Clone, Debug, Default)]
pub struct SinglePairSlot
{
    config: XgridConfig,
    pending: Option<InterpPerInputTile>,
}

impl SinglePairSlot
{
    pub fn new(config: XgridConfig) -> Self
    {
        Self { config, pending: None }
    }

    pub fn is_pending(&self) -> bool
    {
        self.pending.is_some()
    }

    ///
    /// Overlaps a masked source grid with a destination grid whose cells are all active.
    /// Returns the number of exchange cells now pending.
    ///
    pub fn build_single_pair_overlap(&mut self, src: &Grid, nx_dst: usize, ny_dst: usize, x_dst: &[f64], y_dst: &[f64]) -> Result<usize, XGError>
    {
        if self.pending.is_some()
        {
            return Err(XGError::StaleResultAccess(StaleAccess::ResultPending));
        }
        let mut dst_mask = Vec::new();
        dst_mask.try_reserve_exact(nx_dst * ny_dst)?;
        dst_mask.resize(nx_dst * ny_dst, 1.0);
        let dst = Grid::new(nx_dst, ny_dst, x_dst, y_dst, &dst_mask)?;
        let xgrid = create_xgrid_order1(src, &dst, &self.config)?;
        let nxgrid = xgrid.nxgrid();
        self.pending = Some(xgrid);
        Ok(nxgrid)
    }

    ///
    /// Copies the pending result into the caller's buffers, each `nxgrid` long, and
    /// clears the slot. On error the pending result is left in place.
    ///
    pub fn drain_single_pair_result(&mut self, nxgrid: usize, out_src: &mut [usize], out_dst: &mut [usize], out_area: &mut [f64]) -> Result<(), XGError>
    {
        let pending = self.pending.as_ref().ok_or(XGError::StaleResultAccess(StaleAccess::NoPendingResult))?;
        if pending.nxgrid() != nxgrid
        {
            return Err(XGError::StaleResultAccess(StaleAccess::LengthMismatch { expected: pending.nxgrid(), found: nxgrid }));
        }
        for len in [out_src.len(), out_dst.len(), out_area.len()]
        {
            if len != nxgrid
            {
                return Err(XGError::shape("output buffer", nxgrid, len));
            }
        }
        out_src.copy_from_slice(&pending.input_parent_cell_index);
        out_dst.copy_from_slice(&pending.output_parent_cell_index);
        out_area.copy_from_slice(&pending.xcell_area);
        self.pending = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::storage::grid::GridData;

    #[test]
    fn repeated_calls_are_independent()
    {
        let src = GridData::regular_lonlat(4, 4, [0.0, 40.0], [0.0, 40.0]);
        let dst = GridData::regular_lonlat(3, 3, [5.0, 35.0], [5.0, 35.0]);
        let cfg = XgridConfig::default();
        let a = create_xgrid_order1(&src.as_grid(), &dst.as_grid(), &cfg).unwrap();
        let b = create_xgrid_order1(&src.as_grid(), &dst.as_grid(), &cfg).unwrap();
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn slot_holds_one_result_at_a_time()
    {
        let src = GridData::regular_lonlat(2, 2, [0.0, 20.0], [-10.0, 10.0]);
        let dst = GridData::regular_lonlat(1, 1, [0.0, 20.0], [-10.0, 10.0]);
        let mut slot = SinglePairSlot::default();

        let nxgrid = slot.build_single_pair_overlap(&src.as_grid(), 1, 1, &dst.x, &dst.y).unwrap();
        assert_eq!(nxgrid, 4);
        assert!(slot.is_pending());
        let again = slot.build_single_pair_overlap(&src.as_grid(), 1, 1, &dst.x, &dst.y);
        assert_eq!(again, Err(XGError::StaleResultAccess(StaleAccess::ResultPending)));

        let (mut s, mut d, mut a) = (vec![0; 3], vec![0; 3], vec![0.0; 3]);
        let wrong = slot.drain_single_pair_result(3, &mut s, &mut d, &mut a);
        assert_eq!(wrong, Err(XGError::StaleResultAccess(StaleAccess::LengthMismatch { expected: 4, found: 3 })));
        assert!(slot.is_pending());

        let (mut s, mut d, mut a) = (vec![0; 4], vec![9; 4], vec![0.0; 4]);
        slot.drain_single_pair_result(4, &mut s, &mut d, &mut a).unwrap();
        assert_eq!(s, vec![0, 1, 2, 3]);
        assert_eq!(d, vec![0; 4]);
        assert!((a[0] - a[3]).abs() < 1e-9 * a[0]);
        assert!(!slot.is_pending());

        let empty = slot.drain_single_pair_result(4, &mut s, &mut d, &mut a);
        assert_eq!(empty, Err(XGError::StaleResultAccess(StaleAccess::NoPendingResult)));
    }

    #[test]
    fn source_mask_is_honoured()
    {
        let src = GridData::regular_lonlat(2, 1, [0.0, 20.0], [0.0, 10.0]).with_mask(vec![1.0, 0.0]);
        let dst = GridData::regular_lonlat(1, 1, [0.0, 20.0], [0.0, 10.0]);
        let mut slot = SinglePairSlot::new(XgridConfig::default());
        assert_eq!(slot.build_single_pair_overlap(&src.as_grid(), 1, 1, &dst.x, &dst.y), Ok(1));
    }
}
