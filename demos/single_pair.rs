use xgrid::{create_xgrid_order1, errors::XGError, GridData, SinglePairSlot, XgridConfig};

///
/// The four quarters of a cell, through both single pair entry points.
///
fn single_pair() -> Result<(), XGError>
{
    let src = GridData::regular_lonlat(2, 2, [0.0, 20.0], [-10.0, 10.0]);
    let dst = GridData::regular_lonlat(1, 1, [0.0, 20.0], [-10.0, 10.0]);
    let config = XgridConfig::default();

    let xgrid = create_xgrid_order1(&src.as_grid(), &dst.as_grid(), &config)?;
    for (s, d, area) in xgrid.iter()
    {
        println!("source {s} -> destination {d}: {area:.6e} m^2");
    }
    println!("total {:.6e} m^2", xgrid.total_area());

    let mut slot = SinglePairSlot::new(config);
    let nxgrid = slot.build_single_pair_overlap(&src.as_grid(), dst.nx, dst.ny, &dst.x, &dst.y)?;
    if let Err(e) = slot.build_single_pair_overlap(&src.as_grid(), dst.nx, dst.ny, &dst.x, &dst.y)
    {
        println!("second build refused: {e}");
    }
    let mut out_src = vec![0; nxgrid];
    let mut out_dst = vec![0; nxgrid];
    let mut out_area = vec![0.0; nxgrid];
    slot.drain_single_pair_result(nxgrid, &mut out_src, &mut out_dst, &mut out_area)?;
    println!("drained {nxgrid} cells: {out_src:?} -> {out_dst:?}");
    Ok(())
}

fn main()
{
    if let Err(e) = single_pair()
    {
        println!("single pair failed: {e}");
    }
}
