use criterion::{criterion_group, criterion_main, Criterion};
use xgrid::{algorithms::upbound::{get_upbound_nxcells_2dx2d, OverlapBounds}, algorithms::xgrid::create_xgrid_2dx2d_order1,
    errors::XGError, storage::cell_store::GridCellStruct, Component, CouplerConfig, DestinationXgrid, GridData, MosaicCoupler, XgridConfig};

fn build_pair() -> (GridData, GridData)
{
    // a coarse atmosphere over a finer, offset ocean
    let atm = GridData::regular_lonlat(96, 48, [0.0, 360.0], [-90.0, 90.0]);
    let ocn = GridData::regular_lonlat(180, 90, [-280.0, 80.0], [-90.0, 90.0]);
    (atm, ocn)
}

fn estimate_and_build(src: &GridData, dst: &GridData, bounds: &mut OverlapBounds) -> Result<usize, XGError>
{
    let cfg = XgridConfig::default();
    let cells = GridCellStruct::build(&dst.as_grid(), cfg.radius)?;
    bounds.reset();
    let jend = dst.ny - 1;
    let upbound = get_upbound_nxcells_2dx2d(&src.as_grid(), &dst.as_grid(), 0, jend, &cells, bounds, &cfg)?;
    let (nxgrid, _) = create_xgrid_2dx2d_order1(&src.as_grid(), &dst.as_grid(), 0, jend, upbound, &cells, bounds, &cfg)?;
    Ok(nxgrid)
}

fn run_single_pair(c: &mut Criterion)
{
    let (atm, ocn) = build_pair();
    let mut bounds = OverlapBounds::new(atm.nx * atm.ny).unwrap();
    c.bench_function("atm x ocn", |b|b.iter(||estimate_and_build(&atm, &ocn, &mut bounds).unwrap()));
}

fn component(tiles: &[GridData]) -> Vec<Component<'_>>
{
    tiles.iter().enumerate().map(|(i, t)| Component::new(i, t.as_grid())).collect()
}

fn run_mosaic(c: &mut Criterion)
{
    let atm: Vec<GridData> = (0..6).map(|t| GridData::regular_lonlat(32, 48, [60.0 * t as f64, 60.0 * (t + 1) as f64], [-90.0, 90.0])).collect();
    let lnd = vec![GridData::regular_lonlat(144, 30, [0.0, 360.0], [30.0, 90.0])];
    let ocn = vec![GridData::regular_lonlat(180, 60, [0.0, 360.0], [-90.0, 30.0])];
    let (atm_c, lnd_c, ocn_c) = (component(&atm), component(&lnd), component(&ocn));
    let coupler = MosaicCoupler::new(CouplerConfig::default());
    c.bench_function("mosaic", |b|b.iter(|| {
        let mut atmxlnd = vec![DestinationXgrid::default(); 1];
        let mut atmxocn = vec![DestinationXgrid::default(); 1];
        coupler.run(&atm_c, &lnd_c, &ocn_c, &mut atmxlnd, &mut atmxocn).unwrap()
    }));
}

criterion_group!(benches, run_single_pair, run_mosaic);
criterion_main!(benches);
