use xgrid::{coupler::fractions::{destination_fraction, source_fraction}, coupler::ocean::{extend_mosaic_south, invert_mask},
    errors::XGError, geometry::sphere::grid_area, Component, CouplerConfig, DestinationXgrid, GridData, MosaicCoupler};

fn components(tiles: &[GridData]) -> Vec<Component<'_>>
{
    tiles.iter().enumerate().map(|(i, t)| Component::new(i + 1, t.as_grid())).collect()
}

///
/// A two tile atmosphere coupled with one land tile and an ocean that stops at 78S.
///
fn coupled_mosaic() -> Result<(), XGError>
{
    let atm = vec![
        GridData::regular_lonlat(48, 45, [0.0, 180.0], [-90.0, 90.0]),
        GridData::regular_lonlat(48, 45, [180.0, 360.0], [-90.0, 90.0]),
    ];
    // land everywhere north of 40N, ocean below, except a continent of masked ocean cells
    let lnd = vec![GridData::regular_lonlat(72, 20, [0.0, 360.0], [40.0, 90.0])];
    let ocean_mask: Vec<f64> = (0..120 * 59).map(|c| if (c % 120) < 20 && (c / 120) > 30 { 0.0 } else { 1.0 }).collect();
    let ocn = vec![GridData::regular_lonlat(120, 59, [-300.0, 60.0], [-78.0, 40.0]).with_mask(ocean_mask)];
    let (ocn, extended) = extend_mosaic_south(&ocn);
    println!("ocean extended to the south pole: {extended}");

    let config = CouplerConfig::default().with_extended_south(extended);
    let coupler = MosaicCoupler::new(config);
    let mut atmxlnd = vec![DestinationXgrid::default(); lnd.len()];
    let mut atmxocn = vec![DestinationXgrid::default(); ocn.len()];
    let report = coupler.run(&components(&atm), &components(&lnd), &components(&ocn), &mut atmxlnd, &mut atmxocn)?;
    for p in &report.pairs
    {
        println!("{:?} atm tile {} x tile {}: upbound {}, nxgrid {}, degenerate {}",
            p.kind, p.atm_tile, p.dst_tile, p.upbound, p.nxgrid, p.diagnostics.degenerate);
    }
    println!("peak device memory: {} bytes", coupler.residency().stats().peak_bytes);

    let radius = coupler.config().xgrid.radius;
    // fractions are reported on the ocean grid as the model sees it, without the extra row
    let ocn_model = &ocn[0];
    let ocn_area = grid_area(&ocn_model.as_grid(), radius)?;
    let ocn_area = &ocn_area[ocn_model.nx..];
    let fraction = destination_fraction(ocn_area, &atmxocn[0])?;
    let wet = fraction.iter().filter(|&&f| f > 0.999).count();
    println!("ocean cells fully covered: {wet} of {}", fraction.len());
    let land_part = invert_mask(&ocn_model.mask[ocn_model.nx..]);
    println!("ocean cells marked land: {}", land_part.iter().filter(|&&m| m > 0.0).count());

    for (t, a) in atm.iter().enumerate()
    {
        let area = grid_area(&a.as_grid(), radius)?;
        let land = source_fraction(t + 1, &area, &atmxlnd)?;
        let sea = source_fraction(t + 1, &area, &atmxocn)?;
        let max_total = land.iter().zip(&sea).map(|(l, s)| l + s).fold(0.0, f64::max);
        println!("atm tile {}: max land + ocean fraction {max_total:.12}", t + 1);
    }
    Ok(())
}

fn main()
{
    if let Err(e) = coupled_mosaic()
    {
        println!("coupling failed: {e}");
    }
}
