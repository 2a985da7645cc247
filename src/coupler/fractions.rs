use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxBuildHasher;

use crate::algorithms::xgrid::InterpPerInputTile;
use crate::coupler::mosaic::DestinationXgrid;
use crate::errors::XGError;

/// Exchange area keyed by `(input tile, source cell, destination cell)`.
pub type PairAreas = IndexMap<(usize, usize, usize), f64, FxBuildHasher>;

fn accumulate(total: &mut [f64], index: usize, area: f64, what: &'static str) -> Result<(), XGError>
{
    let n = total.len();
    let slot = total.get_mut(index).ok_or(XGError::shape(what, n, index + 1))?;
    *slot += area;
    Ok(())
}

fn ratio(part: &[f64], whole: &[f64]) -> Vec<f64>
{
    part.iter().zip(whole).map(|(p, w)| if *w > 0.0 { p / w } else { 0.0 }).collect()
}

///
/// Exchange area landing on each cell of the destination tile, summed over every
/// atmosphere tile.
///
pub fn destination_exchange_area(dst_ncells: usize, xgrid: &DestinationXgrid) -> Result<Vec<f64>, XGError>
{
    let mut total = vec![0.0; dst_ncells];
    for x in &xgrid.per_input_tile
    {
        for (_, d, area) in x.iter()
        {
            accumulate(&mut total, d, area, "destination cells")?;
        }
    }
    Ok(total)
}

/// Covered fraction of each destination cell, e.g. the ocean fraction of an ocean grid.
pub fn destination_fraction(dst_area: &[f64], xgrid: &DestinationXgrid) -> Result<Vec<f64>, XGError>
{
    let covered = destination_exchange_area(dst_area.len(), xgrid)?;
    Ok(ratio(&covered, dst_area))
}

///
/// Exchange area leaving each cell of atmosphere tile `src_tile`, summed over every
/// destination tile in `xgrids`.
///
pub fn source_exchange_area(src_tile: usize, src_ncells: usize, xgrids: &[DestinationXgrid]) -> Result<Vec<f64>, XGError>
{
    let mut total = vec![0.0; src_ncells];
    for x in xgrids.iter().filter_map(|x| x.for_input_tile(src_tile))
    {
        for (s, _, area) in x.iter()
        {
            accumulate(&mut total, s, area, "source cells")?;
        }
    }
    Ok(total)
}

/// Covered fraction of each source cell, e.g. the land fraction of an atmosphere tile.
pub fn source_fraction(src_tile: usize, src_area: &[f64], xgrids: &[DestinationXgrid]) -> Result<Vec<f64>, XGError>
{
    let covered = source_exchange_area(src_tile, src_area.len(), xgrids)?;
    Ok(ratio(&covered, src_area))
}

///
/// Collapses an exchange grid onto its source grid: entries at or below
/// `ratio_thresh` of their source cell's area are dropped, and runs of entries with the
/// same source cell are merged into one. The result maps each source cell onto itself,
/// e.g. the atmosphere/land exchange derived from the land part of the ocean grid.
///
pub fn merge_by_source(xgrid: &InterpPerInputTile, src_area: &[f64], ratio_thresh: f64) -> Result<InterpPerInputTile, XGError>
{
    let mut merged = InterpPerInputTile { input_tile: xgrid.input_tile, output_tile: xgrid.input_tile, ..Default::default() };
    for (s, _, area) in xgrid.iter()
    {
        let cell_area = *src_area.get(s).ok_or(XGError::shape("source area", s + 1, src_area.len()))?;
        if area / cell_area <= ratio_thresh
        {
            continue;
        }
        match (merged.input_parent_cell_index.last(), merged.xcell_area.last_mut())
        {
            (Some(&last), Some(total)) if last == s => *total += area,
            _ => {
                merged.input_parent_cell_index.push(s);
                merged.output_parent_cell_index.push(s);
                merged.xcell_area.push(area);
            }
        }
    }
    Ok(merged)
}

///
/// Exchange areas over all destination tiles, one entry per distinct
/// `(input tile, source cell, destination cell)` in first-seen order.
///
pub fn pair_areas(xgrid: &DestinationXgrid) -> PairAreas
{
    let mut areas = PairAreas::default();
    for x in &xgrid.per_input_tile
    {
        for (s, d, area) in x.iter()
        {
            *areas.entry((x.input_tile, s, d)).or_insert(0.0) += area;
        }
    }
    areas
}

/// Atmosphere tiles with at least one exchange cell, in first-seen order.
pub fn contributing_tiles(xgrids: &[DestinationXgrid]) -> IndexSet<usize>
{
    xgrids.iter()
        .flat_map(|x| &x.per_input_tile)
        .filter(|x| !x.is_empty())
        .map(|x| x.input_tile)
        .collect()
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn xgrid(input_tile: usize, output_tile: usize, entries: &[(usize, usize, f64)]) -> InterpPerInputTile
    {
        InterpPerInputTile {
            input_tile,
            output_tile,
            input_parent_cell_index: entries.iter().map(|e| e.0).collect(),
            output_parent_cell_index: entries.iter().map(|e| e.1).collect(),
            xcell_area: entries.iter().map(|e| e.2).collect(),
        }
    }

    fn ocean() -> DestinationXgrid
    {
        DestinationXgrid {
            output_tile: 1,
            per_input_tile: vec![
                xgrid(1, 1, &[(0, 0, 1.0), (0, 1, 2.0), (3, 1, 1.0)]),
                xgrid(2, 1, &[(1, 1, 0.5), (2, 2, 4.0)]),
                xgrid(3, 1, &[]),
            ],
        }
    }

    #[test]
    fn destination_fractions()
    {
        let x = ocean();
        assert_eq!(destination_exchange_area(3, &x).unwrap(), vec![1.0, 3.5, 4.0]);
        assert_eq!(destination_fraction(&[2.0, 3.5, 0.0], &x).unwrap(), vec![0.5, 1.0, 0.0]);
        assert!(destination_exchange_area(2, &x).is_err());
    }

    #[test]
    fn source_fractions()
    {
        let x = [ocean()];
        assert_eq!(source_exchange_area(1, 4, &x).unwrap(), vec![3.0, 0.0, 0.0, 1.0]);
        assert_eq!(source_fraction(2, &[1.0, 1.0, 8.0], &x).unwrap(), vec![0.0, 0.5, 0.5]);
        assert_eq!(source_exchange_area(7, 2, &x).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn merge_drops_slivers_and_joins_runs()
    {
        let x = xgrid(2, 5, &[(0, 0, 1.0), (0, 1, 2.0), (1, 1, 1.0e-9), (2, 1, 1.0), (2, 2, 1.0), (0, 3, 1.0)]);
        let merged = merge_by_source(&x, &[10.0, 10.0, 10.0], 1.0e-6).unwrap();
        assert_eq!(merged.input_tile, 2);
        assert_eq!(merged.output_tile, 2);
        assert_eq!(merged.input_parent_cell_index, vec![0, 2, 0]);
        assert_eq!(merged.output_parent_cell_index, vec![0, 2, 0]);
        assert_eq!(merged.xcell_area, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn pair_areas_and_tiles()
    {
        let mut x = ocean();
        x.per_input_tile[0].input_parent_cell_index.push(0);
        x.per_input_tile[0].output_parent_cell_index.push(1);
        x.per_input_tile[0].xcell_area.push(0.25);
        let areas = pair_areas(&x);
        assert_eq!(areas.len(), 5);
        assert_eq!(areas[&(1, 0, 1)], 2.25);
        assert_eq!(areas.get_index(0).map(|(k, _)| *k), Some((1, 0, 0)));

        let tiles = contributing_tiles(&[x]);
        assert_eq!(tiles.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }
}
