use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::algorithms::upbound::{get_upbound_nxcells_2dx2d, OverlapBounds};
use crate::algorithms::xgrid::{create_xgrid_2dx2d_order1_with_diagnostics, InterpPerInputTile, OverlapDiagnostics};
use crate::config::CouplerConfig;
use crate::errors::XGError;
use crate::residency::ResidencyManager;
use crate::serialization::{deserialize, serialize, SerializationFormat};
use crate::storage::cell_store::GridCellStruct;
use crate::storage::grid::{Component, Grid};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExchangeKind
{
    Land,
    Ocean,
}

///
/// Every exchange grid onto one destination tile, one entry per contributing
/// atmosphere tile, in atmosphere tile order. Combining them is left to the caller
/// (see [`fractions`](crate::coupler::fractions)).
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DestinationXgrid
{
    pub output_tile: usize,
    pub per_input_tile: Vec<InterpPerInputTile>,
}

impl DestinationXgrid
{
    pub fn new(output_tile: usize) -> Self
    {
        Self { output_tile, per_input_tile: Vec::new() }
    }

    pub fn push(&mut self, xgrid: InterpPerInputTile)
    {
        self.per_input_tile.push(xgrid);
    }

    /// Exchange cells over all atmosphere tiles.
    pub fn nxgrid(&self) -> usize
    {
        self.per_input_tile.iter().map(InterpPerInputTile::nxgrid).sum()
    }

    pub fn total_area(&self) -> f64
    {
        self.per_input_tile.iter().map(InterpPerInputTile::total_area).sum()
    }

    pub fn for_input_tile(&self, input_tile: usize) -> Option<&InterpPerInputTile>
    {
        self.per_input_tile.iter().find(|x| x.input_tile == input_tile)
    }

    pub fn save(&self, path: &str) -> Result<(), XGError>
    {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path).map_err(|_|XGError::FileIOError)?);
        let buffer = serialize(self, SerializationFormat::BincodeLz4)?;
        file.write_all(&buffer).map_err(|_|XGError::WriteBufferFailed)?;
        Ok(())
    }

    /// Decodes a saved destination. Any inconsistent per-tile record is refused.
    pub fn read_buffer(buffer: &[u8]) -> Result<Self, XGError>
    {
        let xgrid: Self = deserialize(buffer, SerializationFormat::BincodeLz4)?;
        if !xgrid.per_input_tile.iter().all(InterpPerInputTile::is_consistent)
        {
            return Err(XGError::DeserializationFailed);
        }
        Ok(xgrid)
    }

    pub fn read<Reader: std::io::Read>(mut reader: Reader) -> Result<Self, XGError>
    {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(|_|XGError::ReadBufferFailed)?;
        Self::read_buffer(&bytes)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PairReport
{
    pub kind: ExchangeKind,
    pub atm_tile: usize,
    pub dst_tile: usize,
    pub upbound: usize,
    pub nxgrid: usize,
    pub diagnostics: OverlapDiagnostics,
}

/// A tile pair that failed without aborting the run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PairFailure
{
    pub kind: ExchangeKind,
    pub atm_tile: usize,
    pub dst_tile: usize,
    pub error: XGError,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CouplingReport
{
    pub pairs: Vec<PairReport>,
    pub failures: Vec<PairFailure>,
}

impl CouplingReport
{
    pub fn is_complete(&self) -> bool
    {
        self.failures.is_empty()
    }

    pub fn nxgrid(&self, kind: ExchangeKind) -> usize
    {
        self.pairs.iter().filter(|p| p.kind == kind).map(|p| p.nxgrid).sum()
    }

    pub fn degenerate(&self) -> usize
    {
        self.pairs.iter().map(|p| p.diagnostics.degenerate).sum()
    }
}

///
/// Multi-tile driver: every atmosphere tile against every land tile and every ocean tile.
///
/// Tile pairs run one after another and share one [`OverlapBounds`] per atmosphere
/// tile, reset before each destination tile. Input arrays are staged through the
/// coupler's [`ResidencyManager`] for exactly the scope that uses them.
///
#[derive(Debug, Default)]
pub struct MosaicCoupler
{
    config: CouplerConfig,
    residency: ResidencyManager,
}

struct PairResult
{
    report: PairReport,
    xgrid: InterpPerInputTile,
}

impl MosaicCoupler
{
    pub fn new(config: CouplerConfig) -> Self
    {
        let residency = ResidencyManager::new(config.device_capacity_bytes);
        Self { config, residency }
    }

    pub fn config(&self) -> &CouplerConfig
    {
        &self.config
    }

    pub fn residency(&self) -> &ResidencyManager
    {
        &self.residency
    }

    fn validate(&self, atm: &[Component], lnd: &[Component], ocn: &[Component],
        atmxlnd_out: &[DestinationXgrid], atmxocn_out: &[DestinationXgrid]) -> Result<(), XGError>
    {
        for c in atm.iter().chain(lnd).chain(ocn)
        {
            c.validate()?;
        }
        if atmxlnd_out.len() != lnd.len()
        {
            return Err(XGError::shape("land output slots", lnd.len(), atmxlnd_out.len()));
        }
        if atmxocn_out.len() != ocn.len()
        {
            return Err(XGError::shape("ocean output slots", ocn.len(), atmxocn_out.len()));
        }
        if self.config.ocn_extended_south
        {
            if let Some(c) = ocn.iter().find(|c| c.grid.ny < 2)
            {
                return Err(XGError::shape("extended ocean rows", 2, c.grid.ny));
            }
        }
        Ok(())
    }

    fn row_window(&self, kind: ExchangeKind, dst: &Grid) -> (usize, usize)
    {
        match kind
        {
            ExchangeKind::Ocean if self.config.ocn_extended_south => (1, dst.ny - 1),
            _ => (0, dst.ny - 1),
        }
    }

    fn couple_pair(&self, kind: ExchangeKind, atm_tile: usize, atm: &Grid, dst: &Component, bounds: &mut OverlapBounds) -> Result<PairResult, XGError>
    {
        bounds.reset();
        let x = self.residency.copy_in("dst x", dst.grid.x)?;
        let y = self.residency.copy_in("dst y", dst.grid.y)?;
        let mask = self.residency.copy_in("dst mask", dst.grid.mask)?;
        let grid = Grid::new(dst.grid.nx, dst.grid.ny, &x, &y, &mask)?;

        let xcfg = &self.config.xgrid;
        let mut cells = GridCellStruct::build(&grid, xcfg.radius)?;
        let _cells_on_device = self.residency.reserve("dst cells", cells.memory_bytes())?;
        let (jstart, jend) = self.row_window(kind, &grid);

        let upbound = get_upbound_nxcells_2dx2d(atm, &grid, jstart, jend, &cells, bounds, xcfg)?;
        let _candidates_on_device = self.residency.reserve("candidates", bounds.candidate_bytes())?;
        let (nxgrid, mut xgrid, diagnostics) =
            create_xgrid_2dx2d_order1_with_diagnostics(atm, &grid, jstart, jend, upbound, &cells, bounds, xcfg)?;
        cells.release();

        if kind == ExchangeKind::Ocean && self.config.ocn_extended_south
        {
            xgrid.drop_output_rows(grid.nx, 1);
        }
        debug!(?kind, atm_tile, dst_tile = dst.itile, upbound, nxgrid, degenerate = diagnostics.degenerate, "tile pair done");
        let report = PairReport { kind, atm_tile, dst_tile: dst.itile, upbound, nxgrid, diagnostics };
        Ok(PairResult { report, xgrid: xgrid.tagged(atm_tile, dst.itile) })
    }

    ///
    /// Couples every atmosphere tile with every land and ocean tile.
    ///
    /// `atmxlnd_out[j]` and `atmxocn_out[j]` are overwritten with one exchange grid per
    /// atmosphere tile. Shape errors are reported before anything is staged. A fatal error
    /// ([`XGError::is_fatal`]) aborts the run; any other failure is recorded for its tile
    /// pair and the run moves on.
    ///
    pub fn run(&self, atm: &[Component], lnd: &[Component], ocn: &[Component],
        atmxlnd_out: &mut [DestinationXgrid], atmxocn_out: &mut [DestinationXgrid]) -> Result<CouplingReport, XGError>
    {
        self.validate(atm, lnd, ocn, atmxlnd_out, atmxocn_out)?;
        for (out, c) in atmxlnd_out.iter_mut().zip(lnd).chain(atmxocn_out.iter_mut().zip(ocn))
        {
            *out = DestinationXgrid::new(c.itile);
        }

        let mut report = CouplingReport::default();
        for a in atm
        {
            let x = self.residency.copy_in("atm x", a.grid.x)?;
            let y = self.residency.copy_in("atm y", a.grid.y)?;
            let mask = self.residency.copy_in("atm mask", a.grid.mask)?;
            let atm_grid = Grid::new(a.grid.nx, a.grid.ny, &x, &y, &mask)?;
            let mut bounds = OverlapBounds::new(atm_grid.ncells())?;
            let _bounds_on_device = self.residency.reserve("overlap bounds", bounds.memory_bytes())?;

            let passes = [(ExchangeKind::Land, lnd, &mut *atmxlnd_out), (ExchangeKind::Ocean, ocn, &mut *atmxocn_out)];
            for (kind, tiles, outputs) in passes
            {
                for (dst, out) in tiles.iter().zip(outputs.iter_mut())
                {
                    match self.couple_pair(kind, a.itile, &atm_grid, dst, &mut bounds)
                    {
                        Ok(pair) => {
                            report.pairs.push(pair.report);
                            out.push(pair.xgrid);
                        }
                        Err(error) if error.is_fatal() => return Err(error),
                        Err(error) => {
                            warn!(?kind, atm_tile = a.itile, dst_tile = dst.itile, %error, "tile pair failed");
                            report.failures.push(PairFailure { kind, atm_tile: a.itile, dst_tile: dst.itile, error });
                        }
                    }
                }
            }
        }
        info!(
            atm_tiles = atm.len(), lnd_tiles = lnd.len(), ocn_tiles = ocn.len(),
            lnd_nxgrid = report.nxgrid(ExchangeKind::Land), ocn_nxgrid = report.nxgrid(ExchangeKind::Ocean),
            failures = report.failures.len(), peak_device_bytes = self.residency.stats().peak_bytes,
            "coupled mosaic"
        );
        Ok(report)
    }
}

///
/// Runs a [`MosaicCoupler`] built from `config` once.
///
pub fn couple_mosaic(config: &CouplerConfig, atm: &[Component], lnd: &[Component], ocn: &[Component],
    atmxlnd_out: &mut [DestinationXgrid], atmxocn_out: &mut [DestinationXgrid]) -> Result<CouplingReport, XGError>
{
    MosaicCoupler::new(config.clone()).run(atm, lnd, ocn, atmxlnd_out, atmxocn_out)
}
