use serde::{Deserialize, Serialize};

/// Mean earth radius in metres, the radius used for every area unless overridden.
pub const EARTH_RADIUS: f64 = 6371000.0;

///
/// Geometric tolerances shared by the bound estimator and the exchange grid builder.
///
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XgridConfig
{
    /// An overlap whose area relative to the smaller of its two parent cells is at
    /// or below this ratio is degenerate and dropped.
    pub area_ratio_thresh: f64,
    /// Slack (radians) added to bounding-box comparisons.
    pub bbox_slack: f64,
    /// Sphere radius used for all areas.
    pub radius: f64,
}

impl Default for XgridConfig
{
    fn default() -> Self {
        Self { area_ratio_thresh: 1.0e-6, bbox_slack: 1.0e-9, radius: EARTH_RADIUS }
    }
}

///
/// Options for the multi-tile coupling driver.
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouplerConfig
{
    pub xgrid: XgridConfig,
    /// The ocean tiles carry one synthetic southern row (see `coupler::ocean::extend_south`).
    /// The row is skipped by the search and destination indices are reported relative to the
    /// un-extended ocean grid.
    pub ocn_extended_south: bool,
    /// Modelled accelerator memory. `None` means unlimited.
    pub device_capacity_bytes: Option<usize>,
}

impl CouplerConfig
{
    pub fn with_extended_south(mut self, extended: bool) -> Self
    {
        self.ocn_extended_south = extended;
        self
    }

    pub fn with_device_capacity(mut self, bytes: usize) -> Self
    {
        self.device_capacity_bytes = Some(bytes);
        self
    }
}
