use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// A corner closer than this (radians) to ±90° latitude is treated as sitting on the pole.
pub const POLE_TOLERANCE: f64 = 1.0e-10;

/// Capacity of a grid cell outline: four corners plus the vertices added for poles.
pub const CELL_VERTICES: usize = 8;
/// Capacity of a clipped outline: a cell outline clipped by another cell outline.
pub const CLIP_VERTICES: usize = 2 * CELL_VERTICES + 4;

pub type CellPolygon = Polygon<CELL_VERTICES>;
pub type ClipPolygon = Polygon<CLIP_VERTICES>;

/// Longitude differences within this (radians) of ±π keep the direction they were given.
pub const HALF_TURN_TOLERANCE: f64 = 1.0e-10;

///
/// Maps a longitude difference onto the shortest angular path, `[-π, π]`. A difference of
/// exactly half a turn is ambiguous and keeps its sign, so a grid with two columns per turn
/// still runs in its own index direction.
///
#[inline]
pub fn wrap_lon_delta(dlon: f64) -> f64
{
    if dlon.abs() <= PI + HALF_TURN_TOLERANCE
    {
        return dlon;
    }
    dlon - TAU * (dlon / TAU).round()
}

#[inline]
pub(crate) fn on_pole(lat: f64) -> bool
{
    (lat.abs() - FRAC_PI_2).abs() < POLE_TOLERANCE
}

///
/// True when the edge between two corners steps a full turn of longitude or more. Such an
/// edge has no shortest path, so the cell it bounds cannot be outlined. Edges ending on a
/// pole are exempt since a pole corner's longitude carries no information.
///
pub fn spans_full_turn(a: (f64, f64), b: (f64, f64)) -> bool
{
    !on_pole(a.1) && !on_pole(b.1) && (b.0 - a.0).abs() >= TAU - HALF_TURN_TOLERANCE
}

///
/// A spherical polygon stored as vertices in the (lon, lat) plane, radians, with a fixed
/// vertex capacity. Longitudes are unwrapped: consecutive vertices never jump by 2π.
///
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Polygon<const N: usize>
{
    lon: [f64; N],
    lat: [f64; N],
    len: usize,
}

impl<const N: usize> Default for Polygon<N>
{
    fn default() -> Self {
        Self { lon: [0.0; N], lat: [0.0; N], len: 0 }
    }
}

impl<const N: usize> Polygon<N>
{
    pub fn new() -> Self
    {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize
    {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.len == 0
    }

    #[inline]
    pub fn clear(&mut self)
    {
        self.len = 0;
    }

    ///
    /// Appends a vertex. Vertices past the capacity are dropped; no outline produced by
    /// this crate comes close to it.
    ///
    #[inline]
    pub fn push(&mut self, lon: f64, lat: f64)
    {
        debug_assert!(self.len < N, "polygon vertex capacity {N} exceeded");
        if self.len < N
        {
            self.lon[self.len] = lon;
            self.lat[self.len] = lat;
            self.len += 1;
        }
    }

    #[inline]
    pub fn vertex(&self, k: usize) -> (f64, f64)
    {
        (self.lon[k], self.lat[k])
    }

    #[inline]
    pub fn lon(&self) -> &[f64]
    {
        &self.lon[..self.len]
    }

    #[inline]
    pub fn lat(&self) -> &[f64]
    {
        &self.lat[..self.len]
    }

    pub fn vertices(&self) -> impl Iterator<Item = (f64, f64)> + '_
    {
        self.lon().iter().copied().zip(self.lat().iter().copied())
    }

    /// Copy into a polygon of a different capacity.
    pub fn resize<const M: usize>(&self) -> Polygon<M>
    {
        let mut r = Polygon::<M>::new();
        for (lon, lat) in self.vertices()
        {
            r.push(lon, lat);
        }
        r
    }

    /// Same outline moved by `dlon` radians of longitude.
    pub fn shifted(&self, dlon: f64) -> Self
    {
        let mut r = *self;
        for lon in &mut r.lon[..r.len]
        {
            *lon += dlon;
        }
        r
    }

    pub fn lon_bounds(&self) -> (f64, f64)
    {
        self.lon().iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    pub fn lat_bounds(&self) -> (f64, f64)
    {
        self.lat().iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Midpoint of the longitude extent.
    pub fn center_lon(&self) -> f64
    {
        let (lo, hi) = self.lon_bounds();
        0.5 * (lo + hi)
    }

    ///
    /// Twice the signed area in the (lon, lat) plane. Positive for counter-clockwise outlines.
    ///
    pub fn planar_signed_area2(&self) -> f64
    {
        let n = self.len;
        let mut a = 0.0;
        for k in 0..n
        {
            let kp = (k + 1) % n;
            a += self.lon[k] * self.lat[kp] - self.lon[kp] * self.lat[k];
        }
        a
    }

    ///
    /// Outline of a grid cell from its corners, taken in winding order.
    ///
    /// Longitudes are unwrapped along the shortest path between consecutive corners. A
    /// corner sitting on a pole has no meaningful longitude, so it is replaced by two pole
    /// vertices carrying the longitudes of its neighbours. An outline whose longitudes
    /// advance by a full turn encloses a pole and is closed through it.
    ///
    pub fn from_corners(lon: &[f64], lat: &[f64]) -> Self
    {
        let n = lon.len().min(lat.len());
        let mut r = Self::new();
        let Some(first) = (0..n).find(|&k| !on_pole(lat[k]))
        else
        {
            // every corner on a pole, zero area
            for k in 0..n
            {
                r.push(lon[k], lat[k]);
            }
            return r;
        };

        let mut prev_raw = lon[first];
        let mut current = lon[first];
        let mut pending_pole: Option<f64> = None;
        r.push(current, lat[first]);
        for step in 1..n
        {
            let k = (first + step) % n;
            if on_pole(lat[k])
            {
                pending_pole = Some(lat[k].signum() * FRAC_PI_2);
                continue;
            }
            let next = current + wrap_lon_delta(lon[k] - prev_raw);
            if let Some(pole) = pending_pole.take()
            {
                r.push(current, pole);
                r.push(next, pole);
            }
            r.push(next, lat[k]);
            prev_raw = lon[k];
            current = next;
        }

        let closing = current + wrap_lon_delta(lon[first] - prev_raw);
        if let Some(pole) = pending_pole.take()
        {
            r.push(current, pole);
            r.push(closing, pole);
        }
        let turn = closing - lon[first];
        if turn.abs() > PI
        {
            let mean_lat = r.lat().iter().sum::<f64>() / r.len() as f64;
            let pole = if mean_lat >= 0.0 { FRAC_PI_2 } else { -FRAC_PI_2 };
            r.push(closing, lat[first]);
            r.push(closing, pole);
            r.push(lon[first], pole);
        }
        r
    }

    /// True when the outline spans a full turn of longitude.
    pub fn encloses_pole(&self) -> bool
    {
        let (lo, hi) = self.lon_bounds();
        hi - lo >= TAU - POLE_TOLERANCE
    }

    pub fn touches_pole(&self) -> bool
    {
        self.lat().iter().any(|&v| on_pole(v))
    }
}
