use std::f64::consts::TAU;

use crate::geometry::polygon::{ClipPolygon, Polygon};
use crate::geometry::sphere::unit_area;

///
/// Sutherland–Hodgman clip of `subject` against the convex outline `window`, both in the
/// (lon, lat) plane. Vertices on a window edge count as inside. Returns an empty polygon
/// when the window is degenerate or the two do not overlap.
///
pub fn clip_polygon<const N: usize, const M: usize>(subject: &Polygon<N>, window: &Polygon<M>) -> ClipPolygon
{
    let orientation = window.planar_signed_area2().signum();
    if orientation == 0.0 || subject.len() < 3
    {
        return ClipPolygon::new();
    }
    let mut current: ClipPolygon = subject.resize();
    let mut next = ClipPolygon::new();
    let m = window.len();
    for e in 0..m
    {
        let (ax, ay) = window.vertex(e);
        let (bx, by) = window.vertex((e + 1) % m);
        let (dx, dy) = (bx - ax, by - ay);
        if dx == 0.0 && dy == 0.0
        {
            continue;
        }
        let side = |x: f64, y: f64| orientation * (dx * (y - ay) - dy * (x - ax));

        next.clear();
        let n = current.len();
        for k in 0..n
        {
            let (sx, sy) = current.vertex((k + n - 1) % n);
            let (px, py) = current.vertex(k);
            let cs = side(sx, sy);
            let cp = side(px, py);
            if cp >= 0.0
            {
                if cs < 0.0
                {
                    let t = cs / (cs - cp);
                    next.push(sx + t * (px - sx), sy + t * (py - sy));
                }
                next.push(px, py);
            }
            else if cs >= 0.0
            {
                let t = cs / (cs - cp);
                next.push(sx + t * (px - sx), sy + t * (py - sy));
            }
        }
        std::mem::swap(&mut current, &mut next);
        if current.len() < 3
        {
            return ClipPolygon::new();
        }
    }
    current
}

#[inline]
fn ranges_overlap(a: (f64, f64), b: (f64, f64), slack: f64) -> bool
{
    b.0 <= a.1 + slack && b.1 >= a.0 - slack
}

///
/// Longitude shifts (multiples of 2π) under which `dst` may overlap `src`.
///
/// Both ranges are unwrapped longitude extents no wider than a full turn, so only the
/// three multiples of 2π nearest the difference of their centres can bring them together.
///
pub fn candidate_shifts(src: (f64, f64), dst: (f64, f64), slack: f64) -> impl Iterator<Item = f64>
{
    let k0 = ((0.5 * (src.0 + src.1) - 0.5 * (dst.0 + dst.1)) / TAU).round();
    (-1..=1).map(move |k| (k0 + k as f64) * TAU)
        .filter(move |&s| ranges_overlap(src, (dst.0 + s, dst.1 + s), slack))
}

/// True when two unwrapped longitude extents intersect modulo 2π.
#[inline]
pub fn lon_ranges_intersect(src: (f64, f64), dst: (f64, f64), slack: f64) -> bool
{
    candidate_shifts(src, dst, slack).next().is_some()
}

///
/// Area on the unit sphere shared by two cell outlines.
///
/// The destination is tried at every longitude shift that can reach the source and the
/// clipped pieces are summed. Cells across the date line, or enclosing a pole, need no
/// other treatment.
///
pub fn overlap_unit_area<const N: usize, const M: usize>(src: &Polygon<N>, dst: &Polygon<M>) -> f64
{
    let src_lon = src.lon_bounds();
    let dst_lon = dst.lon_bounds();
    let mut area = 0.0;
    for shift in candidate_shifts(src_lon, dst_lon, 0.0)
    {
        let clipped = clip_polygon(src, &dst.shifted(shift));
        if clipped.len() >= 3
        {
            area += unit_area(clipped.lon(), clipped.lat());
        }
    }
    area
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::geometry::polygon::CellPolygon;
    use crate::geometry::sphere::polygon_area;

    fn rect(lon0: f64, lon1: f64, lat0: f64, lat1: f64) -> CellPolygon
    {
        CellPolygon::from_corners(&[lon0, lon1, lon1, lon0], &[lat0, lat0, lat1, lat1])
    }

    #[test]
    fn identical_cells_clip_to_themselves()
    {
        let a = rect(0.1, 0.3, -0.2, 0.1);
        let c = clip_polygon(&a, &a);
        assert!((polygon_area(&c, 1.0) - polygon_area(&a, 1.0)).abs() < 1e-15);
    }

    #[test]
    fn half_overlap()
    {
        let a = rect(0.0, 0.2, 0.0, 0.2);
        let b = rect(0.1, 0.3, 0.0, 0.2);
        let expected = polygon_area(&rect(0.1, 0.2, 0.0, 0.2), 1.0);
        assert!((overlap_unit_area(&a, &b) - expected).abs() < 1e-15);
    }

    #[test]
    fn disjoint_and_touching_cells_have_no_area()
    {
        let a = rect(0.0, 0.2, 0.0, 0.2);
        assert_eq!(overlap_unit_area(&a, &rect(0.5, 0.6, 0.0, 0.2)), 0.0);
        assert!(overlap_unit_area(&a, &rect(0.2, 0.4, 0.0, 0.2)).abs() < 1e-18);
    }

    #[test]
    fn clockwise_window()
    {
        let a = rect(0.0, 0.2, 0.0, 0.2);
        let cw = CellPolygon::from_corners(&[0.1, 0.1, 0.3, 0.3], &[0.0, 0.2, 0.2, 0.0]);
        let expected = polygon_area(&rect(0.1, 0.2, 0.0, 0.2), 1.0);
        assert!((overlap_unit_area(&a, &cw) - expected).abs() < 1e-15);
    }

    #[test]
    fn overlap_across_date_line()
    {
        let west = rect(350f64.to_radians(), 370f64.to_radians(), 0.0, 0.1);
        let east = rect(0.0, 5f64.to_radians(), 0.0, 0.1);
        let expected = polygon_area(&east, 1.0);
        assert!((overlap_unit_area(&west, &east) - expected).abs() < 1e-14);
        assert!((overlap_unit_area(&east, &west) - expected).abs() < 1e-14);
    }

    #[test]
    fn cell_straddling_the_seam_of_a_polar_cap()
    {
        let deg = |v: f64| v.to_radians();
        let cap = CellPolygon::from_corners(&[0.0, deg(90.0), deg(180.0), deg(270.0)], &[deg(80.0); 4]);
        let cell = rect(deg(-5.0), deg(5.0), deg(82.0), deg(84.0));
        let expected = polygon_area(&cell, 1.0);
        assert!((overlap_unit_area(&cell, &cap) - expected).abs() < 1e-14);
        assert!((overlap_unit_area(&cap, &cell) - expected).abs() < 1e-14);
    }

    #[test]
    fn shifts_are_periodic()
    {
        assert!(lon_ranges_intersect((0.0, 0.1), (TAU - 0.05, TAU + 0.05), 0.0));
        assert!(lon_ranges_intersect((0.0, 0.1), (-TAU + 0.05, -TAU + 0.2), 0.0));
        assert!(!lon_ranges_intersect((0.0, 0.1), (1.0, 1.2), 0.0));
        assert!(lon_ranges_intersect((0.0, 0.1), (0.1 + 1e-10, 0.3), 1e-9));
    }
}
