//! Support-overlap geometry.
//!
//! Computes the width-depth support area between a bottom item's usable
//! surface and a top item's footprint. The bottom surface is first eroded
//! according to the item's support shape: only structural zones of a carton
//! actually bear load.

use crate::item::SupportShape;

/// Axis-aligned rectangle in the width-depth plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect2 {
    /// X coordinate of the front-left corner.
    pub x: f64,
    /// Y coordinate of the front-left corner.
    pub y: f64,
    /// Width (x extent).
    pub w: f64,
    /// Depth (y extent).
    pub d: f64,
}

impl Rect2 {
    /// Creates a rectangle.
    pub fn new(x: f64, y: f64, w: f64, d: f64) -> Self {
        Self { x, y, w, d }
    }

    /// Area of the rectangle, zero if degenerate.
    pub fn area(&self) -> f64 {
        (self.w.max(0.0)) * (self.d.max(0.0))
    }

    /// Shrinks the rectangle by a margin on every side.
    fn inset(&self, dx: f64, dy: f64) -> Rect2 {
        Rect2::new(self.x + dx, self.y + dy, self.w - 2.0 * dx, self.d - 2.0 * dy)
    }
}

/// Intersection area of two rectangles, clamped at zero.
pub fn intersection_area(a: &Rect2, b: &Rect2) -> f64 {
    let x_overlap = (a.x + a.w).min(b.x + b.w) - a.x.max(b.x);
    let y_overlap = (a.y + a.d).min(b.y + b.d) - a.y.max(b.y);
    x_overlap.max(0.0) * y_overlap.max(0.0)
}

/// Support overlap between a bottom item's footprint and a top footprint.
///
/// `bottom` is eroded by the item's edge-reduce margins first, then by the
/// support shape. Disjoint footprints yield exactly `0.0`.
pub fn support_overlap(
    bottom: &Rect2,
    top: &Rect2,
    shape: SupportShape,
    edge_reduce_w: f64,
    edge_reduce_d: f64,
    edge_thickness: f64,
) -> f64 {
    let outer = bottom.inset(edge_reduce_w, edge_reduce_d);
    if outer.w <= 0.0 || outer.d <= 0.0 {
        return 0.0;
    }

    let full = intersection_area(&outer, top);
    if full <= 0.0 {
        return 0.0;
    }

    let t = edge_thickness;
    match shape {
        SupportShape::Full => full,
        SupportShape::AllEdges => {
            // Ring: full area minus the interior rectangle.
            let inner = outer.inset(t, t);
            full - intersection_area(&inner, top)
        }
        SupportShape::ShortEdges => {
            // Two strips along the short edges; the removed interior runs
            // the full length of the long dimension.
            let inner = if outer.w < outer.d {
                Rect2::new(outer.x, outer.y + t, outer.w, outer.d - 2.0 * t)
            } else {
                Rect2::new(outer.x + t, outer.y, outer.w - 2.0 * t, outer.d)
            };
            full - intersection_area(&inner, top)
        }
        SupportShape::LongEdges => {
            let inner = if outer.w > outer.d {
                Rect2::new(outer.x, outer.y + t, outer.w, outer.d - 2.0 * t)
            } else {
                Rect2::new(outer.x + t, outer.y, outer.w - 2.0 * t, outer.d)
            };
            full - intersection_area(&inner, top)
        }
        SupportShape::Corners => {
            let squares = [
                Rect2::new(outer.x, outer.y, t, t),
                Rect2::new(outer.x, outer.y + outer.d - t, t, t),
                Rect2::new(outer.x + outer.w - t, outer.y, t, t),
                Rect2::new(outer.x + outer.w - t, outer.y + outer.d - t, t, t),
            ];
            squares.iter().map(|s| intersection_area(s, top)).sum()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: f64 = 27.0;

    #[test]
    fn disjoint_footprints_are_zero() {
        let bottom = Rect2::new(0.0, 0.0, 100.0, 100.0);
        let top = Rect2::new(200.0, 200.0, 50.0, 50.0);
        let overlap = support_overlap(&bottom, &top, SupportShape::Full, 0.0, 0.0, T);
        assert_eq!(overlap, 0.0);
    }

    #[test]
    fn identical_full_footprints_cover_everything() {
        let rect = Rect2::new(0.0, 0.0, 100.0, 100.0);
        let overlap = support_overlap(&rect, &rect, SupportShape::Full, 0.0, 0.0, T);
        assert!((overlap - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn partial_full_overlap() {
        let bottom = Rect2::new(0.0, 0.0, 100.0, 100.0);
        let top = Rect2::new(60.0, 0.0, 100.0, 100.0);
        let overlap = support_overlap(&bottom, &top, SupportShape::Full, 0.0, 0.0, T);
        assert!((overlap - 4000.0).abs() < 1e-9);
    }

    #[test]
    fn all_edges_is_a_ring() {
        let rect = Rect2::new(0.0, 0.0, 100.0, 100.0);
        let overlap = support_overlap(&rect, &rect, SupportShape::AllEdges, 0.0, 0.0, T);
        let ring = 10_000.0 - (100.0 - 2.0 * T) * (100.0 - 2.0 * T);
        assert!((overlap - ring).abs() < 1e-9);
    }

    #[test]
    fn corners_are_four_squares() {
        let rect = Rect2::new(0.0, 0.0, 100.0, 100.0);
        let overlap = support_overlap(&rect, &rect, SupportShape::Corners, 0.0, 0.0, T);
        assert!((overlap - 4.0 * T * T).abs() < 1e-9);
    }

    #[test]
    fn corner_squares_clip_against_top() {
        // Top covers only the front-left quadrant: one corner square counts.
        let bottom = Rect2::new(0.0, 0.0, 100.0, 100.0);
        let top = Rect2::new(0.0, 0.0, 50.0, 50.0);
        let overlap = support_overlap(&bottom, &top, SupportShape::Corners, 0.0, 0.0, T);
        assert!((overlap - T * T).abs() < 1e-9);
    }

    #[test]
    fn short_edges_keep_strips_on_the_narrow_sides() {
        // 60 wide, 200 deep: the short edges run along the width.
        let bottom = Rect2::new(0.0, 0.0, 60.0, 200.0);
        let overlap = support_overlap(&bottom, &bottom, SupportShape::ShortEdges, 0.0, 0.0, T);
        let strips = 2.0 * T * 60.0;
        assert!((overlap - strips).abs() < 1e-9);
    }

    #[test]
    fn long_edges_keep_strips_on_the_long_sides() {
        let bottom = Rect2::new(0.0, 0.0, 60.0, 200.0);
        let overlap = support_overlap(&bottom, &bottom, SupportShape::LongEdges, 0.0, 0.0, T);
        let strips = 2.0 * T * 200.0;
        assert!((overlap - strips).abs() < 1e-9);
    }

    #[test]
    fn edge_reduce_shrinks_the_surface() {
        let bottom = Rect2::new(0.0, 0.0, 100.0, 100.0);
        let top = Rect2::new(0.0, 0.0, 100.0, 100.0);
        let overlap = support_overlap(&bottom, &top, SupportShape::Full, 10.0, 5.0, T);
        assert!((overlap - 80.0 * 90.0).abs() < 1e-9);
    }

    #[test]
    fn eroded_zone_disjoint_from_top_is_zero_not_negative() {
        // Top only touches the interior of an all-edges item.
        let bottom = Rect2::new(0.0, 0.0, 200.0, 200.0);
        let top = Rect2::new(90.0, 90.0, 20.0, 20.0);
        let overlap = support_overlap(&bottom, &top, SupportShape::AllEdges, 0.0, 0.0, T);
        assert_eq!(overlap, 0.0);
    }
}
