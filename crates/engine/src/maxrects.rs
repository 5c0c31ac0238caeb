//! MaxRects free-rectangle packing for layer construction.
//!
//! Maintains the set of maximal free rectangles of the bin footprint. Each
//! insertion picks a free rectangle under one of five placement rules, splits
//! every intersected free rectangle, and prunes contained ones. Rectangles
//! may be placed rotated in the width-depth plane.

use palletizer_core::RectHeuristic;

const EPS: f64 = 1e-9;

/// A placed or free rectangle in the layer plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X coordinate of the front-left corner.
    pub x: f64,
    /// Y coordinate of the front-left corner.
    pub y: f64,
    /// Width (x extent).
    pub width: f64,
    /// Depth (y extent).
    pub height: f64,
}

impl Rect {
    fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.x + other.width <= self.x + self.width + EPS
            && other.y + other.height <= self.y + self.height + EPS
    }
}

/// 2D footprint packer with maximal free rectangles.
#[derive(Debug, Clone)]
pub struct MaxRects {
    bin_width: f64,
    bin_depth: f64,
    used: Vec<Rect>,
    free: Vec<Rect>,
}

impl MaxRects {
    /// Creates a packer over an empty footprint.
    pub fn new(bin_width: f64, bin_depth: f64) -> Self {
        Self {
            bin_width,
            bin_depth,
            used: Vec::new(),
            free: vec![Rect {
                x: 0.0,
                y: 0.0,
                width: bin_width,
                height: bin_depth,
            }],
        }
    }

    /// Fraction of the footprint covered by placed rectangles.
    pub fn occupancy(&self) -> f64 {
        let used: f64 = self.used.iter().map(|r| r.width * r.height).sum();
        used / (self.bin_width * self.bin_depth)
    }

    /// Inserts a `width`x`depth` rectangle under the given rule. Returns the
    /// placed rectangle, whose `width` reveals whether it was rotated; `None`
    /// if nothing fits.
    pub fn insert(&mut self, width: f64, depth: f64, heuristic: RectHeuristic) -> Option<Rect> {
        let new_node = match heuristic {
            RectHeuristic::BestShortSideFit => self.find_best_short_side(width, depth),
            RectHeuristic::BestLongSideFit => self.find_best_long_side(width, depth),
            RectHeuristic::BestAreaFit => self.find_best_area(width, depth),
            RectHeuristic::BottomLeft => self.find_bottom_left(width, depth),
            RectHeuristic::ContactPoint => self.find_contact_point(width, depth),
            // `All` is expanded by the caller; fall back to a sane default.
            RectHeuristic::All => self.find_best_short_side(width, depth),
        }?;

        self.place(new_node);
        Some(new_node)
    }

    fn place(&mut self, node: Rect) {
        let mut i = 0;
        while i < self.free.len() {
            if let Some(pieces) = split_free_node(self.free[i], &node) {
                self.free.swap_remove(i);
                self.free.extend(pieces);
            } else {
                i += 1;
            }
        }
        self.prune_free_list();
        self.used.push(node);
    }

    fn prune_free_list(&mut self) {
        let mut i = 0;
        while i < self.free.len() {
            let mut removed = false;
            let mut j = i + 1;
            while j < self.free.len() {
                if self.free[j].contains(&self.free[i]) {
                    self.free.swap_remove(i);
                    removed = true;
                    break;
                }
                if self.free[i].contains(&self.free[j]) {
                    self.free.swap_remove(j);
                } else {
                    j += 1;
                }
            }
            if !removed {
                i += 1;
            }
        }
    }

    /// Scores both orientations in every free rectangle; lower (s1, s2) wins.
    fn find_scored<F>(&self, width: f64, depth: f64, score: F) -> Option<Rect>
    where
        F: Fn(&Rect, f64, f64) -> (f64, f64),
    {
        let mut best: Option<(Rect, f64, f64)> = None;
        for free in &self.free {
            for (w, d) in [(width, depth), (depth, width)] {
                if free.width + EPS < w || free.height + EPS < d {
                    continue;
                }
                let (s1, s2) = score(free, w, d);
                let candidate = Rect {
                    x: free.x,
                    y: free.y,
                    width: w,
                    height: d,
                };
                let better = match &best {
                    None => true,
                    Some((_, b1, b2)) => s1 < *b1 - EPS || ((s1 - b1).abs() <= EPS && s2 < *b2),
                };
                if better {
                    best = Some((candidate, s1, s2));
                }
            }
        }
        best.map(|(rect, _, _)| rect)
    }

    fn find_best_short_side(&self, width: f64, depth: f64) -> Option<Rect> {
        self.find_scored(width, depth, |free, w, d| {
            let leftover_h = free.width - w;
            let leftover_v = free.height - d;
            (leftover_h.min(leftover_v), leftover_h.max(leftover_v))
        })
    }

    fn find_best_long_side(&self, width: f64, depth: f64) -> Option<Rect> {
        self.find_scored(width, depth, |free, w, d| {
            let leftover_h = free.width - w;
            let leftover_v = free.height - d;
            (leftover_h.max(leftover_v), leftover_h.min(leftover_v))
        })
    }

    fn find_best_area(&self, width: f64, depth: f64) -> Option<Rect> {
        self.find_scored(width, depth, |free, w, d| {
            let leftover_h = free.width - w;
            let leftover_v = free.height - d;
            let area = free.width * free.height - w * d;
            (area, leftover_h.min(leftover_v))
        })
    }

    fn find_bottom_left(&self, width: f64, depth: f64) -> Option<Rect> {
        self.find_scored(width, depth, |free, _w, d| (free.y + d, free.x))
    }

    fn find_contact_point(&self, width: f64, depth: f64) -> Option<Rect> {
        // Higher contact is better; negate to reuse the min-score scan.
        self.find_scored(width, depth, |free, w, d| {
            (-self.contact_point_score(free.x, free.y, w, d), 0.0)
        })
    }

    fn contact_point_score(&self, x: f64, y: f64, width: f64, depth: f64) -> f64 {
        let mut score = 0.0;
        if x < EPS || x + width > self.bin_width - EPS {
            score += depth;
        }
        if y < EPS || y + depth > self.bin_depth - EPS {
            score += width;
        }
        for used in &self.used {
            if (used.x - (x + width)).abs() < EPS || ((used.x + used.width) - x).abs() < EPS {
                score += interval_overlap(used.y, used.y + used.height, y, y + depth);
            }
            if (used.y - (y + depth)).abs() < EPS || ((used.y + used.height) - y).abs() < EPS {
                score += interval_overlap(used.x, used.x + used.width, x, x + width);
            }
        }
        score
    }
}

fn interval_overlap(a0: f64, a1: f64, b0: f64, b1: f64) -> f64 {
    (a1.min(b1) - a0.max(b0)).max(0.0)
}

/// Splits a free rectangle around a placed node. Returns `None` when they do
/// not intersect (the free rectangle stays as-is).
fn split_free_node(free: Rect, used: &Rect) -> Option<Vec<Rect>> {
    if used.x >= free.x + free.width - EPS
        || used.x + used.width <= free.x + EPS
        || used.y >= free.y + free.height - EPS
        || used.y + used.height <= free.y + EPS
    {
        return None;
    }

    let mut pieces = Vec::with_capacity(4);
    // Strip below the used rectangle.
    if used.y > free.y + EPS {
        pieces.push(Rect {
            x: free.x,
            y: free.y,
            width: free.width,
            height: used.y - free.y,
        });
    }
    // Strip above.
    if used.y + used.height < free.y + free.height - EPS {
        pieces.push(Rect {
            x: free.x,
            y: used.y + used.height,
            width: free.width,
            height: free.y + free.height - (used.y + used.height),
        });
    }
    // Strip to the left.
    if used.x > free.x + EPS {
        pieces.push(Rect {
            x: free.x,
            y: free.y,
            width: used.x - free.x,
            height: free.height,
        });
    }
    // Strip to the right.
    if used.x + used.width < free.x + free.width - EPS {
        pieces.push(Rect {
            x: used.x + used.width,
            y: free.y,
            width: free.x + free.width - (used.x + used.width),
            height: free.height,
        });
    }
    Some(pieces)
}
