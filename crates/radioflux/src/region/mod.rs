//! Regions in pixel coordinates and their rasterization to masks.
//!
//! Coordinates follow the FITS convention: 1-based, with pixel `(col, row)`
//! of the array centred on `(col + 1, row + 1)`.

pub mod ds9;

use ndarray::Array2;

pub use ds9::{parse_regions, read_regions};

/// A geometric shape in 1-based pixel coordinates. Angles are in degrees,
/// counter-clockwise from the +x axis.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle {
        x: f64,
        y: f64,
        r: f64,
    },
    /// `a` and `b` are semi-axes.
    Ellipse {
        x: f64,
        y: f64,
        a: f64,
        b: f64,
        angle: f64,
    },
    /// `width` and `height` are full side lengths.
    Box {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        angle: f64,
    },
    Polygon {
        vertices: Vec<(f64, f64)>,
    },
    Annulus {
        x: f64,
        y: f64,
        inner: f64,
        outer: f64,
    },
}

/// Offset of `(px, py)` from `(x, y)`, rotated into a frame at `angle`.
fn rotate_into(px: f64, py: f64, x: f64, y: f64, angle: f64) -> (f64, f64) {
    let (s, c) = angle.to_radians().sin_cos();
    let (dx, dy) = (px - x, py - y);
    (dx * c + dy * s, -dx * s + dy * c)
}

impl Shape {
    /// Whether the point `(px, py)` lies inside the shape.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        match self {
            Shape::Circle { x, y, r } => (px - x).powi(2) + (py - y).powi(2) <= r * r,
            Shape::Ellipse { x, y, a, b, angle } => {
                let (u, v) = rotate_into(px, py, *x, *y, *angle);
                (u / a).powi(2) + (v / b).powi(2) <= 1.0
            }
            Shape::Box {
                x,
                y,
                width,
                height,
                angle,
            } => {
                let (u, v) = rotate_into(px, py, *x, *y, *angle);
                u.abs() <= width / 2.0 && v.abs() <= height / 2.0
            }
            Shape::Polygon { vertices } => {
                let mut inside = false;
                let mut j = vertices.len().wrapping_sub(1);
                for (i, &(xi, yi)) in vertices.iter().enumerate() {
                    let (xj, yj) = vertices[j];
                    if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
                        inside = !inside;
                    }
                    j = i;
                }
                inside
            }
            Shape::Annulus { x, y, inner, outer } => {
                let d2 = (px - x).powi(2) + (py - y).powi(2);
                d2 >= inner * inner && d2 <= outer * outer
            }
        }
    }

    /// Bounding box `(xmin, xmax, ymin, ymax)` in pixel coordinates.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        match self {
            Shape::Circle { x, y, r } => (x - r, x + r, y - r, y + r),
            Shape::Annulus { x, y, outer, .. } => (x - outer, x + outer, y - outer, y + outer),
            Shape::Ellipse { x, y, a, b, .. } => {
                let r = a.abs().max(b.abs());
                (x - r, x + r, y - r, y + r)
            }
            Shape::Box {
                x, y, width, height, ..
            } => {
                let r = width.hypot(*height) / 2.0;
                (x - r, x + r, y - r, y + r)
            }
            Shape::Polygon { vertices } => vertices.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
                |(x0, x1, y0, y1), &(x, y)| (x0.min(x), x1.max(x), y0.min(y), y1.max(y)),
            ),
        }
    }

    /// Visit every array index `(row, col)` of a `[rows, cols]` grid whose
    /// pixel centre lies inside the shape.
    fn for_each_inside(&self, shape: [usize; 2], mut f: impl FnMut(usize, usize)) {
        let [rows, cols] = shape;
        let (x0, x1, y0, y1) = self.bounds();
        // Pixel centre of column c is c + 1.
        let clamp = |lo: f64, hi: f64, n: usize| -> Option<(usize, usize)> {
            if !(lo.is_finite() && hi.is_finite()) || n == 0 {
                return None;
            }
            let first = (lo - 1.0).ceil().max(0.0);
            let last = (hi - 1.0).floor().min(n as f64 - 1.0);
            (first <= last).then(|| (first as usize, last as usize))
        };
        let (Some((c0, c1)), Some((r0, r1))) = (clamp(x0, x1, cols), clamp(y0, y1, rows)) else {
            return;
        };
        for row in r0..=r1 {
            for col in c0..=c1 {
                if self.contains(col as f64 + 1.0, row as f64 + 1.0) {
                    f(row, col);
                }
            }
        }
    }
}

/// A shape and whether it adds to or removes from the region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionShape {
    pub shape: Shape,
    pub exclude: bool,
}

/// An ordered collection of shapes forming one composite region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSet {
    shapes: Vec<RegionShape>,
}

impl RegionSet {
    pub fn new(shapes: Vec<RegionShape>) -> Self {
        RegionSet { shapes }
    }

    pub fn shapes(&self) -> &[RegionShape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Boolean mask of shape `[rows, cols]`.
    ///
    /// Shapes apply in order: included shapes set pixels, excluded shapes
    /// clear them.
    pub fn mask(&self, shape: [usize; 2]) -> Array2<bool> {
        let mut mask = Array2::from_elem((shape[0], shape[1]), false);
        for item in &self.shapes {
            let set = !item.exclude;
            item.shape
                .for_each_inside(shape, |row, col| mask[[row, col]] = set);
        }
        mask
    }

    /// Split into one single-shape set per shape, in order.
    pub fn individual(&self) -> Vec<RegionSet> {
        self.shapes
            .iter()
            .map(|s| RegionSet::new(vec![s.clone()]))
            .collect()
    }
}
