//! Two-axis celestial coordinate transform read from FITS WCS keywords.
//!
//! Supports the zenithal projections common in radio maps (TAN, SIN and the
//! legacy NCP) and plain linear axes. Only world-to-pixel is provided; that
//! is the direction region conversion needs.

use crate::fits::{Header, Value};

/// Projection code taken from the `CTYPEi` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Tan,
    Sin,
    Ncp,
    Linear,
}

impl Projection {
    fn from_ctype(ctype: &str) -> Option<Projection> {
        if !ctype.contains('-') {
            return None;
        }
        match ctype.rsplit('-').next()? {
            "TAN" => Some(Projection::Tan),
            "SIN" => Some(Projection::Sin),
            "NCP" => Some(Projection::Ncp),
            _ => None,
        }
    }
}

/// One image axis: reference pixel (1-based), increment, reference value
/// and type, all in the header's units.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub ctype: String,
    pub crpix: f64,
    pub cdelt: f64,
    pub crval: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wcs {
    pub axes: [Axis; 2],
    /// Pixel offset to intermediate world coordinates (degrees).
    linear: [[f64; 2]; 2],
    projection: Projection,
    /// Index of the latitude axis when the axis types are celestial.
    lat_axis: usize,
}

fn is_latitude(ctype: &str) -> bool {
    ctype.starts_with("DEC") || ctype.get(1..4) == Some("LAT")
}

impl Wcs {
    /// Build the transform for image axes 1 and 2.
    ///
    /// A `CDi_j` matrix takes precedence over `PCi_j`, which takes precedence
    /// over `CDELTi` with an optional `CROTA2` rotation.
    pub fn from_header(header: &Header) -> Wcs {
        let has_cd = ["CD1_1", "CD1_2", "CD2_1", "CD2_2"]
            .iter()
            .any(|k| header.contains(k));
        let has_pc = ["PC1_1", "PC1_2", "PC2_1", "PC2_2"]
            .iter()
            .any(|k| header.contains(k));

        let axis = |i: usize| {
            let cdelt = match header.get_f64(&format!("CDELT{i}")) {
                Some(d) => d,
                None if has_cd => header.get_f64(&format!("CD{i}_{i}")).unwrap_or(1.0),
                None => 1.0,
            };
            Axis {
                ctype: header.get_str(&format!("CTYPE{i}")).unwrap_or("").to_string(),
                crpix: header.get_f64(&format!("CRPIX{i}")).unwrap_or(0.0),
                cdelt,
                crval: header.get_f64(&format!("CRVAL{i}")).unwrap_or(0.0),
            }
        };
        let axes = [axis(1), axis(2)];

        let entry = |prefix: &str, i: usize, j: usize| {
            let default = if i == j { 1.0 } else { 0.0 };
            header
                .get_f64(&format!("{prefix}{i}_{j}"))
                .unwrap_or(if prefix == "CD" { 0.0 } else { default })
        };
        let linear = if has_cd {
            [
                [entry("CD", 1, 1), entry("CD", 1, 2)],
                [entry("CD", 2, 1), entry("CD", 2, 2)],
            ]
        } else if has_pc {
            let (c1, c2) = (axes[0].cdelt, axes[1].cdelt);
            [
                [c1 * entry("PC", 1, 1), c1 * entry("PC", 1, 2)],
                [c2 * entry("PC", 2, 1), c2 * entry("PC", 2, 2)],
            ]
        } else {
            let rho = header.get_f64("CROTA2").unwrap_or(0.0).to_radians();
            let (c1, c2) = (axes[0].cdelt, axes[1].cdelt);
            [
                [c1 * rho.cos(), -c2 * rho.sin()],
                [c1 * rho.sin(), c2 * rho.cos()],
            ]
        };

        let projection = Projection::from_ctype(&axes[0].ctype)
            .or_else(|| Projection::from_ctype(&axes[1].ctype))
            .unwrap_or(Projection::Linear);
        let lat_axis = if is_latitude(&axes[0].ctype) { 0 } else { 1 };

        Wcs {
            axes,
            linear,
            projection,
            lat_axis,
        }
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Per-axis increments `(CDELT1, CDELT2)`.
    pub fn cdelt(&self) -> [f64; 2] {
        [self.axes[0].cdelt, self.axes[1].cdelt]
    }

    /// Geometric-mean pixel size in degrees.
    pub fn pixel_scale(&self) -> f64 {
        let m = &self.linear;
        (m[0][0] * m[1][1] - m[0][1] * m[1][0]).abs().sqrt()
    }

    /// Convert `(lon, lat)` in degrees to 1-based FITS pixel coordinates
    /// `(x, y)` along image axes 1 and 2.
    ///
    /// Returns `None` for points the projection cannot reach or when the
    /// linear part is singular.
    pub fn world_to_pixel(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let lon_axis = 1 - self.lat_axis;
        let (lon0, lat0) = (self.axes[lon_axis].crval, self.axes[self.lat_axis].crval);

        let (x, y) = match self.projection {
            Projection::Linear => (lon - lon0, lat - lat0),
            zenithal => {
                let (d, d0) = (lat.to_radians(), lat0.to_radians());
                let da = (lon - lon0).to_radians();
                let cos_c = d.sin() * d0.sin() + d.cos() * d0.cos() * da.cos();
                let xi = d.cos() * da.sin();
                let (xi, eta) = match zenithal {
                    Projection::Tan if cos_c > 0.0 => {
                        (xi / cos_c, (d.sin() * d0.cos() - d.cos() * d0.sin() * da.cos()) / cos_c)
                    }
                    Projection::Sin if cos_c >= 0.0 => {
                        (xi, d.sin() * d0.cos() - d.cos() * d0.sin() * da.cos())
                    }
                    Projection::Ncp if cos_c >= 0.0 && d0.sin() != 0.0 => {
                        (xi, (d0.cos() - d.cos() * da.cos()) / d0.sin())
                    }
                    _ => return None,
                };
                (xi.to_degrees(), eta.to_degrees())
            }
        };
        let world = if lon_axis == 0 { [x, y] } else { [y, x] };

        let m = &self.linear;
        let det = m[0][0] * m[1][1] - m[0][1] * m[1][0];
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let dx = (m[1][1] * world[0] - m[0][1] * world[1]) / det;
        let dy = (-m[1][0] * world[0] + m[0][0] * world[1]) / det;
        Some((self.axes[0].crpix + dx, self.axes[1].crpix + dy))
    }

    /// Header cards describing this two-axis transform.
    ///
    /// Only reference pixel, increment, reference value and type are written;
    /// rotation terms are not carried over.
    pub fn to_header(&self) -> Header {
        let mut h = Header::new();
        h.set("WCSAXES", Value::Integer(2));
        for (i, axis) in self.axes.iter().enumerate() {
            let n = i + 1;
            h.set(&format!("CRPIX{n}"), Value::Float(axis.crpix));
            h.set(&format!("CDELT{n}"), Value::Float(axis.cdelt));
            h.set(&format!("CRVAL{n}"), Value::Float(axis.crval));
            h.set(&format!("CTYPE{n}"), Value::String(axis.ctype.clone()));
        }
        h
    }
}
