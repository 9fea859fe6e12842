//! Beam conversion from angular units to pixels, and the beam solid angle.

use std::f64::consts::{LN_2, PI};

use crate::error::{Error, Result};
use crate::metadata::Beam;
use crate::wcs::Wcs;

/// Relative difference above which pixels count as non-square and a beam as
/// elliptical.
pub const SHAPE_TOLERANCE: f64 = 1.0e-4;

/// FWHM-to-sigma factor of a Gaussian, `2 * sqrt(2 ln 2)`.
pub fn gaussian_fwhm_factor() -> f64 {
    2.0 * (2.0 * LN_2).sqrt()
}

/// Solid angle of a Gaussian beam with the given FWHM axes, in the square of
/// whatever unit the axes are in.
pub fn beam_area(bmaj: f64, bmin: f64) -> f64 {
    let g = gaussian_fwhm_factor();
    2.0 * PI * bmaj * bmin / (g * g)
}

/// A beam measured in pixels together with its solid angle in pixel².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBeam {
    pub bmaj: f64,
    pub bmin: f64,
    pub area: f64,
}

impl PixelBeam {
    /// Convert `beam` using pixel sizes `cd1` (axis 1) and `cd2` (axis 2).
    ///
    /// A single scale cannot be applied when pixels are non-square and the
    /// beam is elliptical at the same time, so that combination is rejected.
    pub fn new(beam: Beam, cd1: f64, cd2: f64) -> Result<PixelBeam> {
        let non_square = ((cd1 - cd2) / cd1).abs() > SHAPE_TOLERANCE;
        let elliptical = ((beam.bmaj - beam.bmin) / beam.bmin).abs() > SHAPE_TOLERANCE;
        if non_square && elliptical {
            return Err(Error::NonSquareElliptical { cd1, cd2 });
        }

        let bmaj = beam.bmaj / cd1;
        let bmin = beam.bmin / cd2;
        let area = beam_area(bmaj, bmin);
        tracing::debug!(bmaj, bmin, "beam in pixels");
        tracing::debug!(area, "beam area in pixels");
        Ok(PixelBeam { bmaj, bmin, area })
    }

    /// Convert `beam` with the transform's pixel increments.
    ///
    /// Axis 1 is negated: right ascension conventionally runs opposite to
    /// pixel index, giving a negative `CDELT1`.
    pub fn from_wcs(beam: Beam, wcs: &Wcs) -> Result<PixelBeam> {
        let [cdelt1, cdelt2] = wcs.cdelt();
        PixelBeam::new(beam, -cdelt1, cdelt2)
    }
}
