use ndarray::{Array2, ArrayD};

use crate::beam::PixelBeam;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::fits::{Header, Image};
use crate::flatten::flatten;
use crate::metadata::{self, Beam};
use crate::wcs::Wcs;

/// An image prepared for flux measurement: a 2D plane, its header and the
/// beam normalization.
#[derive(Debug, Clone)]
pub struct RadioMap {
    header: Header,
    data: Array2<f64>,
    beam: Beam,
    pixel_beam: PixelBeam,
    frequency: f64,
    unit: Option<String>,
}

impl RadioMap {
    /// Resolve metadata, flatten the image and convert the beam to pixels.
    ///
    /// Non-fatal problems are reported through `diagnostics`; any error leaves
    /// no map behind.
    pub fn new(header: &Header, data: &ArrayD<f64>, diagnostics: &mut Diagnostics) -> Result<Self> {
        let meta = metadata::resolve(header, diagnostics)?;
        let (flat_header, plane) = flatten(header, data)?;
        let pixel_beam = PixelBeam::from_wcs(meta.beam, &Wcs::from_header(&flat_header))?;
        Ok(RadioMap {
            header: flat_header,
            data: plane,
            beam: meta.beam,
            pixel_beam,
            frequency: meta.frequency,
            unit: meta.unit,
        })
    }

    pub fn from_image(image: &Image, diagnostics: &mut Diagnostics) -> Result<Self> {
        RadioMap::new(&image.header, &image.data, diagnostics)
    }

    /// The 2D header matching [`RadioMap::data`].
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// `[rows, columns]` of the plane, i.e. `[NAXIS2, NAXIS1]`.
    pub fn shape(&self) -> [usize; 2] {
        let (rows, cols) = self.data.dim();
        [rows, cols]
    }

    /// Beam in the header's angular unit.
    pub fn beam(&self) -> Beam {
        self.beam
    }

    /// Beam axes and solid angle in pixels.
    pub fn pixel_beam(&self) -> PixelBeam {
        self.pixel_beam
    }

    /// Beam solid angle in pixel².
    pub fn beam_area(&self) -> f64 {
        self.pixel_beam.area
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn wcs(&self) -> Wcs {
        Wcs::from_header(&self.header)
    }
}
