//! Per-image flux measurement: load, prepare the map, measure the regions.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, Result};
use crate::fits::{read_image, Header, Image};
use crate::map::RadioMap;
use crate::region::{read_regions, RegionSet};
use crate::report::ReportRow;
use crate::stats::measure;

/// Default foreground region file.
pub const DEFAULT_FOREGROUND: &str = "ds9.reg";

/// Where images come from.
pub trait ImageSource {
    fn load(&self, path: &Path) -> Result<Image>;
}

/// Where regions come from. Sky coordinates are resolved against `header`.
pub trait RegionSource {
    fn open(&self, path: &Path, header: &Header) -> Result<RegionSet>;
}

/// Reads FITS files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitsImageSource;

impl ImageSource for FitsImageSource {
    fn load(&self, path: &Path) -> Result<Image> {
        read_image(path)
    }
}

/// Reads DS9 region files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ds9RegionSource;

impl RegionSource for Ds9RegionSource {
    fn open(&self, path: &Path, header: &Header) -> Result<RegionSet> {
        read_regions(path, header)
    }
}

/// What to measure and how.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxOptions {
    pub foreground: PathBuf,
    /// Off-source region giving the noise and background level. When set,
    /// every row carries an error column, even for zero noise.
    pub background: Option<PathBuf>,
    /// Report every foreground shape separately.
    pub individual: bool,
    /// Subtract the background mean before measuring.
    pub subtract_background: bool,
}

impl Default for FluxOptions {
    fn default() -> Self {
        FluxOptions {
            foreground: PathBuf::from(DEFAULT_FOREGROUND),
            background: None,
            individual: false,
            subtract_background: false,
        }
    }
}

/// Noise and level taken from the background region.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Background {
    noise: f64,
    level: f64,
}

pub struct FluxPipeline<I = FitsImageSource, R = Ds9RegionSource> {
    images: I,
    regions: R,
    options: FluxOptions,
}

impl FluxPipeline {
    /// A pipeline reading FITS images and DS9 regions from disk.
    pub fn new(options: FluxOptions) -> Self {
        FluxPipeline::with_sources(FitsImageSource, Ds9RegionSource, options)
    }
}

impl<I: ImageSource, R: RegionSource> FluxPipeline<I, R> {
    pub fn with_sources(images: I, regions: R, options: FluxOptions) -> Self {
        FluxPipeline {
            images,
            regions,
            options,
        }
    }

    pub fn options(&self) -> &FluxOptions {
        &self.options
    }

    /// Load one image and measure it, one row per reported region.
    pub fn process(&self, path: &Path, diagnostics: &mut Diagnostics) -> Result<Vec<ReportRow>> {
        debug!(path = %path.display(), "processing image");
        let image = self.images.load(path)?;
        let map = RadioMap::from_image(&image, diagnostics)?;
        self.measure_map(&path.display().to_string(), &map, diagnostics)
    }

    /// Measure an already prepared map.
    pub fn measure_map(
        &self,
        source: &str,
        map: &RadioMap,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<ReportRow>> {
        let background = match &self.options.background {
            Some(path) => Some(self.background(path, map, diagnostics)?),
            None if self.options.subtract_background => {
                return Err(Error::MissingBackgroundRegion)
            }
            None => None,
        };
        let level = match background {
            Some(bg) if self.options.subtract_background => bg.level,
            _ => 0.0,
        };
        let noise = background.map(|bg| bg.noise);

        let foreground = self.regions.open(&self.options.foreground, map.header())?;
        let targets: Vec<(Option<usize>, RegionSet)> = if self.options.individual {
            foreground
                .individual()
                .into_iter()
                .enumerate()
                .map(|(i, set)| (Some(i + 1), set))
                .collect()
        } else {
            vec![(None, foreground)]
        };

        let mut rows = Vec::with_capacity(targets.len());
        for (label, set) in targets {
            let mask = set.mask(map.shape());
            let measurement = measure(map, mask.view(), level, noise)?;
            if measurement.pixels == 0 {
                diagnostics.warn(Warning::EmptyRegion { label });
            }
            debug!(
                source,
                ?label,
                pixels = measurement.pixels,
                flux = measurement.flux,
                "measured region"
            );
            rows.push(ReportRow {
                source: source.to_string(),
                label,
                frequency: map.frequency(),
                measurement,
            });
        }
        Ok(rows)
    }

    fn background(
        &self,
        path: &Path,
        map: &RadioMap,
        diagnostics: &mut Diagnostics,
    ) -> Result<Background> {
        let set = self.regions.open(path, map.header())?;
        let mask = set.mask(map.shape());
        let m = measure(map, mask.view(), 0.0, None)?;
        if m.pixels == 0 {
            diagnostics.warn(Warning::EmptyBackground);
        }
        debug!(noise = m.rms, level = m.mean, "background region");
        Ok(Background {
            noise: m.rms,
            level: m.mean,
        })
    }
}
