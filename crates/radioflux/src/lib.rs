//! Beam-normalized flux density measurement for radio-astronomy images.
//!
//! A FITS image is reduced to its first 2D plane, its restoring beam is
//! converted to pixels, and the pixels inside DS9 regions are summed and
//! divided by the beam area.

pub mod beam;
pub mod diagnostics;
pub mod error;
pub mod fits;
pub mod flatten;
pub mod map;
pub mod metadata;
pub mod pipeline;
pub mod region;
pub mod report;
pub mod stats;
pub mod wcs;

pub use diagnostics::{Diagnostics, Warning};
pub use error::{Error, FitsError, RegionError, Result};
pub use map::RadioMap;
pub use pipeline::{FluxOptions, FluxPipeline};
pub use report::ReportRow;
pub use stats::Measurement;
