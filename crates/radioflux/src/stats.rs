//! Beam-normalized statistics of the pixels selected by a mask.

use ndarray::ArrayView2;

use crate::error::{Error, Result};
use crate::map::RadioMap;

/// Per-region result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Number of pixels inside the mask.
    pub pixels: usize,
    /// Population standard deviation of the background-subtracted pixels.
    pub rms: f64,
    pub mean: f64,
    pub sum: f64,
    /// `sum / beam area`.
    pub flux: f64,
    /// `noise * sqrt(pixels / beam area)`, present when noise was supplied.
    pub error: Option<f64>,
}

/// Measure the pixels of `map` where `mask` is true.
///
/// `background` is subtracted from every pixel first. `noise`, the off-source
/// RMS, scales by the square root of the number of beams in the region.
pub fn measure(
    map: &RadioMap,
    mask: ArrayView2<'_, bool>,
    background: f64,
    noise: Option<f64>,
) -> Result<Measurement> {
    if mask.dim() != map.data().dim() {
        return Err(Error::Shape {
            expected: map.shape().to_vec(),
            got: mask.shape().to_vec(),
        });
    }

    let values: Vec<f64> = map
        .data()
        .iter()
        .zip(mask.iter())
        .filter_map(|(&v, &inside)| inside.then_some(v - background))
        .collect();
    Ok(summarize(&values, map.beam_area(), noise))
}

/// Statistics of already-selected, background-subtracted values.
pub fn summarize(values: &[f64], beam_area: f64, noise: Option<f64>) -> Measurement {
    let pixels = values.len();
    let n = pixels as f64;
    let sum: f64 = values.iter().sum();
    let mean = sum / n;
    let rms = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    Measurement {
        pixels,
        rms,
        mean,
        sum,
        flux: sum / beam_area,
        error: noise.map(|sigma| sigma * (n / beam_area).sqrt()),
    }
}
