//! Reduce an N-dimensional image to its first 2D spatial plane.

use ndarray::{Array2, ArrayD, Axis, Ix2};

use crate::error::{Error, Result};
use crate::fits::{Header, Value};
use crate::wcs::Wcs;

/// Scalar keywords copied verbatim into a flattened header.
const CARRIED_KEYWORDS: [&str; 2] = ["EQUINOX", "EPOCH"];

/// Return the 2D header and plane of an image.
///
/// Two-axis images pass through unchanged. For more axes the header is
/// rebuilt from the first two axes of the coordinate transform and the data
/// is sliced at index 0 along every axis beyond the first two. This assumes
/// those extra axes (frequency, Stokes, ...) are degenerate; it is not a
/// general multi-plane reduction.
pub fn flatten(header: &Header, data: &ArrayD<f64>) -> Result<(Header, Array2<f64>)> {
    let naxis = header.get_i64("NAXIS").unwrap_or(data.ndim() as i64);
    if naxis < 2 {
        return Err(Error::TooFewAxes(naxis));
    }
    if data.ndim() != naxis as usize {
        return Err(Error::Shape {
            expected: vec![naxis as usize],
            got: vec![data.ndim()],
        });
    }

    if naxis == 2 {
        let plane = data.clone().into_dimensionality::<Ix2>().map_err(|_| Error::Shape {
            expected: vec![2],
            got: vec![data.ndim()],
        })?;
        return Ok((header.clone(), plane));
    }

    let mut flat = Wcs::from_header(header).to_header();
    flat.set("NAXIS", Value::Integer(2));
    for key in ["NAXIS1", "NAXIS2"] {
        if let Some(v) = header.get(key) {
            flat.set(key, v.clone());
        }
    }
    for key in CARRIED_KEYWORDS {
        if let Some(v) = header.get(key) {
            flat.set(key, v.clone());
        }
    }

    let mut view = data.view();
    while view.ndim() > 2 {
        view = view.index_axis_move(Axis(0), 0);
    }
    let plane = view
        .into_dimensionality::<Ix2>()
        .map_err(|_| Error::Shape {
            expected: vec![2],
            got: vec![data.ndim()],
        })?
        .to_owned();
    tracing::debug!(naxis, shape = ?plane.shape(), "flattened image to first plane");
    Ok((flat, plane))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    fn cube_header(naxis: i64) -> Header {
        let mut h = Header::new().with("NAXIS", Value::Integer(naxis));
        let types = ["RA---SIN", "DEC--SIN", "FREQ", "STOKES", "EXTRA"];
        for i in 1..=naxis as usize {
            h.set(&format!("CTYPE{i}"), Value::String(types[i - 1].to_string()));
            h.set(&format!("CRPIX{i}"), Value::Float(i as f64));
            h.set(&format!("CDELT{i}"), Value::Float(-0.001 * i as f64));
            h.set(&format!("CRVAL{i}"), Value::Float(10.0 * i as f64));
        }
        h
    }

    #[test]
    fn one_axis_rejected() {
        let h = Header::new().with("NAXIS", Value::Integer(1));
        let data = Array::zeros(IxDyn(&[5]));
        assert!(matches!(flatten(&h, &data), Err(Error::TooFewAxes(1))));
    }

    #[test]
    fn two_axes_pass_through() {
        let mut h = cube_header(2).with("BMAJ", Value::Float(0.01));
        h.push_history("kept");
        let data = Array::from_shape_fn(IxDyn(&[3, 4]), |ix| (ix[0] * 4 + ix[1]) as f64);
        let (fh, plane) = flatten(&h, &data).unwrap();
        assert_eq!(fh, h);
        assert_eq!(plane.into_dyn(), data);
    }

    #[test]
    fn cube_takes_first_plane() {
        let h = cube_header(3).with("EQUINOX", Value::Float(2000.0));
        let data = Array::from_shape_fn(IxDyn(&[2, 3, 4]), |ix| {
            (ix[0] * 100 + ix[1] * 10 + ix[2]) as f64
        });
        let (fh, plane) = flatten(&h, &data).unwrap();
        assert_eq!(plane.shape(), &[3, 4]);
        assert_eq!(plane[[2, 3]], 23.0);
        assert_eq!(fh.get_i64("NAXIS"), Some(2));
        assert_eq!(fh.get_f64("EQUINOX"), Some(2000.0));
        assert_eq!(fh.get_str("CTYPE1"), Some("RA---SIN"));
        assert_eq!(fh.get_f64("CDELT2"), Some(-0.002));
        assert_eq!(fh.get_f64("CRVAL1"), Some(10.0));
        assert!(!fh.contains("CTYPE3"));
        assert!(!fh.contains("EPOCH"));
    }

    #[test]
    fn every_extra_axis_indexed_at_zero() {
        for naxis in 3..=5usize {
            let h = cube_header(naxis as i64);
            let mut shape = vec![2usize; naxis - 2];
            shape.extend([3, 3]);
            let data = Array::from_shape_fn(IxDyn(&shape), |ix| {
                let extra: usize = (0..naxis - 2).map(|k| ix[k]).sum();
                if extra == 0 {
                    1.0
                } else {
                    -1.0
                }
            });
            let (_, plane) = flatten(&h, &data).unwrap();
            assert!(plane.iter().all(|&v| v == 1.0), "naxis = {naxis}");
        }
    }

    #[test]
    fn header_and_data_rank_must_agree() {
        let h = cube_header(3);
        let data = Array::zeros(IxDyn(&[3, 3]));
        assert!(matches!(flatten(&h, &data), Err(Error::Shape { .. })));
    }
}
