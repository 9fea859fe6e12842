//! Primary-HDU image data: decoding, calibration and a float64 writer.

use std::path::Path;

use bytemuck::pod_collect_to_vec;
use ndarray::{ArrayD, IxDyn};

use crate::error::{Error, FitsError, Result};
use crate::fits::header::{parse_header, serialize_header, Card, Header};
use crate::fits::value::Value;
use crate::fits::BLOCK_SIZE;

const VALID_BITPIX: [i64; 6] = [8, 16, 32, 64, -32, -64];

/// A loaded image: header plus calibrated pixel grid.
///
/// The grid is in C order with shape `[NAXISn, ..., NAXIS2, NAXIS1]`, so FITS
/// axis 1 is the last (fastest) array axis.
#[derive(Debug, Clone)]
pub struct Image {
    pub header: Header,
    pub data: ArrayD<f64>,
}

/// Axis lengths in FITS order (NAXIS1 first).
pub fn axis_lengths(header: &Header) -> std::result::Result<Vec<usize>, FitsError> {
    let naxis = header
        .get_i64("NAXIS")
        .ok_or_else(|| FitsError::MissingKeyword(String::from("NAXIS")))?;
    if naxis < 0 {
        return Err(FitsError::InvalidHeader("negative NAXIS"));
    }
    (1..=naxis)
        .map(|i| {
            let key = format!("NAXIS{i}");
            match header.get_i64(&key) {
                Some(n) if n >= 0 => Ok(n as usize),
                Some(_) => Err(FitsError::InvalidHeader("negative NAXISn")),
                None => Err(FitsError::MissingKeyword(key)),
            }
        })
        .collect()
}

fn decode_pixels(raw: &[u8], bitpix: i64) -> std::result::Result<Vec<f64>, FitsError> {
    Ok(match bitpix {
        8 => raw.iter().map(|&b| b as f64).collect(),
        16 => {
            let pixels: Vec<i16> = pod_collect_to_vec(raw);
            pixels.into_iter().map(|v| i16::from_be(v) as f64).collect()
        }
        32 => {
            let pixels: Vec<i32> = pod_collect_to_vec(raw);
            pixels.into_iter().map(|v| i32::from_be(v) as f64).collect()
        }
        64 => {
            let pixels: Vec<i64> = pod_collect_to_vec(raw);
            pixels.into_iter().map(|v| i64::from_be(v) as f64).collect()
        }
        -32 => {
            let pixels: Vec<u32> = pod_collect_to_vec(raw);
            pixels
                .into_iter()
                .map(|v| f32::from_bits(u32::from_be(v)) as f64)
                .collect()
        }
        -64 => {
            let pixels: Vec<u64> = pod_collect_to_vec(raw);
            pixels
                .into_iter()
                .map(|v| f64::from_bits(u64::from_be(v)))
                .collect()
        }
        other => return Err(FitsError::InvalidBitpix(other)),
    })
}

/// Parse the primary HDU of an in-memory FITS file.
///
/// Applies `BZERO + BSCALE * raw`; integer pixels equal to `BLANK` become NaN.
pub fn parse_image(bytes: &[u8]) -> Result<Image> {
    let (header, data_start) = parse_header(bytes)?;
    if header.get("SIMPLE") != Some(&Value::Logical(true)) {
        return Err(FitsError::InvalidHeader("primary HDU must start with SIMPLE = T").into());
    }
    let bitpix = header
        .get_i64("BITPIX")
        .ok_or_else(|| FitsError::MissingKeyword(String::from("BITPIX")))?;
    if !VALID_BITPIX.contains(&bitpix) {
        return Err(FitsError::InvalidBitpix(bitpix).into());
    }

    let naxes = axis_lengths(&header)?;
    let npixels: usize = if naxes.is_empty() {
        0
    } else {
        naxes
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or(FitsError::InvalidHeader("data size overflows"))?
    };
    let data_end = npixels
        .checked_mul(bitpix.unsigned_abs() as usize / 8)
        .and_then(|len| len.checked_add(data_start))
        .ok_or(FitsError::InvalidHeader("data size overflows"))?;
    let raw = bytes
        .get(data_start..data_end)
        .ok_or(FitsError::UnexpectedEof)?;

    let mut pixels = decode_pixels(raw, bitpix)?;
    let bscale = header.get_f64("BSCALE").unwrap_or(1.0);
    let bzero = header.get_f64("BZERO").unwrap_or(0.0);
    let blank = if bitpix > 0 {
        header.get_i64("BLANK").map(|b| b as f64)
    } else {
        None
    };
    for p in &mut pixels {
        *p = match blank {
            Some(b) if *p == b => f64::NAN,
            _ => bzero + bscale * *p,
        };
    }

    // An axis-less HDU becomes an empty one-dimensional array.
    let shape: Vec<usize> = if naxes.is_empty() {
        vec![0]
    } else {
        naxes.iter().rev().copied().collect()
    };
    let data = ArrayD::from_shape_vec(IxDyn(&shape), pixels).map_err(|_| Error::Shape {
        expected: shape.clone(),
        got: vec![npixels],
    })?;
    Ok(Image { header, data })
}

/// Read the primary HDU of the FITS file at `path`.
pub fn read_image(path: &Path) -> Result<Image> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "read FITS file");
    parse_image(&bytes)
}

/// Encode `data` as a float64 primary HDU.
///
/// The structural keywords (SIMPLE, BITPIX, NAXISn) are derived from the
/// array; every other card of `header` is carried over in order.
pub fn encode_image(header: &Header, data: &ArrayD<f64>) -> Vec<u8> {
    const STRUCTURAL: [&str; 4] = ["SIMPLE", "BITPIX", "NAXIS", "EXTEND"];

    let mut out = Header::new()
        .with("SIMPLE", Value::Logical(true))
        .with("BITPIX", Value::Integer(-64))
        .with("NAXIS", Value::Integer(data.ndim() as i64));
    for (i, &len) in data.shape().iter().rev().enumerate() {
        out.set(&format!("NAXIS{}", i + 1), Value::Integer(len as i64));
    }
    let is_structural = |c: &Card| {
        STRUCTURAL.contains(&c.keyword.as_str())
            || (c.keyword.starts_with("NAXIS") && c.keyword[5..].parse::<usize>().is_ok())
            || matches!(c.keyword.as_str(), "BSCALE" | "BZERO" | "BLANK")
    };
    let mut cards = out.cards().to_vec();
    cards.extend(header.cards().iter().filter(|c| !is_structural(c)).cloned());
    let out = Header::from_cards(cards);

    let mut bytes = serialize_header(&out);
    let pixels: Vec<u64> = data.iter().map(|v| v.to_bits().to_be()).collect();
    let raw: Vec<u8> = pod_collect_to_vec(&pixels);
    bytes.extend_from_slice(&raw);
    bytes.resize(bytes.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, 0);
    bytes
}

/// Write `data` with `header` to `path` as a float64 primary HDU.
pub fn write_image(path: &Path, header: &Header, data: &ArrayD<f64>) -> Result<()> {
    std::fs::write(path, encode_image(header, data)).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn int_image(bitpix: i64, raw: &[u8], extra: &[(&str, Value)]) -> Vec<u8> {
        let width = raw.len() / (bitpix.unsigned_abs() as usize / 8);
        let mut h = Header::new()
            .with("SIMPLE", Value::Logical(true))
            .with("BITPIX", Value::Integer(bitpix))
            .with("NAXIS", Value::Integer(2))
            .with("NAXIS1", Value::Integer(width as i64))
            .with("NAXIS2", Value::Integer(1));
        for (k, v) in extra {
            h.set(k, v.clone());
        }
        let mut bytes = serialize_header(&h);
        bytes.extend_from_slice(raw);
        bytes.resize(bytes.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, 0);
        bytes
    }

    #[test]
    fn decode_i16_big_endian() {
        let raw = [0x00, 0x01, 0xFF, 0xFF, 0x01, 0x00];
        let img = parse_image(&int_image(16, &raw, &[])).unwrap();
        assert_eq!(img.data.shape(), &[1, 3]);
        let px: Vec<f64> = img.data.iter().copied().collect();
        assert_eq!(px, vec![1.0, -1.0, 256.0]);
    }

    #[test]
    fn bscale_bzero_and_blank() {
        let raw = [0x00, 0x02, 0x7F, 0xFF];
        let img = parse_image(&int_image(
            16,
            &raw,
            &[
                ("BSCALE", Value::Float(0.5)),
                ("BZERO", Value::Float(10.0)),
                ("BLANK", Value::Integer(32767)),
            ],
        ))
        .unwrap();
        assert_eq!(img.data[[0, 0]], 11.0);
        assert!(img.data[[0, 1]].is_nan());
    }

    #[test]
    fn decode_f32() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&1.5f32.to_be_bytes());
        raw.extend_from_slice(&(-2.25f32).to_be_bytes());
        let img = parse_image(&int_image(-32, &raw, &[])).unwrap();
        assert_eq!(img.data[[0, 0]], 1.5);
        assert_eq!(img.data[[0, 1]], -2.25);
    }

    #[test]
    fn invalid_bitpix_rejected() {
        let bytes = int_image(16, &[0, 0], &[("BITPIX", Value::Integer(12))]);
        assert!(matches!(
            parse_image(&bytes),
            Err(Error::Fits(FitsError::InvalidBitpix(12)))
        ));
    }

    #[test]
    fn truncated_data_rejected() {
        let h = Header::new()
            .with("SIMPLE", Value::Logical(true))
            .with("BITPIX", Value::Integer(-64))
            .with("NAXIS", Value::Integer(2))
            .with("NAXIS1", Value::Integer(100))
            .with("NAXIS2", Value::Integer(100));
        let bytes = serialize_header(&h);
        assert!(matches!(
            parse_image(&bytes),
            Err(Error::Fits(FitsError::UnexpectedEof))
        ));
    }

    #[test]
    fn missing_naxis_keyword() {
        let h = Header::new()
            .with("SIMPLE", Value::Logical(true))
            .with("BITPIX", Value::Integer(8))
            .with("NAXIS", Value::Integer(2))
            .with("NAXIS1", Value::Integer(1));
        let err = parse_image(&serialize_header(&h)).unwrap_err();
        assert_eq!(err.to_string(), "missing required keyword: NAXIS2");
    }

    #[test]
    fn oversized_axes_rejected() {
        let h = Header::new()
            .with("SIMPLE", Value::Logical(true))
            .with("BITPIX", Value::Integer(-64))
            .with("NAXIS", Value::Integer(2))
            .with("NAXIS1", Value::Integer(1 << 40))
            .with("NAXIS2", Value::Integer(1 << 40));
        assert!(matches!(
            parse_image(&serialize_header(&h)),
            Err(Error::Fits(FitsError::InvalidHeader("data size overflows")))
        ));
    }

    #[test]
    fn axis_less_hdu_is_empty() {
        let h = Header::new()
            .with("SIMPLE", Value::Logical(true))
            .with("BITPIX", Value::Integer(8))
            .with("NAXIS", Value::Integer(0));
        let img = parse_image(&serialize_header(&h)).unwrap();
        assert_eq!(img.data.shape(), &[0]);
    }

    #[test]
    fn encode_preserves_cube_layout_and_metadata() {
        let data = Array::from_shape_fn(IxDyn(&[2, 3, 4]), |ix| {
            (ix[0] * 100 + ix[1] * 10 + ix[2]) as f64
        });
        let mut h = Header::new()
            .with("NAXIS", Value::Integer(7))
            .with("BMAJ", Value::Float(1.0e-3))
            .with("CTYPE3", Value::String(String::from("FREQ")));
        h.push_history("CLEAN BMAJ 1 2");
        let img = parse_image(&encode_image(&h, &data)).unwrap();

        assert_eq!(img.data.shape(), &[2, 3, 4]);
        assert_eq!(img.data, data);
        assert_eq!(img.header.get_i64("NAXIS"), Some(3));
        assert_eq!(img.header.get_i64("NAXIS1"), Some(4));
        assert_eq!(img.header.get_i64("NAXIS3"), Some(2));
        assert_eq!(img.header.get_f64("BMAJ"), Some(1.0e-3));
        assert_eq!(img.header.get_str("CTYPE3"), Some("FREQ"));
        assert_eq!(img.header.history().count(), 1);
    }

    #[test]
    fn write_and_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.fits");
        let data = Array::from_elem(IxDyn(&[4, 5]), 2.5);
        write_image(&path, &Header::new(), &data).unwrap();
        let img = read_image(&path).unwrap();
        assert_eq!(img.data.shape(), &[4, 5]);
        assert!(img.data.iter().all(|&v| v == 2.5));
    }

    #[test]
    fn read_missing_file_reports_path() {
        let err = read_image(Path::new("/nonexistent/map.fits")).unwrap_err();
        assert!(err.to_string().starts_with("/nonexistent/map.fits:"));
    }
}
