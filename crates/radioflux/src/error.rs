use thiserror::Error;

/// Errors raised while reading a FITS primary HDU.
#[derive(Debug, Error)]
pub enum FitsError {
    /// Malformed header block or card.
    #[error("invalid FITS header: {0}")]
    InvalidHeader(&'static str),
    /// Premature end of data while reading.
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// Unrecognized BITPIX value.
    #[error("invalid BITPIX value: {0}")]
    InvalidBitpix(i64),
    /// Malformed keyword name in a header card.
    #[error("invalid keyword name")]
    InvalidKeyword,
    /// A required keyword was not found in the header.
    #[error("missing required keyword: {0}")]
    MissingKeyword(String),
}

/// Errors raised while parsing a DS9 region file.
#[derive(Debug, Error)]
pub enum RegionError {
    /// A shape line that could not be tokenized.
    #[error("line {line}: cannot parse '{text}'")]
    Syntax { line: usize, text: String },
    /// A shape with the wrong number of parameters.
    #[error("line {line}: {shape} expects {expected} parameters, got {got}")]
    Arity {
        line: usize,
        shape: &'static str,
        expected: &'static str,
        got: usize,
    },
    /// A numeric or sexagesimal value that could not be read.
    #[error("line {line}: invalid value '{value}'")]
    InvalidValue { line: usize, value: String },
    /// A coordinate frame this crate does not convert.
    #[error("line {line}: unsupported coordinate system '{frame}'")]
    UnsupportedFrame { line: usize, frame: String },
    /// A sky-frame shape was seen before any usable coordinate transform.
    #[error("line {line}: sky coordinates cannot be converted: {reason}")]
    Projection { line: usize, reason: String },
}

/// All errors surfaced by flux measurement.
#[derive(Debug, Error)]
pub enum Error {
    /// None of the beam keywords or history entries could be resolved.
    #[error("No beam information found")]
    NoBeam,
    /// The image has fewer than two axes, so there is no plane to measure.
    #[error("Can't make map from this: NAXIS = {0}")]
    TooFewAxes(i64),
    /// Non-square pixels combined with an elliptical beam.
    #[error("Pixels are not square ({cd1}, {cd2}) and beam is elliptical")]
    NonSquareElliptical { cd1: f64, cd2: f64 },
    /// Background subtraction was requested without a background region.
    #[error("Background subtraction requested but no bg region")]
    MissingBackgroundRegion,
    /// Data array and header disagree, or a mask does not match the plane.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    Shape {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// Error from the FITS reader.
    #[error(transparent)]
    Fits(#[from] FitsError),
    /// Error from the region parser.
    #[error(transparent)]
    Region(#[from] RegionError),
    /// An I/O error, annotated with the path that failed.
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Error::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_no_beam() {
        assert_eq!(Error::NoBeam.to_string(), "No beam information found");
    }

    #[test]
    fn display_non_square_elliptical() {
        let e = Error::NonSquareElliptical { cd1: 1.0, cd2: 2.0 };
        assert_eq!(
            e.to_string(),
            "Pixels are not square (1, 2) and beam is elliptical"
        );
    }

    #[test]
    fn display_missing_background_region() {
        assert_eq!(
            Error::MissingBackgroundRegion.to_string(),
            "Background subtraction requested but no bg region"
        );
    }

    #[test]
    fn fits_error_is_transparent() {
        let e: Error = FitsError::InvalidBitpix(-99).into();
        assert_eq!(e.to_string(), "invalid BITPIX value: -99");
        assert!(matches!(e, Error::Fits(FitsError::InvalidBitpix(-99))));
    }

    #[test]
    fn region_error_carries_line() {
        let e: Error = RegionError::UnsupportedFrame {
            line: 3,
            frame: String::from("galactic"),
        }
        .into();
        assert_eq!(
            e.to_string(),
            "line 3: unsupported coordinate system 'galactic'"
        );
    }

    #[test]
    fn io_error_source() {
        use std::error::Error as StdError;

        let e = Error::io(
            std::path::Path::new("missing.fits"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        );
        assert_eq!(e.to_string(), "missing.fits: file not found");
        assert!(e.source().is_some());
    }
}
