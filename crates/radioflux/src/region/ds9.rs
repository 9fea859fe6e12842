//! DS9 region-file parsing.
//!
//! Sky-frame shapes are converted to pixel coordinates with the image's
//! coordinate transform as they are read, so the resulting [`RegionSet`]
//! is always in pixels.

use std::path::Path;

use crate::error::{Error, RegionError, Result};
use crate::fits::value::parse_float;
use crate::fits::Header;
use crate::region::{RegionSet, RegionShape, Shape};
use crate::wcs::Wcs;

type ParseResult<T> = std::result::Result<T, RegionError>;

/// Coordinate frame of the shapes that follow a frame line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// Pixel coordinates (`image`, `physical`).
    Image,
    /// Equatorial J2000 degrees or sexagesimal (`fk5`, `icrs`, `j2000`).
    Sky,
}

/// `Some(Some(frame))` for a supported frame line, `Some(None)` for a frame
/// that is recognized but not converted, `None` when `name` is not a frame.
fn frame_line(name: &str) -> Option<Option<Frame>> {
    match name {
        "image" | "physical" => Some(Some(Frame::Image)),
        "fk5" | "icrs" | "j2000" => Some(Some(Frame::Sky)),
        "fk4" | "b1950" | "galactic" | "ecliptic" | "linear" | "amplifier" | "detector" => {
            Some(None)
        }
        _ => None,
    }
}

/// Shapes that select no area and are skipped.
const IGNORED_SHAPES: [&str; 9] = [
    "point",
    "text",
    "line",
    "vector",
    "ruler",
    "compass",
    "projection",
    "segment",
    "composite",
];

struct Parser<'a> {
    wcs: &'a Wcs,
    frame: Frame,
    line: usize,
}

impl Parser<'_> {
    fn invalid(&self, value: &str) -> RegionError {
        RegionError::InvalidValue {
            line: self.line,
            value: value.to_string(),
        }
    }

    /// A plain number, with an optional pixel suffix.
    fn number(&self, token: &str) -> ParseResult<f64> {
        let t = token.trim_end_matches(['i', 'p']);
        parse_float(t).ok_or_else(|| self.invalid(token))
    }

    /// Sexagesimal `a:b:c` or `a h b m c s` / `a d b m c s`, returned in the
    /// first component's unit.
    fn sexagesimal(&self, token: &str) -> ParseResult<Option<f64>> {
        let parts: Vec<&str> = token
            .split([':', 'h', 'd', 'm', 's'])
            .filter(|p| !p.is_empty())
            .collect();
        if !token.contains([':', 'h', 'm']) || parts.is_empty() || parts.len() > 3 {
            return Ok(None);
        }
        let negative = token.trim_start().starts_with('-');
        let mut total = 0.0;
        for (i, part) in parts.iter().enumerate() {
            let v = parse_float(part.trim_start_matches(['+', '-'])).ok_or_else(|| self.invalid(token))?;
            total += v / 60f64.powi(i as i32);
        }
        Ok(Some(if negative { -total } else { total }))
    }

    /// A longitude or latitude in degrees.
    fn angle_coord(&self, token: &str, is_ra: bool) -> ParseResult<f64> {
        if let Some(v) = self.sexagesimal(token)? {
            return Ok(if is_ra { v * 15.0 } else { v });
        }
        let t = token.trim_end_matches('d');
        parse_float(t).ok_or_else(|| self.invalid(token))
    }

    /// A pixel position from a coordinate pair.
    fn position(&self, xs: &str, ys: &str) -> ParseResult<(f64, f64)> {
        match self.frame {
            Frame::Image => Ok((self.number(xs)?, self.number(ys)?)),
            Frame::Sky => {
                let lon = self.angle_coord(xs, true)?;
                let lat = self.angle_coord(ys, false)?;
                self.wcs
                    .world_to_pixel(lon, lat)
                    .ok_or_else(|| RegionError::Projection {
                        line: self.line,
                        reason: format!("({lon}, {lat}) is outside the projection"),
                    })
            }
        }
    }

    /// A length in pixels. Unit suffixes select arcsec, arcmin, degrees or
    /// pixels; a bare number is in pixels for image frames and degrees for
    /// sky frames.
    fn size(&self, token: &str) -> ParseResult<f64> {
        let (body, degrees_per_unit) = match token.chars().last() {
            Some('"') => (&token[..token.len() - 1], Some(1.0 / 3600.0)),
            Some('\'') => (&token[..token.len() - 1], Some(1.0 / 60.0)),
            Some('d') => (&token[..token.len() - 1], Some(1.0)),
            Some('r') => (&token[..token.len() - 1], Some(1.0f64.to_degrees())),
            Some('i' | 'p') => (&token[..token.len() - 1], None),
            _ if self.frame == Frame::Sky => (token, Some(1.0)),
            _ => (token, None),
        };
        let v = parse_float(body).ok_or_else(|| self.invalid(token))?;
        match degrees_per_unit {
            None => Ok(v),
            Some(scale) => {
                let pixel = self.wcs.pixel_scale();
                if pixel == 0.0 || !pixel.is_finite() {
                    return Err(RegionError::Projection {
                        line: self.line,
                        reason: String::from("image has no pixel scale"),
                    });
                }
                Ok(v * scale / pixel)
            }
        }
    }

    fn angle(&self, token: &str) -> ParseResult<f64> {
        parse_float(token.trim_end_matches('d')).ok_or_else(|| self.invalid(token))
    }

    fn arity(&self, shape: &'static str, expected: &'static str, got: usize) -> RegionError {
        RegionError::Arity {
            line: self.line,
            shape,
            expected,
            got,
        }
    }

    fn shape(&self, name: &str, args: &[&str]) -> ParseResult<Option<Shape>> {
        let shape = match name {
            "circle" => {
                if args.len() != 3 {
                    return Err(self.arity("circle", "3", args.len()));
                }
                let (x, y) = self.position(args[0], args[1])?;
                Shape::Circle {
                    x,
                    y,
                    r: self.size(args[2])?,
                }
            }
            "ellipse" => {
                if !(4..=5).contains(&args.len()) {
                    return Err(self.arity("ellipse", "4 or 5", args.len()));
                }
                let (x, y) = self.position(args[0], args[1])?;
                Shape::Ellipse {
                    x,
                    y,
                    a: self.size(args[2])?,
                    b: self.size(args[3])?,
                    angle: args.get(4).map_or(Ok(0.0), |a| self.angle(a))?,
                }
            }
            "box" => {
                if !(4..=5).contains(&args.len()) {
                    return Err(self.arity("box", "4 or 5", args.len()));
                }
                let (x, y) = self.position(args[0], args[1])?;
                Shape::Box {
                    x,
                    y,
                    width: self.size(args[2])?,
                    height: self.size(args[3])?,
                    angle: args.get(4).map_or(Ok(0.0), |a| self.angle(a))?,
                }
            }
            "polygon" => {
                if args.len() < 6 || args.len() % 2 != 0 {
                    return Err(self.arity("polygon", "an even number >= 6", args.len()));
                }
                let vertices = args
                    .chunks_exact(2)
                    .map(|p| self.position(p[0], p[1]))
                    .collect::<ParseResult<Vec<_>>>()?;
                Shape::Polygon { vertices }
            }
            "annulus" => {
                if args.len() != 4 {
                    return Err(self.arity("annulus", "4", args.len()));
                }
                let (x, y) = self.position(args[0], args[1])?;
                Shape::Annulus {
                    x,
                    y,
                    inner: self.size(args[2])?,
                    outer: self.size(args[3])?,
                }
            }
            _ if IGNORED_SHAPES.contains(&name) => {
                tracing::debug!(line = self.line, shape = name, "skipping shape without area");
                return Ok(None);
            }
            _ => {
                return Err(RegionError::Syntax {
                    line: self.line,
                    text: name.to_string(),
                })
            }
        };
        Ok(Some(shape))
    }

    /// Handle one `;`-separated statement.
    fn statement(&mut self, text: &str) -> ParseResult<Option<RegionShape>> {
        let lower = text.to_ascii_lowercase();
        let lower = lower.trim();
        if lower.is_empty() || lower.starts_with("global") {
            return Ok(None);
        }
        if let Some(frame) = frame_line(lower) {
            self.frame = frame.ok_or_else(|| RegionError::UnsupportedFrame {
                line: self.line,
                frame: lower.to_string(),
            })?;
            return Ok(None);
        }

        let (exclude, body) = match lower.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, lower.strip_prefix('+').unwrap_or(lower).trim_start()),
        };
        let (name, args) = match body.find('(') {
            Some(open) => {
                let close = body.rfind(')').filter(|&c| c > open).ok_or_else(|| {
                    RegionError::Syntax {
                        line: self.line,
                        text: text.to_string(),
                    }
                })?;
                (body[..open].trim(), &body[open + 1..close])
            }
            None => match body.split_once(char::is_whitespace) {
                Some((name, rest)) => (name, rest),
                None => (body, ""),
            },
        };
        let args: Vec<&str> = args
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|a| !a.is_empty())
            .collect();

        Ok(self
            .shape(name, &args)?
            .map(|shape| RegionShape { shape, exclude }))
    }
}

/// Parse DS9 region text into pixel-coordinate shapes.
///
/// `header` supplies the coordinate transform for sky-frame shapes. Shapes
/// before any frame line are taken to be in image coordinates.
pub fn parse_regions(text: &str, header: &Header) -> Result<RegionSet> {
    let wcs = Wcs::from_header(header);
    let mut parser = Parser {
        wcs: &wcs,
        frame: Frame::Image,
        line: 0,
    };
    let mut shapes = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        parser.line = idx + 1;
        let content = raw.split('#').next().unwrap_or("");
        for statement in content.split(';') {
            if let Some(shape) = parser.statement(statement)? {
                shapes.push(shape);
            }
        }
    }
    Ok(RegionSet::new(shapes))
}

/// Read and parse the DS9 region file at `path`.
pub fn read_regions(path: &Path, header: &Header) -> Result<RegionSet> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let set = parse_regions(&text, header)?;
    tracing::debug!(path = %path.display(), shapes = set.len(), "parsed regions");
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fits::Value;

    fn sky_header() -> Header {
        Header::new()
            .with("CTYPE1", Value::String(String::from("RA---SIN")))
            .with("CTYPE2", Value::String(String::from("DEC--SIN")))
            .with("CRPIX1", Value::Float(101.0))
            .with("CRPIX2", Value::Float(101.0))
            .with("CDELT1", Value::Float(-1.0 / 3600.0))
            .with("CDELT2", Value::Float(1.0 / 3600.0))
            .with("CRVAL1", Value::Float(202.5))
            .with("CRVAL2", Value::Float(47.0))
    }

    fn only_shape(text: &str) -> Shape {
        let set = parse_regions(text, &sky_header()).unwrap();
        assert_eq!(set.len(), 1, "{text}");
        set.shapes()[0].shape.clone()
    }

    #[test]
    fn image_circle() {
        let text = "# Region file format: DS9 version 4.1\n\
                    global color=green dashlist=8 3 width=1\n\
                    image\n\
                    circle(100,120.5,20) # color=red\n";
        assert_eq!(
            only_shape(text),
            Shape::Circle {
                x: 100.0,
                y: 120.5,
                r: 20.0
            }
        );
    }

    #[test]
    fn fk5_circle_at_reference() {
        match only_shape("fk5\ncircle(13:30:00.0,+47:00:00.0,30\")") {
            Shape::Circle { x, y, r } => {
                assert!((x - 101.0).abs() < 1e-6);
                assert!((y - 101.0).abs() < 1e-6);
                assert!((r - 30.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fk5_decimal_degrees_and_bare_size() {
        match only_shape("fk5;circle(202.5,47.0,0.01)") {
            Shape::Circle { x, y, r } => {
                assert!((x - 101.0).abs() < 1e-6);
                assert!((y - 101.0).abs() < 1e-6);
                assert!((r - 36.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn negative_declination_sexagesimal() {
        let h = sky_header().with("CRVAL2", Value::Float(-30.5));
        let set = parse_regions("icrs\ncircle(202.5,-30:30:00,1')", &h).unwrap();
        match &set.shapes()[0].shape {
            Shape::Circle { y, r, .. } => {
                assert!((y - 101.0).abs() < 1e-6);
                assert!((r - 60.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exclusion_and_multiple_shapes() {
        let set = parse_regions(
            "image\ncircle(50,50,10)\n-circle(50,50,2)\nbox(10,10,4,6,30)",
            &sky_header(),
        )
        .unwrap();
        assert_eq!(set.len(), 3);
        assert!(!set.shapes()[0].exclude);
        assert!(set.shapes()[1].exclude);
        assert_eq!(
            set.shapes()[2].shape,
            Shape::Box {
                x: 10.0,
                y: 10.0,
                width: 4.0,
                height: 6.0,
                angle: 30.0
            }
        );
    }

    #[test]
    fn polygon_and_ellipse() {
        let set = parse_regions(
            "image; polygon(1,1,10,1,10,10,1,10); ellipse(5,5,3,2)",
            &sky_header(),
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        match &set.shapes()[0].shape {
            Shape::Polygon { vertices } => assert_eq!(vertices.len(), 4),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            set.shapes()[1].shape,
            Shape::Ellipse { angle, .. } if angle == 0.0
        ));
    }

    #[test]
    fn points_and_text_are_skipped() {
        let set = parse_regions(
            "image\npoint(10,10) # point=x\ntext(5,5) # text={hi}\nannulus(5,5,1,2)",
            &sky_header(),
        )
        .unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn unsupported_frame_reports_line() {
        let err = parse_regions("image\ncircle(1,1,1)\ngalactic\n", &sky_header()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "line 3: unsupported coordinate system 'galactic'"
        );
    }

    #[test]
    fn wrong_arity() {
        let err = parse_regions("image;circle(1,1)", &sky_header()).unwrap_err();
        assert!(matches!(
            err,
            Error::Region(RegionError::Arity {
                shape: "circle",
                got: 2,
                ..
            })
        ));
    }

    #[test]
    fn unknown_shape() {
        assert!(matches!(
            parse_regions("image;blob(1,2,3)", &sky_header()),
            Err(Error::Region(RegionError::Syntax { line: 1, .. }))
        ));
    }

    #[test]
    fn bad_number() {
        assert!(matches!(
            parse_regions("image\ncircle(1,x,3)", &sky_header()),
            Err(Error::Region(RegionError::InvalidValue { line: 2, .. }))
        ));
    }

    #[test]
    fn default_frame_is_image() {
        assert_eq!(
            only_shape("circle(3,4,5)"),
            Shape::Circle {
                x: 3.0,
                y: 4.0,
                r: 5.0
            }
        );
    }

    #[test]
    fn read_regions_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ds9.reg");
        std::fs::write(&path, "image\ncircle(5,5,2)\ncircle(9,9,1)\n").unwrap();
        let set = read_regions(&path, &sky_header()).unwrap();
        assert_eq!(set.individual().len(), 2);
    }
}
