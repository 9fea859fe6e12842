//! Beam, frequency and unit resolution from loosely populated headers.
//!
//! Each quantity has a static, ordered table of rules. The first rule that
//! yields a value wins, so the fallback order is visible in one place.

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, Result};
use crate::fits::Header;

/// The flux unit flux normalization assumes.
pub const EXPECTED_UNIT: &str = "JY/BEAM";

/// Marker identifying a clean-beam entry in the processing history.
const CLEAN_BEAM_MARKER: &str = "CLEAN BMAJ";

/// Beam FWHM axes in the header's angular unit (degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beam {
    pub bmaj: f64,
    pub bmin: f64,
}

/// Where a beam may be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeamRule {
    /// A pair of numeric keywords (major, minor).
    Keys(&'static str, &'static str),
    /// The last parseable clean-beam line of the HISTORY log.
    History,
}

/// Where a frequency may be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyRule {
    /// A numeric keyword.
    Key(&'static str),
    /// `CRVALi` of the first axis whose `CTYPEi` equals the given type.
    AxisReference(&'static str),
}

pub const BEAM_RULES: &[BeamRule] = &[
    BeamRule::Keys("BMAJ", "BMIN"),
    BeamRule::Keys("RESOL1", "RESOL2"),
    BeamRule::History,
];

pub const FREQUENCY_RULES: &[FrequencyRule] = &[
    FrequencyRule::Key("RESTFRQ"),
    FrequencyRule::Key("RESTFREQ"),
    FrequencyRule::Key("FREQ"),
    FrequencyRule::AxisReference("FREQ"),
];

pub const UNIT_KEYS: &[&str] = &["BUNIT", "UNIT"];

/// Parse one history line of the form `... CLEAN BMAJ <maj> <x> <min> ...`.
///
/// Returns the 4th and 6th whitespace-separated tokens as `(bmaj, bmin)` if
/// the line carries the clean-beam marker and both tokens are numbers.
pub fn parse_clean_beam(line: &str) -> Option<(f64, f64)> {
    if !line.contains(CLEAN_BEAM_MARKER) {
        return None;
    }
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let bmaj = tokens.get(3)?.parse::<f64>().ok()?;
    let bmin = tokens.get(5)?.parse::<f64>().ok()?;
    Some((bmaj, bmin))
}

impl BeamRule {
    fn apply(self, header: &Header) -> Option<Beam> {
        match self {
            BeamRule::Keys(major, minor) => Some(Beam {
                bmaj: header.get_f64(major)?,
                bmin: header.get_f64(minor)?,
            }),
            BeamRule::History => header
                .history()
                .filter_map(parse_clean_beam)
                .last()
                .map(|(bmaj, bmin)| Beam { bmaj, bmin }),
        }
    }
}

impl FrequencyRule {
    fn apply(self, header: &Header) -> Option<f64> {
        match self {
            FrequencyRule::Key(key) => header.get_f64(key),
            FrequencyRule::AxisReference(axis_type) => {
                let axis = (1..)
                    .map_while(|i| header.get_str(&format!("CTYPE{i}")).map(|t| (i, t)))
                    .find(|(_, t)| *t == axis_type)?
                    .0;
                header.get_f64(&format!("CRVAL{axis}"))
            }
        }
    }
}

/// Resolve the beam, failing with [`Error::NoBeam`] when no rule applies.
pub fn resolve_beam(header: &Header) -> Result<Beam> {
    for rule in BEAM_RULES {
        if let Some(beam) = rule.apply(header) {
            tracing::debug!(?rule, bmaj = beam.bmaj, bmin = beam.bmin, "resolved beam");
            return Ok(beam);
        }
        tracing::debug!(?rule, "beam rule yielded nothing");
    }
    Err(Error::NoBeam)
}

/// Resolve the observing frequency, or 0 with a warning.
pub fn resolve_frequency(header: &Header, diagnostics: &mut Diagnostics) -> f64 {
    match FREQUENCY_RULES.iter().find_map(|rule| rule.apply(header)) {
        Some(freq) => freq,
        None => {
            diagnostics.warn(Warning::MissingFrequency);
            0.0
        }
    }
}

/// Resolve the flux unit, warning unless it is [`EXPECTED_UNIT`].
pub fn resolve_unit(header: &Header, diagnostics: &mut Diagnostics) -> Option<String> {
    let unit = UNIT_KEYS
        .iter()
        .find_map(|key| header.get_str(key))
        .map(String::from);
    if unit.as_deref() != Some(EXPECTED_UNIT) {
        diagnostics.warn(Warning::UnexpectedUnit(unit.clone()));
    }
    unit
}

/// Everything the metadata resolver extracts from one header.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub beam: Beam,
    pub frequency: f64,
    pub unit: Option<String>,
}

/// Resolve unit, beam and frequency in that order.
pub fn resolve(header: &Header, diagnostics: &mut Diagnostics) -> Result<Metadata> {
    let unit = resolve_unit(header, diagnostics);
    let beam = resolve_beam(header)?;
    let frequency = resolve_frequency(header, diagnostics);
    Ok(Metadata {
        beam,
        frequency,
        unit,
    })
}
