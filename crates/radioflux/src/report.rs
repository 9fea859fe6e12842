//! Text rows of the flux report.

use std::fmt;

use crate::stats::Measurement;

/// One measured region of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    /// Identifier of the image, usually its path.
    pub source: String,
    /// 1-based position of the region when regions are measured individually.
    pub label: Option<usize>,
    pub frequency: f64,
    pub measurement: Measurement,
}

impl ReportRow {
    pub fn flux(&self) -> f64 {
        self.measurement.flux
    }

    pub fn error(&self) -> Option<f64> {
        self.measurement.error
    }
}

/// `<source> [<label>] <frequency> <flux> [<error>]`, space separated, with
/// the frequency in `%g` style.
impl fmt::Display for ReportRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)?;
        if let Some(label) = self.label {
            write!(f, " {label}")?;
        }
        write!(f, " {} {}", format_g(self.frequency), self.measurement.flux)?;
        if let Some(error) = self.measurement.error {
            write!(f, " {error}")?;
        }
        Ok(())
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Format like C's `%g`: six significant digits, scientific notation for
/// exponents below -4 or from 6 up, trailing zeros removed.
pub fn format_g(value: f64) -> String {
    if value == 0.0 {
        return String::from("0");
    }
    if value.is_nan() {
        return String::from("nan");
    }
    if value.is_infinite() {
        return String::from(if value > 0.0 { "inf" } else { "-inf" });
    }

    let sci = format!("{value:.5e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((&sci, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if !(-4..6).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.abs())
    } else {
        let decimals = (5 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}
