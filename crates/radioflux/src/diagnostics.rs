//! Non-fatal warnings raised while resolving metadata or measuring regions.

use std::fmt;

/// A condition that degrades a result without aborting it.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// The flux unit is not `JY/BEAM`; `None` when no unit keyword exists.
    UnexpectedUnit(Option<String>),
    /// No frequency keyword or FREQ axis was found; frequency set to zero.
    MissingFrequency,
    /// A region mask selected no pixels.
    EmptyRegion { label: Option<usize> },
    /// The background region selected no pixels; noise and level are NaN.
    EmptyBackground,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnexpectedUnit(Some(unit)) => {
                write!(f, "units are {unit} but code expects JY/BEAM")
            }
            Warning::UnexpectedUnit(None) => write!(f, "units are unset but code expects JY/BEAM"),
            Warning::MissingFrequency => write!(f, "can't get frequency -- set to zero"),
            Warning::EmptyRegion { label: Some(n) } => write!(f, "region {n} contains no pixels"),
            Warning::EmptyRegion { label: None } => write!(f, "region contains no pixels"),
            Warning::EmptyBackground => write!(f, "background region contains no pixels"),
        }
    }
}

/// Collects warnings so callers can inspect them; each one is also logged.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn contains(&self, warning: &Warning) -> bool {
        self.warnings.contains(warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_in_order() {
        let mut d = Diagnostics::new();
        assert!(d.is_empty());
        d.warn(Warning::MissingFrequency);
        d.warn(Warning::UnexpectedUnit(Some(String::from("K"))));
        assert_eq!(
            d.warnings(),
            &[
                Warning::MissingFrequency,
                Warning::UnexpectedUnit(Some(String::from("K")))
            ]
        );
    }

    #[test]
    fn display_unit_warning() {
        let w = Warning::UnexpectedUnit(Some(String::from("Jy/beam")));
        assert_eq!(w.to_string(), "units are Jy/beam but code expects JY/BEAM");
    }
}
