//! Conversion of locale-formatted viewer counts ("8.5천명 시청 중") to integers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewerCountError {
    #[error("no digits in viewer text {0:?}")]
    NoDigits(String),

    #[error("malformed number {number:?} before unit {unit:?} in {text:?}")]
    MalformedNumber {
        text: String,
        number: String,
        unit: String,
    },

    #[error("viewer count out of range in {0:?}")]
    OutOfRange(String),
}

/// A magnitude marker such as `만` (ten thousand).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMarker {
    pub marker: String,
    pub multiplier: u64,
}

impl UnitMarker {
    pub fn new(marker: &str, multiplier: u64) -> Self {
        Self {
            marker: marker.to_string(),
            multiplier,
        }
    }
}

/// How a catalog page phrases its viewer counts.
///
/// Units are tested in order, so larger magnitudes must come first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerLocale {
    pub watching_suffix: String,
    pub units: Vec<UnitMarker>,
}

impl Default for ViewerLocale {
    fn default() -> Self {
        Self {
            watching_suffix: "명 시청 중".to_string(),
            units: vec![UnitMarker::new("만", 10_000), UnitMarker::new("천", 1_000)],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewerCountParser {
    locale: ViewerLocale,
}

impl ViewerCountParser {
    pub fn new(locale: ViewerLocale) -> Self {
        Self { locale }
    }

    /// Parses a single viewer-count label.
    ///
    /// Unit-scaled values are truncated toward zero. Text without a unit keeps
    /// only its ASCII digits, so `"1,234명 시청 중"` is `1234`.
    pub fn parse(&self, text: &str) -> Result<u64, ViewerCountError> {
        let stripped = text.replace(self.locale.watching_suffix.as_str(), "");
        let stripped = stripped.trim();

        for unit in &self.locale.units {
            if unit.marker.is_empty() || !stripped.contains(unit.marker.as_str()) {
                continue;
            }
            let number = stripped.replace(unit.marker.as_str(), "");
            let number = number.trim();
            let value: f64 = number.parse().map_err(|_| ViewerCountError::MalformedNumber {
                text: text.to_string(),
                number: number.to_string(),
                unit: unit.marker.clone(),
            })?;
            return scale(value, unit.multiplier, text);
        }

        let digits: String = stripped.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(ViewerCountError::NoDigits(text.to_string()));
        }
        digits
            .parse()
            .map_err(|_| ViewerCountError::OutOfRange(text.to_string()))
    }

    /// Absent or blank labels count as zero viewers and never reach [`parse`](Self::parse).
    pub fn parse_or_zero(&self, text: Option<&str>) -> Result<u64, ViewerCountError> {
        match text {
            Some(t) if !t.trim().is_empty() => self.parse(t),
            _ => Ok(0),
        }
    }
}

fn scale(value: f64, multiplier: u64, text: &str) -> Result<u64, ViewerCountError> {
    let scaled = value * multiplier as f64;
    if !scaled.is_finite() || scaled < 0.0 || scaled >= u64::MAX as f64 {
        return Err(ViewerCountError::OutOfRange(text.to_string()));
    }
    Ok(scaled.trunc() as u64)
}
