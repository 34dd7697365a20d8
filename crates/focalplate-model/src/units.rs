// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Length units
//!
//! Everything downstream of ingestion works in metres. A [`LengthUnit`] only
//! describes how raw survey numbers are converted on the way in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Common unit scales (unit to metres)
pub mod scales {
    /// Meters to meters (identity)
    pub const METRE: f64 = 1.0;
    /// Millimeters to meters
    pub const MILLIMETRE: f64 = 0.001;
    /// Micrometres to meters
    pub const MICROMETRE: f64 = 1e-6;
    /// Centimeters to meters
    pub const CENTIMETRE: f64 = 0.01;
    /// Inches to meters
    pub const INCH: f64 = 0.0254;
    /// Feet to meters
    pub const FOOT: f64 = 0.3048;
}

/// Length unit of raw survey records
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    Metre,
    #[default]
    Millimetre,
    Micrometre,
    Centimetre,
    Inch,
    Foot,
}

impl LengthUnit {
    /// Scale factor from this unit to metres
    pub fn scale(&self) -> f64 {
        match self {
            LengthUnit::Metre => scales::METRE,
            LengthUnit::Millimetre => scales::MILLIMETRE,
            LengthUnit::Micrometre => scales::MICROMETRE,
            LengthUnit::Centimetre => scales::CENTIMETRE,
            LengthUnit::Inch => scales::INCH,
            LengthUnit::Foot => scales::FOOT,
        }
    }

    /// Convert a value in this unit to metres
    #[inline]
    pub fn to_metres(&self, value: f64) -> f64 {
        value * self.scale()
    }

    /// Convert a value in metres to this unit
    #[inline]
    pub fn from_metres(&self, metres: f64) -> f64 {
        metres / self.scale()
    }

    /// Short symbol used in logs and config files
    pub fn symbol(&self) -> &'static str {
        match self {
            LengthUnit::Metre => "m",
            LengthUnit::Millimetre => "mm",
            LengthUnit::Micrometre => "um",
            LengthUnit::Centimetre => "cm",
            LengthUnit::Inch => "in",
            LengthUnit::Foot => "ft",
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_scales() {
        assert!((LengthUnit::Millimetre.to_metres(11045.6) - 11.0456).abs() < 1e-12);
        assert!((LengthUnit::Inch.scale() - 0.0254).abs() < 1e-10);
        assert!((LengthUnit::Millimetre.from_metres(0.0745) - 74.5).abs() < 1e-9);
        assert_eq!(LengthUnit::default(), LengthUnit::Millimetre);
    }
}
