// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Length unit names as written in configuration files and on the command line

use focalplate_model::{InputError, LengthUnit};

/// Parse a unit name
///
/// Accepts symbols (`mm`) as well as British and American spellings
/// (`millimetre`, `millimeter`), case-insensitively.
pub fn parse_unit_name(name: &str) -> Result<LengthUnit, InputError> {
    let lower = name.trim().to_ascii_lowercase();
    let unit = match lower.as_str() {
        "m" | "metre" | "meter" | "metres" | "meters" => LengthUnit::Metre,
        "mm" | "millimetre" | "millimeter" | "millimetres" | "millimeters" => {
            LengthUnit::Millimetre
        }
        "um" | "µm" | "micrometre" | "micrometer" | "micron" | "microns" => {
            LengthUnit::Micrometre
        }
        "cm" | "centimetre" | "centimeter" | "centimetres" | "centimeters" => {
            LengthUnit::Centimetre
        }
        "in" | "inch" | "inches" => LengthUnit::Inch,
        "ft" | "foot" | "feet" => LengthUnit::Foot,
        _ => return Err(InputError::UnknownUnit(name.to_string())),
    };
    Ok(unit)
}
