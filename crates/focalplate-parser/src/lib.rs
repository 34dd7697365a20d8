// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Focalplate Parser - Survey point-cloud reader
//!
//! This crate reads the text files produced by the focal-plane survey: one
//! `x y z flag` record per line, one file for the front points and one for
//! the back points. It implements the traits defined in `focalplate-model`.
//!
//! # Features
//!
//! - **Record tokenization** using `nom` combinators and `lexical-core`
//! - **SIMD-accelerated line scanning** using `memchr`
//! - **Unit conversion** to metres at ingestion time
//! - **Progress reporting** for large surveys
//!
//! # Example
//!
//! ```ignore
//! use focalplate_parser::SurveyReader;
//! use focalplate_model::{LengthUnit, SurveyParser};
//!
//! let reader = SurveyReader::new();
//! let front = reader.parse(front_text, LengthUnit::Millimetre)?;
//! println!("Found {} modules", front.len());
//! ```

mod reader;
mod scanner;
mod tokenizer;
mod units;

pub use scanner::LineScanner;
pub use tokenizer::{parse_record, RawRecord};
pub use units::parse_unit_name;

use focalplate_model::{LengthUnit, PointCloud, ProgressCallback, Result, SurveyParser};

/// Survey reader implementing the `SurveyParser` trait
#[derive(Default, Clone, Copy, Debug)]
pub struct SurveyReader {
    /// Whether the first record line is a column header
    pub has_header: bool,
}

impl SurveyReader {
    /// Create a new reader with default settings
    pub fn new() -> Self {
        Self { has_header: false }
    }

    /// Set whether the first record line is a column header
    pub fn with_header(mut self, enabled: bool) -> Self {
        self.has_header = enabled;
        self
    }
}

impl SurveyParser for SurveyReader {
    fn parse(&self, content: &str, unit: LengthUnit) -> Result<PointCloud> {
        reader::read_cloud(content, unit, self.has_header, None)
    }

    fn parse_with_progress(
        &self,
        content: &str,
        unit: LengthUnit,
        on_progress: ProgressCallback,
    ) -> Result<PointCloud> {
        reader::read_cloud(content, unit, self.has_header, Some(&on_progress))
    }
}

/// Quick parse function for simple use cases
pub fn parse(content: &str, unit: LengthUnit) -> Result<PointCloud> {
    SurveyReader::new().parse(content, unit)
}
