// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Focalplate Model - Shared types and traits for focal-plate module placement
//!
//! This crate provides the core abstractions shared by the survey parser, the
//! placement engine and any modeling backend. Nothing here depends on a math
//! library; coordinates cross crate boundaries as plain `[f64; 3]` values.
//!
//! # Architecture
//!
//! - [`PointCloud`] - Ordered, index-addressable survey points in metres
//! - [`SurveyParser`] - Entry point for ingesting survey records
//! - [`ModelingIntent`] / [`IntentStream`] - Ordered, handle-based instructions
//!   for a solid-modeling backend
//! - [`ModelingBackend`] - Seam implemented by anything that realises intents
//! - [`BatchReport`] - Recoverable warnings and per-module failures
//!
//! # Example
//!
//! ```ignore
//! use focalplate_model::{apply_stream, LengthUnit, SurveyParser};
//!
//! let parser: Box<dyn SurveyParser> = get_parser();
//! let front = parser.parse(front_text, LengthUnit::Millimetre)?;
//! println!("{} front points", front.len());
//!
//! let count = apply_stream(&mut backend, &stream)?;
//! ```

pub mod error;
pub mod intent;
pub mod report;
pub mod traits;
pub mod types;
pub mod units;

// Re-export all public types
pub use error::*;
pub use intent::*;
pub use report::*;
pub use traits::*;
pub use types::*;
pub use units::*;
