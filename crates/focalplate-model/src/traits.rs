// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core traits
//!
//! These traits are the seams between ingestion, placement and realisation.

use crate::error::{BackendError, Result};
use crate::intent::{BatchHint, IntentStream, ModelingIntent};
use crate::types::PointCloud;
use crate::units::LengthUnit;

/// Progress callback type for parsing operations
pub type ProgressCallback = Box<dyn Fn(&str, f32) + Send>;

/// Survey ingestion interface
///
/// Implementations read textual survey records in `unit` and return a cloud
/// whose coordinates are in metres.
pub trait SurveyParser: Send + Sync {
    /// Parse survey content
    ///
    /// # Arguments
    /// * `content` - The survey file content as a string
    /// * `unit` - Length unit the raw numbers are expressed in
    fn parse(&self, content: &str, unit: LengthUnit) -> Result<PointCloud>;

    /// Parse survey content with progress reporting
    ///
    /// # Arguments
    /// * `content` - The survey file content as a string
    /// * `unit` - Length unit the raw numbers are expressed in
    /// * `on_progress` - Callback function receiving (phase_name, percent_complete)
    fn parse_with_progress(
        &self,
        content: &str,
        unit: LengthUnit,
        on_progress: ProgressCallback,
    ) -> Result<PointCloud>;
}

/// Solid-modeling backend
///
/// A backend realises intents one by one, in stream order. Batching toggles
/// are advisory; a backend without a user interface can ignore them.
pub trait ModelingBackend {
    /// Called once before the first intent when the stream carries a hint
    fn begin_batch(&mut self, _hint: &BatchHint) {}

    /// Realise one intent; `position` is its index in the stream
    fn apply(
        &mut self,
        position: usize,
        intent: &ModelingIntent,
    ) -> std::result::Result<(), BackendError>;

    /// Called once after the last intent (or after a rejection)
    fn end_batch(&mut self) {}
}

/// Replay a whole stream on a backend
///
/// Stops at the first rejected intent. Returns the number of intents applied.
pub fn apply_stream(
    backend: &mut dyn ModelingBackend,
    stream: &IntentStream,
) -> std::result::Result<usize, BackendError> {
    if let Some(hint) = stream.hint() {
        backend.begin_batch(hint);
    }

    let mut applied = 0;
    let mut outcome = Ok(());
    for (position, intent) in stream.iter().enumerate() {
        if let Err(e) = backend.apply(position, intent) {
            outcome = Err(e);
            break;
        }
        applied += 1;
    }

    if stream.hint().is_some() {
        backend.end_batch();
    }
    outcome.map(|_| applied)
}
