// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Recoverable warnings and per-module failures
//!
//! A batch never aborts because of a single module. Whatever could not be
//! placed is collected in a [`BatchReport`] alongside the intent stream.

use crate::types::{ModuleIndex, TemplateVariant};
use serde::Serialize;
use thiserror::Error;

/// Recoverable condition; processing continues
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Front and back clouds differ in length; only the shorter is paired
    #[error("Front cloud has {front} points but back cloud has {back}; pairing {paired}")]
    CountMismatch {
        front: usize,
        back: usize,
        paired: usize,
    },

    /// Anchor lies outside the shell's bottom surface
    #[error("Anchor of {index} lies {radius:.6} m from the axis, outside the bottom surface")]
    AnchorOutsideFootprint { index: ModuleIndex, radius: f64 },

    /// Anchor lies outside a partial sweep sector
    #[error("Anchor of {index} at azimuth {azimuth_deg:.3}° lies outside the shell sweep")]
    AnchorOutsideSweep {
        index: ModuleIndex,
        azimuth_deg: f64,
    },

    /// Support-surface marker lies above the outer rim
    #[error("Support marker of {index} at height {height:.6} m lies above the outer rim")]
    MarkerAboveRim { index: ModuleIndex, height: f64 },
}

/// A module that could not be placed; the rest of the batch continues
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleFailure {
    /// Axis parallel to the bottom plane, or front and back coincide
    #[error("Extrusion axis of {index} does not meet the bottom plane")]
    DegenerateAxis { index: ModuleIndex },

    /// A transformed template could not be aligned with the reference
    #[error("Cannot align {variant} template of {index}: {reason}")]
    Alignment {
        index: ModuleIndex,
        variant: TemplateVariant,
        reason: String,
    },

    /// The axis never meets the support surface
    #[error("Extrusion axis of {index} misses the support surface")]
    SupportSurfaceMissed { index: ModuleIndex },
}

impl ModuleFailure {
    /// Create an alignment failure
    pub fn alignment(
        index: ModuleIndex,
        variant: TemplateVariant,
        reason: impl Into<String>,
    ) -> Self {
        ModuleFailure::Alignment {
            index,
            variant,
            reason: reason.into(),
        }
    }

    /// Module this failure belongs to
    pub fn index(&self) -> ModuleIndex {
        match self {
            ModuleFailure::DegenerateAxis { index }
            | ModuleFailure::Alignment { index, .. }
            | ModuleFailure::SupportSurfaceMissed { index } => *index,
        }
    }
}

/// Everything recoverable that happened during a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub warnings: Vec<Warning>,
    pub failures: Vec<ModuleFailure>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn fail(&mut self, failure: ModuleFailure) {
        self.failures.push(failure);
    }

    /// No warnings and no failures
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.failures.is_empty()
    }

    /// Indices of modules that produced no intents, sorted and deduplicated
    pub fn skipped_modules(&self) -> Vec<ModuleIndex> {
        let mut indices: Vec<ModuleIndex> = self.failures.iter().map(|f| f.index()).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Append another report
    pub fn merge(&mut self, other: BatchReport) {
        self.warnings.extend(other.warnings);
        self.failures.extend(other.failures);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_modules_are_unique() {
        let mut report = BatchReport::new();
        report.fail(ModuleFailure::DegenerateAxis {
            index: ModuleIndex(4),
        });
        report.fail(ModuleFailure::alignment(
            ModuleIndex(2),
            TemplateVariant::Full,
            "no reference edge",
        ));
        report.fail(ModuleFailure::SupportSurfaceMissed {
            index: ModuleIndex(4),
        });

        assert_eq!(report.skipped_modules(), vec![ModuleIndex(2), ModuleIndex(4)]);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_count_mismatch_message() {
        let warning = Warning::CountMismatch {
            front: 63,
            back: 62,
            paired: 62,
        };
        assert_eq!(
            warning.to_string(),
            "Front cloud has 63 points but back cloud has 62; pairing 62"
        );
    }
}
