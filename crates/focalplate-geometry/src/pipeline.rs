// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end placement: survey clouds in, intent stream out
//!
//! Everything fatal is checked before the first intent is written, so a
//! failed run never leaves a partial stream behind.

use crate::error::{Error, Result};
use crate::frame::{pair_modules, FrameBuilder};
use crate::instancer::{Instancer, ModulePlan};
use crate::shell::ShellContext;
use crate::template::{TemplateLibrary, TemplateParams};
use focalplate_model::{BatchHint, BatchReport, IntentStream, LengthUnit, ModuleIndex, PointCloud};

/// Placement options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Plan modules on the rayon pool
    pub parallel: bool,
    /// Batching toggles attached to the stream
    pub batch_hint: Option<BatchHint>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            batch_hint: None,
        }
    }
}

impl PipelineOptions {
    /// Single-threaded planning
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Options for replay inside a host with a live user interface
    pub fn interactive_host() -> Self {
        Self {
            batch_hint: Some(BatchHint::interactive_host()),
            ..Self::default()
        }
    }

    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn with_batch_hint(mut self, hint: BatchHint) -> Self {
        self.batch_hint = Some(hint);
        self
    }
}

/// Result of a placement run
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOutput {
    pub stream: IntentStream,
    pub report: BatchReport,
    pub reference: ModuleIndex,
    /// Plans in stream order, reference first
    pub plans: Vec<ModulePlan>,
}

impl PipelineOutput {
    /// Number of modules that produced intents
    pub fn placed(&self) -> usize {
        self.plans.len()
    }
}

/// Place templates on every module of two survey clouds
pub fn generate(
    front: &PointCloud,
    back: &PointCloud,
    shell: &ShellContext,
    params: TemplateParams,
    options: PipelineOptions,
) -> Result<PipelineOutput> {
    let library = TemplateLibrary::new(params)?;
    let mut report = BatchReport::new();

    let (pairs, mismatch) = pair_modules(front, back);
    if let Some(warning) = mismatch {
        log::warn!("{}", warning);
        report.warn(warning);
    }

    let frames = FrameBuilder::new(shell).build_all(&pairs, &mut report)?;
    if frames.is_empty() {
        return Err(Error::NoReferenceModule);
    }
    log::info!("Built {} of {} module frames", frames.len(), pairs.len());

    let instancer = Instancer::new(shell, library, &frames)?.with_parallel(options.parallel);
    let reference = instancer.reference().frame.index;

    let mut stream = match options.batch_hint {
        Some(hint) => IntentStream::with_hint(hint),
        None => IntentStream::new(),
    };
    let plans = instancer.instantiate(&frames, &mut stream, &mut report)?;

    log::info!(
        "Placed {} modules with {} intents ({} warnings, {} skipped)",
        plans.len(),
        stream.len(),
        report.warnings.len(),
        report.skipped_modules().len()
    );

    Ok(PipelineOutput {
        stream,
        report,
        reference,
        plans,
    })
}

/// Parse two survey files and place templates on them
///
/// When `recenter_z` is set the best-fit sphere radius is added to every z
/// coordinate of both clouds before frames are built.
pub fn generate_from_text(
    front: &str,
    back: &str,
    unit: LengthUnit,
    recenter_z: bool,
    shell: &ShellContext,
    params: TemplateParams,
    options: PipelineOptions,
) -> Result<PipelineOutput> {
    let mut front = focalplate_parser::parse(front, unit)?;
    let mut back = focalplate_parser::parse(back, unit)?;
    if recenter_z {
        let dz = shell.best_fit_sphere_radius();
        front = front.with_z_offset(dz)?;
        back = back.with_z_offset(dz)?;
    }
    log::debug!("Front cloud:\n{}", front.dump());
    log::debug!("Back cloud:\n{}", back.dump());

    generate(&front, &back, shell, params, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::tests::sample_shell;
    use crate::template::tests::sample_params;
    use focalplate_model::{InputError, ModuleFailure, Warning};

    #[test]
    fn test_options_presets() {
        assert!(PipelineOptions::default().parallel);
        assert!(!PipelineOptions::sequential().parallel);
        assert_eq!(
            PipelineOptions::interactive_host().batch_hint,
            Some(BatchHint::interactive_host())
        );
        let options = PipelineOptions::sequential().with_parallel(true);
        assert!(options.parallel);
    }

    #[test]
    fn test_invalid_template_is_fatal() {
        let err = generate_from_text(
            "0 0 -11000 1\n",
            "0 0 -11050 1\n",
            LengthUnit::Millimetre,
            true,
            &sample_shell(),
            TemplateParams::new(0.0745, 0.040, 0.003),
            PipelineOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(_)));
    }

    #[test]
    fn test_empty_cloud_is_fatal() {
        let err = generate_from_text(
            "# nothing here\n",
            "0 0 -11050 1\n",
            LengthUnit::Millimetre,
            true,
            &sample_shell(),
            sample_params(),
            PipelineOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, Error::Input(InputError::Empty));
    }

    #[test]
    fn test_all_degenerate_has_no_reference() {
        let err = generate_from_text(
            "0 0 0 1\n1 0 0 1\n",
            "0 0 0 1\n1 0 0 1\n",
            LengthUnit::Metre,
            false,
            &sample_shell(),
            sample_params(),
            PipelineOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, Error::NoReferenceModule);
    }

    #[test]
    fn test_mismatch_and_degenerate_reported() {
        // Module 1 has coincident points; the back cloud has one point fewer
        let front = "10 20 -11000 1\n60 20 -11000 1\n-50 30 -11000 0\n0 80 -11000 1\n";
        let back = "10 20 -11050 1\n60 20 -11000 1\n-50 30 -11050 1\n";
        let output = generate_from_text(
            front,
            back,
            LengthUnit::Millimetre,
            true,
            &sample_shell(),
            sample_params(),
            PipelineOptions::sequential(),
        )
        .unwrap();

        assert_eq!(output.reference, ModuleIndex(0));
        assert_eq!(output.placed(), 2);
        assert_eq!(
            output.report.warnings[0],
            Warning::CountMismatch {
                front: 4,
                back: 3,
                paired: 3
            }
        );
        assert_eq!(
            output.report.failures,
            vec![ModuleFailure::DegenerateAxis {
                index: ModuleIndex(1)
            }]
        );
        assert_eq!(output.stream.count_op("create_polygon"), 6);
    }
}
