// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Instancer - places the reference templates on every module frame
//!
//! The reference module's templates are built once and frozen before any
//! module is planned. Planning is independent per module and runs on the
//! rayon pool; emission is serial so handles are allocated in index order.

use crate::emitter::IntentEmitter;
use crate::error::{Error, Result};
use crate::frame::{FrameSet, ModuleFrame};
use crate::placement::{PlacedVariant, PlacementTransform};
use crate::shell::{ReferencePlane, ShellContext};
use crate::template::{TemplateAnchor, TemplateLibrary, TemplateSet};
use crate::tolerance::BASIS_EPSILON;
use focalplate_model::{BatchReport, IntentStream, ModuleFailure, TemplateVariant, Warning};
use nalgebra::{Point3, Unit, Vector3};
use rayon::prelude::*;

/// Templates and alignment edges of the reference module
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceModule {
    pub frame: ModuleFrame,
    pub templates: TemplateSet,
    /// Centroid of the templates, on the frame anchor
    pub center: Point3<f64>,
    /// Alignment side per variant, in emission order
    pub sides: [usize; 3],
    /// Unit direction of each alignment side
    pub directions: [Vector3<f64>; 3],
}

impl ReferenceModule {
    /// Build the reference templates with their centroid on the frame anchor
    pub fn build(
        frame: &ModuleFrame,
        library: &TemplateLibrary,
        plane: ReferencePlane,
    ) -> Result<Self> {
        let up = template_up(&frame.normal, plane).ok_or_else(|| {
            Error::reference_alignment(frame.index, "no in-plane up direction")
        })?;
        let start = frame.anchor - up.into_inner() * library.params().circumradius();
        let anchor = TemplateAnchor::new(start, up.into_inner(), frame.normal.into_inner())?;
        let templates = library.build(&anchor);

        let center = templates.full.center_point().ok_or_else(|| {
            Error::reference_alignment(frame.index, "template center is not finite")
        })?;

        let mut sides = [0usize; 3];
        let mut directions = [Vector3::zeros(); 3];
        for variant in TemplateVariant::ALL {
            let pattern = templates.get(variant);
            let side = pattern.alignment_side(plane).ok_or_else(|| {
                Error::reference_alignment(
                    frame.index,
                    format!("{} template has no alignment edge", variant),
                )
            })?;
            sides[variant.ordinal()] = side;
            directions[variant.ordinal()] = pattern.side(side).direction().normalize();
        }

        Ok(Self {
            frame: *frame,
            templates,
            center,
            sides,
            directions,
        })
    }

    /// Plan of the reference module itself: templates used as-is
    fn placed_variants(&self) -> Vec<PlacedVariant> {
        TemplateVariant::ALL
            .iter()
            .map(|&v| {
                PlacedVariant::identity(self.templates.get(v), self.center, self.sides[v.ordinal()])
            })
            .collect()
    }
}

/// Reference plane's vertical axis projected onto the module plane
///
/// Falls back to the horizontal axis when the module normal is vertical.
fn template_up(normal: &Unit<Vector3<f64>>, plane: ReferencePlane) -> Option<Unit<Vector3<f64>>> {
    let project = |v: Vector3<f64>| v - normal.into_inner() * normal.dot(&v);
    Unit::try_new(project(plane.vertical()), BASIS_EPSILON)
        .or_else(|| Unit::try_new(project(plane.horizontal()), BASIS_EPSILON))
}

/// Everything needed to emit one module
#[derive(Clone, Debug, PartialEq)]
pub struct ModulePlan {
    pub frame: ModuleFrame,
    pub is_reference: bool,
    /// Placed variants in emission order
    pub variants: Vec<PlacedVariant>,
    /// Target of the full-depth cut
    pub support_marker: Point3<f64>,
    pub warnings: Vec<Warning>,
}

/// Places the reference templates on module frames
pub struct Instancer {
    shell: ShellContext,
    library: TemplateLibrary,
    reference: ReferenceModule,
    parallel: bool,
}

impl Instancer {
    /// Select the reference module and freeze its templates
    pub fn new(shell: &ShellContext, library: TemplateLibrary, frames: &FrameSet) -> Result<Self> {
        let frame = frames.reference_module().ok_or(Error::NoReferenceModule)?;
        let reference = ReferenceModule::build(frame, &library, shell.reference_plane())?;
        log::info!(
            "Reference module {} at ({:.6}, {:.6}, {:.6})",
            frame.index,
            frame.anchor.x,
            frame.anchor.y,
            frame.anchor.z
        );

        Ok(Self {
            shell: *shell,
            library,
            reference,
            parallel: true,
        })
    }

    /// Set whether module plans are computed on the rayon pool
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn reference(&self) -> &ReferenceModule {
        &self.reference
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    /// Plan one module
    pub fn plan_module(&self, frame: &ModuleFrame) -> std::result::Result<ModulePlan, ModuleFailure> {
        let is_reference = frame.index == self.reference.frame.index;
        let plane = self.shell.reference_plane();

        let variants = if is_reference {
            self.reference.placed_variants()
        } else {
            let transform =
                PlacementTransform::new(self.reference.center, &self.reference.frame.normal, frame);
            TemplateVariant::ALL
                .iter()
                .map(|&v| {
                    transform.place(
                        self.reference.templates.get(v),
                        &self.reference.directions[v.ordinal()],
                        plane,
                    )
                })
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        let support_marker = self
            .shell
            .support_marker(&frame.anchor, &frame.normal)
            .ok_or(ModuleFailure::SupportSurfaceMissed { index: frame.index })?;

        let mut warnings = self.shell.check_anchor(frame.index, &frame.anchor);
        warnings.extend(self.shell.check_marker(frame.index, &support_marker));

        log::debug!(
            "Planned {}: flipped={} angle={:.6} rad",
            frame.index,
            variants.first().map(|v| v.flipped).unwrap_or(false),
            variants.first().map(|v| v.alignment_angle).unwrap_or(0.0)
        );

        Ok(ModulePlan {
            frame: *frame,
            is_reference,
            variants,
            support_marker,
            warnings,
        })
    }

    /// Plan every non-reference module in index order
    ///
    /// Failures and warnings go to `report`; failed modules are left out.
    pub fn plan_all(&self, frames: &FrameSet, report: &mut BatchReport) -> Vec<ModulePlan> {
        let pending: Vec<&ModuleFrame> = frames
            .iter()
            .filter(|f| f.index != self.reference.frame.index)
            .collect();

        // Ordered collect keeps index order regardless of scheduling
        let results: Vec<std::result::Result<ModulePlan, ModuleFailure>> = if self.parallel {
            pending.par_iter().map(|f| self.plan_module(f)).collect()
        } else {
            pending.iter().map(|f| self.plan_module(f)).collect()
        };

        let mut plans = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(plan) => {
                    record_warnings(&plan, report);
                    plans.push(plan);
                }
                Err(failure) => {
                    log::warn!("{}", failure);
                    report.fail(failure);
                }
            }
        }
        plans
    }

    /// Plan and emit every module into `stream`
    ///
    /// The reference module is emitted first, then every other module in
    /// index order. Returns the emitted plans in stream order. A failure of
    /// the reference module itself is fatal.
    pub fn instantiate(
        &self,
        frames: &FrameSet,
        stream: &mut IntentStream,
        report: &mut BatchReport,
    ) -> Result<Vec<ModulePlan>> {
        let reference_plan = self
            .plan_module(&self.reference.frame)
            .map_err(Error::ReferenceModule)?;
        record_warnings(&reference_plan, report);

        let mut plans = Vec::with_capacity(frames.len());
        plans.push(reference_plan);
        plans.extend(self.plan_all(frames, report));

        let mut emitter = IntentEmitter::new(stream, self.library.params(), &self.shell);
        for plan in &plans {
            emitter.emit_module(plan)?;
        }

        Ok(plans)
    }
}

fn record_warnings(plan: &ModulePlan, report: &mut BatchReport) {
    for warning in &plan.warnings {
        log::warn!("{}", warning);
        report.warn(warning.clone());
    }
}
