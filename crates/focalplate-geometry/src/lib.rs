// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Focalplate Geometry - Module Holder Placement
//!
//! Places triangular module holders on a focal-plane shell. Every module is
//! surveyed as a front point and a back point; the line through them is the
//! module's extrusion axis. This crate turns two survey clouds into an
//! ordered stream of modeling intents that a CAD backend can replay.
//!
//! ## Overview
//!
//! - **Frames**: pair the clouds, cut every axis with the bottom plane
//! - **Templates**: chamfered, full and pin-hole triangles built once on the
//!   module closest to the origin
//! - **Instancing**: copy the templates onto every other module, flip them
//!   when the orientation flag is false and align one edge with the
//!   reference module
//! - **Emission**: handle-based intents for features, transforms and
//!   sketch relations
//!
//! ## Architecture
//!
//! - `SurveyParser`: trait from focalplate-model for ingesting survey files
//! - `ModelingBackend`: trait from focalplate-model for realising intents
//! - [`PreviewBackend`]: in-memory backend used to check a stream
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use focalplate_geometry::{generate, PipelineOptions, ShellContext, TemplateParams};
//!
//! let shell = ShellContext::new(shell_params)?;
//! let params = TemplateParams::new(0.0745, 0.0105, 0.003);
//! let output = generate(&front, &back, &shell, params, PipelineOptions::default())?;
//!
//! println!("{} intents for {} modules", output.stream.len(), output.placed());
//! ```

pub mod emitter;
pub mod error;
pub mod frame;
pub mod instancer;
pub mod pipeline;
pub mod placement;
pub mod preview;
pub mod shell;
pub mod template;
pub mod tolerance;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Rotation3, Unit, Vector3};

// Re-export main types
pub use emitter::{EmittedModule, FrameHandles, IntentEmitter, PolygonHandles};
pub use error::{Error, Result};
pub use frame::{find_reference_module, pair_modules, FrameBuilder, FrameSet, ModuleFrame, ModulePair};
pub use instancer::{Instancer, ModulePlan, ReferenceModule};
pub use pipeline::{generate, generate_from_text, PipelineOptions, PipelineOutput};
pub use placement::{normal_alignment, parallel_alignment_angle, PlacedVariant, PlacementTransform};
pub use preview::{PreviewBackend, PreviewPolygon, PreviewSummary};
pub use shell::{best_fit_sphere_radius, BottomPlane, ReferencePlane, ShellContext, ShellParameters};
pub use template::{
    CircleMarker, Edge, TemplateAnchor, TemplateLibrary, TemplateParams, TemplatePattern, TemplateSet,
};
