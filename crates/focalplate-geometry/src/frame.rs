// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Module frames
//!
//! Pairs front and back survey points by index, intersects each extrusion
//! axis with the bottom plane and selects the reference module.

use crate::error::{Error, Result};
use crate::shell::{BottomPlane, ShellContext};
use crate::tolerance::MIN_AXIS_LENGTH;
use focalplate_model::{BatchReport, ModuleFailure, ModuleIndex, PointCloud, SurveyPoint, Warning};
use nalgebra::{Point3, Unit, Vector3};
use rustc_hash::FxHashMap;

/// Front and back survey points of one module
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModulePair {
    pub index: ModuleIndex,
    pub front: SurveyPoint,
    pub back: SurveyPoint,
}

impl ModulePair {
    /// Orientation is read from the front cloud only
    #[inline]
    pub fn orientation_flag(&self) -> bool {
        self.front.orientation_flag
    }
}

/// Pair two clouds by index
///
/// Only the shorter length is paired; a length difference yields a
/// [`Warning::CountMismatch`].
pub fn pair_modules(front: &PointCloud, back: &PointCloud) -> (Vec<ModulePair>, Option<Warning>) {
    let pairs: Vec<ModulePair> = front
        .iter()
        .zip(back.iter())
        .map(|(f, b)| ModulePair {
            index: f.index,
            front: *f,
            back: *b,
        })
        .collect();

    let warning = (front.len() != back.len()).then(|| Warning::CountMismatch {
        front: front.len(),
        back: back.len(),
        paired: pairs.len(),
    });

    (pairs, warning)
}

#[inline]
pub(crate) fn to_point(p: &focalplate_model::Point3D) -> Point3<f64> {
    Point3::new(p.x, p.y, p.z)
}

/// Local frame of one module
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModuleFrame {
    pub index: ModuleIndex,
    /// Intersection of the extrusion axis with the bottom plane
    pub anchor: Point3<f64>,
    /// Unit direction from front to back
    pub normal: Unit<Vector3<f64>>,
    pub front: Point3<f64>,
    pub back: Point3<f64>,
    pub orientation_flag: bool,
}

impl ModuleFrame {
    /// Squared distance of the anchor to the shell origin
    #[inline]
    pub fn anchor_distance_squared(&self) -> f64 {
        self.anchor.coords.norm_squared()
    }
}

/// Builds module frames against one bottom plane
#[derive(Clone, Copy, Debug)]
pub struct FrameBuilder {
    plane: BottomPlane,
}

impl FrameBuilder {
    /// Create a builder for the shell's bottom plane
    pub fn new(shell: &ShellContext) -> Self {
        Self {
            plane: shell.bottom_plane(),
        }
    }

    /// Create a builder for an explicit plane
    pub fn with_plane(plane: BottomPlane) -> Self {
        Self { plane }
    }

    pub fn plane(&self) -> &BottomPlane {
        &self.plane
    }

    /// Build the frame of one pair
    ///
    /// Fails with [`ModuleFailure::DegenerateAxis`] when the points coincide
    /// or the axis is parallel to the bottom plane.
    pub fn build(&self, pair: &ModulePair) -> Result<ModuleFrame> {
        let degenerate = || Error::Module(ModuleFailure::DegenerateAxis { index: pair.index });

        let front = to_point(&pair.front.position);
        let back = to_point(&pair.back.position);
        let direction = back - front;

        let normal =
            Unit::try_new(direction, MIN_AXIS_LENGTH).ok_or_else(degenerate)?;
        let anchor = self
            .plane
            .intersect_line(&front, &direction)
            .ok_or_else(degenerate)?;

        if !anchor.coords.iter().all(|c| c.is_finite()) {
            return Err(degenerate());
        }

        Ok(ModuleFrame {
            index: pair.index,
            anchor,
            normal,
            front,
            back,
            orientation_flag: pair.orientation_flag(),
        })
    }

    /// Build every frame, recording per-module failures in `report`
    pub fn build_all(&self, pairs: &[ModulePair], report: &mut BatchReport) -> Result<FrameSet> {
        let mut frames = Vec::with_capacity(pairs.len());
        for pair in pairs {
            match self.build(pair) {
                Ok(frame) => frames.push(frame),
                Err(Error::Module(failure)) => {
                    log::warn!("{}", failure);
                    report.fail(failure);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(FrameSet::new(frames))
    }
}

/// Frames in index order, cached by module index
#[derive(Clone, Debug, Default)]
pub struct FrameSet {
    frames: Vec<ModuleFrame>,
    by_index: FxHashMap<ModuleIndex, usize>,
}

impl FrameSet {
    pub fn new(mut frames: Vec<ModuleFrame>) -> Self {
        frames.sort_by_key(|f| f.index);
        let by_index = frames
            .iter()
            .enumerate()
            .map(|(pos, f)| (f.index, pos))
            .collect();
        Self { frames, by_index }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: ModuleIndex) -> Option<&ModuleFrame> {
        self.by_index.get(&index).map(|&pos| &self.frames[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleFrame> {
        self.frames.iter()
    }

    pub fn as_slice(&self) -> &[ModuleFrame] {
        &self.frames
    }

    /// Frame closest to the origin (see [`find_reference_module`])
    pub fn reference_module(&self) -> Option<&ModuleFrame> {
        find_reference_module(&self.frames)
    }
}

/// Frame whose anchor is closest to the origin
///
/// Linear scan with strict `<`, so the lowest index wins a tie.
pub fn find_reference_module(frames: &[ModuleFrame]) -> Option<&ModuleFrame> {
    let mut best: Option<&ModuleFrame> = None;
    for frame in frames {
        match best {
            Some(b) if frame.anchor_distance_squared() < b.anchor_distance_squared() => {
                best = Some(frame)
            }
            None => best = Some(frame),
            _ => {}
        }
    }
    best
}
