// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rigid placement of reference templates onto a module frame
//!
//! A copy of each reference template goes through three steps:
//!
//! 1. reorient the template plane onto the module plane and translate the
//!    centroid onto the frame anchor
//! 2. rotate 180° about the frame normal when the orientation flag is false
//! 3. rotate about the frame normal until the alignment edge is parallel to
//!    the reference module's edge
//!
//! Rotations in steps 2 and 3 use the axis through the frame anchor, which is
//! where the centroid sits after step 1.

use crate::frame::ModuleFrame;
use crate::shell::ReferencePlane;
use crate::template::TemplatePattern;
use crate::tolerance::{ANGLE_EPSILON, BASIS_EPSILON, PROJECTION_EPSILON};
use focalplate_model::{ModuleFailure, ModuleIndex};
use nalgebra::{Point3, Rotation3, Unit, Vector3};
use std::f64::consts::{FRAC_PI_2, PI};

/// Axis and angle of the shortest rotation carrying `from` onto `to`
///
/// Opposite normals get a half turn about an arbitrary perpendicular. `None`
/// when the normals already agree.
pub fn normal_alignment_axis_angle(
    from: &Unit<Vector3<f64>>,
    to: &Unit<Vector3<f64>>,
) -> Option<(Unit<Vector3<f64>>, f64)> {
    let cross = from.cross(to.as_ref());
    let cosine = from.dot(to);
    let angle = cross.norm().atan2(cosine);
    if angle < ANGLE_EPSILON {
        return None;
    }
    let axis = match Unit::try_new(cross, BASIS_EPSILON) {
        Some(axis) => axis,
        None if cosine > 0.0 => Unit::try_new(cross, 0.0)?,
        None => any_perpendicular(from),
    };
    Some((axis, angle))
}

/// Shortest rotation carrying `from` onto `to`
pub fn normal_alignment(from: &Unit<Vector3<f64>>, to: &Unit<Vector3<f64>>) -> Rotation3<f64> {
    normal_alignment_axis_angle(from, to)
        .map(|(axis, angle)| Rotation3::from_axis_angle(&axis, angle))
        .unwrap_or_else(Rotation3::identity)
}

/// Some unit vector perpendicular to `v`
fn any_perpendicular(v: &Unit<Vector3<f64>>) -> Unit<Vector3<f64>> {
    let helper = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    Unit::new_normalize(v.cross(&helper))
}

/// Angle in (−90°, 90°] about `axis` that makes `current` parallel to `target`
///
/// Both directions are projected onto the plane perpendicular to `axis`;
/// `None` when either projection vanishes.
pub fn parallel_alignment_angle(
    current: &Vector3<f64>,
    target: &Vector3<f64>,
    axis: &Unit<Vector3<f64>>,
) -> Option<f64> {
    let project = |v: &Vector3<f64>| {
        let length = v.norm();
        let p = v - axis.into_inner() * axis.dot(v);
        (length > 0.0 && p.norm() >= PROJECTION_EPSILON * length).then_some(p)
    };
    let c = project(current)?;
    let t = project(target)?;

    let mut angle = axis.dot(&c.cross(&t)).atan2(c.dot(&t));
    if angle > FRAC_PI_2 {
        angle -= PI;
    } else if angle <= -FRAC_PI_2 {
        angle += PI;
    }
    angle.is_finite().then_some(angle)
}

/// One template variant placed on a module
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedVariant {
    /// Template as sketched, on the reference module plane
    pub source: TemplatePattern,
    pub source_center: Point3<f64>,
    /// Step 1 rotation about the source centroid, as axis and angle
    pub reorientation: Option<(Unit<Vector3<f64>>, f64)>,
    /// Final pose
    pub pattern: TemplatePattern,
    /// Translation from the source centroid to the anchor
    pub offset: Vector3<f64>,
    pub flipped: bool,
    /// Rotation of step 3, radians
    pub alignment_angle: f64,
    /// Triangle side carrying the alignment edge
    pub side: usize,
}

impl PlacedVariant {
    /// Reference templates placed by the identity transform
    pub fn identity(pattern: &TemplatePattern, center: Point3<f64>, side: usize) -> Self {
        Self {
            source: pattern.clone(),
            source_center: center,
            reorientation: None,
            pattern: pattern.clone(),
            offset: Vector3::zeros(),
            flipped: false,
            alignment_angle: 0.0,
            side,
        }
    }
}

/// Per-module rigid transform of the reference templates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementTransform {
    pub index: ModuleIndex,
    pub source_center: Point3<f64>,
    pub anchor: Point3<f64>,
    pub axis: Unit<Vector3<f64>>,
    pub reorientation: Rotation3<f64>,
    pub reorientation_axis_angle: Option<(Unit<Vector3<f64>>, f64)>,
    pub flip: bool,
}

impl PlacementTransform {
    /// Transform from templates centred on `source_center` with normal
    /// `source_normal` onto `frame`
    pub fn new(
        source_center: Point3<f64>,
        source_normal: &Unit<Vector3<f64>>,
        frame: &ModuleFrame,
    ) -> Self {
        let reorientation_axis_angle = normal_alignment_axis_angle(source_normal, &frame.normal);
        Self {
            index: frame.index,
            source_center,
            anchor: frame.anchor,
            axis: frame.normal,
            reorientation: reorientation_axis_angle
                .map(|(axis, angle)| Rotation3::from_axis_angle(&axis, angle))
                .unwrap_or_else(Rotation3::identity),
            reorientation_axis_angle,
            flip: !frame.orientation_flag,
        }
    }

    #[inline]
    pub fn offset(&self) -> Vector3<f64> {
        self.anchor - self.source_center
    }

    /// Step 1: reorient about the source centroid, then translate
    pub fn pose(&self, template: &TemplatePattern) -> (TemplatePattern, TemplatePattern) {
        let staged = template.reoriented(&self.source_center, &self.reorientation);
        let posed = staged.translated(&self.offset());
        (staged, posed)
    }

    /// Step 2: half turn about the frame normal when requested
    pub fn apply_flip(&self, posed: &TemplatePattern) -> TemplatePattern {
        if self.flip {
            posed.rotated_about(&self.anchor, &self.axis, PI)
        } else {
            posed.clone()
        }
    }

    /// Step 3: rotate so the alignment edge is parallel to `target`
    pub fn align(
        &self,
        pattern: &TemplatePattern,
        target: &Vector3<f64>,
        plane: ReferencePlane,
    ) -> Result<(TemplatePattern, f64, usize), ModuleFailure> {
        let fail = |reason: &str| ModuleFailure::alignment(self.index, pattern.variant(), reason);

        pattern
            .center_point()
            .ok_or_else(|| fail("center point is not finite"))?;
        let edge = pattern
            .alignment_edge(plane)
            .ok_or_else(|| fail("no edge is flatter than the reference slope bound"))?;
        let side = pattern
            .side_of_edge(edge)
            .ok_or_else(|| fail("alignment edge is a corner cut"))?;

        let current = pattern.edges()[edge].direction();
        let angle = parallel_alignment_angle(&current, target, &self.axis)
            .ok_or_else(|| fail("reference edge projects to a point on the module plane"))?;

        let aligned = if angle.abs() < ANGLE_EPSILON {
            pattern.clone()
        } else {
            pattern.rotated_about(&self.anchor, &self.axis, angle)
        };
        Ok((aligned, angle, side))
    }

    /// All three steps for one template
    pub fn place(
        &self,
        template: &TemplatePattern,
        target: &Vector3<f64>,
        plane: ReferencePlane,
    ) -> Result<PlacedVariant, ModuleFailure> {
        let (_, posed) = self.pose(template);
        let flipped = self.apply_flip(&posed);
        let (pattern, alignment_angle, side) = self.align(&flipped, target, plane)?;

        Ok(PlacedVariant {
            source: template.clone(),
            source_center: self.source_center,
            reorientation: self.reorientation_axis_angle,
            pattern,
            offset: self.offset(),
            flipped: self.flip,
            alignment_angle,
            side,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::tests::sample_params;
    use crate::template::{TemplateAnchor, TemplateLibrary};
    use approx::assert_relative_eq;

    fn frame(anchor: Point3<f64>, normal: Vector3<f64>, flag: bool) -> ModuleFrame {
        let normal = Unit::new_normalize(normal);
        ModuleFrame {
            index: ModuleIndex(5),
            anchor,
            normal,
            front: anchor - normal.into_inner() * 0.1,
            back: anchor,
            orientation_flag: flag,
        }
    }

    fn reference_full() -> TemplatePattern {
        let library = TemplateLibrary::new(sample_params()).unwrap();
        let r = sample_params().circumradius();
        let anchor = TemplateAnchor::new(Point3::new(0.0, -r, -0.05), Vector3::y(), -Vector3::z())
            .unwrap();
        library.full(&anchor)
    }

    #[test]
    fn test_parallel_angle_range() {
        let axis = Vector3::z_axis();
        let x = Vector3::x();

        let a = parallel_alignment_angle(&Vector3::new(1.0, 1.0, 0.0), &x, &axis).unwrap();
        assert_relative_eq!(a, -PI / 4.0, epsilon = 1e-12);

        // Antiparallel edges are already parallel
        let a = parallel_alignment_angle(&-x, &x, &axis).unwrap();
        assert_relative_eq!(a, 0.0, epsilon = 1e-12);

        // Perpendicular resolves to +90°
        let a = parallel_alignment_angle(&Vector3::y(), &x, &axis).unwrap();
        assert_relative_eq!(a, -PI / 2.0 + PI, epsilon = 1e-12);

        assert!(parallel_alignment_angle(&x, &Vector3::z(), &axis).is_none());
    }

    #[test]
    fn test_opposite_normals() {
        let r = normal_alignment(&Vector3::z_axis(), &-Vector3::z_axis());
        assert_relative_eq!(r * Vector3::z(), -Vector3::z(), epsilon = 1e-12);

        let (axis, angle) = normal_alignment_axis_angle(&Vector3::z_axis(), &-Vector3::z_axis()).unwrap();
        assert_relative_eq!(angle, PI, epsilon = 1e-12);
        assert_relative_eq!(axis.dot(&Vector3::z()), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_axis_angle_matches_rotation() {
        let from = Unit::new_normalize(Vector3::new(0.01, -0.02, -1.0));
        let to = Unit::new_normalize(Vector3::new(0.0, 1.0, -0.01));
        let (axis, angle) = normal_alignment_axis_angle(&from, &to).unwrap();
        let rotated = Rotation3::from_axis_angle(&axis, angle) * from.into_inner();
        assert_relative_eq!(rotated, to.into_inner(), epsilon = 1e-12);
        assert_relative_eq!(
            normal_alignment(&from, &to) * from.into_inner(),
            to.into_inner(),
            epsilon = 1e-12
        );

        assert!(normal_alignment_axis_angle(&to, &to).is_none());
        assert_eq!(normal_alignment(&to, &to), Rotation3::identity());
    }

    #[test]
    fn test_pose_centres_on_anchor() {
        let template = reference_full();
        let center = template.center_point().unwrap();
        let target = frame(
            Point3::new(0.3, 0.2, -0.05),
            Vector3::new(0.02, -0.01, -1.0),
            true,
        );
        let transform = PlacementTransform::new(center, template.normal(), &target);
        let (staged, posed) = transform.pose(&template);

        assert_relative_eq!(staged.center_point().unwrap(), center, epsilon = 1e-12);
        assert_relative_eq!(posed.center_point().unwrap(), target.anchor, epsilon = 1e-12);
        assert_relative_eq!(
            posed.normal().into_inner(),
            target.normal.into_inner(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_flip_depends_on_flag() {
        let template = reference_full();
        let center = template.center_point().unwrap();
        let anchor = Point3::new(0.1, 0.0, -0.05);

        let keep = PlacementTransform::new(center, template.normal(), &frame(anchor, -Vector3::z(), true));
        let turn = PlacementTransform::new(center, template.normal(), &frame(anchor, -Vector3::z(), false));

        let (_, posed) = keep.pose(&template);
        assert_eq!(keep.apply_flip(&posed), posed);

        let flipped = turn.apply_flip(&posed);
        // The first corner sits below the centroid before the flip and above it after
        assert!(posed.corners()[0].y < anchor.y);
        assert!(flipped.corners()[0].y > anchor.y);

        let back = turn.apply_flip(&flipped);
        for (a, b) in posed.outline().iter().zip(back.outline()) {
            assert!((a - b).norm() < 1e-9);
        }
    }

    #[test]
    fn test_alignment_makes_edges_parallel() {
        let plane = ReferencePlane::Xy;
        let template = reference_full();
        let center = template.center_point().unwrap();
        let side = template.alignment_side(plane).unwrap();
        let target = template.side(side).direction().normalize();

        let module = frame(
            Point3::new(-0.2, 0.4, -0.05),
            Vector3::new(-0.05, 0.08, -1.0),
            false,
        );
        let transform = PlacementTransform::new(center, template.normal(), &module);
        let placed = transform.place(&template, &target, plane).unwrap();

        assert!(placed.flipped);
        assert!(placed.alignment_angle.abs() <= FRAC_PI_2);

        let edge = placed.pattern.side(placed.side).direction().normalize();
        let projected = (target - module.normal.into_inner() * module.normal.dot(&target)).normalize();
        assert!(edge.cross(&projected).norm() < 1e-9);
        assert_relative_eq!(
            placed.pattern.center_point().unwrap(),
            module.anchor,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_alignment_failure_near_perpendicular_plane() {
        let plane = ReferencePlane::Xy;
        let template = reference_full();
        let center = template.center_point().unwrap();
        let target = template.side(1).direction().normalize();

        // Module plane almost perpendicular to the reference edge
        let module = frame(
            Point3::new(5.0e7, 0.0, -0.05),
            Vector3::new(1.0, 0.0, -1e-9),
            true,
        );
        let transform = PlacementTransform::new(center, template.normal(), &module);
        let err = transform.place(&template, &target, plane).unwrap_err();
        assert!(matches!(
            err,
            ModuleFailure::Alignment {
                index: ModuleIndex(5),
                ..
            }
        ));
    }
}
