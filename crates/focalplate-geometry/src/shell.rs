// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shell context
//!
//! The revolved shell itself is built elsewhere. Placement only needs the
//! parameters that bound it: the bottom plane every module axis is cut with,
//! the best-fit sphere and the support surface below it, and the footprint
//! used to sanity-check anchors.

use crate::error::{Error, Result};
use crate::tolerance::AXIS_EPSILON;
use focalplate_model::{ModuleIndex, Warning};
use nalgebra::{Point3, Unit, Vector3};

/// Principal plane the shell is described against
///
/// The default front plane (XY) has its normal along +Z, the optical axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ReferencePlane {
    /// Front plane
    #[default]
    Xy,
    /// Top plane
    Xz,
    /// Right plane
    Yz,
}

impl ReferencePlane {
    /// Unit normal
    pub fn normal(&self) -> Unit<Vector3<f64>> {
        match self {
            ReferencePlane::Xy => Vector3::z_axis(),
            ReferencePlane::Xz => Vector3::y_axis(),
            ReferencePlane::Yz => Vector3::x_axis(),
        }
    }

    /// In-plane axis slopes are measured against
    pub fn horizontal(&self) -> Vector3<f64> {
        match self {
            ReferencePlane::Xy | ReferencePlane::Xz => Vector3::x(),
            ReferencePlane::Yz => Vector3::y(),
        }
    }

    /// In-plane "up" direction
    pub fn vertical(&self) -> Vector3<f64> {
        match self {
            ReferencePlane::Xy => Vector3::y(),
            ReferencePlane::Xz | ReferencePlane::Yz => Vector3::z(),
        }
    }

    /// |Δvertical / Δhorizontal| of a direction projected onto this plane
    ///
    /// Infinite for vertical directions and NaN for directions along the
    /// normal; neither compares below any finite bound.
    pub fn slope(&self, direction: &Vector3<f64>) -> f64 {
        let dh = direction.dot(&self.horizontal());
        let dv = direction.dot(&self.vertical());
        (dv / dh).abs()
    }
}

/// Plane `normal · p = offset`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BottomPlane {
    pub normal: Unit<Vector3<f64>>,
    pub offset: f64,
}

impl BottomPlane {
    pub fn new(normal: Unit<Vector3<f64>>, offset: f64) -> Self {
        Self { normal, offset }
    }

    /// Signed distance of a point above the plane
    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&p.coords) - self.offset
    }

    /// Intersection with the line `origin + t * direction`
    ///
    /// `None` when the line is parallel to the plane or `direction` is zero.
    pub fn intersect_line(
        &self,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<Point3<f64>> {
        let length = direction.norm();
        if length == 0.0 || !length.is_finite() {
            return None;
        }
        let denom = self.normal.dot(direction);
        if (denom / length).abs() < AXIS_EPSILON {
            return None;
        }
        let t = (self.offset - self.normal.dot(&origin.coords)) / denom;
        Some(origin + direction * t)
    }
}

/// Raw shell parameters, in metres and degrees
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShellParameters {
    pub best_fit_sphere_radius: f64,
    pub outer_rim_height: f64,
    pub bottom_surface_radius: f64,
    pub support_to_top_distance: f64,
    pub sweep_angle_deg: f64,
    /// Signed position of the bottom plane along the reference normal
    pub bottom_plane_offset: f64,
    pub reference_plane: ReferencePlane,
}

/// Validated, immutable shell parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShellContext {
    params: ShellParameters,
}

impl ShellContext {
    /// Validate parameters
    pub fn new(params: ShellParameters) -> Result<Self> {
        let lengths = [
            ("best-fit sphere radius", params.best_fit_sphere_radius),
            ("outer rim height", params.outer_rim_height),
            ("bottom surface radius", params.bottom_surface_radius),
            ("support-to-top distance", params.support_to_top_distance),
        ];
        for (name, value) in lengths {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::invalid_shell(format!(
                    "{} must be a positive length, got {}",
                    name, value
                )));
            }
        }

        let sweep = params.sweep_angle_deg;
        if !(sweep.is_finite() && sweep > 0.0 && sweep <= 360.0) {
            return Err(Error::invalid_shell(format!(
                "sweep angle must lie in (0, 360] degrees, got {}",
                sweep
            )));
        }

        if !params.bottom_plane_offset.is_finite() {
            return Err(Error::invalid_shell("bottom plane offset must be finite"));
        }

        Ok(Self { params })
    }

    pub fn parameters(&self) -> &ShellParameters {
        &self.params
    }

    pub fn best_fit_sphere_radius(&self) -> f64 {
        self.params.best_fit_sphere_radius
    }

    pub fn support_to_top_distance(&self) -> f64 {
        self.params.support_to_top_distance
    }

    pub fn reference_plane(&self) -> ReferencePlane {
        self.params.reference_plane
    }

    /// Plane every module axis is intersected with
    pub fn bottom_plane(&self) -> BottomPlane {
        BottomPlane::new(
            self.params.reference_plane.normal(),
            self.params.bottom_plane_offset,
        )
    }

    /// Centre of the best-fit sphere, which touches the origin
    pub fn sphere_center(&self) -> Point3<f64> {
        Point3::from(self.params.reference_plane.normal().into_inner() * self.best_fit_sphere_radius())
    }

    /// Radius of the support surface, concentric with the best-fit sphere
    pub fn support_radius(&self) -> f64 {
        self.best_fit_sphere_radius() + self.support_to_top_distance()
    }

    /// Point where a module axis meets the support surface
    ///
    /// Of the two intersections the one closest to `origin` is returned.
    pub fn support_marker(
        &self,
        origin: &Point3<f64>,
        direction: &Unit<Vector3<f64>>,
    ) -> Option<Point3<f64>> {
        let oc = origin - self.sphere_center();
        let radius = self.support_radius();
        let b = direction.dot(&oc);
        let c = oc.norm_squared() - radius * radius;
        let disc = b * b - c;
        if !(disc >= 0.0) {
            return None;
        }
        let root = disc.sqrt();
        let (t1, t2) = (-b - root, -b + root);
        let t = if t1.abs() <= t2.abs() { t1 } else { t2 };
        Some(origin + direction.into_inner() * t)
    }

    /// Distance of a point from the shell axis
    pub fn radial_distance(&self, p: &Point3<f64>) -> f64 {
        let n = self.params.reference_plane.normal();
        (p.coords - n.into_inner() * n.dot(&p.coords)).norm()
    }

    /// Azimuth of a point about the shell axis, in [0, 360) degrees
    pub fn azimuth_deg(&self, p: &Point3<f64>) -> f64 {
        let plane = self.params.reference_plane;
        let angle = p
            .coords
            .dot(&plane.vertical())
            .atan2(p.coords.dot(&plane.horizontal()))
            .to_degrees();
        if angle < 0.0 {
            angle + 360.0
        } else {
            angle
        }
    }

    /// Height of the rim top along the reference normal
    pub fn rim_top(&self) -> f64 {
        self.params.bottom_plane_offset + self.params.outer_rim_height
    }

    /// Footprint warnings for an anchor
    pub fn check_anchor(&self, index: ModuleIndex, anchor: &Point3<f64>) -> Vec<Warning> {
        let mut warnings = Vec::new();

        let radius = self.radial_distance(anchor);
        if radius > self.params.bottom_surface_radius {
            warnings.push(Warning::AnchorOutsideFootprint { index, radius });
        }

        if self.params.sweep_angle_deg < 360.0 && radius > 0.0 {
            let azimuth_deg = self.azimuth_deg(anchor);
            if azimuth_deg > self.params.sweep_angle_deg {
                warnings.push(Warning::AnchorOutsideSweep { index, azimuth_deg });
            }
        }

        warnings
    }

    /// Warning when a support marker lies above the rim
    pub fn check_marker(&self, index: ModuleIndex, marker: &Point3<f64>) -> Option<Warning> {
        let height = self.params.reference_plane.normal().dot(&marker.coords);
        (height > self.rim_top()).then_some(Warning::MarkerAboveRim { index, height })
    }
}

/// Least-squares best-fit sphere radius of a radial sag profile
///
/// `profile` holds `(r, z)` samples of a surface tangent to the origin whose
/// centre lies at `+R` along the reference normal, as in
/// [`ShellContext::sphere_center`]: `z = R − √(R² − r²)`. Fits
/// `r² + z² = 2Rz`. `None` when every sample has zero sag.
pub fn best_fit_sphere_radius(profile: &[(f64, f64)]) -> Option<f64> {
    let (num, den) = profile.iter().fold((0.0, 0.0), |(num, den), &(r, z)| {
        (num + (r * r + z * z) * z, den + z * z)
    });
    if den == 0.0 || !den.is_finite() {
        return None;
    }
    Some(num / (2.0 * den))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    pub(crate) fn sample_parameters() -> ShellParameters {
        ShellParameters {
            best_fit_sphere_radius: 11.0456,
            outer_rim_height: 0.1,
            bottom_surface_radius: 0.5,
            support_to_top_distance: 0.01,
            sweep_angle_deg: 360.0,
            bottom_plane_offset: -0.05,
            reference_plane: ReferencePlane::Xy,
        }
    }

    pub(crate) fn sample_shell() -> ShellContext {
        ShellContext::new(sample_parameters()).unwrap()
    }

    #[test]
    fn test_validation() {
        let mut params = sample_parameters();
        params.support_to_top_distance = 0.0;
        assert!(matches!(
            ShellContext::new(params),
            Err(Error::InvalidShell(_))
        ));

        let mut params = sample_parameters();
        params.sweep_angle_deg = 400.0;
        assert!(ShellContext::new(params).is_err());

        let mut params = sample_parameters();
        params.bottom_plane_offset = f64::NAN;
        assert!(ShellContext::new(params).is_err());
    }

    #[test]
    fn test_bottom_plane_intersection() {
        let plane = sample_shell().bottom_plane();
        let hit = plane
            .intersect_line(&Point3::new(0.01, 0.02, 0.0456), &Vector3::new(0.0, 0.0, -0.05))
            .unwrap();
        assert_relative_eq!(hit, Point3::new(0.01, 0.02, -0.05), epsilon = 1e-12);
        assert!(plane
            .intersect_line(&Point3::origin(), &Vector3::new(1.0, 0.0, 0.0))
            .is_none());
    }

    #[test]
    fn test_support_marker_nearest_root() {
        let shell = sample_shell();
        let marker = shell
            .support_marker(&Point3::new(0.0, 0.0, -0.05), &-Vector3::z_axis())
            .unwrap();
        assert_relative_eq!(marker.z, -0.01, epsilon = 1e-9);

        // Same line traversed the other way gives the same marker
        let marker = shell
            .support_marker(&Point3::new(0.0, 0.0, -0.05), &Vector3::z_axis())
            .unwrap();
        assert_relative_eq!(marker.z, -0.01, epsilon = 1e-9);
    }

    #[test]
    fn test_support_marker_miss() {
        let shell = sample_shell();
        let miss = shell.support_marker(&Point3::new(0.0, 0.0, -1.0), &Vector3::x_axis());
        assert!(miss.is_none());
    }

    #[test]
    fn test_footprint_warnings() {
        let mut params = sample_parameters();
        params.sweep_angle_deg = 90.0;
        let shell = ShellContext::new(params).unwrap();

        assert!(shell
            .check_anchor(ModuleIndex(0), &Point3::new(0.1, 0.1, -0.05))
            .is_empty());

        let warnings = shell.check_anchor(ModuleIndex(1), &Point3::new(-0.6, 0.0, -0.05));
        assert_eq!(warnings.len(), 2);
        assert!(matches!(warnings[0], Warning::AnchorOutsideFootprint { .. }));
        assert!(matches!(warnings[1], Warning::AnchorOutsideSweep { .. }));
    }

    #[test]
    fn test_marker_above_rim() {
        let shell = sample_shell();
        assert!(shell
            .check_marker(ModuleIndex(0), &Point3::new(0.0, 0.0, -0.01))
            .is_none());
        assert!(shell
            .check_marker(ModuleIndex(0), &Point3::new(0.0, 0.0, 0.2))
            .is_some());
    }

    #[test]
    fn test_best_fit_sphere_radius() {
        let radius = 11.0456;
        let profile: Vec<(f64, f64)> = (1..=20)
            .map(|i| {
                let r = i as f64 * 0.02;
                (r, radius - (radius * radius - r * r).sqrt())
            })
            .collect();
        let fitted = best_fit_sphere_radius(&profile).unwrap();
        assert_relative_eq!(fitted, radius, max_relative = 1e-9);
        assert!(best_fit_sphere_radius(&[(0.1, 0.0)]).is_none());

        // The fitted sphere is the one the shell context places markers on
        let mut params = sample_parameters();
        params.best_fit_sphere_radius = fitted;
        let center = ShellContext::new(params).unwrap().sphere_center();
        for &(r, z) in &profile {
            let distance = (Point3::new(r, 0.0, z) - center).norm();
            assert_relative_eq!(distance, fitted, max_relative = 1e-9);
        }
    }
}
