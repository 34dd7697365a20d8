// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangular module templates
//!
//! Every module mount is an equilateral triangle of side `S` in the module
//! plane. Three variants are derived from it:
//!
//! - **Chamfered**: each corner replaced by a straight cut at setback `c`
//! - **Full**: the plain triangle
//! - **PinHole**: construction triangle with a circle marker at each corner
//!
//! Templates are values. Transforms return new patterns and never touch the
//! pattern they are called on.

use crate::error::{Error, Result};
use crate::shell::ReferencePlane;
use crate::tolerance::{BASIS_EPSILON, EDGE_LENGTH_TOLERANCE, MAX_REFERENCE_SLOPE};
use focalplate_model::{RemovalDepth, TemplateVariant};
use nalgebra::{Point3, Rotation3, Unit, Vector3};
use std::f64::consts::PI;

/// Template dimensions in metres
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemplateParams {
    pub side_length: f64,
    pub chamfer_length: f64,
    pub pin_hole_diameter: f64,
}

impl TemplateParams {
    pub fn new(side_length: f64, chamfer_length: f64, pin_hole_diameter: f64) -> Self {
        Self {
            side_length,
            chamfer_length,
            pin_hole_diameter,
        }
    }

    /// Check the dimensions describe a buildable template
    pub fn validate(&self) -> Result<()> {
        let s = self.side_length;
        let c = self.chamfer_length;
        let d = self.pin_hole_diameter;

        if !(s.is_finite() && s > 0.0) {
            return Err(Error::invalid_template(format!(
                "side length must be positive, got {}",
                s
            )));
        }
        if !(c.is_finite() && c > 0.0) {
            return Err(Error::invalid_template(format!(
                "chamfer length must be positive, got {}",
                c
            )));
        }
        if c >= s / 2.0 {
            return Err(Error::invalid_template(format!(
                "chamfer length {} must be shorter than half the side length {}",
                c, s
            )));
        }
        if !(d.is_finite() && d > 0.0) {
            return Err(Error::invalid_template(format!(
                "pin hole diameter must be positive, got {}",
                d
            )));
        }
        Ok(())
    }

    /// Distance from the centroid to a corner
    #[inline]
    pub fn circumradius(&self) -> f64 {
        self.side_length / 3f64.sqrt()
    }
}

/// Where and how a template is laid out
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemplateAnchor {
    /// First corner of the triangle
    pub point: Point3<f64>,
    /// Direction from the first corner to the centroid
    pub up: Unit<Vector3<f64>>,
    pub normal: Unit<Vector3<f64>>,
}

impl TemplateAnchor {
    /// Create an anchor, orthogonalising `up` against `normal`
    pub fn new(point: Point3<f64>, up: Vector3<f64>, normal: Vector3<f64>) -> Result<Self> {
        let normal = Unit::try_new(normal, BASIS_EPSILON)
            .ok_or_else(|| Error::invalid_template("template normal is degenerate"))?;
        let up = up - normal.into_inner() * normal.dot(&up);
        let up = Unit::try_new(up, BASIS_EPSILON)
            .ok_or_else(|| Error::invalid_template("template up direction is parallel to its normal"))?;
        Ok(Self { point, up, normal })
    }
}

/// Straight outline segment
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub start: Point3<f64>,
    pub end: Point3<f64>,
}

impl Edge {
    #[inline]
    pub fn direction(&self) -> Vector3<f64> {
        self.end - self.start
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.direction().norm()
    }

    /// Slope of the edge projected onto a reference plane
    #[inline]
    pub fn slope_in(&self, plane: ReferencePlane) -> f64 {
        plane.slope(&self.direction())
    }
}

/// Circle marker of a pin hole
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleMarker {
    pub center: Point3<f64>,
    pub diameter: f64,
}

/// One template variant laid out in 3D
#[derive(Clone, Debug, PartialEq)]
pub struct TemplatePattern {
    variant: TemplateVariant,
    corners: [Point3<f64>; 3],
    outline: Vec<Point3<f64>>,
    normal: Unit<Vector3<f64>>,
    markers: Vec<CircleMarker>,
    chamfer_length: Option<f64>,
}

impl TemplatePattern {
    pub fn variant(&self) -> TemplateVariant {
        self.variant
    }

    /// Corners of the underlying triangle, `corners[k + 1]` at +120° from `corners[k]`
    pub fn corners(&self) -> &[Point3<f64>; 3] {
        &self.corners
    }

    /// Closed outline (3 points, or 6 for the chamfered variant)
    pub fn outline(&self) -> &[Point3<f64>] {
        &self.outline
    }

    pub fn normal(&self) -> &Unit<Vector3<f64>> {
        &self.normal
    }

    /// Pin-hole markers (empty for other variants)
    pub fn markers(&self) -> &[CircleMarker] {
        &self.markers
    }

    pub fn chamfer_length(&self) -> Option<f64> {
        self.chamfer_length
    }

    pub fn removal(&self) -> RemovalDepth {
        self.variant.removal()
    }

    /// Construction-only geometry does not create a solid
    pub fn is_construction(&self) -> bool {
        self.variant == TemplateVariant::PinHole
    }

    /// Outline edges in order, closing back to the first point
    pub fn edges(&self) -> Vec<Edge> {
        let n = self.outline.len();
        (0..n)
            .map(|i| Edge {
                start: self.outline[i],
                end: self.outline[(i + 1) % n],
            })
            .collect()
    }

    /// Triangle side `k`, from `corners[k]` to `corners[k + 1]`
    pub fn side(&self, k: usize) -> Edge {
        Edge {
            start: self.corners[k % 3],
            end: self.corners[(k + 1) % 3],
        }
    }

    /// Triangle side an outline edge lies on
    ///
    /// `None` for the corner cuts of the chamfered outline.
    pub fn side_of_edge(&self, edge: usize) -> Option<usize> {
        match self.variant {
            TemplateVariant::Chamfered => (edge % 2 == 1 && edge < 6).then_some(edge / 2),
            _ => (edge < 3).then_some(edge),
        }
    }

    /// Centroid of the corners
    pub fn center_point(&self) -> Option<Point3<f64>> {
        let sum = self.corners[0].coords + self.corners[1].coords + self.corners[2].coords;
        let center = Point3::from(sum / 3.0);
        center.coords.iter().all(|c| c.is_finite()).then_some(center)
    }

    /// Index of the most horizontal outline edge
    ///
    /// Enumeration order with strict `<` from [`MAX_REFERENCE_SLOPE`]: the
    /// first of equally horizontal edges wins.
    pub fn reference_edge(&self, plane: ReferencePlane) -> Option<usize> {
        let mut best = None;
        let mut best_slope = MAX_REFERENCE_SLOPE;
        for (i, edge) in self.edges().iter().enumerate() {
            let slope = edge.slope_in(plane);
            if slope < best_slope {
                best_slope = slope;
                best = Some(i);
            }
        }
        best
    }

    /// Index of the most horizontal among the longest outline edges
    pub fn long_reference_edge(&self, plane: ReferencePlane) -> Option<usize> {
        let edges = self.edges();
        let longest = edges
            .iter()
            .map(Edge::length)
            .filter(|l| l.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        if !longest.is_finite() {
            return None;
        }

        let mut best = None;
        let mut best_slope = MAX_REFERENCE_SLOPE;
        for (i, edge) in edges.iter().enumerate() {
            if edge.length() < longest - EDGE_LENGTH_TOLERANCE {
                continue;
            }
            let slope = edge.slope_in(plane);
            if slope < best_slope {
                best_slope = slope;
                best = Some(i);
            }
        }
        best
    }

    /// Outline edge used to align this variant
    pub fn alignment_edge(&self, plane: ReferencePlane) -> Option<usize> {
        match self.variant {
            TemplateVariant::Chamfered => self.long_reference_edge(plane),
            _ => self.reference_edge(plane),
        }
    }

    /// Triangle side carrying the alignment edge
    pub fn alignment_side(&self, plane: ReferencePlane) -> Option<usize> {
        self.alignment_edge(plane).and_then(|e| self.side_of_edge(e))
    }

    fn map_points(
        &self,
        f: impl Fn(&Point3<f64>) -> Point3<f64>,
        normal: Unit<Vector3<f64>>,
    ) -> Self {
        Self {
            variant: self.variant,
            corners: [f(&self.corners[0]), f(&self.corners[1]), f(&self.corners[2])],
            outline: self.outline.iter().map(&f).collect(),
            normal,
            markers: self
                .markers
                .iter()
                .map(|m| CircleMarker {
                    center: f(&m.center),
                    diameter: m.diameter,
                })
                .collect(),
            chamfer_length: self.chamfer_length,
        }
    }

    /// Copy moved by `offset`
    pub fn translated(&self, offset: &Vector3<f64>) -> Self {
        self.map_points(|p| p + offset, self.normal)
    }

    /// Copy rotated by `rotation` about `center`
    pub fn reoriented(&self, center: &Point3<f64>, rotation: &Rotation3<f64>) -> Self {
        let normal = Unit::new_normalize(rotation * self.normal.into_inner());
        self.map_points(|p| center + rotation * (p - center), normal)
    }

    /// Copy rotated by `angle` radians about the axis through `center`
    pub fn rotated_about(&self, center: &Point3<f64>, axis: &Unit<Vector3<f64>>, angle: f64) -> Self {
        self.reoriented(center, &Rotation3::from_axis_angle(axis, angle))
    }
}

/// The three variants built for one anchor
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateSet {
    pub chamfered: TemplatePattern,
    pub full: TemplatePattern,
    pub pin_hole: TemplatePattern,
}

impl TemplateSet {
    pub fn get(&self, variant: TemplateVariant) -> &TemplatePattern {
        match variant {
            TemplateVariant::Chamfered => &self.chamfered,
            TemplateVariant::Full => &self.full,
            TemplateVariant::PinHole => &self.pin_hole,
        }
    }

    /// Patterns in emission order
    pub fn iter(&self) -> impl Iterator<Item = &TemplatePattern> {
        [&self.chamfered, &self.full, &self.pin_hole].into_iter()
    }
}

/// Builds validated templates
#[derive(Clone, Copy, Debug)]
pub struct TemplateLibrary {
    params: TemplateParams,
}

impl TemplateLibrary {
    /// Create a library, validating the dimensions
    pub fn new(params: TemplateParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &TemplateParams {
        &self.params
    }

    /// Equilateral triangle with its first corner on the anchor
    pub fn full(&self, anchor: &TemplateAnchor) -> TemplatePattern {
        let corners = equilateral_corners(self.params.side_length, anchor);
        TemplatePattern {
            variant: TemplateVariant::Full,
            corners,
            outline: corners.to_vec(),
            normal: anchor.normal,
            markers: Vec::new(),
            chamfer_length: None,
        }
    }

    /// Triangle with every corner cut at the chamfer setback
    pub fn chamfered(&self, anchor: &TemplateAnchor) -> TemplatePattern {
        let corners = equilateral_corners(self.params.side_length, anchor);
        TemplatePattern {
            variant: TemplateVariant::Chamfered,
            corners,
            outline: chamfer_outline(&corners, self.params.chamfer_length),
            normal: anchor.normal,
            markers: Vec::new(),
            chamfer_length: Some(self.params.chamfer_length),
        }
    }

    /// Construction triangle with a pin-hole marker on every corner
    pub fn pin_hole(&self, anchor: &TemplateAnchor) -> TemplatePattern {
        let corners = equilateral_corners(self.params.side_length, anchor);
        TemplatePattern {
            variant: TemplateVariant::PinHole,
            corners,
            outline: corners.to_vec(),
            normal: anchor.normal,
            markers: corners
                .iter()
                .map(|&center| CircleMarker {
                    center,
                    diameter: self.params.pin_hole_diameter,
                })
                .collect(),
            chamfer_length: None,
        }
    }

    /// All three variants for one anchor
    pub fn build(&self, anchor: &TemplateAnchor) -> TemplateSet {
        TemplateSet {
            chamfered: self.chamfered(anchor),
            full: self.full(anchor),
            pin_hole: self.pin_hole(anchor),
        }
    }
}

/// Corners of an equilateral triangle with `anchor.point` as the first one
fn equilateral_corners(side: f64, anchor: &TemplateAnchor) -> [Point3<f64>; 3] {
    let center = anchor.point + anchor.up.into_inner() * (side / 3f64.sqrt());
    let spoke = anchor.point - center;
    let turn = |k: f64| {
        center + Rotation3::from_axis_angle(&anchor.normal, k * 2.0 * PI / 3.0) * spoke
    };
    [anchor.point, turn(1.0), turn(2.0)]
}

/// Six-point outline, two points per corner at `setback` along both sides
fn chamfer_outline(corners: &[Point3<f64>; 3], setback: f64) -> Vec<Point3<f64>> {
    let mut outline = Vec::with_capacity(6);
    for i in 0..3 {
        let corner = corners[i];
        let prev = corners[(i + 2) % 3];
        let next = corners[(i + 1) % 3];
        outline.push(corner + (prev - corner).normalize() * setback);
        outline.push(corner + (next - corner).normalize() * setback);
    }
    outline
}
