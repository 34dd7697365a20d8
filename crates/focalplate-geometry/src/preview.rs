// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Preview backend
//!
//! Replays an intent stream without a CAD kernel. Point positions are
//! tracked through every transform so the realised geometry can be
//! compared with what the placement engine computed. Relations are checked,
//! not solved: an intent whose relation does not already hold is rejected,
//! and so is a polygon whose defining points are off its sketch plane.

use crate::shell::ReferencePlane;
use crate::tolerance::{BASIS_EPSILON, COINCIDENCE_TOLERANCE, HORIZONTAL_SLOPE, PARALLEL_TOLERANCE};
use focalplate_model::{BackendError, Handle, ModelingBackend, ModelingIntent, TemplateVariant};
use nalgebra::{Point3, Rotation3, Unit, Vector3};
use rustc_hash::FxHashMap;
use std::f64::consts::PI;
use std::fmt;

/// Sketch created by a polygon intent
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewPolygon {
    pub variant: TemplateVariant,
    pub plane: Handle,
    pub construction: bool,
    pub center_point: Handle,
    pub vertices: Vec<Handle>,
    pub edges: Vec<Handle>,
}

/// Counts of realised entities
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PreviewSummary {
    pub points: usize,
    pub lines: usize,
    pub planes: usize,
    pub sketches: usize,
    pub chamfers: usize,
    pub features: usize,
    pub relations: usize,
    pub transforms: usize,
}

impl fmt::Display for PreviewSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} points, {} lines, {} planes, {} sketches, {} chamfers, {} features, {} relations, {} transforms",
            self.points,
            self.lines,
            self.planes,
            self.sketches,
            self.chamfers,
            self.features,
            self.relations,
            self.transforms
        )
    }
}

/// In-memory backend tracking point positions
#[derive(Debug, Default)]
pub struct PreviewBackend {
    reference_plane: ReferencePlane,
    points: FxHashMap<Handle, Point3<f64>>,
    /// Lines as (start, end) point handles
    lines: FxHashMap<Handle, (Handle, Handle)>,
    /// Sketch owning each polygon edge
    edge_sketches: FxHashMap<Handle, Handle>,
    /// Planes as (point, normal)
    planes: FxHashMap<Handle, (Point3<f64>, Unit<Vector3<f64>>)>,
    polygons: FxHashMap<Handle, PreviewPolygon>,
    chamfers: usize,
    features: usize,
    relations: usize,
    transforms: usize,
    batches: usize,
}

impl PreviewBackend {
    pub fn new(reference_plane: ReferencePlane) -> Self {
        Self {
            reference_plane,
            ..Self::default()
        }
    }

    /// Current position of a point
    pub fn point(&self, handle: Handle) -> Option<Point3<f64>> {
        self.points.get(&handle).copied()
    }

    pub fn polygon(&self, sketch: Handle) -> Option<&PreviewPolygon> {
        self.polygons.get(&sketch)
    }

    /// Current vertex positions of a polygon sketch
    pub fn polygon_vertices(&self, sketch: Handle) -> Option<Vec<Point3<f64>>> {
        let polygon = self.polygons.get(&sketch)?;
        polygon.vertices.iter().map(|&v| self.point(v)).collect()
    }

    /// Current direction of a line, start to end
    pub fn line_direction(&self, handle: Handle) -> Option<Vector3<f64>> {
        let &(start, end) = self.lines.get(&handle)?;
        Some(self.point(end)? - self.point(start)?)
    }

    /// Current normal of a polygon sketch, from its center and first two vertices
    pub fn sketch_normal(&self, sketch: Handle) -> Option<Unit<Vector3<f64>>> {
        let polygon = self.polygons.get(&sketch)?;
        let c = self.point(polygon.center_point)?;
        let a = self.point(*polygon.vertices.first()?)? - c;
        let b = self.point(*polygon.vertices.get(1)?)? - c;
        Unit::try_new(a.cross(&b), BASIS_EPSILON)
    }

    /// Number of completed batches
    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn summary(&self) -> PreviewSummary {
        PreviewSummary {
            points: self.points.len(),
            lines: self.lines.len(),
            planes: self.planes.len(),
            sketches: self.polygons.len(),
            chamfers: self.chamfers,
            features: self.features,
            relations: self.relations,
            transforms: self.transforms,
        }
    }

    fn require_point(
        &self,
        position: usize,
        op: &'static str,
        handle: Handle,
    ) -> Result<Point3<f64>, BackendError> {
        self.point(handle)
            .ok_or_else(|| BackendError::new(position, op, format!("unknown point {}", handle)))
    }

    fn require_line(
        &self,
        position: usize,
        op: &'static str,
        handle: Handle,
    ) -> Result<Vector3<f64>, BackendError> {
        self.line_direction(handle)
            .ok_or_else(|| BackendError::new(position, op, format!("unknown line {}", handle)))
    }

    fn require_sketch(
        &self,
        position: usize,
        op: &'static str,
        handle: Handle,
    ) -> Result<&PreviewPolygon, BackendError> {
        self.polygons
            .get(&handle)
            .ok_or_else(|| BackendError::new(position, op, format!("unknown sketch {}", handle)))
    }

    fn insert_point(&mut self, handle: Handle, p: Point3<f64>) {
        self.points.insert(handle, p);
    }

    fn insert_line(&mut self, handle: Handle, start: Handle, end: Handle) {
        self.lines.insert(handle, (start, end));
    }

    fn move_points(
        &mut self,
        position: usize,
        op: &'static str,
        entities: &[Handle],
        f: impl Fn(&Point3<f64>) -> Point3<f64>,
    ) -> Result<(), BackendError> {
        for &entity in entities {
            let p = self.require_point(position, op, entity)?;
            self.points.insert(entity, f(&p));
        }
        self.transforms += 1;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn create_polygon(
        &mut self,
        position: usize,
        op: &'static str,
        sketch: Handle,
        plane: Handle,
        variant: TemplateVariant,
        center: [f64; 3],
        vertex: [f64; 3],
        sides: u32,
        construction: bool,
        center_point: Handle,
        vertices: &[Handle],
        edges: &[Handle],
    ) -> Result<(), BackendError> {
        if sides < 3 || vertices.len() != sides as usize || edges.len() != sides as usize {
            return Err(BackendError::new(
                position,
                op,
                format!("polygon with {} sides needs as many vertices and edges", sides),
            ));
        }
        let (origin, normal) = *self
            .planes
            .get(&plane)
            .ok_or_else(|| BackendError::new(position, op, format!("unknown plane {}", plane)))?;

        let center = Point3::from(center);
        let vertex = Point3::from(vertex);
        for (name, p) in [("center", &center), ("vertex", &vertex)] {
            let distance = normal.dot(&(p - origin));
            if !(distance.abs() <= COINCIDENCE_TOLERANCE) {
                return Err(BackendError::new(
                    position,
                    op,
                    format!("{} lies {:.3e} m off plane {}", name, distance, plane),
                ));
            }
        }
        let spoke = vertex - center;
        self.insert_point(center_point, center);
        for (k, &handle) in vertices.iter().enumerate() {
            let angle = k as f64 * 2.0 * PI / sides as f64;
            let p = center + Rotation3::from_axis_angle(&normal, angle) * spoke;
            self.insert_point(handle, p);
        }
        for (k, &edge) in edges.iter().enumerate() {
            self.insert_line(edge, vertices[k], vertices[(k + 1) % vertices.len()]);
            self.edge_sketches.insert(edge, sketch);
        }

        self.polygons.insert(
            sketch,
            PreviewPolygon {
                variant,
                plane,
                construction,
                center_point,
                vertices: vertices.to_vec(),
                edges: edges.to_vec(),
            },
        );
        Ok(())
    }

    fn check_parallel(
        &self,
        position: usize,
        op: &'static str,
        a: Handle,
        b: Handle,
    ) -> Result<(), BackendError> {
        let mut da = self.require_line(position, op, a)?;
        let mut db = self.require_line(position, op, b)?;

        // Sketch relations compare against the projection onto the sketch plane
        let normal = self
            .edge_sketches
            .get(&a)
            .and_then(|&sketch| self.sketch_normal(sketch));
        if let Some(n) = normal {
            da -= n.into_inner() * n.dot(&da);
            db -= n.into_inner() * n.dot(&db);
        }
        let (ua, ub) = match (
            Unit::try_new(da, BASIS_EPSILON),
            Unit::try_new(db, BASIS_EPSILON),
        ) {
            (Some(ua), Some(ub)) => (ua, ub),
            _ => {
                return Err(BackendError::new(
                    position,
                    op,
                    format!("{} or {} has no direction in the sketch plane", a, b),
                ))
            }
        };

        let sine = ua.cross(ub.as_ref()).norm();
        if sine > PARALLEL_TOLERANCE {
            return Err(BackendError::new(
                position,
                op,
                format!("{} and {} are not parallel (sin = {:.3e})", a, b, sine),
            ));
        }
        Ok(())
    }
}

impl ModelingBackend for PreviewBackend {
    fn apply(&mut self, position: usize, intent: &ModelingIntent) -> Result<(), BackendError> {
        let op = intent.op();
        match intent {
            ModelingIntent::CreatePoint { handle, position: p } => {
                self.insert_point(*handle, Point3::from(*p));
            }
            ModelingIntent::CreateLine { handle, start, end, .. } => {
                self.require_point(position, op, *start)?;
                self.require_point(position, op, *end)?;
                self.insert_line(*handle, *start, *end);
            }
            ModelingIntent::CreatePlaneFromPointAndNormal { handle, point, normal, .. } => {
                let origin = self.require_point(position, op, *point)?;
                let direction = self.require_line(position, op, *normal)?;
                let normal = Unit::try_new(direction, BASIS_EPSILON).ok_or_else(|| {
                    BackendError::new(position, op, format!("normal line {} has zero length", normal))
                })?;
                self.planes.insert(*handle, (origin, normal));
            }
            ModelingIntent::CreatePolygon {
                sketch,
                plane,
                variant,
                center,
                vertex,
                sides,
                construction,
                center_point,
                vertices,
                edges,
            } => {
                self.create_polygon(
                    position,
                    op,
                    *sketch,
                    *plane,
                    *variant,
                    *center,
                    *vertex,
                    *sides,
                    *construction,
                    *center_point,
                    vertices,
                    edges,
                )?;
            }
            ModelingIntent::CreateChamfer { vertex, length, .. } => {
                self.require_point(position, op, *vertex)?;
                if !(*length > 0.0) {
                    return Err(BackendError::new(position, op, "chamfer length must be positive"));
                }
                self.chamfers += 1;
            }
            ModelingIntent::ExtrudeTwoWay { sketch, depth, .. } => {
                self.require_sketch(position, op, *sketch)?;
                if !(*depth > 0.0) {
                    return Err(BackendError::new(position, op, "extrusion depth must be positive"));
                }
                self.features += 1;
            }
            ModelingIntent::ExtrudeToPoint { sketch, target, .. } => {
                self.require_sketch(position, op, *sketch)?;
                self.require_point(position, op, *target)?;
                self.features += 1;
            }
            ModelingIntent::CreateCircularCut { sketch, center, diameter, .. } => {
                self.require_sketch(position, op, *sketch)?;
                self.require_point(position, op, *center)?;
                if !(*diameter > 0.0) {
                    return Err(BackendError::new(position, op, "cut diameter must be positive"));
                }
                self.features += 1;
            }
            ModelingIntent::Rotate { entities, center, axis, angle } => {
                let pivot = self.require_point(position, op, *center)?;
                let axis = Unit::try_new(Vector3::from(*axis), BASIS_EPSILON)
                    .ok_or_else(|| BackendError::new(position, op, "rotation axis has zero length"))?;
                let rotation = Rotation3::from_axis_angle(&axis, *angle);
                self.move_points(position, op, entities, |p| pivot + rotation * (p - pivot))?;
            }
            ModelingIntent::Translate { entities, offset } => {
                let offset = Vector3::from(*offset);
                self.move_points(position, op, entities, |p| p + offset)?;
            }
            ModelingIntent::MakeCoincident { a, b } => {
                let pa = self.require_point(position, op, *a)?;
                let pb = self.require_point(position, op, *b)?;
                let distance = (pa - pb).norm();
                if distance > COINCIDENCE_TOLERANCE {
                    return Err(BackendError::new(
                        position,
                        op,
                        format!("{} and {} are {:.3e} m apart", a, b, distance),
                    ));
                }
                self.relations += 1;
            }
            ModelingIntent::MakeParallel { a, b } => {
                self.check_parallel(position, op, *a, *b)?;
                self.relations += 1;
            }
            ModelingIntent::MakeHorizontal { entity } => {
                let direction = self.require_line(position, op, *entity)?;
                let slope = self.reference_plane.slope(&direction);
                if !(slope < HORIZONTAL_SLOPE) {
                    return Err(BackendError::new(
                        position,
                        op,
                        format!("{} is not horizontal (slope {:.3e})", entity, slope),
                    ));
                }
                self.relations += 1;
            }
        }
        Ok(())
    }

    fn end_batch(&mut self) {
        self.batches += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::IntentEmitter;
    use crate::frame::{pair_modules, FrameBuilder};
    use crate::instancer::Instancer;
    use crate::shell::tests::sample_shell;
    use crate::template::tests::sample_params;
    use crate::template::TemplateLibrary;
    use focalplate_model::{
        apply_stream, BatchReport, IntentStream, LengthUnit, Point3D, PointCloud, SurveyRecord,
    };

    fn cloud(points: &[(f64, f64, f64, bool)]) -> PointCloud {
        let records = points
            .iter()
            .map(|&(x, y, z, flag)| SurveyRecord {
                position: Point3D::new(x, y, z),
                orientation_flag: flag,
            })
            .collect();
        PointCloud::from_records(records, LengthUnit::Metre).unwrap()
    }

    #[test]
    fn test_replay_matches_planned_vertices() {
        let shell = sample_shell();
        let center = Point3::new(0.0, 0.0, 11.0456);
        let mut front = Vec::new();
        let mut back = Vec::new();
        for i in 0..9 {
            let f = Point3::new(0.07 * (i % 3) as f64 - 0.06, 0.08 * (i / 3) as f64 - 0.07, 0.0456);
            let b = f + (f - center).normalize() * 0.05;
            front.push((f.x, f.y, f.z, i % 4 != 1));
            back.push((b.x, b.y, b.z, true));
        }
        let (pairs, _) = pair_modules(&cloud(&front), &cloud(&back));
        let frames = FrameBuilder::new(&shell)
            .build_all(&pairs, &mut BatchReport::new())
            .unwrap();
        let library = TemplateLibrary::new(sample_params()).unwrap();
        let instancer = Instancer::new(&shell, library, &frames).unwrap();

        let mut plans = vec![instancer
            .plan_module(&instancer.reference().frame)
            .unwrap()];
        plans.extend(instancer.plan_all(&frames, &mut BatchReport::new()));

        let mut stream = IntentStream::new();
        let mut emitter = IntentEmitter::new(&mut stream, &sample_params(), &shell);
        let emitted: Vec<_> = plans.iter().map(|p| emitter.emit_module(p).unwrap()).collect();

        let mut backend = PreviewBackend::new(shell.reference_plane());
        let applied = apply_stream(&mut backend, &stream).unwrap();
        assert_eq!(applied, stream.len());

        for (plan, module) in plans.iter().zip(&emitted) {
            for (placed, polygon) in plan.variants.iter().zip(&module.polygons) {
                let realised = backend.polygon_vertices(polygon.sketch).unwrap();
                for (got, want) in realised.iter().zip(placed.pattern.corners()) {
                    assert!((got - want).norm() < 1e-9, "{} vertex off by {}", plan.frame.index, (got - want).norm());
                }
                let normal = backend.sketch_normal(polygon.sketch).unwrap();
                assert!(normal.cross(plan.frame.normal.as_ref()).norm() < 1e-9);
            }
        }

        let summary = backend.summary();
        assert_eq!(summary.sketches, 27);
        assert_eq!(summary.features, 9 * (1 + 1 + 3));
        assert_eq!(summary.chamfers, 27);
    }

    #[test]
    fn test_polygon_off_its_plane_rejected() {
        let mut stream = IntentStream::new();
        let origin = stream.allocate();
        let tip = stream.allocate();
        let axis = stream.allocate();
        let plane = stream.allocate();
        stream.push(ModelingIntent::CreatePoint { handle: origin, position: [0.0, 0.0, -0.05] });
        stream.push(ModelingIntent::CreatePoint { handle: tip, position: [0.0, 0.0, -0.1] });
        stream.push(ModelingIntent::CreateLine { handle: axis, start: origin, end: tip, construction: true });
        stream.push(ModelingIntent::CreatePlaneFromPointAndNormal {
            handle: plane,
            point: origin,
            normal: axis,
            name: "Module 0 plane".to_string(),
        });
        let mut backend = PreviewBackend::new(ReferencePlane::Xy);
        assert_eq!(apply_stream(&mut backend, &stream).unwrap(), 4);

        let polygon = |handle: u32, center: [f64; 3], vertex: [f64; 3]| ModelingIntent::CreatePolygon {
            sketch: Handle(handle),
            plane,
            variant: TemplateVariant::Full,
            center,
            vertex,
            sides: 3,
            construction: false,
            center_point: Handle(handle + 1),
            vertices: vec![Handle(handle + 2), Handle(handle + 3), Handle(handle + 4)],
            edges: vec![Handle(handle + 5), Handle(handle + 6), Handle(handle + 7)],
        };

        let err = backend
            .apply(4, &polygon(10, [0.3, 0.0, 0.1352], [0.3, -0.043, 0.1352]))
            .unwrap_err();
        assert_eq!(err.op, "create_polygon");
        assert!(err.message.contains("center"));
        assert!(backend.polygon(Handle(10)).is_none());

        let err = backend
            .apply(5, &polygon(20, [0.0, 0.0, -0.05], [0.0, -0.043, -0.049]))
            .unwrap_err();
        assert!(err.message.contains("vertex"));

        backend
            .apply(6, &polygon(30, [0.1, 0.2, -0.05], [0.1, 0.157, -0.05]))
            .unwrap();
        let normal = backend.sketch_normal(Handle(30)).unwrap();
        assert!(normal.cross(&Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn test_unknown_handle_rejected() {
        let mut backend = PreviewBackend::new(ReferencePlane::Xy);
        let err = backend
            .apply(
                0,
                &ModelingIntent::CreateLine {
                    handle: Handle(2),
                    start: Handle(0),
                    end: Handle(1),
                    construction: true,
                },
            )
            .unwrap_err();
        assert_eq!(err.position, 0);
        assert_eq!(err.op, "create_line");
    }

    #[test]
    fn test_relations_are_checked() {
        let mut stream = IntentStream::new();
        let a = stream.allocate();
        let b = stream.allocate();
        let c = stream.allocate();
        let line = stream.allocate();
        let slanted = stream.allocate();
        stream.push(ModelingIntent::CreatePoint { handle: a, position: [0.0, 0.0, 0.0] });
        stream.push(ModelingIntent::CreatePoint { handle: b, position: [1.0, 0.0, 0.0] });
        stream.push(ModelingIntent::CreatePoint { handle: c, position: [1.0, 1.0, 0.0] });
        stream.push(ModelingIntent::CreateLine { handle: line, start: a, end: b, construction: false });
        stream.push(ModelingIntent::CreateLine { handle: slanted, start: a, end: c, construction: false });
        stream.push(ModelingIntent::MakeHorizontal { entity: line });

        let mut backend = PreviewBackend::new(ReferencePlane::Xy);
        assert_eq!(apply_stream(&mut backend, &stream).unwrap(), 6);

        assert!(backend.apply(6, &ModelingIntent::MakeHorizontal { entity: slanted }).is_err());
        assert!(backend.apply(7, &ModelingIntent::MakeParallel { a: line, b: slanted }).is_err());
        assert!(backend.apply(8, &ModelingIntent::MakeCoincident { a, b }).is_err());

        backend
            .apply(
                9,
                &ModelingIntent::Translate {
                    entities: vec![c],
                    offset: [0.0, -1.0, 0.0],
                },
            )
            .unwrap();
        assert!(backend.apply(10, &ModelingIntent::MakeParallel { a: line, b: slanted }).is_ok());
        assert!(backend.apply(11, &ModelingIntent::MakeCoincident { a: b, b: c }).is_ok());
        assert_eq!(backend.summary().relations, 3);
    }
}
