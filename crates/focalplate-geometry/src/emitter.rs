// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Intent emission
//!
//! Turns module plans into modeling intents. Emission is strictly serial:
//! handles are allocated in the order intents are written, so the same
//! plans always produce the same stream.
//!
//! Every copy is sketched where its reference template lies, on the
//! reference module's plane, and then moved onto its module by explicit
//! transforms.

use crate::error::{Error, Result};
use crate::instancer::ModulePlan;
use crate::placement::PlacedVariant;
use crate::shell::ShellContext;
use crate::template::TemplateParams;
use crate::tolerance::{ANGLE_EPSILON, HORIZONTAL_SLOPE};
use focalplate_model::{Handle, IntentStream, ModelingIntent, TemplateVariant};
use nalgebra::Point3;
use std::f64::consts::PI;

#[inline]
fn coords(p: &Point3<f64>) -> [f64; 3] {
    [p.x, p.y, p.z]
}

/// Handles created for one module's reference geometry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHandles {
    pub front: Handle,
    pub back: Handle,
    pub axis: Handle,
    pub anchor: Handle,
    pub plane: Handle,
}

/// Handles created for one polygon sketch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolygonHandles {
    pub sketch: Handle,
    pub center_point: Handle,
    pub vertices: Vec<Handle>,
    pub edges: Vec<Handle>,
}

impl PolygonHandles {
    /// Center point and vertices, the entities moved by a transform
    fn points(&self) -> Vec<Handle> {
        let mut points = Vec::with_capacity(1 + self.vertices.len());
        points.push(self.center_point);
        points.extend_from_slice(&self.vertices);
        points
    }
}

/// Handles created for one module
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmittedModule {
    pub frame: FrameHandles,
    /// Sketches in [`TemplateVariant::ALL`] order
    pub polygons: Vec<PolygonHandles>,
}

/// Reference module handles later modules are sketched and constrained against
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ReferenceHandles {
    plane: Handle,
    /// Alignment edge of each variant
    edges: [Handle; 3],
}

/// Writes module plans into an intent stream
pub struct IntentEmitter<'a> {
    stream: &'a mut IntentStream,
    params: TemplateParams,
    shell: ShellContext,
    reference: Option<ReferenceHandles>,
}

impl<'a> IntentEmitter<'a> {
    pub fn new(stream: &'a mut IntentStream, params: &TemplateParams, shell: &ShellContext) -> Self {
        Self {
            stream,
            params: *params,
            shell: *shell,
            reference: None,
        }
    }

    /// Alignment edge handles of the reference module, once it was emitted
    pub fn reference_edges(&self) -> Option<[Handle; 3]> {
        self.reference.map(|r| r.edges)
    }

    /// Plane handle of the reference module, once it was emitted
    pub fn reference_plane(&self) -> Option<Handle> {
        self.reference.map(|r| r.plane)
    }

    /// Emit one module
    ///
    /// The reference module must be emitted before any other module: copies
    /// are sketched on its plane and made parallel to its edges. Nothing is
    /// written for a module that comes too early.
    pub fn emit_module(&mut self, plan: &ModulePlan) -> Result<EmittedModule> {
        let reference = match (plan.is_reference, self.reference) {
            (true, _) => None,
            (false, Some(reference)) => Some(reference),
            (false, None) => {
                return Err(Error::ReferenceNotEmitted {
                    index: plan.frame.index,
                })
            }
        };

        let frame = self.emit_frame(plan);

        let mut polygons = Vec::with_capacity(plan.variants.len());
        let mut edges = [Handle::default(); 3];
        for placed in &plan.variants {
            let polygon = match reference {
                None => self.emit_reference_polygon(&frame, placed),
                Some(reference) => self.emit_placed_polygon(plan, &frame, &reference, placed),
            };
            edges[placed.pattern.variant().ordinal()] = polygon.edges[placed.side];
            self.emit_features(plan, placed, &polygon);
            polygons.push(polygon);
        }

        if plan.is_reference {
            self.reference = Some(ReferenceHandles {
                plane: frame.plane,
                edges,
            });
        }

        Ok(EmittedModule { frame, polygons })
    }

    fn point(&mut self, p: &Point3<f64>) -> Handle {
        let handle = self.stream.allocate();
        self.stream.push(ModelingIntent::CreatePoint {
            handle,
            position: coords(p),
        });
        handle
    }

    fn emit_frame(&mut self, plan: &ModulePlan) -> FrameHandles {
        let frame = &plan.frame;
        let front = self.point(&frame.front);
        let back = self.point(&frame.back);

        let axis = self.stream.allocate();
        self.stream.push(ModelingIntent::CreateLine {
            handle: axis,
            start: front,
            end: back,
            construction: true,
        });

        let anchor = self.point(&frame.anchor);
        let plane = self.stream.allocate();
        self.stream.push(ModelingIntent::CreatePlaneFromPointAndNormal {
            handle: plane,
            point: anchor,
            normal: axis,
            name: format!("Module {} plane", frame.index.0),
        });

        FrameHandles {
            front,
            back,
            axis,
            anchor,
            plane,
        }
    }

    fn emit_polygon(
        &mut self,
        plane: Handle,
        variant: TemplateVariant,
        center: &Point3<f64>,
        vertex: &Point3<f64>,
    ) -> PolygonHandles {
        let sketch = self.stream.allocate();
        let center_point = self.stream.allocate();
        let vertices = self.stream.allocate_n(3);
        let edges = self.stream.allocate_n(3);

        self.stream.push(ModelingIntent::CreatePolygon {
            sketch,
            plane,
            variant,
            center: coords(center),
            vertex: coords(vertex),
            sides: 3,
            construction: variant == TemplateVariant::PinHole,
            center_point,
            vertices: vertices.clone(),
            edges: edges.clone(),
        });

        PolygonHandles {
            sketch,
            center_point,
            vertices,
            edges,
        }
    }

    fn emit_reference_polygon(&mut self, frame: &FrameHandles, placed: &PlacedVariant) -> PolygonHandles {
        let pattern = &placed.pattern;
        let polygon = self.emit_polygon(
            frame.plane,
            pattern.variant(),
            &placed.source_center,
            &placed.source.corners()[0],
        );

        self.stream.push(ModelingIntent::MakeCoincident {
            a: polygon.center_point,
            b: frame.anchor,
        });
        if pattern.side(placed.side).slope_in(self.shell.reference_plane()) < HORIZONTAL_SLOPE {
            self.stream.push(ModelingIntent::MakeHorizontal {
                entity: polygon.edges[placed.side],
            });
        }
        polygon
    }

    fn emit_placed_polygon(
        &mut self,
        plan: &ModulePlan,
        frame: &FrameHandles,
        reference: &ReferenceHandles,
        placed: &PlacedVariant,
    ) -> PolygonHandles {
        let variant = placed.pattern.variant();
        let polygon = self.emit_polygon(
            reference.plane,
            variant,
            &placed.source_center,
            &placed.source.corners()[0],
        );
        let axis: [f64; 3] = plan.frame.normal.into_inner().into();

        if let Some((normal_axis, angle)) = placed.reorientation {
            self.stream.push(ModelingIntent::Rotate {
                entities: polygon.points(),
                center: polygon.center_point,
                axis: normal_axis.into_inner().into(),
                angle,
            });
        }
        self.stream.push(ModelingIntent::Translate {
            entities: polygon.points(),
            offset: placed.offset.into(),
        });
        if placed.flipped {
            self.stream.push(ModelingIntent::Rotate {
                entities: polygon.points(),
                center: frame.anchor,
                axis,
                angle: PI,
            });
        }
        if placed.alignment_angle.abs() >= ANGLE_EPSILON {
            self.stream.push(ModelingIntent::Rotate {
                entities: polygon.points(),
                center: frame.anchor,
                axis,
                angle: placed.alignment_angle,
            });
        }

        self.stream.push(ModelingIntent::MakeCoincident {
            a: polygon.center_point,
            b: frame.anchor,
        });
        self.stream.push(ModelingIntent::MakeParallel {
            a: polygon.edges[placed.side],
            b: reference.edges[variant.ordinal()],
        });
        polygon
    }

    fn emit_features(
        &mut self,
        plan: &ModulePlan,
        placed: &PlacedVariant,
        polygon: &PolygonHandles,
    ) {
        match placed.pattern.variant() {
            TemplateVariant::Chamfered => {
                for &vertex in &polygon.vertices {
                    let handle = self.stream.allocate();
                    self.stream.push(ModelingIntent::CreateChamfer {
                        handle,
                        vertex,
                        length: self.params.chamfer_length,
                    });
                }
                let handle = self.stream.allocate();
                self.stream.push(ModelingIntent::ExtrudeTwoWay {
                    handle,
                    sketch: polygon.sketch,
                    depth: self.shell.support_to_top_distance(),
                });
            }
            TemplateVariant::Full => {
                let target = self.point(&plan.support_marker);
                let handle = self.stream.allocate();
                self.stream.push(ModelingIntent::ExtrudeToPoint {
                    handle,
                    sketch: polygon.sketch,
                    target,
                });
            }
            TemplateVariant::PinHole => {
                for &center in &polygon.vertices {
                    let handle = self.stream.allocate();
                    self.stream.push(ModelingIntent::CreateCircularCut {
                        handle,
                        sketch: polygon.sketch,
                        center,
                        diameter: self.params.pin_hole_diameter,
                    });
                }
            }
        }
    }
}
