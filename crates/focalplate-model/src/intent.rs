// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Modeling intents
//!
//! The placement engine never talks to a CAD kernel. It writes an ordered
//! [`IntentStream`] where every entity is addressed by an explicit [`Handle`];
//! a [`crate::ModelingBackend`] replays the stream.

use crate::types::TemplateVariant;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to an entity created by an earlier intent
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize, Default,
)]
pub struct Handle(pub u32);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// One instruction for a solid-modeling backend
///
/// Positions are in metres, angles in radians, axes are unit vectors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ModelingIntent {
    // ========================================================================
    // Reference geometry
    // ========================================================================
    CreatePoint {
        handle: Handle,
        position: [f64; 3],
    },
    CreateLine {
        handle: Handle,
        start: Handle,
        end: Handle,
        construction: bool,
    },
    /// Plane through `point` whose normal follows the line `normal`
    CreatePlaneFromPointAndNormal {
        handle: Handle,
        point: Handle,
        normal: Handle,
        name: String,
    },

    // ========================================================================
    // Sketch geometry
    // ========================================================================
    /// Regular polygon on `plane`, given by its centre and one vertex
    ///
    /// `vertices[k]` is the vertex at `k * 360° / sides` about the plane
    /// normal; `edges[k]` joins `vertices[k]` to `vertices[k + 1]`.
    CreatePolygon {
        sketch: Handle,
        plane: Handle,
        variant: TemplateVariant,
        center: [f64; 3],
        vertex: [f64; 3],
        sides: u32,
        construction: bool,
        center_point: Handle,
        vertices: Vec<Handle>,
        edges: Vec<Handle>,
    },
    CreateChamfer {
        handle: Handle,
        vertex: Handle,
        length: f64,
    },

    // ========================================================================
    // Features
    // ========================================================================
    /// Symmetric cut of `depth` in both directions of the sketch plane
    ExtrudeTwoWay {
        handle: Handle,
        sketch: Handle,
        depth: f64,
    },
    /// Cut from the sketch plane up to a target point
    ExtrudeToPoint {
        handle: Handle,
        sketch: Handle,
        target: Handle,
    },
    CreateCircularCut {
        handle: Handle,
        sketch: Handle,
        center: Handle,
        diameter: f64,
    },

    // ========================================================================
    // Transforms and relations
    // ========================================================================
    /// Rotate points about the axis through `center`
    Rotate {
        entities: Vec<Handle>,
        center: Handle,
        axis: [f64; 3],
        angle: f64,
    },
    Translate {
        entities: Vec<Handle>,
        offset: [f64; 3],
    },
    MakeCoincident {
        a: Handle,
        b: Handle,
    },
    MakeParallel {
        a: Handle,
        b: Handle,
    },
    MakeHorizontal {
        entity: Handle,
    },
}

impl ModelingIntent {
    /// Stable operation name
    pub fn op(&self) -> &'static str {
        match self {
            ModelingIntent::CreatePoint { .. } => "create_point",
            ModelingIntent::CreateLine { .. } => "create_line",
            ModelingIntent::CreatePlaneFromPointAndNormal { .. } => {
                "create_plane_from_point_and_normal"
            }
            ModelingIntent::CreatePolygon { .. } => "create_polygon",
            ModelingIntent::CreateChamfer { .. } => "create_chamfer",
            ModelingIntent::ExtrudeTwoWay { .. } => "extrude_two_way",
            ModelingIntent::ExtrudeToPoint { .. } => "extrude_to_point",
            ModelingIntent::CreateCircularCut { .. } => "create_circular_cut",
            ModelingIntent::Rotate { .. } => "rotate",
            ModelingIntent::Translate { .. } => "translate",
            ModelingIntent::MakeCoincident { .. } => "make_coincident",
            ModelingIntent::MakeParallel { .. } => "make_parallel",
            ModelingIntent::MakeHorizontal { .. } => "make_horizontal",
        }
    }

    /// Handles introduced by this intent
    pub fn created_handles(&self) -> Vec<Handle> {
        match self {
            ModelingIntent::CreatePoint { handle, .. }
            | ModelingIntent::CreateLine { handle, .. }
            | ModelingIntent::CreatePlaneFromPointAndNormal { handle, .. }
            | ModelingIntent::CreateChamfer { handle, .. }
            | ModelingIntent::ExtrudeTwoWay { handle, .. }
            | ModelingIntent::ExtrudeToPoint { handle, .. }
            | ModelingIntent::CreateCircularCut { handle, .. } => vec![*handle],
            ModelingIntent::CreatePolygon {
                sketch,
                center_point,
                vertices,
                edges,
                ..
            } => {
                let mut out = Vec::with_capacity(2 + vertices.len() + edges.len());
                out.push(*sketch);
                out.push(*center_point);
                out.extend_from_slice(vertices);
                out.extend_from_slice(edges);
                out
            }
            _ => Vec::new(),
        }
    }

    /// Whether this intent removes material from the shell
    pub fn is_feature(&self) -> bool {
        matches!(
            self,
            ModelingIntent::ExtrudeTwoWay { .. }
                | ModelingIntent::ExtrudeToPoint { .. }
                | ModelingIntent::CreateCircularCut { .. }
        )
    }
}

/// Interactive-host toggles a backend may honour while replaying a batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BatchHint {
    pub suspend_graphics: bool,
    pub suspend_feature_tree: bool,
    pub suppress_dimension_dialogs: bool,
}

impl BatchHint {
    /// All toggles on, for hosts with a live user interface
    pub fn interactive_host() -> Self {
        Self {
            suspend_graphics: true,
            suspend_feature_tree: true,
            suppress_dimension_dialogs: true,
        }
    }
}

/// Ordered intents plus the handle allocator that produced them
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentStream {
    intents: Vec<ModelingIntent>,
    next_handle: u32,
    hint: Option<BatchHint>,
}

impl IntentStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stream carrying a batching hint
    pub fn with_hint(hint: BatchHint) -> Self {
        Self {
            hint: Some(hint),
            ..Self::default()
        }
    }

    /// Reserve the next handle
    pub fn allocate(&mut self) -> Handle {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    /// Reserve `n` consecutive handles
    pub fn allocate_n(&mut self, n: usize) -> Vec<Handle> {
        (0..n).map(|_| self.allocate()).collect()
    }

    pub fn push(&mut self, intent: ModelingIntent) {
        self.intents.push(intent);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelingIntent> {
        self.intents.iter()
    }

    pub fn intents(&self) -> &[ModelingIntent] {
        &self.intents
    }

    pub fn hint(&self) -> Option<&BatchHint> {
        self.hint.as_ref()
    }

    /// Number of handles allocated so far
    pub fn handle_count(&self) -> u32 {
        self.next_handle
    }

    /// Count intents with the given operation name
    pub fn count_op(&self, op: &str) -> usize {
        self.intents.iter().filter(|i| i.op() == op).count()
    }

    pub fn into_intents(self) -> Vec<ModelingIntent> {
        self.intents
    }
}
