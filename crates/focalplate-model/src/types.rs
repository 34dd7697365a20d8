// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for survey data representation

use crate::error::{InputError, Result};
use crate::units::LengthUnit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

/// Type-safe module identifier
///
/// Position of a survey record within its cloud. Front and back records that
/// share an index belong to the same module.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize, Default,
)]
pub struct ModuleIndex(pub u32);

impl fmt::Display for ModuleIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

impl From<u32> for ModuleIndex {
    fn from(id: u32) -> Self {
        ModuleIndex(id)
    }
}

impl From<ModuleIndex> for u32 {
    fn from(id: ModuleIndex) -> Self {
        id.0
    }
}

impl From<ModuleIndex> for usize {
    fn from(id: ModuleIndex) -> Self {
        id.0 as usize
    }
}

/// 3D coordinate in metres
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Point3D {
    fn from(p: [f64; 3]) -> Self {
        Point3D::new(p[0], p[1], p[2])
    }
}

impl fmt::Display for Point3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.6})", self.x, self.y, self.z)
    }
}

/// One surveyed location
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurveyPoint {
    pub index: ModuleIndex,
    pub position: Point3D,
    /// `false` requests a 180° rotation of the module about its normal
    pub orientation_flag: bool,
}

/// Raw record as produced by a tokenizer, already in metres
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurveyRecord {
    pub position: Point3D,
    pub orientation_flag: bool,
}

/// Ordered survey points with contiguous indices starting at 0
///
/// Built once by a [`crate::SurveyParser`]; read-only afterwards apart from
/// the single [`PointCloud::with_z_offset`] normalisation.
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud {
    points: Vec<SurveyPoint>,
    source_unit: LengthUnit,
    z_offset: Option<f64>,
}

impl PointCloud {
    /// Build a cloud from records, assigning indices by position
    pub fn from_records(records: Vec<SurveyRecord>, source_unit: LengthUnit) -> Result<Self> {
        if records.is_empty() {
            return Err(InputError::Empty);
        }

        let points = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| SurveyPoint {
                index: ModuleIndex(i as u32),
                position: record.position,
                orientation_flag: record.orientation_flag,
            })
            .collect();

        Ok(Self {
            points,
            source_unit,
            z_offset: None,
        })
    }

    /// Add `dz` (metres) to every z coordinate
    ///
    /// Can only be applied once per cloud.
    pub fn with_z_offset(mut self, dz: f64) -> Result<Self> {
        if let Some(previous) = self.z_offset {
            return Err(InputError::OffsetAlreadyApplied(previous));
        }
        for point in &mut self.points {
            point.position.z += dz;
        }
        self.z_offset = Some(dz);
        Ok(self)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get a point by module index
    pub fn get(&self, index: ModuleIndex) -> Option<&SurveyPoint> {
        self.points.get(usize::from(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SurveyPoint> {
        self.points.iter()
    }

    pub fn points(&self) -> &[SurveyPoint] {
        &self.points
    }

    /// Unit the raw records were declared in
    pub fn source_unit(&self) -> LengthUnit {
        self.source_unit
    }

    /// Z offset applied so far, if any
    pub fn z_offset(&self) -> Option<f64> {
        self.z_offset
    }

    /// Human-readable listing of every point, in the source unit
    pub fn dump(&self) -> String {
        let unit = self.source_unit;
        let mut out = String::with_capacity(self.points.len() * 48);
        for p in &self.points {
            let _ = writeln!(
                out,
                "{}: ({:.4}, {:.4}, {:.4}) {} flag={}",
                p.index,
                unit.from_metres(p.position.x),
                unit.from_metres(p.position.y),
                unit.from_metres(p.position.z),
                unit,
                p.orientation_flag
            );
        }
        out
    }
}

/// The three template variants instanced per module
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateVariant {
    /// Mounting triangle with chamfered corners, cut to support height
    Chamfered,
    /// Structural triangle, cut through the shell
    Full,
    /// Construction triangle carrying the pin holes
    PinHole,
}

impl TemplateVariant {
    /// Fixed emission order
    pub const ALL: [TemplateVariant; 3] = [
        TemplateVariant::Chamfered,
        TemplateVariant::Full,
        TemplateVariant::PinHole,
    ];

    /// How deep this variant removes material from the shell
    pub fn removal(&self) -> RemovalDepth {
        match self {
            TemplateVariant::Chamfered => RemovalDepth::SupportHeight,
            TemplateVariant::Full => RemovalDepth::ThroughShell,
            TemplateVariant::PinHole => RemovalDepth::PinHolesOnly,
        }
    }

    /// Position within [`TemplateVariant::ALL`]
    pub fn ordinal(&self) -> usize {
        match self {
            TemplateVariant::Chamfered => 0,
            TemplateVariant::Full => 1,
            TemplateVariant::PinHole => 2,
        }
    }
}

impl fmt::Display for TemplateVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TemplateVariant::Chamfered => "chamfered",
            TemplateVariant::Full => "full",
            TemplateVariant::PinHole => "pin-hole",
        };
        f.write_str(name)
    }
}

/// Removal-depth tag attached to a template
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalDepth {
    /// Two-way cut of the support-to-top distance
    SupportHeight,
    /// Cut from the anchor up to the support-surface marker
    ThroughShell,
    /// Only full-depth circular cuts at the corners
    PinHolesOnly,
}
