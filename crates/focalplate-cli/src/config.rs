// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON run configuration
//!
//! Lengths are written in the file's `unit` and converted to metres here;
//! the sweep angle is always in degrees. The best-fit sphere radius is either
//! given directly or fitted to a measured sag profile.

use anyhow::{bail, Context, Result};
use focalplate_geometry::{
    best_fit_sphere_radius, PipelineOptions, ReferencePlane, ShellParameters, TemplateParams,
};
use focalplate_model::{BatchHint, LengthUnit};
use focalplate_parser::parse_unit_name;
use serde::Deserialize;
use std::fs;
use std::path::Path;

fn default_unit() -> String {
    "mm".to_string()
}

fn default_sweep() -> f64 {
    360.0
}

fn default_plane() -> String {
    "xy".to_string()
}

fn default_parallel() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ShellSection {
    #[serde(default)]
    pub best_fit_sphere_radius: Option<f64>,
    /// `[r, z]` samples of the measured surface, sagging toward +z
    #[serde(default)]
    pub sag_profile: Option<Vec<[f64; 2]>>,
    pub outer_rim_height: f64,
    pub bottom_surface_radius: f64,
    pub support_to_top_distance: f64,
    #[serde(default = "default_sweep")]
    pub sweep_angle_deg: f64,
    pub bottom_plane_offset: f64,
    /// "xy" (front), "xz" (top) or "yz" (right)
    #[serde(default = "default_plane")]
    pub reference_plane: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TemplateSection {
    pub side_length: f64,
    pub chamfer_length: f64,
    pub pin_hole_diameter: f64,
}

/// Contents of a run configuration file
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Unit of every length in this file, and of the survey files unless
    /// overridden on the command line
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Add the best-fit sphere radius to every survey z coordinate
    #[serde(default)]
    pub recenter_z: bool,
    pub shell: ShellSection,
    pub template: TemplateSection,
    #[serde(default)]
    pub batch_hint: Option<BatchHint>,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl ConfigFile {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read configuration {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("in configuration {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn length_unit(&self) -> Result<LengthUnit> {
        Ok(parse_unit_name(&self.unit)?)
    }

    pub fn reference_plane(&self) -> Result<ReferencePlane> {
        let plane = match self.shell.reference_plane.trim().to_ascii_lowercase().as_str() {
            "xy" | "front" => ReferencePlane::Xy,
            "xz" | "top" => ReferencePlane::Xz,
            "yz" | "right" => ReferencePlane::Yz,
            other => bail!("unknown reference plane '{}'", other),
        };
        Ok(plane)
    }

    /// Best-fit sphere radius in the file's unit
    pub fn sphere_radius(&self) -> Result<f64> {
        match (self.shell.best_fit_sphere_radius, &self.shell.sag_profile) {
            (Some(radius), _) => Ok(radius),
            (None, Some(profile)) => {
                let samples: Vec<(f64, f64)> = profile.iter().map(|&[r, z]| (r, z)).collect();
                let radius = best_fit_sphere_radius(&samples)
                    .context("sag profile has no curvature to fit a sphere to")?;
                log::info!(
                    "Fitted best-fit sphere radius {:.6} {} to {} samples",
                    radius,
                    self.unit,
                    samples.len()
                );
                Ok(radius)
            }
            (None, None) => bail!("shell needs best_fit_sphere_radius or sag_profile"),
        }
    }

    /// Shell parameters in metres
    pub fn shell_parameters(&self) -> Result<ShellParameters> {
        let unit = self.length_unit()?;
        let shell = &self.shell;
        Ok(ShellParameters {
            best_fit_sphere_radius: unit.to_metres(self.sphere_radius()?),
            outer_rim_height: unit.to_metres(shell.outer_rim_height),
            bottom_surface_radius: unit.to_metres(shell.bottom_surface_radius),
            support_to_top_distance: unit.to_metres(shell.support_to_top_distance),
            sweep_angle_deg: shell.sweep_angle_deg,
            bottom_plane_offset: unit.to_metres(shell.bottom_plane_offset),
            reference_plane: self.reference_plane()?,
        })
    }

    /// Template dimensions in metres
    pub fn template_params(&self) -> Result<TemplateParams> {
        let unit = self.length_unit()?;
        let t = &self.template;
        Ok(TemplateParams::new(
            unit.to_metres(t.side_length),
            unit.to_metres(t.chamfer_length),
            unit.to_metres(t.pin_hole_diameter),
        ))
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        let options = PipelineOptions::default().with_parallel(self.parallel);
        match self.batch_hint {
            Some(hint) => options.with_batch_hint(hint),
            None => options,
        }
    }
}
