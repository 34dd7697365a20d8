// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point-cloud construction from scanned record lines

use crate::scanner::LineScanner;
use crate::tokenizer::parse_record;
use focalplate_model::{
    InputError, LengthUnit, Point3D, PointCloud, ProgressCallback, Result, SurveyRecord,
};

/// Lines between progress callbacks
const PROGRESS_INTERVAL: usize = 4096;

/// Read every record of `content` into a cloud in metres
pub(crate) fn read_cloud(
    content: &str,
    unit: LengthUnit,
    has_header: bool,
    on_progress: Option<&ProgressCallback>,
) -> Result<PointCloud> {
    let total = content.len().max(1);
    let scale = unit.scale();
    let mut scanner = LineScanner::new(content);
    let mut records = Vec::with_capacity(content.len() / 32);

    if let Some(cb) = on_progress {
        cb("Scanning", 0.0);
    }

    if has_header {
        if let Some((line, text)) = scanner.next_line() {
            log::debug!("Skipping header on line {}: {}", line, text.trim());
        }
    }

    let mut seen = 0usize;
    while let Some((line, text)) = scanner.next_line() {
        let raw = parse_record(text).map_err(|msg| InputError::format(line, msg))?;
        records.push(SurveyRecord {
            position: Point3D::new(raw.x * scale, raw.y * scale, raw.z * scale),
            orientation_flag: raw.flag,
        });

        seen += 1;
        if seen % PROGRESS_INTERVAL == 0 {
            if let Some(cb) = on_progress {
                cb("Parsing", 100.0 * scanner.position() as f32 / total as f32);
            }
        }
    }

    let cloud = PointCloud::from_records(records, unit)?;

    if let Some(cb) = on_progress {
        cb("Complete", 100.0);
    }
    log::debug!("Read {} survey records ({})", cloud.len(), unit);
    Ok(cloud)
}
