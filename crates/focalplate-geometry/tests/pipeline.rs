// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use focalplate_geometry::{
    generate_from_text, PipelineOptions, PreviewBackend, ReferencePlane, ShellContext,
    ShellParameters, TemplateParams,
};
use focalplate_model::{
    apply_stream, LengthUnit, ModelingBackend, ModelingIntent, ModuleFailure, ModuleIndex,
};
use nalgebra::{Point3, Vector3};

const RADIUS_MM: f64 = 11045.6;

fn shell() -> ShellContext {
    ShellContext::new(ShellParameters {
        best_fit_sphere_radius: RADIUS_MM / 1000.0,
        outer_rim_height: 0.1,
        bottom_surface_radius: 0.5,
        support_to_top_distance: 0.01,
        sweep_angle_deg: 360.0,
        bottom_plane_offset: -0.05,
        reference_plane: ReferencePlane::Xy,
    })
    .unwrap()
}

fn params() -> TemplateParams {
    TemplateParams::new(0.0745, 0.0105, 0.003)
}

/// Survey files in millimetres, sphere vertex at z = -R as measured
///
/// Modules sit on alternating rows of a triangular grid; every other one is
/// mounted upside down.
fn survey(rings: i32) -> (String, String) {
    let center = Point3::new(0.0, 0.0, 0.0);
    let mut front = String::from("# front survey\n");
    let mut back = String::from("# back survey\n");
    for row in -rings..=rings {
        for col in -rings..=rings {
            let x = 37.25 * col as f64 + 3.0;
            let y = 64.5 * row as f64 + 2.0;
            let z = -(RADIUS_MM * RADIUS_MM - x * x - y * y).sqrt();
            let f = Point3::new(x, y, z);
            let dir: Vector3<f64> = (f - center).normalize();
            let b = f + dir * 50.0;
            let flag = (row + col).rem_euclid(2) == 0;
            front.push_str(&format!("{:.6} {:.6} {:.6} {}\n", f.x, f.y, f.z, flag as u8));
            back.push_str(&format!("{:.6},{:.6},{:.6},1\n", b.x, b.y, b.z));
        }
    }
    (front, back)
}

fn run(front: &str, back: &str, options: PipelineOptions) -> focalplate_geometry::PipelineOutput {
    generate_from_text(
        front,
        back,
        LengthUnit::Millimetre,
        true,
        &shell(),
        params(),
        options,
    )
    .unwrap()
}

#[test]
fn places_every_module_of_a_grid() {
    let (front, back) = survey(2);
    let output = run(&front, &back, PipelineOptions::default());

    assert_eq!(output.placed(), 25);
    assert!(output.report.failures.is_empty());
    assert_eq!(output.reference, ModuleIndex(12));
    assert_eq!(output.plans[0].frame.index, ModuleIndex(12));
    assert_eq!(output.stream.count_op("create_polygon"), 75);
    assert_eq!(output.stream.count_op("make_horizontal"), 3);
    assert_eq!(output.stream.count_op("make_parallel"), 72);
}

#[test]
fn serial_and_parallel_streams_are_identical() {
    let (front, back) = survey(3);
    let parallel = run(&front, &back, PipelineOptions::default());
    let serial = run(&front, &back, PipelineOptions::sequential());
    assert_eq!(parallel.stream, serial.stream);
    assert_eq!(parallel.report, serial.report);
}

#[test]
fn preview_replay_reproduces_placed_vertices() {
    let (front, back) = survey(2);
    let output = run(&front, &back, PipelineOptions::interactive_host());

    let mut backend = PreviewBackend::new(ReferencePlane::Xy);
    let applied = apply_stream(&mut backend, &output.stream).unwrap();
    assert_eq!(applied, output.stream.len());
    assert_eq!(backend.batches(), 1);

    let sketches: Vec<_> = output
        .stream
        .iter()
        .filter_map(|intent| match intent {
            ModelingIntent::CreatePolygon { sketch, .. } => Some(*sketch),
            _ => None,
        })
        .collect();
    let planned = output
        .plans
        .iter()
        .flat_map(|plan| plan.variants.iter().map(|v| v.pattern.corners()));

    for (sketch, corners) in sketches.iter().zip(planned) {
        let realised = backend.polygon_vertices(*sketch).unwrap();
        for (got, want) in realised.iter().zip(corners) {
            assert!((got - want).norm() < 1e-9);
        }
    }
}

#[test]
fn flipped_modules_are_turned_half_way() {
    let (front, back) = survey(1);
    let output = run(&front, &back, PipelineOptions::sequential());
    for plan in output.plans.iter().skip(1) {
        for placed in &plan.variants {
            assert_eq!(placed.flipped, !plan.frame.orientation_flag);
        }
    }
}

#[test]
fn degenerate_module_is_skipped_and_reported() {
    let (front, mut back) = survey(1);
    // Replace the back point of module 2 with its front point
    let front_lines: Vec<&str> = front.lines().skip(1).collect();
    let mut back_lines: Vec<String> = back.lines().skip(1).map(String::from).collect();
    let fields: Vec<&str> = front_lines[2].split(' ').collect();
    back_lines[2] = format!("{},{},{},1", fields[0], fields[1], fields[2]);
    back = back_lines.join("\n");

    let output = run(&front, &back, PipelineOptions::default());
    assert_eq!(output.placed(), 8);
    assert_eq!(
        output.report.failures,
        vec![ModuleFailure::DegenerateAxis {
            index: ModuleIndex(2)
        }]
    );
    assert!(output.plans.iter().all(|p| p.frame.index != ModuleIndex(2)));
}

/// Five modules in metres, already recentred
///
/// Module 2 has an axis almost along the reference edge direction, so no
/// copy can be aligned. Module 3 is tilted so far that it passes under the
/// support surface.
fn survey_with_failures() -> (String, String) {
    let front = "\
0.07 0.0 0.0456 1
0.0 0.01 0.0456 1
0.0 0.1 0.0456 1
0.0 0.3 -0.02 1
-0.07 0.02 0.0456 0
";
    let back = "\
0.07 0.0 -0.0044 1
0.0 0.01 -0.0044 1
1.0 0.1 0.04559999 1
0.0 0.35 -0.0205 1
-0.07 0.02 -0.0044 1
";
    (front.to_string(), back.to_string())
}

fn plane_names(stream: &focalplate_model::IntentStream) -> Vec<String> {
    stream
        .iter()
        .filter_map(|intent| match intent {
            ModelingIntent::CreatePlaneFromPointAndNormal { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn failed_modules_emit_nothing_and_the_batch_continues() {
    let (front, back) = survey_with_failures();
    for options in [PipelineOptions::default(), PipelineOptions::sequential()] {
        let output = generate_from_text(
            &front,
            &back,
            LengthUnit::Metre,
            false,
            &shell(),
            params(),
            options,
        )
        .unwrap();

        assert_eq!(output.reference, ModuleIndex(1));
        assert_eq!(output.placed(), 3);
        assert_eq!(output.report.failures.len(), 2);
        assert!(matches!(
            output.report.failures[0],
            ModuleFailure::Alignment { index: ModuleIndex(2), .. }
        ));
        assert_eq!(
            output.report.failures[1],
            ModuleFailure::SupportSurfaceMissed {
                index: ModuleIndex(3)
            }
        );
        assert_eq!(
            output.report.skipped_modules(),
            vec![ModuleIndex(2), ModuleIndex(3)]
        );

        assert_eq!(
            plane_names(&output.stream),
            vec!["Module 1 plane", "Module 0 plane", "Module 4 plane"]
        );
        assert_eq!(output.stream.count_op("create_polygon"), 9);

        // No point of a failed module reaches the stream
        let failed_fronts = [[0.0, 0.1, 0.0456], [0.0, 0.3, -0.02]];
        for intent in output.stream.iter() {
            if let ModelingIntent::CreatePoint { position, .. } = intent {
                assert!(!failed_fronts.contains(position));
            }
        }

        let mut backend = PreviewBackend::new(ReferencePlane::Xy);
        assert_eq!(
            apply_stream(&mut backend, &output.stream).unwrap(),
            output.stream.len()
        );
    }
}

#[test]
fn copies_start_on_the_plane_they_are_sketched_on() {
    let (front, back) = survey(2);
    let output = run(&front, &back, PipelineOptions::default());

    let mut backend = PreviewBackend::new(ReferencePlane::Xy);
    let mut planes = std::collections::HashMap::new();
    for (position, intent) in output.stream.iter().enumerate() {
        match intent {
            ModelingIntent::CreatePlaneFromPointAndNormal { handle, point, .. } => {
                backend.apply(position, intent).unwrap();
                planes.insert(*handle, backend.point(*point).unwrap());
            }
            ModelingIntent::CreatePolygon { sketch, plane, center, vertex, .. } => {
                backend.apply(position, intent).unwrap();
                let origin = planes[plane];
                let normal = backend.sketch_normal(*sketch).unwrap();
                for p in [center, vertex] {
                    let offset = Point3::from(*p) - origin;
                    assert!(normal.dot(&offset).abs() < 1e-9);
                }
            }
            _ => backend.apply(position, intent).unwrap(),
        }
    }
}
