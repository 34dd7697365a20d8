// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! focalplate - place module holders from a focal-plane survey
//!
//! Reads a front and a back survey file, places the chamfered, full and
//! pin-hole templates on every module and writes the resulting modeling
//! intents as JSON.
//!
//! # Usage
//!
//! ```bash
//! focalplate --front front.txt --back back.txt --config plate.json
//!
//! # Survey in micrometres, single-threaded, intents to a file
//! focalplate --front f.txt --back b.txt --config plate.json --unit um \
//!     --sequential --output intents.json
//! ```

mod config;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use focalplate_geometry::{generate, PreviewBackend, ShellContext};
use focalplate_model::{
    apply_stream, BatchReport, LengthUnit, ModelingIntent, ModuleIndex, PointCloud, SurveyParser,
};
use focalplate_parser::{parse_unit_name, SurveyReader};
use serde::Serialize;

use crate::config::ConfigFile;

#[derive(Debug, Default)]
struct Args {
    front: Option<PathBuf>,
    back: Option<PathBuf>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    unit: Option<String>,
    sequential: bool,
    dump: bool,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args::default();

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1).cloned();
        match args[i].as_str() {
            "--front" | "-f" => {
                result.front = value.map(PathBuf::from);
                i += 1;
            }
            "--back" | "-b" => {
                result.back = value.map(PathBuf::from);
                i += 1;
            }
            "--config" | "-c" => {
                result.config = value.map(PathBuf::from);
                i += 1;
            }
            "--output" | "-o" => {
                result.output = value.map(PathBuf::from);
                i += 1;
            }
            "--unit" | "-u" => {
                result.unit = value;
                i += 1;
            }
            "--sequential" => result.sequential = true,
            "--dump" => result.dump = true,
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    result
}

fn print_help() {
    println!("focalplate - module holder placement for focal-plane shells");
    println!();
    println!("USAGE:");
    println!("    focalplate --front <FILE> --back <FILE> --config <FILE> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -f, --front <FILE>      Front survey points, one `x y z flag` per line");
    println!("    -b, --back <FILE>       Back survey points, same order as the front file");
    println!("    -c, --config <FILE>     JSON run configuration (shell and template)");
    println!("    -o, --output <FILE>     Write intents here instead of stdout");
    println!("    -u, --unit <NAME>       Survey length unit (default: the config unit)");
    println!("        --sequential        Plan modules on one thread");
    println!("        --dump              Print both point clouds after ingestion");
    println!("    -h, --help              Print help information");
    println!();
    println!("LOGGING:");
    println!("    Set RUST_LOG=debug for per-module detail.");
}

/// Document written to the output
#[derive(Serialize)]
struct IntentDocument<'a> {
    reference: ModuleIndex,
    intents: &'a [ModelingIntent],
    report: &'a BatchReport,
}

fn required<'a>(path: &'a Option<PathBuf>, flag: &str) -> Result<&'a Path> {
    path.as_deref()
        .with_context(|| format!("missing required argument {}", flag))
}

fn read_cloud(path: &Path, unit: LengthUnit, name: &'static str) -> Result<PointCloud> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read {} survey {}", name, path.display()))?;
    let progress = Box::new(move |phase: &str, percent: f32| {
        log::debug!("{} survey: {} {:.0}%", name, phase, percent);
    });
    let cloud = SurveyReader::new()
        .parse_with_progress(&text, unit, progress)
        .with_context(|| format!("in {} survey {}", name, path.display()))?;
    log::info!("Read {} {} points from {}", cloud.len(), name, path.display());
    Ok(cloud)
}

fn run(args: &Args) -> Result<()> {
    let config = ConfigFile::load(required(&args.config, "--config")?)?;
    let survey_unit = match &args.unit {
        Some(name) => parse_unit_name(name)?,
        None => config.length_unit()?,
    };

    let shell = ShellContext::new(config.shell_parameters()?)?;
    let params = config.template_params()?;

    let mut front = read_cloud(required(&args.front, "--front")?, survey_unit, "front")?;
    let mut back = read_cloud(required(&args.back, "--back")?, survey_unit, "back")?;
    if config.recenter_z {
        let dz = shell.best_fit_sphere_radius();
        front = front.with_z_offset(dz)?;
        back = back.with_z_offset(dz)?;
        log::info!("Recentred z by {:.6} m", dz);
    }
    if args.dump {
        eprintln!("Front cloud:\n{}", front.dump());
        eprintln!("Back cloud:\n{}", back.dump());
    }

    let mut options = config.pipeline_options();
    if args.sequential {
        options = options.with_parallel(false);
    }

    let output = generate(&front, &back, &shell, params, options)?;

    let mut preview = PreviewBackend::new(shell.reference_plane());
    apply_stream(&mut preview, &output.stream).context("preview replay rejected the stream")?;
    log::info!("Preview: {}", preview.summary());
    for index in output.report.skipped_modules() {
        log::warn!("{} produced no intents", index);
    }

    let document = IntentDocument {
        reference: output.reference,
        intents: output.stream.intents(),
        report: &output.report,
    };
    let json = serde_json::to_string_pretty(&document).context("cannot serialise intents")?;

    match &args.output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("cannot write {}", path.display()))?;
            log::info!("Wrote {} intents to {}", output.stream.len(), path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", json).context("cannot write to stdout")?;
        }
    }

    Ok(())
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = parse_args();
    if let Err(e) = run(&args) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
