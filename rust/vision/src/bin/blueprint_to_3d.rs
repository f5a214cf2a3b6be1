// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI tool: Convert a blueprint image into a 3D wall model (OBJ output)
//!
//! Walls are traced from the drawing, doors and windows are found with the
//! given template images and cut out of the extruded walls.
//!
//! Usage:
//!   blueprint-to-3d <image_path> --door-template <png> --window-template <png> [options]

use blueprint3d_geometry::CsgrsEngine;
use blueprint3d_vision::{
    convert, output_stem, write_model, ConversionConfig, ConversionError, ConversionRequest,
    ImageSource, StatusClass, SubtractionOutcome,
};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit code for a blueprint that cannot be converted
const EXIT_BAD_INPUT: u8 = 2;
/// Exit code for internal failures and usage errors
const EXIT_INTERNAL: u8 = 1;

struct Options {
    image: PathBuf,
    door_template: PathBuf,
    window_template: PathBuf,
    output_dir: PathBuf,
    config: ConversionConfig,
    debug: bool,
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return ExitCode::SUCCESS;
    }

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            print_usage();
            return ExitCode::from(EXIT_INTERNAL);
        }
    };

    let default_filter = if options.debug {
        "info,blueprint3d_vision=debug,blueprint3d_geometry=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error [{}]: {}", e.code(), e);
            match e.status_class() {
                StatusClass::BadInput => ExitCode::from(EXIT_BAD_INPUT),
                StatusClass::Internal => ExitCode::from(EXIT_INTERNAL),
            }
        }
    }
}

fn run(options: Options) -> Result<(), ConversionError> {
    println!("=== Blueprint to 3D Model ===");
    println!();
    println!("[1/3] Converting: {}", options.image.display());
    println!(
        "  Wall height: {:.2}m, wall thickness: {}px",
        options.config.wall_height_m, options.config.wall_thickness_px
    );

    let image = ImageSource::Path(options.image);
    let stem = output_stem(&image);
    let request = ConversionRequest {
        image,
        door_template: ImageSource::Path(options.door_template),
        window_template: ImageSource::Path(options.window_template),
        config: options.config,
    };

    let output = convert(&request, &CsgrsEngine::new())?;
    let model = &output.model;

    println!("[2/3] Detection results:");
    if output.walls.fallback {
        println!("  Walls: none traced, using fallback outline");
    } else {
        println!("  Walls: {} polygons", output.walls.polygon_count);
    }
    println!("  Doors: {}", output.door_count);
    println!("  Windows: {}", output.window_count);
    if let Some(mask) = &output.diagnostic_mask {
        println!("  Cleaned mask: {}", mask.display());
    }

    let scale = &model.calibration;
    if scale.is_fallback {
        println!("  Scale: 1 px/m (wall thickness unusable)");
    } else {
        println!("  Scale: {:.2} px/m", scale.scale_factor);
    }
    match &model.subtraction {
        SubtractionOutcome::Applied => println!("  Openings cut: {}", model.openings_extruded),
        SubtractionOutcome::NoOpenings => println!("  Openings cut: none"),
        SubtractionOutcome::FellBack(reason) => {
            println!("  Openings NOT cut ({}), walls exported whole", reason)
        }
    }

    println!("[3/3] Writing OBJ to {}", options.output_dir.display());
    let path = write_model(model, &options.output_dir, &stem)?;

    println!();
    println!("=== Model Summary ===");
    let (min, max) = model.mesh.bounds();
    println!(
        "  Footprint: {:.2}m x {:.2}m, height {:.2}m",
        max.x - min.x,
        max.y - min.y,
        max.z - min.z
    );
    println!(
        "  Total: {} vertices, {} triangles",
        model.vertex_count, model.face_count
    );
    println!();
    println!("Done! Open {} in a 3D viewer.", path.display());
    Ok(())
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut config = ConversionConfig::default();
    let mut door_template = None;
    let mut window_template = None;
    let mut wall_height = None;
    let mut wall_thickness = None;
    let mut output_dir = PathBuf::from(".");
    let mut debug = false;

    let mut i = 2;
    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = || {
            i += 1;
            args.get(i)
                .cloned()
                .ok_or_else(|| format!("{} requires a value", flag))
        };
        match flag {
            "--door-template" => door_template = Some(PathBuf::from(value()?)),
            "--window-template" => window_template = Some(PathBuf::from(value()?)),
            "--wall-height" => {
                let raw = value()?;
                wall_height = Some(
                    raw.parse::<f64>()
                        .map_err(|_| format!("Invalid wall height value: {}", raw))?,
                );
            }
            "--wall-thickness" => {
                let raw = value()?;
                wall_thickness = Some(
                    raw.parse::<i64>()
                        .map_err(|_| format!("Invalid wall thickness value: {}", raw))?,
                );
            }
            "--output-dir" => output_dir = PathBuf::from(value()?),
            "--config" => {
                let path = PathBuf::from(value()?);
                config = ConversionConfig::from_json_file(&path).map_err(|e| e.to_string())?;
            }
            "--debug" => debug = true,
            other => return Err(format!("Unknown option: {}", other)),
        }
        i += 1;
    }

    // File, then environment, then flags
    config.apply_env();
    if let Some(height) = wall_height {
        config.wall_height_m = height;
    }
    if let Some(thickness) = wall_thickness {
        config.wall_thickness_px = thickness;
    }
    if debug {
        config.save_diagnostics = true;
    }

    Ok(Options {
        image: PathBuf::from(&args[1]),
        door_template: door_template.ok_or("--door-template is required")?,
        window_template: window_template.ok_or("--window-template is required")?,
        output_dir,
        config,
        debug,
    })
}

fn print_usage() {
    eprintln!("Usage: blueprint-to-3d <image_path> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --door-template <path>    Door symbol template image (required)");
    eprintln!("  --window-template <path>  Window symbol template image (required)");
    eprintln!("  --wall-height <m>         Wall height in meters (default: 3.0)");
    eprintln!("  --wall-thickness <px>     Drawn wall thickness in pixels (default: 5)");
    eprintln!("  --output-dir <dir>        Directory for the OBJ file (default: .)");
    eprintln!("  --config <json>           Load settings from a JSON file");
    eprintln!("  --debug                   Verbose logging and save the cleaned mask");
    eprintln!();
    eprintln!("Environment overrides: BLUEPRINT3D_WALL_HEIGHT, BLUEPRINT3D_WALL_THICKNESS,");
    eprintln!("  BLUEPRINT3D_MATCH_THRESHOLD, BLUEPRINT3D_MIN_CONTOUR_AREA,");
    eprintln!("  BLUEPRINT3D_SAVE_DIAGNOSTICS");
    eprintln!();
    eprintln!("Exit codes: 0 success, 1 internal or usage error, 2 unusable blueprint");
}
