// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Convert a generated two-room plan and write the OBJ to the temp dir
//!
//! Run with: cargo run -p blueprint3d-vision --example synthetic_plan

use blueprint3d_geometry::CsgrsEngine;
use blueprint3d_vision::{
    convert, write_model, ConversionConfig, ConversionRequest, ImageSource, SubtractionOutcome,
};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use std::io::Cursor;

fn main() {
    println!("=== Synthetic Blueprint Conversion ===\n");

    let plan = two_room_plan();
    let door = image::imageops::crop_imm(&plan, 95, 55, 30, 20).to_image();
    let window = window_symbol();

    let mut config = ConversionConfig::default();
    config.openings.threshold = 0.9;
    config.openings.nms_iou = Some(0.3);

    let request = ConversionRequest::new(png(&plan), png(&door), png(&window)).with_config(config);
    let output = match convert(&request, &CsgrsEngine::new()) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Conversion failed [{}]: {}", e.code(), e);
            std::process::exit(1);
        }
    };

    println!("Plan: {}x{} px", plan.width(), plan.height());
    println!("  Wall polygons: {}", output.walls.polygon_count);
    println!("  Doors: {}, windows: {}", output.door_count, output.window_count);
    println!("  Scale: {:.1} px/m", output.model.calibration.scale_factor);
    match &output.model.subtraction {
        SubtractionOutcome::Applied => println!("  Openings cut"),
        SubtractionOutcome::NoOpenings => println!("  No openings found"),
        SubtractionOutcome::FellBack(reason) => println!("  Openings skipped: {}", reason),
    }
    println!(
        "  Mesh: {} vertices, {} triangles, {:.3} m^3",
        output.model.vertex_count,
        output.model.face_count,
        output.model.mesh.volume()
    );

    match write_model(&output.model, &std::env::temp_dir(), "synthetic_plan") {
        Ok(path) => println!("\nWrote {}", path.display()),
        Err(e) => eprintln!("\nCould not write model: {}", e),
    }
}

/// Two rooms side by side with 5 px walls and a doorway in the shared wall
fn two_room_plan() -> GrayImage {
    GrayImage::from_fn(240, 160, |x, y| {
        let outer = (20..220).contains(&x) && (20..140).contains(&y);
        let left_room = (25..115).contains(&x) && (25..135).contains(&y);
        let right_room = (120..215).contains(&x) && (25..135).contains(&y);
        let doorway = (115..120).contains(&x) && (60..70).contains(&y);
        if outer && !left_room && !right_room && !doorway {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Three parallel strokes, the usual plan symbol for glazing
fn window_symbol() -> GrayImage {
    GrayImage::from_fn(24, 9, |_, y| if y % 4 == 0 { Luma([0]) } else { Luma([255]) })
}

fn png(image: &GrayImage) -> ImageSource {
    let mut bytes = Vec::new();
    if let Err(e) = DynamicImage::ImageLuma8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
    {
        eprintln!("Could not encode image: {}", e);
        std::process::exit(1);
    }
    ImageSource::Bytes(bytes)
}
