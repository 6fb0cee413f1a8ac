// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::PathBuf;

use clap::Args;

use czarr_core::constant;
use czarr_core::im::PixelArray;
use czarr_core::subtract_background;
use czarr_core::ut;

use crate::exit_with_error;

const COMMAND: &str = "background";

#[derive(Debug, Args)]
#[command(about = "Subtract a smooth background with a morphological top-hat filter.")]
pub struct BackgroundArgs {
    #[arg(short = 'i', long, help = "Input image or numpy array.", required = true)]
    pub input: Option<String>,

    #[arg(short = 'o', long, help = "Output image or numpy array.", required = true)]
    pub output: Option<String>,

    #[arg(
        long,
        help = "Structuring element, disk (2-D images) or ball (3-D arrays).",
        default_value = "disk"
    )]
    pub elem: String,

    #[arg(
        short = 'r',
        long,
        help = "Radius of the structuring element.",
        default_value_t = constant::DEFAULT_BACKGROUND_RADIUS
    )]
    pub radius: i64,

    #[arg(long, help = "Background is lighter than the objects.")]
    pub light_bg: bool,

    #[arg(short = 'v', long, help = "Verbose output.")]
    pub verbose: bool,
}

pub fn background(args: &BackgroundArgs) {
    let input = PathBuf::from(args.input.to_owned().unwrap_or_default());
    let output = PathBuf::from(args.output.to_owned().unwrap_or_default());

    if !input.is_file() {
        exit_with_error(
            COMMAND,
            &format!("Input file does not exist: {}", input.display()),
        );
    }

    let image = PixelArray::open(&input).unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));

    // (H, W, 1) and (1, H, W) images work with a disk
    let image = image.squeeze();

    ut::track::progress_log(
        &format!(
            "Subtracting {} background with a {} of radius {}.",
            if args.light_bg { "light" } else { "dark" },
            args.elem,
            args.radius
        ),
        args.verbose,
    );

    let subtracted = subtract_background(&image, &args.elem, args.radius, args.light_bg)
        .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));

    subtracted
        .save(&output)
        .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));

    ut::track::progress_log(
        &format!("Complete. Saved to {}.", output.display()),
        args.verbose,
    );
}
