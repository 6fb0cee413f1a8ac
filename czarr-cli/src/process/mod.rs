// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::{Path, PathBuf};

use clap::Args;
use kdam::TqdmParallelIterator;
use polars::prelude::*;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use czarr_core::constant;
use czarr_core::im::PixelArray;
use czarr_core::io::write_table;
use czarr_core::processor::LabeledObjects;
use czarr_core::ut;
use czarr_core::{CzarrError, PipelineConfig};

use crate::{configure_threads, exit_with_error, load_config, stack_tables, tag_table};

const COMMAND: &str = "process";

const LABELS_SUFFIX: &str = "_labels";
const OVERLAY_SUFFIX: &str = "_overlay";

/// Whether a file is a label array or overlay written by `--save-labels`
fn is_saved_label(path: &Path) -> bool {
    let stem = ut::path::file_stem(path);
    stem.ends_with(LABELS_SUFFIX) || stem.ends_with(OVERLAY_SUFFIX)
}

#[derive(Debug, Args)]
#[command(about = "Threshold, label and measure objects in 2-D images.")]
pub struct ProcessArgs {
    #[arg(
        short = 'i',
        long,
        help = "Input image or directory of images.",
        required = true
    )]
    pub input: Option<String>,

    #[arg(short = 'o', long, help = "Output directory.")]
    pub output: Option<String>,

    #[arg(short = 'c', long, help = "Pipeline configuration (.json).")]
    pub config: Option<String>,

    #[arg(long, help = "Save label arrays (.npy) and overlays (.png).")]
    pub save_labels: bool,

    #[arg(long, help = "Substring specifying images (e.g. _image).")]
    pub image_substring: Option<String>,

    #[arg(short = 't', long, help = "Number of threads.")]
    pub threads: Option<usize>,

    #[arg(short = 'v', long, help = "Verbose output.")]
    pub verbose: bool,
}

pub fn process(args: &ProcessArgs) {
    configure_threads(args.threads, COMMAND);

    let config = load_config(args.config.as_ref(), COMMAND);
    let input = PathBuf::from(args.input.to_owned().unwrap_or_default());

    if input.is_file() {
        process_single(&input, &config, args);
    } else if input.is_dir() {
        process_directory(&input, &config, args);
    } else {
        exit_with_error(
            COMMAND,
            &format!("Input path does not exist: {}", input.display()),
        );
    }
}

/// Open an image, drop a unit channel axis and run the pipeline
fn run_pipeline(path: &Path, config: &PipelineConfig) -> Result<LabeledObjects, CzarrError> {
    let array = PixelArray::open(path)?.squeeze();
    config.run(array)
}

/// Write the label array and, if present, the RGB overlay of one image
fn save_labels(objects: &LabeledObjects, output: &Path, stem: &str) -> Result<(), CzarrError> {
    objects
        .labels
        .save(output.join(format!("{}{}.npy", stem, LABELS_SUFFIX)))?;

    if objects.image.ndim() == 3 {
        objects
            .image
            .save(output.join(format!("{}{}.png", stem, OVERLAY_SUFFIX)))?;
    }

    Ok(())
}

fn process_single(input: &Path, config: &PipelineConfig, args: &ProcessArgs) {
    let stem = ut::path::file_stem(input);

    let objects =
        run_pipeline(input, config).unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));

    println!("{}\t{}", stem, objects.count);

    if let Some(table) = &objects.table {
        println!("{}", table);
    }

    if let Some(output) = &args.output {
        let output = ut::path::create_directory(output)
            .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));

        if let Some(mut table) = objects.table.clone() {
            write_table(&mut table, output.join(format!("{}_objects.csv", stem)))
                .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));
        }

        if args.save_labels {
            save_labels(&objects, &output, &stem)
                .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));
        }
    } else if args.save_labels {
        exit_with_error(COMMAND, "An output directory is required to save labels.");
    }
}

fn process_directory(input: &Path, config: &PipelineConfig, args: &ProcessArgs) {
    let Some(output) = &args.output else {
        exit_with_error(
            COMMAND,
            "An output directory (-o) is required when processing a directory.",
        );
    };

    let mut image_files = ut::path::collect_file_paths(
        input,
        constant::SUPPORTED_IMAGE_FORMATS.as_slice(),
        args.image_substring.to_owned(),
    )
    .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));

    // Outputs of an earlier run into the same directory are not inputs
    image_files.retain(|path| !is_saved_label(path));

    if image_files.is_empty() {
        exit_with_error(
            COMMAND,
            "No image files were detected. Please check your path and/or substring identifier.",
        );
    }

    let output = ut::path::create_directory(output)
        .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));

    ut::track::progress_log(
        &format!(
            "Detected {} images.",
            ut::track::thousands_format(image_files.len())
        ),
        args.verbose,
    );

    let pb = ut::track::progress_bar(image_files.len(), "Processing", args.verbose);

    let results: Vec<(String, Result<(usize, Option<DataFrame>), CzarrError>)> = (0..image_files
        .len())
        .into_par_iter()
        .tqdm_with_bar(pb)
        .map(|idx| {
            let stem = ut::path::file_stem(&image_files[idx]);

            let result = run_pipeline(&image_files[idx], config).and_then(|objects| {
                if args.save_labels {
                    save_labels(&objects, &output, &stem)?;
                }

                Ok((objects.count, objects.table))
            });

            (stem, result)
        })
        .collect();

    if args.verbose {
        println!();
    }

    let mut names: Vec<String> = Vec::with_capacity(results.len());
    let mut counts: Vec<u64> = Vec::with_capacity(results.len());
    let mut tables: Vec<DataFrame> = Vec::new();
    let mut failure: Vec<String> = Vec::new();

    let mut sorted = results;
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    for (stem, result) in sorted {
        match result {
            Ok((count, table)) => {
                if let Some(mut table) = table {
                    tag_table(&mut table, "image", &stem)
                        .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));
                    tables.push(table);
                }

                names.push(stem);
                counts.push(count as u64);
            }
            Err(err) => failure.push(format!("{}\t{}", stem, err)),
        }
    }

    let total: u64 = counts.iter().sum();
    let processed = names.len();

    if !names.is_empty() {
        let mut df = DataFrame::new(vec![
            Column::new("image".into(), names),
            Column::new("objects".into(), counts),
        ])
        .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));

        write_table(&mut df, output.join("counts.csv"))
            .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));
    }

    match stack_tables(tables) {
        Ok(Some(mut objects)) => write_table(&mut objects, output.join("objects.csv"))
            .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string())),
        Ok(None) => {}
        Err(err) => exit_with_error(COMMAND, &err.to_string()),
    }

    if !failure.is_empty() {
        std::fs::write(output.join("object_errors.tsv"), failure.join("\n"))
            .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));
    }

    ut::track::progress_log(
        &format!(
            "Complete. {} objects detected across {} images ({} failed).",
            ut::track::thousands_format(total),
            ut::track::thousands_format(processed),
            failure.len()
        ),
        args.verbose,
    );
}
