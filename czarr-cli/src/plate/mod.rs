// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use kdam::TqdmParallelIterator;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use zarrs::filesystem::FilesystemStore;
use zarrs::storage::ReadableListableStorage;

use czarr_core::io::write_table;
use czarr_core::ut;
use czarr_core::{CzarrError, PipelineConfig};

use crate::{configure_threads, exit_with_error, load_config};

pub mod layout;
pub mod summary;

use layout::{FieldLayout, PlateLayout, WellLayout, read_plane};
use summary::{FieldResult, fields_table, heatmap_table, objects_table, wells_table};

const COMMAND: &str = "plate";

#[derive(Debug, Args)]
#[command(about = "Count and measure objects in every field of an OME-ZARR HCS plate.")]
pub struct PlateArgs {
    #[arg(short = 'i', long, help = "Input plate (.ome.zarr).", required = true)]
    pub input: Option<String>,

    #[arg(short = 'o', long, help = "Output directory.", required = true)]
    pub output: Option<String>,

    #[arg(long, help = "Index of the channel to analyze.", default_value_t = 0)]
    pub channel: u64,

    #[arg(short = 'c', long, help = "Pipeline configuration (.json).")]
    pub config: Option<String>,

    #[arg(short = 't', long, help = "Number of threads.")]
    pub threads: Option<usize>,

    #[arg(short = 'v', long, help = "Verbose output.")]
    pub verbose: bool,
}

/// Read one field plane and run the pipeline on it
fn process_field(
    store: &ReadableListableStorage,
    well: &WellLayout,
    field: &FieldLayout,
    channel: u64,
    config: &PipelineConfig,
) -> Result<FieldResult, CzarrError> {
    let plane = read_plane(store, field, channel)?;
    let objects = config.run(plane)?;

    Ok(FieldResult {
        well: well.path.to_owned(),
        row: well.row.to_owned(),
        column: well.column.to_owned(),
        field: field.name.to_owned(),
        objects: objects.count as u64,
        table: objects.table,
    })
}

pub fn plate(args: &PlateArgs) {
    configure_threads(args.threads, COMMAND);

    let config = load_config(args.config.as_ref(), COMMAND);

    let input = PathBuf::from(args.input.to_owned().unwrap_or_default());
    if !input.is_dir() {
        exit_with_error(
            COMMAND,
            &format!("Input plate does not exist: {}", input.display()),
        );
    }

    let store: ReadableListableStorage = Arc::new(
        FilesystemStore::new(&input)
            .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string())),
    );

    let layout =
        PlateLayout::open(&store).unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));

    let fields = layout.fields();

    if fields.is_empty() {
        exit_with_error(COMMAND, "No fields were listed in the plate metadata.");
    }

    let output = ut::path::create_directory(args.output.to_owned().unwrap_or_default())
        .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));

    ut::track::progress_log(
        &format!(
            "Detected {} wells and {} fields in {}.",
            ut::track::thousands_format(layout.wells.len()),
            ut::track::thousands_format(fields.len()),
            layout.name.as_deref().unwrap_or("plate")
        ),
        args.verbose,
    );

    let pb = ut::track::progress_bar(fields.len(), "Processing fields", args.verbose);

    let runs: Vec<(String, Result<FieldResult, CzarrError>)> = (0..fields.len())
        .into_par_iter()
        .tqdm_with_bar(pb)
        .map(|idx| {
            let (well, field) = fields[idx];
            (
                field.path.to_owned(),
                process_field(&store, well, field, args.channel, &config),
            )
        })
        .collect();

    if args.verbose {
        println!();
    }

    let mut results: Vec<FieldResult> = Vec::with_capacity(runs.len());
    let mut failure: Vec<String> = Vec::new();

    for (path, run) in runs {
        match run {
            Ok(result) => results.push(result),
            Err(err) => failure.push(format!("{}\t{}", path, err)),
        }
    }

    let write = |df: &mut polars::prelude::DataFrame, name: &str| {
        write_table(df, output.join(name))
            .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));
    };

    let tables = fields_table(&results).and_then(|fields| {
        Ok((
            fields,
            wells_table(&results)?,
            heatmap_table(&layout.rows, &layout.columns, &results)?,
            objects_table(&results)?,
        ))
    });

    let (mut fields_df, mut wells_df, mut heatmap_df, objects_df) =
        tables.unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));

    write(&mut fields_df, "fields.csv");
    write(&mut wells_df, "wells.csv");
    write(&mut heatmap_df, "heatmap.csv");

    if let Some(mut objects_df) = objects_df {
        write(&mut objects_df, "objects.csv");
    }

    if !failure.is_empty() {
        std::fs::write(output.join("field_errors.tsv"), failure.join("\n"))
            .unwrap_or_else(|err| exit_with_error(COMMAND, &err.to_string()));
    }

    let total: u64 = results.iter().map(|r| r.objects).sum();

    ut::track::progress_log(
        &format!(
            "Complete. {} objects detected across {} fields ({} failed).",
            ut::track::thousands_format(total),
            ut::track::thousands_format(results.len()),
            failure.len()
        ),
        args.verbose,
    );
}
