// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

pub mod background;
pub mod plate;
pub mod process;

use polars::prelude::*;

use czarr_core::{CzarrError, PipelineConfig};

/// Print a command-prefixed error and exit with status 1
pub(crate) fn exit_with_error(command: &str, message: &str) -> ! {
    eprintln!("[czarr::{}] ERROR: {}", command, message);
    std::process::exit(1);
}

/// Size the global rayon pool if a thread count was provided
pub(crate) fn configure_threads(threads: Option<usize>, command: &str) {
    if let Some(threads) = threads {
        if threads < 1 {
            exit_with_error(
                command,
                "Threads must be set to a positive integer if provided.",
            );
        }

        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .unwrap_or_else(|err| exit_with_error(command, &err.to_string()));
    }
}

/// Load the pipeline configuration file or fall back to defaults
pub(crate) fn load_config(path: Option<&String>, command: &str) -> PipelineConfig {
    match path {
        Some(path) => {
            PipelineConfig::open(path).unwrap_or_else(|err| exit_with_error(command, &err.to_string()))
        }
        None => PipelineConfig::default(),
    }
}

/// Prepend a constant string column to a per-object table
pub(crate) fn tag_table(
    table: &mut DataFrame,
    name: &str,
    value: &str,
) -> Result<(), CzarrError> {
    let column = Column::new(name.into(), vec![value.to_string(); table.height()]);

    table
        .insert_column(0, column)
        .map_err(|err| CzarrError::TableError(err.to_string()))?;

    Ok(())
}

/// Stack tables sharing a schema into one table
pub(crate) fn stack_tables(tables: Vec<DataFrame>) -> Result<Option<DataFrame>, CzarrError> {
    let mut tables = tables.into_iter();

    let Some(mut stacked) = tables.next() else {
        return Ok(None);
    };

    for table in tables {
        stacked
            .vstack_mut(&table)
            .map_err(|err| CzarrError::TableError(err.to_string()))?;
    }

    Ok(Some(stacked))
}
