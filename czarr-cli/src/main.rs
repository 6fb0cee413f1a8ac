// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use clap::{Parser, Subcommand};
use czarr_cli::{background, plate, process};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Background(background::BackgroundArgs),
    Plate(plate::PlateArgs),
    Process(process::ProcessArgs),
}

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Background(background_args)) => background::background(background_args),
        Some(Commands::Plate(plate_args)) => plate::plate(plate_args),
        Some(Commands::Process(process_args)) => process::process(process_args),
        None => {}
    }
}
