use std::{fmt::Display, path::PathBuf};

use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::{
    geometry::validate::ValidationError,
    models::store::Store,
    services::plots::{
        CreatePlotError, CreatePlotParameters, DeletePlotError, DeletePlotParameters,
        LookupError, PlotCenterError, UpdatePlotError, UpdatePlotParameters, create_plot,
        delete_plot, find_plot, list_names, plot_center, update_plot,
    },
    storage::{Storage, json::JsonFileStorage},
};

mod geometry;
mod models;
mod services;
mod storage;
mod ui;

#[derive(Parser)]
#[command(
    name = "plots",
    about = "Keep track of land plots and their surface area from your terminal"
)]
struct Cli {
    /// Path of the JSON store (defaults to the local data directory)
    #[arg(long, global = true, env = "PLOTS_STORE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new plot
    New {
        /// Plot name
        name: String,

        /// Polygon as JSON, e.g. '[[48.85, 2.35], [48.86, 2.35], [48.86, 2.36]]'
        #[arg(long, required_unless_present = "coords_file", conflicts_with = "coords_file")]
        coords: Option<String>,

        /// Read the polygon JSON from a file
        #[arg(long)]
        coords_file: Option<PathBuf>,

        /// Farm the plot belongs to
        #[arg(short, long)]
        farm: Option<String>,

        /// Crop grown on the plot
        #[arg(long)]
        crop: Option<String>,

        /// A plot manager is assigned
        #[arg(long)]
        manager: bool,
    },

    /// List all plots (newest first)
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List plot numbers and names
    Names {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a plot
    Show {
        /// Plot number, slug or part of the name
        plot: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update a plot (surface area is recomputed)
    Update {
        /// Plot number, slug or part of the name
        plot: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New polygon as JSON
        #[arg(long, conflicts_with = "coords_file")]
        coords: Option<String>,

        /// Read the new polygon JSON from a file
        #[arg(long)]
        coords_file: Option<PathBuf>,

        /// New farm name (empty string clears it)
        #[arg(short, long)]
        farm: Option<String>,

        /// New crop (empty string clears it)
        #[arg(long)]
        crop: Option<String>,

        /// Whether a plot manager is assigned
        #[arg(long)]
        manager: Option<bool>,
    },

    /// Delete a plot
    Delete {
        /// Plot number, slug or part of the name
        plot: String,
    },

    /// Show the center point of a plot
    Center {
        /// Plot number, slug or part of the name
        plot: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Error)]
enum CoordinatesInputError {
    #[error("Failed to read coordinates from '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Coordinates are not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),
}

/// Parses the polygon given inline or through a file, if any
fn read_coordinates(
    coords: Option<String>,
    coords_file: Option<PathBuf>,
) -> Result<Option<Value>, CoordinatesInputError> {
    let text = match (coords, coords_file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .map_err(|e| CoordinatesInputError::ReadFailed { path, source: e })?,
        (None, None) => return Ok(None),
    };

    Ok(Some(serde_json::from_str(&text)?))
}

/// Flag or environment value first, then the local data directory
fn resolve_store_path(store: Option<PathBuf>) -> PathBuf {
    store.unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plots")
            .join("store.json")
    })
}

fn exit_with_error(message: impl Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => exit_with_error(format!("Failed to serialize output: {}", e)),
    }
}

fn report_validation_error(error: &ValidationError) -> ! {
    eprintln!("Error: {}", error);
    if error.index().is_some() {
        eprintln!("\nCoordinates are [lat, lng] pairs, e.g. [[48.85, 2.35], [48.86, 2.35], [48.86, 2.36]]");
    }
    std::process::exit(1);
}

fn report_lookup_error(error: &LookupError, store: &Store) -> ! {
    match error {
        LookupError::PlotNotFound(identifier) => {
            eprintln!("Error: Plot '{}' not found", identifier);

            let names = list_names(store);
            if names.is_empty() {
                eprintln!("\nNo plots exist yet. Create one with `plots new`.");
            } else {
                eprintln!("\nAvailable plots:");
                for entry in names {
                    eprintln!("  - #{} {}", entry.id, entry.name);
                }
            }
        }
        LookupError::AmbiguousPlotName(names) => {
            eprintln!("Error: Plot name is ambiguous. Multiple plots found:");
            for name in names {
                eprintln!("  - {}", name);
            }
            eprintln!("\nPlease be more specific or use the plot number.");
        }
    }
    std::process::exit(1);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("plots=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();

    let storage_path = resolve_store_path(cli.store);

    // Create parent directory if it doesn't exist
    if let Some(parent) = storage_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).unwrap_or_else(|e| {
            exit_with_error(format!("Failed to create data directory: {}", e));
        });
    }

    let storage = JsonFileStorage::new(storage_path);

    let mut store = match storage.load() {
        Ok(store) => store,
        Err(e) => exit_with_error(format!("Failed to load store: {}", e)),
    };

    match cli.command {
        Some(Commands::New {
            name,
            coords,
            coords_file,
            farm,
            crop,
            manager,
        }) => {
            let coordinates = match read_coordinates(coords, coords_file) {
                Ok(Some(coordinates)) => coordinates,
                Ok(None) => exit_with_error("Provide the polygon with --coords or --coords-file"),
                Err(e) => exit_with_error(e),
            };

            match create_plot(
                &mut store,
                &storage,
                CreatePlotParameters {
                    name,
                    farm_name: farm,
                    crop_type: crop,
                    has_manager: manager,
                    coordinates,
                },
            ) {
                Ok(plot) => {
                    println!(
                        "{} Created plot {} {} ({})",
                        "✓".green(),
                        format!("#{}", plot.plot_number).dimmed(),
                        plot.name.bold(),
                        ui::format_area(plot.surface_area).cyan()
                    );
                }
                Err(CreatePlotError::EmptyName) => exit_with_error("Plot name cannot be empty"),
                Err(CreatePlotError::InvalidCoordinates(e)) => report_validation_error(&e),
                Err(CreatePlotError::Storage(e)) => {
                    exit_with_error(format!("Failed to save plot: {}", e))
                }
            }
        }
        Some(Commands::List { json }) => {
            let plots = store.plots_newest_first();

            if json {
                print_json(&plots);
            } else if plots.is_empty() {
                println!("No plots found");
            } else {
                let total_area: f64 = plots.iter().filter_map(|p| p.surface_area).sum();
                ui::render_view_header("Plots", plots.len());
                for plot in &plots {
                    ui::render_plot_line(plot);
                }
                println!(
                    "\n  {} {}\n",
                    "Total:".dimmed(),
                    ui::format_area(Some(total_area)).cyan()
                );
            }
        }
        Some(Commands::Names { json }) => {
            let names = list_names(&store);

            if json {
                print_json(&names);
            } else if names.is_empty() {
                println!("No plots found");
            } else {
                ui::render_names(&names);
            }
        }
        Some(Commands::Show { plot, json }) => match find_plot(&store, &plot) {
            Ok(plot) if json => print_json(plot),
            Ok(plot) => ui::render_plot_details(plot),
            Err(e) => report_lookup_error(&e, &store),
        },
        Some(Commands::Update {
            plot,
            name,
            coords,
            coords_file,
            farm,
            crop,
            manager,
        }) => {
            let coordinates = match read_coordinates(coords, coords_file) {
                Ok(coordinates) => coordinates,
                Err(e) => exit_with_error(e),
            };

            match update_plot(
                &mut store,
                &storage,
                UpdatePlotParameters {
                    identifier: plot,
                    name,
                    farm_name: farm,
                    crop_type: crop,
                    has_manager: manager,
                    coordinates,
                },
            ) {
                Ok(plot) => {
                    println!(
                        "{} Updated plot {} {} ({})",
                        "✓".green(),
                        format!("#{}", plot.plot_number).dimmed(),
                        plot.name.bold(),
                        ui::format_area(plot.surface_area).cyan()
                    );
                }
                Err(UpdatePlotError::Lookup(e)) => report_lookup_error(&e, &store),
                Err(UpdatePlotError::EmptyName) => exit_with_error("Plot name cannot be empty"),
                Err(UpdatePlotError::InvalidCoordinates(e)) => report_validation_error(&e),
                Err(UpdatePlotError::Storage(e)) => {
                    exit_with_error(format!("Failed to save plot: {}", e))
                }
            }
        }
        Some(Commands::Delete { plot }) => {
            match delete_plot(
                &mut store,
                &storage,
                DeletePlotParameters { identifier: plot },
            ) {
                Ok(plot) => {
                    println!("{} Plot '{}' deleted successfully.", "✓".green(), plot.name);
                }
                Err(DeletePlotError::Lookup(e)) => report_lookup_error(&e, &store),
                Err(DeletePlotError::Storage(e)) => {
                    exit_with_error(format!("Failed to delete plot: {}", e))
                }
            }
        }
        Some(Commands::Center { plot, json }) => match plot_center(&store, &plot) {
            Ok(center) if json => print_json(&center),
            Ok(center) => ui::render_center(&center),
            Err(PlotCenterError::Lookup(e)) => report_lookup_error(&e, &store),
            Err(PlotCenterError::NoCoordinates(e)) => exit_with_error(e),
        },
        None => {
            // Default: list plots (same as `plots list`)
            let plots = store.plots_newest_first();

            if plots.is_empty() {
                println!("No plots yet. Create one with `plots new <NAME> --coords <JSON>`");
            } else {
                ui::render_view_header("Plots", plots.len());
                for plot in plots {
                    ui::render_plot_line(plot);
                }
            }
        }
    }
}
