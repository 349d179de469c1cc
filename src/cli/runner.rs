use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use msipro::api::{LoadedDataset, MsiTile, save_dataset};
use msipro::core::params::ReaderOptions;
use msipro::types::{AngleKind, OutputFormat};

use super::args::CliArgs;
use super::errors::AppError;

/// Config file first, then any flag given on the command line
fn resolve_options(args: &CliArgs) -> Result<ReaderOptions, AppError> {
    let mut options = match &args.config {
        Some(path) => ReaderOptions::from_json_file(path)?,
        None => ReaderOptions::default(),
    };
    if args.mask_saturated {
        options.mask_saturated = true;
    }
    if let Some(tile) = &args.tile_id {
        options.tile_id = Some(tile.clone());
    }
    if let Some(res) = args.resolution {
        options.resolution = Some(res);
    }
    Ok(options)
}

fn require_output(output: Option<PathBuf>) -> Result<PathBuf, AppError> {
    output.ok_or(AppError::MissingArgument {
        arg: "--output".to_string(),
    })
}

fn save(dataset: &LoadedDataset, output: &PathBuf, format: OutputFormat) -> Result<(), AppError> {
    save_dataset(dataset, output, format)?;
    info!(
        "{} ({}x{}, {}) written to {:?}",
        dataset.name,
        dataset.data.ncols(),
        dataset.data.nrows(),
        dataset.attrs.units,
        output
    );
    Ok(())
}

fn process_angle(
    tile: &MsiTile,
    kind: AngleKind,
    output: &PathBuf,
    format: OutputFormat,
) -> Result<(), AppError> {
    let dataset = tile
        .load_angles(kind, None)?
        .ok_or_else(|| AppError::AngleUnavailable {
            kind: kind.to_string(),
            tile: tile.granule().tile_number.clone(),
        })?;
    save(&dataset, output, format)
}

fn print_footprint(tile: &MsiTile, resolution: Option<u32>) -> Result<(), Box<dyn std::error::Error>> {
    let resolution = resolution.ok_or(AppError::MissingArgument {
        arg: "--resolution".to_string(),
    })?;
    let area = tile.area_footprint(resolution)?;
    println!("{}", serde_json::to_string_pretty(&area)?);
    Ok(())
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        // RUST_LOG narrows the output when set
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let options = resolve_options(&args)?;
    let tile = MsiTile::open(&args.input, &options)?;
    info!(
        "{} observed {} (bands: {})",
        tile.platform_name()?,
        tile.start_time(),
        tile.available_bands().join(",")
    );

    if args.footprint {
        return print_footprint(&tile, options.resolution);
    }
    if let Some(band) = &args.band {
        let output = require_output(args.output)?;
        let dataset = tile.load_band(band)?;
        save(&dataset, &output, args.format)?;
        return Ok(());
    }
    if let Some(kind) = args.angle {
        let output = require_output(args.output)?;
        process_angle(&tile, kind, &output, args.format)?;
        return Ok(());
    }
    Err(AppError::NoAction.into())
}
