use clap::Parser;
use std::path::PathBuf;

use msipro::types::{AngleKind, OutputFormat};

#[derive(Parser)]
#[command(name = "msipro", version, about = "MSIPRO CLI")]
pub struct CliArgs {
    /// Input SAFE directory
    #[arg(short, long)]
    pub input: PathBuf,

    /// Band to calibrate to reflectance (B01..B12, B8A)
    #[arg(short, long, conflicts_with_all = ["angle", "footprint"])]
    pub band: Option<String>,

    /// Angle dataset to interpolate to the tile grid
    #[arg(short, long, value_enum, conflicts_with = "footprint")]
    pub angle: Option<AngleKind>,

    /// Print the tile footprint as JSON instead of loading pixels
    #[arg(long, default_value_t = false)]
    pub footprint: bool,

    /// Grid resolution in metres (10, 20 or 60) for angles and footprints
    #[arg(short, long)]
    pub resolution: Option<u32>,

    /// Mark saturated pixels as +inf instead of calibrating them
    #[arg(long, default_value_t = false)]
    pub mask_saturated: bool,

    /// Granule to read, e.g. T31UDQ; defaults to the first granule
    #[arg(long)]
    pub tile_id: Option<String>,

    /// Output filename
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (tiff or json)
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::TIFF)]
    pub format: OutputFormat,

    /// JSON file with reader options; flags given on the command line take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub log: bool,
}
