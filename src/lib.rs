#![doc = r#"
MSIPRO — a Sentinel-2 MSI Level-1C SAFE tile reader.

This crate turns one tile of a Sentinel-2 L1C SAFE product into calibrated top-of-atmosphere
reflectance bands (percent), full-resolution solar and satellite angle grids (degrees) and
the tile's geospatial footprint. It powers the MSIPRO CLI and can be embedded in your own
Rust applications.

Stability
---------
The public library API is experimental in initial releases and may evolve as the crate
stabilizes. Breaking changes can occur.

Requirements
------------
- GDAL development headers and runtime available on your system (JPEG2000 decoding and
  coordinate reference lookup).
- Rust 2024 edition toolchain.

Add dependency
--------------
```toml
[dependencies]
msipro = "0.1"
```

Quick start: calibrate a band
-----------------------------
```rust,no_run
use std::path::Path;
use msipro::{MsiTile, OutputFormat, ReaderOptions, save_dataset};

fn main() -> msipro::Result<()> {
    let options = ReaderOptions {
        mask_saturated: true,
        ..ReaderOptions::default()
    };
    let tile = MsiTile::open(
        "/data/S2B_MSIL1C_20210517T103619_N0300_R008_T31UDQ_20210517T123513.SAFE",
        &options,
    )?;

    let red = tile.load_band("B04")?;
    assert_eq!(red.attrs.units, "%");
    save_dataset(&red, Path::new("/out/B04.tif"), OutputFormat::TIFF)
}
```

Angle grids and footprints
--------------------------
Angle datasets are interpolated from the coarse grids of the tile metadata onto the pixel
grid of the requested resolution. A tile without a grid for the requested kind yields
`None` rather than an error.

```rust,no_run
use msipro::{AngleKind, MsiTile, ReaderOptions};

fn main() -> msipro::Result<()> {
    let tile = MsiTile::open("/data/product.SAFE", &ReaderOptions::default())?;

    if let Some(sza) = tile.load_angles(AngleKind::SolarZenith, Some(60))? {
        println!("{} {:?} {}", sza.name, sza.data.dim(), sza.attrs.units);
    }

    let area = tile.area_footprint(60)?;
    println!("{} {:?}", area.crs, area.extent.as_tuple());
    Ok(())
}
```

Working with metadata directly
------------------------------
The metadata handles do not need GDAL and accept in-memory documents.

```rust,no_run
use std::sync::Arc;
use ndarray::Array2;
use msipro::{AngleKind, CodeOnlyCrsResolver, ProductMetadata, TileMetadata};

fn main() -> msipro::Result<()> {
    let mda = ProductMetadata::from_file("/data/product.SAFE/MTD_MSIL1C.xml")?;
    let raw = Array2::<u16>::from_elem((1830, 1830), 1000);
    let reflectance = mda.calibrate(&raw, "B01", false)?;

    let tile = TileMetadata::from_file(
        "/data/product.SAFE/GRANULE/L1C_T31UDQ_A021913_20210517T104312/MTD_TL.xml",
        "31UDQ",
        Arc::new(CodeOnlyCrsResolver),
    )?;
    let vza = tile.full_resolution_angles(AngleKind::SatelliteZenith, 60)?;
    println!("{:?} {:?}", reflectance.dim(), vza.map(|a| a.dim()));
    Ok(())
}
```

Error handling
--------------
All public functions return `msipro::Result<T>`. Missing metadata, unknown bands and
undefined resolutions have their own variants so callers can skip one band or resolution
and keep going.

```rust,no_run
use msipro::{Error, MsiTile, ReaderOptions};

fn main() {
    let tile = match MsiTile::open("/data/product.SAFE", &ReaderOptions::default()) {
        Ok(tile) => tile,
        Err(e) => return eprintln!("cannot open: {e}"),
    };
    for band in ["B01", "B13"] {
        match tile.load_band(band) {
            Ok(ds) => println!("{} loaded", ds.name),
            Err(Error::UnknownBand(b)) => eprintln!("skipping unknown band {b}"),
            Err(Error::ResolutionNotFound(r)) => eprintln!("no {r} m grid"),
            Err(other) => eprintln!("error: {other}"),
        }
    }
}
```

Useful modules
--------------
- [`api`] — high-level entry points (`MsiTile`, `save_dataset`).
- [`core`] — calibration, angle interpolation and geocoding primitives.
- [`io`] — SAFE discovery, XML metadata handles, GDAL adapters and writers.
- [`types`] — band and platform tables, `AngleKind`, `DatasetAttrs`.
- [`error`] — crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use crate::core::calibration::CalibrationParams;
pub use crate::core::geocoding::{
    AreaDefinition, AreaExtent, CodeOnlyCrsResolver, CoordinateReference, CrsResolver,
    GridGeocoding, TileGeocoding,
};
pub use crate::core::params::ReaderOptions;
pub use crate::error::{Error, Result};
pub use crate::types::{AngleKind, BandInfo, DatasetAttrs, OutputFormat};

// Readers
pub use crate::io::gdal::{GdalBandReader, GdalCrsResolver, GdalError, RawBand, select_crs_resolver};
pub use crate::io::product::ProductMetadata;
pub use crate::io::safe::{Granule, ProductName, SafeProduct};
pub use crate::io::tile::TileMetadata;

// Selected writer helpers
pub use crate::io::writers::metadata::{embed_tiff_metadata, extract_metadata_fields, write_json_sidecar};
pub use crate::io::writers::tiff::write_geotiff_f32;

// High-level API re-exports
pub use crate::api::{LoadedDataset, MsiTile, save_dataset};
