//! High-level, ergonomic library API: open one tile of a SAFE product, load calibrated
//! bands and full-resolution angle grids with their attributes, and save them as
//! GeoTIFFs. Prefer these entrypoints over the metadata handles in `io` when
//! integrating MSIPRO.
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ndarray::Array2;
use tracing::{info, warn};

use crate::core::geocoding::{AreaDefinition, CrsResolver};
use crate::core::params::ReaderOptions;
use crate::error::{Error, Result};
use crate::io::gdal::{GdalBandReader, RawBand, select_crs_resolver};
use crate::io::product::ProductMetadata;
use crate::io::safe::{Granule, SafeProduct};
use crate::io::tile::TileMetadata;
use crate::io::writers::metadata::{embed_tiff_metadata, write_json_dataset, write_json_sidecar};
use crate::io::writers::tiff::write_geotiff_f32;
use crate::types::{AngleKind, DatasetAttrs, OutputFormat, band_info};

/// A loaded dataset: values plus the attributes describing them
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub name: String,
    pub data: Array2<f64>,
    pub attrs: DatasetAttrs,
}

/// One granule of an MSI L1C product with its product and tile metadata
#[derive(Debug)]
pub struct MsiTile {
    product: SafeProduct,
    granule: Granule,
    mda: ProductMetadata,
    tile_mda: TileMetadata,
    options: ReaderOptions,
}

impl MsiTile {
    /// Open a `.SAFE` directory, resolving coordinate references through GDAL when possible
    pub fn open<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<Self> {
        Self::open_with_resolver(path, options, select_crs_resolver())
    }

    pub fn open_with_resolver<P: AsRef<Path>>(
        path: P,
        options: &ReaderOptions,
        resolver: Arc<dyn CrsResolver>,
    ) -> Result<Self> {
        let product = SafeProduct::open(path)?;
        let granule = product.granule(options.tile_id.as_deref())?.clone();
        let mda = ProductMetadata::from_file(&product.metadata_path)?;
        let tile_mda = TileMetadata::from_file(&granule.metadata_path, &granule.tile_number, resolver)?;
        info!(
            "Opened tile {} of {} ({} bands)",
            granule.tile_number,
            product.name.mission_id,
            granule.bands.len()
        );
        Ok(Self {
            product,
            granule,
            mda,
            tile_mda,
            options: options.clone(),
        })
    }

    pub fn product(&self) -> &SafeProduct {
        &self.product
    }

    pub fn granule(&self) -> &Granule {
        &self.granule
    }

    pub fn metadata(&self) -> &ProductMetadata {
        &self.mda
    }

    pub fn tile_metadata(&self) -> &TileMetadata {
        &self.tile_mda
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn platform_name(&self) -> Result<&'static str> {
        self.product.name.platform_name()
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.product.name.observation_time
    }

    /// Same as the start time: the product name carries a single observation time
    pub fn end_time(&self) -> DateTime<Utc> {
        self.product.name.observation_time
    }

    /// Band labels with an image in this granule, in label order
    pub fn available_bands(&self) -> Vec<&str> {
        self.granule.bands.keys().map(|s| s.as_str()).collect()
    }

    pub fn area_footprint(&self, resolution: u32) -> Result<AreaDefinition> {
        self.tile_mda.area_footprint(resolution)
    }

    /// Footprint of `band` at its native resolution
    pub fn area_def(&self, band: &str) -> Result<AreaDefinition> {
        let info = band_info(band).ok_or_else(|| Error::UnknownBand(band.to_string()))?;
        self.area_footprint(info.resolution)
    }

    fn attrs(
        &self,
        name: &str,
        units: &str,
        resolution: u32,
        band: Option<&str>,
        area: AreaDefinition,
    ) -> Result<DatasetAttrs> {
        Ok(DatasetAttrs {
            name: name.to_string(),
            units: units.to_string(),
            platform_name: self.platform_name()?.to_string(),
            start_time: self.start_time(),
            end_time: self.end_time(),
            resolution,
            band: band.map(|b| b.to_string()),
            area,
        })
    }

    /// Decode the image of `band` through GDAL
    pub fn read_raw_band(&self, band: &str) -> Result<RawBand> {
        let path = self.granule.band_path(band)?;
        Ok(GdalBandReader::open(path)?.read()?)
    }

    /// Calibrate already decoded digital numbers of `band` to percent reflectance
    pub fn calibrate_band(&self, band: &str, raw: &RawBand) -> Result<LoadedDataset> {
        let info = band_info(band).ok_or_else(|| Error::UnknownBand(band.to_string()))?;
        if let Some(res) = self.options.resolution {
            if res != info.resolution {
                warn!(
                    "{} is loaded at its native {} m, ignoring requested {} m",
                    info.label, info.resolution, res
                );
            }
        }
        let area = self.area_footprint(info.resolution)?;
        if raw.dim() != area.shape() {
            return Err(Error::Processing(format!(
                "{} image is {:?}, tile grid at {} m is {:?}",
                info.label,
                raw.dim(),
                info.resolution,
                area.shape()
            )));
        }
        let data = self
            .mda
            .calibrate_raw(raw, info.label, self.options.mask_saturated)?;
        Ok(LoadedDataset {
            name: info.label.to_string(),
            data,
            attrs: self.attrs(info.label, "%", info.resolution, Some(info.label), area)?,
        })
    }

    /// Decode and calibrate `band`
    pub fn load_band(&self, band: &str) -> Result<LoadedDataset> {
        info!("Loading band {}", band);
        let raw = self.read_raw_band(band)?;
        self.calibrate_band(band, &raw)
    }

    /// Angle grid for `kind` at `resolution` (or the configured default), in degrees.
    /// `None` when the tile carries no grid for this kind.
    pub fn load_angles(
        &self,
        kind: AngleKind,
        resolution: Option<u32>,
    ) -> Result<Option<LoadedDataset>> {
        let resolution = resolution
            .or(self.options.resolution)
            .ok_or_else(|| Error::InvalidArgument {
                arg: "resolution",
                value: "none given for angle datasets".to_string(),
            })?;
        info!("Loading {} at {} m", kind, resolution);
        let Some(data) = self.tile_mda.full_resolution_angles(kind, resolution)? else {
            warn!("{} is not available for tile {}", kind, self.granule.tile_number);
            return Ok(None);
        };
        let area = self.area_footprint(resolution)?;
        Ok(Some(LoadedDataset {
            name: kind.name().to_string(),
            data,
            attrs: self.attrs(kind.name(), "degrees", resolution, None, area)?,
        }))
    }
}

/// Save a dataset: a float32 GeoTIFF with embedded metadata and a JSON sidecar, or a
/// single JSON document
pub fn save_dataset(dataset: &LoadedDataset, output: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::TIFF => {
            let mut ds = write_geotiff_f32(output, &dataset.data).map_err(Error::external)?;
            embed_tiff_metadata(&mut ds, &dataset.attrs).map_err(Error::external)?;
            write_json_sidecar(output, &dataset.attrs).map_err(Error::external)?;
        }
        OutputFormat::JSON => {
            write_json_dataset(output, &dataset.attrs, &dataset.data).map_err(Error::external)?;
        }
    }
    info!("Saved {} to {:?}", dataset.name, output);
    Ok(())
}
