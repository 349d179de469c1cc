use gdal::raster::GdalDataType;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, errors::GdalError as GdalCrateError};
use ndarray::Array2;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::geocoding::{CodeOnlyCrsResolver, CoordinateReference, CrsResolver, epsg_number};

/// Errors encountered when using GDAL reader
#[derive(Debug, Error)]
pub enum GdalError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Dimension mismatch: expected {0}x{1}, got {2} values")]
    DimensionMismatch(usize, usize, usize),
}

/// Digital numbers of one band, in the integer type the file stores
#[derive(Debug, Clone, PartialEq)]
pub enum RawBand {
    U8(Array2<u8>),
    U16(Array2<u16>),
}

impl RawBand {
    /// (rows, cols)
    pub fn dim(&self) -> (usize, usize) {
        match self {
            RawBand::U8(a) => a.dim(),
            RawBand::U16(a) => a.dim(),
        }
    }
}

/// Reader for a single-band MSI image (JPEG2000 through GDAL's JP2 drivers)
pub struct GdalBandReader {
    pub dataset: Dataset,
    /// Width (pixels) of the raster
    pub size_x: usize,
    /// Height (lines) of the raster
    pub size_y: usize,
}

impl GdalBandReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GdalError> {
        info!("Opening raster {:?}", path.as_ref());
        let dataset = Dataset::open(path.as_ref())?;
        let (size_x, size_y) = dataset.raster_size();
        if dataset.raster_count() == 0 {
            return Err(GdalError::UnsupportedFormat("No raster bands found".into()));
        }
        Ok(GdalBandReader {
            dataset,
            size_x,
            size_y,
        })
    }

    /// Read band 1 at native type
    pub fn read(&self) -> Result<RawBand, GdalError> {
        let band = self.dataset.rasterband(1)?;
        let window = (self.size_x, self.size_y);
        let band_type = band.band_type();
        debug!("Reading {}x{} band of type {:?}", self.size_x, self.size_y, band_type);
        match band_type {
            GdalDataType::UInt8 => {
                let buf = band.read_as::<u8>((0, 0), window, window, None)?;
                Ok(RawBand::U8(self.to_array(buf.data().to_vec())?))
            }
            GdalDataType::UInt16 => {
                let buf = band.read_as::<u16>((0, 0), window, window, None)?;
                Ok(RawBand::U16(self.to_array(buf.data().to_vec())?))
            }
            other => Err(GdalError::UnsupportedFormat(format!(
                "band type {:?}, expected UInt8 or UInt16",
                other
            ))),
        }
    }

    fn to_array<T>(&self, data: Vec<T>) -> Result<Array2<T>, GdalError> {
        let len = data.len();
        Array2::from_shape_vec((self.size_y, self.size_x), data)
            .map_err(|_| GdalError::DimensionMismatch(self.size_x, self.size_y, len))
    }
}

/// Resolves EPSG codes to WKT through GDAL/PROJ
#[derive(Debug, Default, Clone, Copy)]
pub struct GdalCrsResolver;

impl GdalCrsResolver {
    fn wkt_for(code: &str) -> Result<String, GdalError> {
        let epsg = epsg_number(code)
            .ok_or_else(|| GdalError::UnsupportedFormat(format!("reference code {}", code)))?;
        Ok(SpatialRef::from_epsg(epsg)?.to_wkt()?)
    }
}

impl CrsResolver for GdalCrsResolver {
    fn resolve(&self, code: &str) -> CoordinateReference {
        match Self::wkt_for(code) {
            Ok(wkt) => CoordinateReference::Resolved {
                code: code.to_string(),
                wkt,
            },
            Err(e) => {
                warn!("Could not resolve {} ({}); keeping the code only", code, e);
                CoordinateReference::Code {
                    code: code.to_string(),
                }
            }
        }
    }
}

/// Pick the precise resolver if GDAL can build a well-known reference, else the code-only one
pub fn select_crs_resolver() -> Arc<dyn CrsResolver> {
    match GdalCrsResolver::wkt_for("EPSG:4326") {
        Ok(_) => Arc::new(GdalCrsResolver),
        Err(e) => {
            warn!("Projection database unavailable ({}); footprints carry reference codes only", e);
            Arc::new(CodeOnlyCrsResolver)
        }
    }
}
