//! I/O layer for reading MSI L1C SAFE products and GDAL-backed rasters.
//! Provides the `safe` layout discovery, the `xml` element tree, the `product` and `tile`
//! metadata handles, `gdal` adapters, and `writers` for GeoTIFF outputs and metadata
//! embedding/sidecars.
pub mod safe;
pub use safe::{Granule, ProductName, SafeProduct};

pub mod xml;
pub use xml::XmlElement;

pub mod product;
pub use product::ProductMetadata;

pub mod tile;
pub use tile::TileMetadata;

pub mod gdal;
pub use gdal::{GdalBandReader, GdalCrsResolver, GdalError, RawBand, select_crs_resolver};

pub mod writers;
