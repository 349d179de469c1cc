//! Output writers: float GeoTIFFs plus embedded or sidecar metadata.
pub mod metadata;
pub mod tiff;
