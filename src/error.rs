//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Metadata lookups fail with the specific `MetadataMissing`, `UnknownBand` or
//! `ResolutionNotFound` variants so callers can skip one band or resolution and keep going.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("GDAL error: {0}")]
    Gdal(#[from] crate::io::GdalError),

    #[error("Missing or invalid metadata: {0}")]
    MetadataMissing(String),

    #[error("Unknown band: {0}")]
    UnknownBand(String),

    #[error("Resolution {0} m is not defined in the tile geocoding")]
    ResolutionNotFound(u32),

    #[error("Unsupported SAFE product: {0}")]
    UnsupportedProduct(String),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("External error: {0}")]
    External(String),
}

impl Error {
    pub fn missing<S: Into<String>>(what: S) -> Self {
        Error::MetadataMissing(what.into())
    }

    pub fn external<E: std::fmt::Display>(e: E) -> Self {
        Error::External(e.to_string())
    }
}
