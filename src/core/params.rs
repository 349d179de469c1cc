use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Reader options suitable for config files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Turn `SATURATED` pixels into `+inf` instead of calibrating them
    pub mask_saturated: bool,
    /// Granule to read (`31UDQ` or `T31UDQ`); None means the first granule
    pub tile_id: Option<String>,
    /// Output grid in metres; None means the band's native resolution
    pub resolution: Option<u32>,
}

impl ReaderOptions {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&content).map_err(|e| Error::InvalidArgument {
            arg: "config",
            value: format!("{:?}: {}", path.as_ref(), e),
        })
    }
}
