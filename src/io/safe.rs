//! SAFE directory layout of an MSI Level-1C product.
//!
//! ```text
//! S2B_MSIL1C_20210517T103619_N0300_R008_T31UDQ_20210517T123513.SAFE/
//!   MTD_MSIL1C.xml
//!   GRANULE/L1C_T31UDQ_A021913_20210517T104312/
//!     MTD_TL.xml
//!     IMG_DATA/T31UDQ_20210517T103619_B01.jp2
//! ```
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{band_info, platform_name};

pub const PRODUCT_METADATA_FILE: &str = "MTD_MSIL1C.xml";
pub const TILE_METADATA_FILE: &str = "MTD_TL.xml";

const TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

fn parse_compact_time(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIME_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Fields encoded in a product directory name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductName {
    /// `S2A`, `S2B`, ...
    pub mission_id: String,
    pub observation_time: DateTime<Utc>,
    /// e.g. `0300`
    pub processing_baseline: String,
    pub relative_orbit: u32,
    /// Tile number without the leading `T`, e.g. `31UDQ`
    pub tile_number: String,
    pub discriminator: DateTime<Utc>,
}

impl ProductName {
    /// Parse `{mission}_MSIL1C_{time}_N{baseline}_R{orbit}_T{tile}_{discriminator}[.SAFE]`
    pub fn parse(name: &str) -> Result<Self> {
        let unsupported = || Error::UnsupportedProduct(name.to_string());
        let stem = name.strip_suffix(".SAFE").unwrap_or(name);
        let parts: Vec<&str> = stem.split('_').collect();
        if parts.len() != 7 || parts[1] != "MSIL1C" {
            return Err(unsupported());
        }
        let mission_id = parts[0].to_string();
        if platform_name(&mission_id).is_none() {
            return Err(unsupported());
        }
        let observation_time = parse_compact_time(parts[2]).ok_or_else(unsupported)?;
        let processing_baseline = parts[3].strip_prefix('N').ok_or_else(unsupported)?.to_string();
        let relative_orbit = parts[4]
            .strip_prefix('R')
            .and_then(|s| s.parse().ok())
            .ok_or_else(unsupported)?;
        let tile_number = parts[5].strip_prefix('T').ok_or_else(unsupported)?.to_string();
        let discriminator = parse_compact_time(parts[6]).ok_or_else(unsupported)?;
        Ok(Self {
            mission_id,
            observation_time,
            processing_baseline,
            relative_orbit,
            tile_number,
            discriminator,
        })
    }

    pub fn platform_name(&self) -> Result<&'static str> {
        platform_name(&self.mission_id)
            .ok_or_else(|| Error::UnsupportedProduct(self.mission_id.clone()))
    }
}

/// Tile number from a granule directory name such as `L1C_T31UDQ_A021913_20210517T104312`
pub fn granule_tile_number(dir_name: &str) -> Option<String> {
    dir_name
        .split('_')
        .filter_map(|token| token.strip_prefix('T'))
        .find(|rest| rest.len() == 5 && rest.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|s| s.to_string())
}

/// Band label from an image file name such as `T31UDQ_20210517T103619_B8A.jp2`
pub fn image_band_label(file_name: &str) -> Option<&'static str> {
    let stem = file_name
        .strip_suffix(".jp2")
        .or_else(|| file_name.strip_suffix(".JP2"))?;
    let suffix = stem.rsplit('_').next()?;
    band_info(suffix).map(|b| b.label)
}

/// One tile of a product
#[derive(Debug, Clone, Serialize)]
pub struct Granule {
    pub dir: PathBuf,
    pub tile_number: String,
    pub metadata_path: PathBuf,
    /// Band label to image path
    pub bands: BTreeMap<String, PathBuf>,
}

impl Granule {
    fn scan(dir: PathBuf) -> Result<Option<Self>> {
        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let metadata_path = dir.join(TILE_METADATA_FILE);
        if !metadata_path.is_file() {
            warn!("Granule {:?} has no {}; skipping", dir, TILE_METADATA_FILE);
            return Ok(None);
        }
        let Some(tile_number) = granule_tile_number(&dir_name) else {
            warn!("Cannot read a tile number from granule {}; skipping", dir_name);
            return Ok(None);
        };

        let mut bands = BTreeMap::new();
        let img_dir = dir.join("IMG_DATA");
        if img_dir.is_dir() {
            for entry in fs::read_dir(&img_dir)? {
                let path = entry?.path();
                let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
                    continue;
                };
                if let Some(label) = image_band_label(&name) {
                    debug!("Found {} image: {:?}", label, path);
                    bands.insert(label.to_string(), path);
                }
            }
        }
        Ok(Some(Self {
            dir,
            tile_number,
            metadata_path,
            bands,
        }))
    }

    pub fn band_path(&self, label: &str) -> Result<&Path> {
        let info = band_info(label).ok_or_else(|| Error::UnknownBand(label.to_string()))?;
        self.bands
            .get(info.label)
            .map(|p| p.as_path())
            .ok_or_else(|| Error::UnknownBand(format!("{} (no image in {:?})", label, self.dir)))
    }
}

/// An opened `.SAFE` product directory
#[derive(Debug, Clone, Serialize)]
pub struct SafeProduct {
    pub root: PathBuf,
    pub name: ProductName,
    pub metadata_path: PathBuf,
    pub granules: Vec<Granule>,
}

impl SafeProduct {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        info!("Opening SAFE product {:?}", root);
        if !root.is_dir() {
            return Err(Error::UnsupportedProduct(format!("{:?} is not a directory", root)));
        }
        let dir_name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::UnsupportedProduct(format!("{:?}", root)))?;
        let name = ProductName::parse(&dir_name)?;

        let metadata_path = root.join(PRODUCT_METADATA_FILE);
        if !metadata_path.is_file() {
            return Err(Error::UnsupportedProduct(format!(
                "{} not found in {:?}",
                PRODUCT_METADATA_FILE, root
            )));
        }

        let granule_root = root.join("GRANULE");
        if !granule_root.is_dir() {
            return Err(Error::UnsupportedProduct(format!("no GRANULE directory in {:?}", root)));
        }
        let mut dirs: Vec<PathBuf> = fs::read_dir(&granule_root)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        let mut granules = Vec::new();
        for dir in dirs {
            if let Some(granule) = Granule::scan(dir)? {
                granules.push(granule);
            }
        }
        if granules.is_empty() {
            return Err(Error::UnsupportedProduct(format!("no granules in {:?}", granule_root)));
        }
        info!(
            "Product {} with {} granule(s)",
            name.mission_id,
            granules.len()
        );
        Ok(Self {
            root,
            name,
            metadata_path,
            granules,
        })
    }

    /// Granule by tile number (with or without the leading `T`), or the first one
    pub fn granule(&self, tile: Option<&str>) -> Result<&Granule> {
        match tile {
            None => self
                .granules
                .first()
                .ok_or_else(|| Error::UnsupportedProduct("no granules".to_string())),
            Some(t) => {
                let wanted = t.strip_prefix('T').unwrap_or(t);
                self.granules
                    .iter()
                    .find(|g| g.tile_number.eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| Error::InvalidArgument {
                        arg: "tile-id",
                        value: t.to_string(),
                    })
            }
        }
    }
}
