//! Tile geocoding: per-resolution pixel grids, extents, coordinate references and the
//! area definition handed to callers.
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::io::xml::{XmlElement, parse_number};

/// `(left, bottom, right, top)` in projection units
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AreaExtent {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl AreaExtent {
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.left, self.bottom, self.right, self.top)
    }
}

/// Pixel grid of a tile at one resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridGeocoding {
    pub resolution: u32,
    pub rows: usize,
    pub cols: usize,
    pub ulx: f64,
    pub uly: f64,
    pub xdim: f64,
    /// As stored in the metadata; negative for north-up tiles
    pub ydim: f64,
}

impl GridGeocoding {
    /// Extent as `(ulx, uly + rows*ydim, ulx + cols*xdim, uly)`; `ydim` is used with its
    /// stored sign.
    pub fn area_extent(&self) -> AreaExtent {
        AreaExtent {
            left: self.ulx,
            bottom: self.uly + self.rows as f64 * self.ydim,
            right: self.ulx + self.cols as f64 * self.xdim,
            top: self.uly,
        }
    }
}

/// `Tile_Geocoding` block of a tile metadata document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileGeocoding {
    /// `HORIZONTAL_CS_CODE`, e.g. `EPSG:32631`
    pub cs_code: String,
    pub grids: BTreeMap<u32, GridGeocoding>,
}

impl TileGeocoding {
    /// Build from the `Tile_Geocoding` element
    pub fn from_xml(element: &XmlElement) -> Result<Self> {
        let cs_code = element
            .child("HORIZONTAL_CS_CODE")
            .map(|e| e.text().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::missing("Tile_Geocoding/HORIZONTAL_CS_CODE"))?;

        let mut grids = BTreeMap::new();
        for size in element.children_named("Size") {
            let res_attr = size
                .attr("resolution")
                .ok_or_else(|| Error::missing("Size@resolution"))?;
            let resolution: u32 = parse_number(res_attr, "Size@resolution")?;
            let geopos = element
                .child_with_attr("Geoposition", "resolution", res_attr)
                .ok_or_else(|| {
                    Error::missing(format!("Geoposition[@resolution=\"{}\"]", res_attr))
                })?;
            grids.insert(
                resolution,
                GridGeocoding {
                    resolution,
                    rows: size.child_number("NROWS")?,
                    cols: size.child_number("NCOLS")?,
                    ulx: geopos.child_number("ULX")?,
                    uly: geopos.child_number("ULY")?,
                    xdim: geopos.child_number("XDIM")?,
                    ydim: geopos.child_number("YDIM")?,
                },
            );
        }
        debug!(
            "Tile geocoding {} with resolutions {:?}",
            cs_code,
            grids.keys().collect::<Vec<_>>()
        );
        Ok(Self { cs_code, grids })
    }

    pub fn grid(&self, resolution: u32) -> Result<&GridGeocoding> {
        self.grids
            .get(&resolution)
            .ok_or(Error::ResolutionNotFound(resolution))
    }

    pub fn resolutions(&self) -> Vec<u32> {
        self.grids.keys().copied().collect()
    }
}

/// Coordinate reference of a footprint.
///
/// Two references are equal when their codes are equal, whether or not a WKT
/// definition could be resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoordinateReference {
    Resolved { code: String, wkt: String },
    Code { code: String },
}

impl CoordinateReference {
    pub fn code(&self) -> &str {
        match self {
            CoordinateReference::Resolved { code, .. } | CoordinateReference::Code { code } => code,
        }
    }

    pub fn wkt(&self) -> Option<&str> {
        match self {
            CoordinateReference::Resolved { wkt, .. } => Some(wkt),
            CoordinateReference::Code { .. } => None,
        }
    }

    /// Numeric part of an `EPSG:nnnn` code
    pub fn epsg(&self) -> Option<u32> {
        epsg_number(self.code())
    }
}

impl PartialEq for CoordinateReference {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl fmt::Display for CoordinateReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

pub fn epsg_number(code: &str) -> Option<u32> {
    let (authority, number) = code.split_once(':')?;
    if !authority.trim().eq_ignore_ascii_case("EPSG") {
        return None;
    }
    number.trim().parse().ok()
}

/// Turns a reference code into a `CoordinateReference`
pub trait CrsResolver: Send + Sync + fmt::Debug {
    fn resolve(&self, code: &str) -> CoordinateReference;
}

/// Keeps only the code string; used when no projection database is available
#[derive(Debug, Default, Clone, Copy)]
pub struct CodeOnlyCrsResolver;

impl CrsResolver for CodeOnlyCrsResolver {
    fn resolve(&self, code: &str) -> CoordinateReference {
        CoordinateReference::Code {
            code: code.to_string(),
        }
    }
}

/// Geospatial rectangle of a tile at one resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaDefinition {
    pub area_id: String,
    pub description: String,
    pub proj_id: String,
    /// Columns
    pub width: usize,
    /// Rows
    pub height: usize,
    pub crs: CoordinateReference,
    pub extent: AreaExtent,
}

impl AreaDefinition {
    pub fn new(tile_id: &str, grid: &GridGeocoding, crs: CoordinateReference) -> Self {
        Self {
            area_id: tile_id.to_string(),
            description: "On-the-fly area".to_string(),
            proj_id: tile_id.to_string(),
            width: grid.cols,
            height: grid.rows,
            crs,
            extent: grid.area_extent(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn pixel_size_x(&self) -> f64 {
        (self.extent.right - self.extent.left) / self.width as f64
    }

    /// Negative for north-up areas
    pub fn pixel_size_y(&self) -> f64 {
        (self.extent.bottom - self.extent.top) / self.height as f64
    }

    pub fn geotransform(&self) -> [f64; 6] {
        [
            self.extent.left,
            self.pixel_size_x(),
            0.0,
            self.extent.top,
            0.0,
            self.pixel_size_y(),
        ]
    }
}
