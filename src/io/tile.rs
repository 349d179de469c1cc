use std::path::Path;
use std::sync::Arc;

use ndarray::Array2;
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::core::angles::{nanmean_stack, parse_values_rows, upsample_angles};
use crate::core::geocoding::{AreaDefinition, CrsResolver, TileGeocoding};
use crate::error::{Error, Result};
use crate::io::xml::XmlElement;
use crate::types::{AngleKind, AngleSource};

/// Tile-level metadata (`MTD_TL.xml`): geocoding and coarse angle grids
#[derive(Debug)]
pub struct TileMetadata {
    root: XmlElement,
    tile_id: String,
    resolver: Arc<dyn CrsResolver>,
    geocoding: OnceCell<TileGeocoding>,
}

impl TileMetadata {
    pub fn parse(xml: &str, tile_id: &str, resolver: Arc<dyn CrsResolver>) -> Result<Self> {
        Ok(Self::from_root(XmlElement::parse(xml)?, tile_id, resolver))
    }

    pub fn from_file<P: AsRef<Path>>(
        path: P,
        tile_id: &str,
        resolver: Arc<dyn CrsResolver>,
    ) -> Result<Self> {
        info!("Reading tile metadata: {:?}", path.as_ref());
        Ok(Self::from_root(XmlElement::from_file(path)?, tile_id, resolver))
    }

    pub fn from_root(root: XmlElement, tile_id: &str, resolver: Arc<dyn CrsResolver>) -> Self {
        Self {
            root,
            tile_id: tile_id.to_string(),
            resolver,
            geocoding: OnceCell::new(),
        }
    }

    pub fn tile_id(&self) -> &str {
        &self.tile_id
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn geocoding(&self) -> Result<&TileGeocoding> {
        self.geocoding.get_or_try_init(|| {
            let element = self
                .root
                .find("Tile_Geocoding")
                .ok_or_else(|| Error::missing("Tile_Geocoding"))?;
            TileGeocoding::from_xml(element)
        })
    }

    /// Footprint of the tile's pixel grid at `resolution` metres
    pub fn area_footprint(&self, resolution: u32) -> Result<AreaDefinition> {
        let geocoding = self.geocoding()?;
        let grid = geocoding.grid(resolution)?;
        let crs = self.resolver.resolve(&geocoding.cs_code);
        Ok(AreaDefinition::new(&self.tile_id, grid, crs))
    }

    /// Coarse grid for `kind`, or `None` when the tile carries no such grid.
    /// Satellite grids are the NaN-ignoring mean over the detectors of band id 1.
    pub fn coarse_angles(&self, kind: AngleKind) -> Result<Option<Array2<f64>>> {
        let Some(tile_angles) = self.root.find("Tile_Angles") else {
            return Ok(None);
        };
        match kind.source() {
            AngleSource::Sun { tag, item } => {
                let rows: Vec<&str> = tile_angles
                    .select(&[tag, item, "Values_List", "VALUES"])
                    .into_iter()
                    .map(|e| e.text())
                    .collect();
                if rows.is_empty() {
                    return Ok(None);
                }
                Ok(Some(parse_values_rows(&rows)?))
            }
            AngleSource::Viewing { tag, item } => {
                let mut grids = Vec::new();
                for detector in tile_angles.children_named(tag) {
                    if detector.attr("bandId") != Some("1") {
                        continue;
                    }
                    let rows: Vec<&str> = detector
                        .select(&[item, "Values_List", "VALUES"])
                        .into_iter()
                        .map(|e| e.text())
                        .collect();
                    if !rows.is_empty() {
                        grids.push(parse_values_rows(&rows)?);
                    }
                }
                if grids.is_empty() {
                    return Ok(None);
                }
                debug!("Reducing {} detector grids for {}", grids.len(), kind);
                Ok(Some(nanmean_stack(&grids)?))
            }
        }
    }

    /// Angles for `kind` on the full pixel grid at `resolution`, in degrees
    pub fn full_resolution_angles(
        &self,
        kind: AngleKind,
        resolution: u32,
    ) -> Result<Option<Array2<f64>>> {
        let grid = self.geocoding()?.grid(resolution)?;
        let Some(coarse) = self.coarse_angles(kind)? else {
            debug!("No {} grid in tile {}", kind, self.tile_id);
            return Ok(None);
        };
        Ok(Some(upsample_angles(&coarse, grid.rows, grid.cols)))
    }
}
