//! Shared types and static lookup tables used across MSIPRO.
//! Includes `AngleKind`, `DatasetAttrs`, the band table (`BANDS`) and the platform table
//! (`PLATFORMS`).
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::geocoding::AreaDefinition;

/// Output file format
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Float32 GeoTIFF with embedded metadata and a JSON sidecar
    TIFF,
    /// One JSON document with attributes and values (missing values as `null`)
    JSON,
}

/// Viewing/illumination angle datasets available from the tile metadata
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleKind {
    #[value(name = "solar_zenith_angle")]
    SolarZenith,
    #[value(name = "solar_azimuth_angle")]
    SolarAzimuth,
    #[value(name = "satellite_zenith_angle")]
    SatelliteZenith,
    #[value(name = "satellite_azimuth_angle")]
    SatelliteAzimuth,
}

/// Where an angle grid lives below `Tile_Angles`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AngleSource {
    /// One grid, `{tag}/{item}/Values_List/VALUES`
    Sun { tag: &'static str, item: &'static str },
    /// One grid per detector, `{tag}[@bandId="1"]/{item}/Values_List/VALUES`
    Viewing { tag: &'static str, item: &'static str },
}

impl AngleKind {
    pub const ALL: [AngleKind; 4] = [
        AngleKind::SolarZenith,
        AngleKind::SolarAzimuth,
        AngleKind::SatelliteZenith,
        AngleKind::SatelliteAzimuth,
    ];

    /// Dataset name used in outputs and sidecars
    pub fn name(&self) -> &'static str {
        match self {
            AngleKind::SolarZenith => "solar_zenith_angle",
            AngleKind::SolarAzimuth => "solar_azimuth_angle",
            AngleKind::SatelliteZenith => "satellite_zenith_angle",
            AngleKind::SatelliteAzimuth => "satellite_azimuth_angle",
        }
    }

    pub fn source(&self) -> AngleSource {
        match self {
            AngleKind::SolarZenith => AngleSource::Sun {
                tag: "Sun_Angles_Grid",
                item: "Zenith",
            },
            AngleKind::SolarAzimuth => AngleSource::Sun {
                tag: "Sun_Angles_Grid",
                item: "Azimuth",
            },
            AngleKind::SatelliteZenith => AngleSource::Viewing {
                tag: "Viewing_Incidence_Angles_Grids",
                item: "Zenith",
            },
            AngleKind::SatelliteAzimuth => AngleSource::Viewing {
                tag: "Viewing_Incidence_Angles_Grids",
                item: "Azimuth",
            },
        }
    }
}

impl std::fmt::Display for AngleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Static description of one MSI band
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BandInfo {
    /// Label used in file names and by callers (`B01`, `B8A`, ...)
    pub label: &'static str,
    /// Name used by `Spectral_Information[@physicalBand]` (`B1`, `B8A`, ...)
    pub physical_band: &'static str,
    /// Native ground sampling distance in metres
    pub resolution: u32,
}

pub static BANDS: [BandInfo; 13] = [
    BandInfo { label: "B01", physical_band: "B1", resolution: 60 },
    BandInfo { label: "B02", physical_band: "B2", resolution: 10 },
    BandInfo { label: "B03", physical_band: "B3", resolution: 10 },
    BandInfo { label: "B04", physical_band: "B4", resolution: 10 },
    BandInfo { label: "B05", physical_band: "B5", resolution: 20 },
    BandInfo { label: "B06", physical_band: "B6", resolution: 20 },
    BandInfo { label: "B07", physical_band: "B7", resolution: 20 },
    BandInfo { label: "B08", physical_band: "B8", resolution: 10 },
    BandInfo { label: "B8A", physical_band: "B8A", resolution: 20 },
    BandInfo { label: "B09", physical_band: "B9", resolution: 60 },
    BandInfo { label: "B10", physical_band: "B10", resolution: 60 },
    BandInfo { label: "B11", physical_band: "B11", resolution: 20 },
    BandInfo { label: "B12", physical_band: "B12", resolution: 20 },
];

/// Look up a band by its label, case-insensitively
pub fn band_info(label: &str) -> Option<&'static BandInfo> {
    BANDS.iter().find(|b| b.label.eq_ignore_ascii_case(label))
}

/// Mission identifiers found in product names and the platform they denote
pub static PLATFORMS: [(&str, &str); 4] = [
    ("S2A", "Sentinel-2A"),
    ("S2B", "Sentinel-2B"),
    ("S2C", "Sentinel-2C"),
    ("S2D", "Sentinel-2D"),
];

pub fn platform_name(mission_id: &str) -> Option<&'static str> {
    PLATFORMS
        .iter()
        .find(|(id, _)| id.eq_ignore_ascii_case(mission_id))
        .map(|(_, name)| *name)
}

/// Attributes attached to every loaded dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetAttrs {
    /// Band label (`B04`) or angle dataset name (`solar_zenith_angle`)
    pub name: String,
    /// `%` for reflectance, `degrees` for angles
    pub units: String,
    pub platform_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Ground sampling distance in metres
    pub resolution: u32,
    /// Set for reflectance datasets only
    pub band: Option<String>,
    pub area: AreaDefinition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_table_maps_two_digit_labels() {
        assert_eq!(band_info("B01").map(|b| b.physical_band), Some("B1"));
        assert_eq!(band_info("b8a").map(|b| b.physical_band), Some("B8A"));
        assert_eq!(band_info("B12").map(|b| b.resolution), Some(20));
        assert!(band_info("B13").is_none());
    }

    #[test]
    fn platform_lookup() {
        assert_eq!(platform_name("S2B"), Some("Sentinel-2B"));
        assert_eq!(platform_name("S1A"), None);
    }

    #[test]
    fn angle_sources() {
        assert!(matches!(AngleKind::SolarAzimuth.source(), AngleSource::Sun { item: "Azimuth", .. }));
        assert!(matches!(
            AngleKind::SatelliteZenith.source(),
            AngleSource::Viewing { tag: "Viewing_Incidence_Angles_Grids", item: "Zenith" }
        ));
    }
}
