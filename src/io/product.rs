use std::collections::HashMap;
use std::path::Path;

use ndarray::Array2;
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::core::calibration::{CalibrationParams, calibrate};
use crate::error::{Error, Result};
use crate::io::gdal::RawBand;
use crate::io::xml::{XmlElement, parse_number};
use crate::types::band_info;

/// Product-level metadata (`MTD_MSIL1C.xml`): quantification, special values and
/// per-band radiometric offsets.
///
/// The document is parsed once on construction; the derived tables are built lazily on
/// first use and memoized for the lifetime of the handle.
#[derive(Debug)]
pub struct ProductMetadata {
    root: XmlElement,
    band_indices: OnceCell<HashMap<String, u32>>,
    band_offsets: OnceCell<HashMap<u32, f64>>,
    special_values: OnceCell<HashMap<String, f64>>,
}

impl ProductMetadata {
    pub fn parse(xml: &str) -> Result<Self> {
        Ok(Self::from_root(XmlElement::parse(xml)?))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Reading product metadata: {:?}", path.as_ref());
        Ok(Self::from_root(XmlElement::from_file(path)?))
    }

    pub fn from_root(root: XmlElement) -> Self {
        Self {
            root,
            band_indices: OnceCell::new(),
            band_offsets: OnceCell::new(),
            special_values: OnceCell::new(),
        }
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Scale factor from digital numbers to reflectance
    pub fn quantification_value(&self) -> Result<f64> {
        let value: f64 = self.root.find_number("QUANTIFICATION_VALUE")?;
        if !(value.is_finite() && value > 0.0) {
            return Err(Error::missing(format!(
                "QUANTIFICATION_VALUE (must be positive, got {})",
                value
            )));
        }
        Ok(value)
    }

    /// `physicalBand` name to integer `bandId`
    pub fn band_indices(&self) -> Result<&HashMap<String, u32>> {
        self.band_indices.get_or_try_init(|| {
            let mut indices = HashMap::new();
            for element in self.root.find_all("Spectral_Information") {
                let physical = element
                    .attr("physicalBand")
                    .ok_or_else(|| Error::missing("Spectral_Information@physicalBand"))?;
                let band_id = element
                    .attr("bandId")
                    .ok_or_else(|| Error::missing("Spectral_Information@bandId"))?;
                indices.insert(
                    physical.to_string(),
                    parse_number(band_id, "Spectral_Information@bandId")?,
                );
            }
            debug!("Spectral index table has {} bands", indices.len());
            Ok(indices)
        })
    }

    /// Additive radiometric offsets keyed by band id; empty for products without offsets
    pub fn band_offsets(&self) -> Result<&HashMap<u32, f64>> {
        self.band_offsets.get_or_try_init(|| {
            let mut offsets = HashMap::new();
            if let Some(list) = self.root.find("Radiometric_Offset_List") {
                for off in &list.children {
                    let band_id = off
                        .attr("band_id")
                        .ok_or_else(|| Error::missing("RADIO_ADD_OFFSET@band_id"))?;
                    offsets.insert(
                        parse_number(band_id, "RADIO_ADD_OFFSET@band_id")?,
                        parse_number(off.text(), "RADIO_ADD_OFFSET")?,
                    );
                }
            }
            debug!("Radiometric offset table has {} entries", offsets.len());
            Ok(offsets)
        })
    }

    /// Sentinel digital numbers keyed by name (`NODATA`, `SATURATED`)
    pub fn special_values(&self) -> Result<&HashMap<String, f64>> {
        self.special_values.get_or_try_init(|| {
            let mut values = HashMap::new();
            for entry in self.root.find_all("Special_Values") {
                let name = entry
                    .child("SPECIAL_VALUE_TEXT")
                    .ok_or_else(|| Error::missing("Special_Values/SPECIAL_VALUE_TEXT"))?;
                let index: f64 = entry.child_number("SPECIAL_VALUE_INDEX")?;
                values.insert(name.text().to_string(), index);
            }
            Ok(values)
        })
    }

    pub fn no_data(&self) -> Result<f64> {
        self.special_value("NODATA")
    }

    pub fn saturated(&self) -> Result<f64> {
        self.special_value("SATURATED")
    }

    fn special_value(&self, name: &str) -> Result<f64> {
        self.special_values()?
            .get(name)
            .copied()
            .ok_or_else(|| Error::missing(format!("Special_Values {}", name)))
    }

    /// Offset to add to the digital numbers of `band` (e.g. `B01`, `B8A`); zero when the
    /// product lists none for it
    pub fn band_offset(&self, band: &str) -> Result<f64> {
        let info = band_info(band).ok_or_else(|| Error::UnknownBand(band.to_string()))?;
        let band_index = self
            .band_indices()?
            .get(info.physical_band)
            .copied()
            .ok_or_else(|| Error::UnknownBand(band.to_string()))?;
        Ok(self.band_offsets()?.get(&band_index).copied().unwrap_or(0.0))
    }

    /// Everything the calibration formula needs for `band`
    pub fn calibration_params(&self, band: &str, mask_saturated: bool) -> Result<CalibrationParams> {
        Ok(CalibrationParams {
            no_data: self.no_data()?,
            saturated: self.saturated()?,
            offset: self.band_offset(band)?,
            quantification: self.quantification_value()?,
            mask_saturated,
        })
    }

    /// Calibrate raw digital numbers of `band` to percent reflectance
    pub fn calibrate<T>(&self, raw: &Array2<T>, band: &str, mask_saturated: bool) -> Result<Array2<f64>>
    where
        T: Copy + Into<f64> + Send + Sync,
    {
        let params = self.calibration_params(band, mask_saturated)?;
        debug!("Calibrating {} with {:?}", band, params);
        Ok(calibrate(raw, &params))
    }

    /// Calibrate a band decoded by the raster reader
    pub fn calibrate_raw(&self, raw: &RawBand, band: &str, mask_saturated: bool) -> Result<Array2<f64>> {
        match raw {
            RawBand::U8(data) => self.calibrate(data, band, mask_saturated),
            RawBand::U16(data) => self.calibrate(data, band, mask_saturated),
        }
    }
}
