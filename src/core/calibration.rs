//! Digital number to top-of-atmosphere reflectance conversion.
use ndarray::{Array2, Zip};
use serde::Serialize;

/// Constants of the per-band calibration formula
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationParams {
    pub no_data: f64,
    pub saturated: f64,
    pub offset: f64,
    pub quantification: f64,
    pub mask_saturated: bool,
}

impl CalibrationParams {
    /// Calibrate one digital number.
    ///
    /// `NODATA` becomes NaN; `SATURATED` becomes `+inf` when masking is on. Everything else
    /// is `(dn + offset) / quantification * 100`.
    #[inline]
    pub fn apply(&self, dn: f64) -> f64 {
        if dn == self.no_data {
            f64::NAN
        } else if self.mask_saturated && dn == self.saturated {
            f64::INFINITY
        } else {
            (dn + self.offset) / self.quantification * 100.0
        }
    }
}

/// Calibrate a whole grid, in parallel, into a new array of the same shape
pub fn calibrate<T>(raw: &Array2<T>, params: &CalibrationParams) -> Array2<f64>
where
    T: Copy + Into<f64> + Send + Sync,
{
    Zip::from(raw).par_map_collect(|&dn| params.apply(dn.into()))
}
