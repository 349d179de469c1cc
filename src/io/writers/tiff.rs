use gdal::Dataset;
use gdal::DriverManager;
use gdal::raster::{Buffer, ColorInterpretation};
use ndarray::Array2;
use std::path::Path;
use tracing::debug;

/// Write a single-band float32 GeoTIFF; NaN marks missing pixels
pub fn write_geotiff_f32(
    output: &Path,
    data: &Array2<f64>,
) -> Result<Dataset, Box<dyn std::error::Error>> {
    let (rows, cols) = data.dim();
    debug!("Writing {}x{} float32 GeoTIFF to {:?}", cols, rows, output);
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let ds = driver.create_with_band_type::<f32, _>(output, cols, rows, 1)?;
    let values: Vec<f32> = data.iter().map(|&v| v as f32).collect();
    let mut buf = Buffer::new((cols, rows), values);
    {
        let mut band = ds.rasterband(1)?;
        band.set_color_interpretation(ColorInterpretation::GrayIndex)?;
        band.set_no_data_value(Some(f64::NAN))?;
        band.write((0, 0), (cols, rows), &mut buf)?;
    }
    Ok(ds)
}
