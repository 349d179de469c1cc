use gdal::Dataset;
use gdal::Metadata;
use ndarray::Array2;
use serde_json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::types::DatasetAttrs;

/// Flatten dataset attributes into upper-case key/value pairs
pub fn extract_metadata_fields(attrs: &DatasetAttrs) -> HashMap<String, String> {
    let mut metadata = HashMap::new();

    metadata.insert("NAME".to_string(), attrs.name.clone());
    metadata.insert("UNITS".to_string(), attrs.units.clone());
    metadata.insert("PLATFORM".to_string(), attrs.platform_name.clone());
    metadata.insert("START_TIME".to_string(), attrs.start_time.to_rfc3339());
    metadata.insert("END_TIME".to_string(), attrs.end_time.to_rfc3339());
    metadata.insert("RESOLUTION".to_string(), attrs.resolution.to_string());
    if let Some(band) = &attrs.band {
        metadata.insert("BAND".to_string(), band.clone());
    }

    // Footprint
    metadata.insert("AREA_ID".to_string(), attrs.area.area_id.clone());
    metadata.insert("CRS".to_string(), attrs.area.crs.code().to_string());
    metadata.insert("WIDTH".to_string(), attrs.area.width.to_string());
    metadata.insert("HEIGHT".to_string(), attrs.area.height.to_string());

    // Conversion provenance
    metadata.insert("CONVERSION_TOOL".to_string(), "MSIPRO".to_string());
    metadata.insert(
        "CONVERSION_VERSION".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    metadata.insert(
        "CONVERSION_TIMESTAMP".to_string(),
        chrono::Utc::now().to_rfc3339(),
    );

    metadata
}

/// Convert metadata HashMap to JSON format
pub fn convert_metadata_to_json(
    metadata: &HashMap<String, String>,
) -> HashMap<String, serde_json::Value> {
    let mut json_metadata = HashMap::new();

    for (key, value) in metadata {
        // Convert key to lowercase for JSON format
        let json_key = key.to_lowercase();

        let json_value = match value.parse::<u64>() {
            Ok(num) => serde_json::Value::Number(serde_json::Number::from(num)),
            Err(_) => match value.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                Some(num) => serde_json::Value::Number(num),
                None => serde_json::Value::String(value.clone()),
            },
        };
        json_metadata.insert(json_key, json_value);
    }

    json_metadata
}

/// Add the fields that are arrays or objects rather than flat strings
pub fn add_special_json_fields(
    json_metadata: &mut HashMap<String, serde_json::Value>,
    attrs: &DatasetAttrs,
) {
    let numbers = |values: &[f64]| {
        serde_json::Value::Array(
            values
                .iter()
                .filter_map(|&v| serde_json::Number::from_f64(v))
                .map(serde_json::Value::Number)
                .collect(),
        )
    };
    json_metadata.insert(
        "geotransform".to_string(),
        numbers(&attrs.area.geotransform()),
    );
    let (left, bottom, right, top) = attrs.area.extent.as_tuple();
    json_metadata.insert("area_extent".to_string(), numbers(&[left, bottom, right, top]));
    if let Some(wkt) = attrs.area.crs.wkt() {
        json_metadata.insert("crs_wkt".to_string(), serde_json::Value::String(wkt.to_string()));
    }
}

/// Build the full JSON document for a dataset
pub fn metadata_json(attrs: &DatasetAttrs) -> HashMap<String, serde_json::Value> {
    let metadata = extract_metadata_fields(attrs);
    let mut json_metadata = convert_metadata_to_json(&metadata);
    add_special_json_fields(&mut json_metadata, attrs);
    json_metadata
}

/// Embed georeferencing and dataset attributes into a GeoTIFF dataset
pub fn embed_tiff_metadata(
    ds: &mut Dataset,
    attrs: &DatasetAttrs,
) -> Result<(), Box<dyn std::error::Error>> {
    ds.set_geo_transform(&attrs.area.geotransform())?;
    // Only a resolved reference carries a definition GDAL can store
    if let Some(wkt) = attrs.area.crs.wkt() {
        ds.set_projection(wkt)?;
    }

    for (key, value) in extract_metadata_fields(attrs) {
        ds.set_metadata_item(&key, &value, "")?;
    }

    Ok(())
}

/// Write `<output>.json` next to an output raster
pub fn write_json_sidecar(
    output_path: &Path,
    attrs: &DatasetAttrs,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let sidecar_path = output_path.with_extension("json");
    let json_string = serde_json::to_string_pretty(&metadata_json(attrs))?;
    std::fs::write(&sidecar_path, json_string)?;
    info!("Created metadata sidecar: {:?}", sidecar_path);
    Ok(sidecar_path)
}

/// Write attributes and values as one JSON document; non-finite values become `null`
pub fn write_json_dataset(
    output_path: &Path,
    attrs: &DatasetAttrs,
    data: &Array2<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut json_metadata = metadata_json(attrs);
    let rows: Vec<serde_json::Value> = data
        .outer_iter()
        .map(|row| {
            serde_json::Value::Array(
                row.iter()
                    .map(|&v| {
                        serde_json::Number::from_f64(v)
                            .map(serde_json::Value::Number)
                            .unwrap_or(serde_json::Value::Null)
                    })
                    .collect(),
            )
        })
        .collect();
    json_metadata.insert("data".to_string(), serde_json::Value::Array(rows));
    std::fs::write(output_path, serde_json::to_string(&json_metadata)?)?;
    info!("Wrote JSON dataset: {:?}", output_path);
    Ok(())
}
