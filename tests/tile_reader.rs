use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use chrono::{TimeZone, Utc};
use ndarray::Array2;

use msipro::{
    AngleKind, CodeOnlyCrsResolver, Error, MsiTile, OutputFormat, RawBand, ReaderOptions,
    save_dataset,
};

const PRODUCT_NAME: &str = "S2A_MSIL1C_20200412T104021_N0209_R008_T31UDQ_20200412T124907.SAFE";
const GRANULE_NAME: &str = "L1C_T31UDQ_A025080_20200412T104020";

const PRODUCT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<n1:Level-1C_User_Product xmlns:n1="https://psd-14.sentinel2.eo.esa.int/PSD/User_Product_Level-1C.xsd">
  <n1:General_Info>
    <Product_Image_Characteristics>
      <Special_Values>
        <SPECIAL_VALUE_TEXT>NODATA</SPECIAL_VALUE_TEXT>
        <SPECIAL_VALUE_INDEX>0</SPECIAL_VALUE_INDEX>
      </Special_Values>
      <Special_Values>
        <SPECIAL_VALUE_TEXT>SATURATED</SPECIAL_VALUE_TEXT>
        <SPECIAL_VALUE_INDEX>65535</SPECIAL_VALUE_INDEX>
      </Special_Values>
      <QUANTIFICATION_VALUE unit="none">10000</QUANTIFICATION_VALUE>
      <Radiometric_Offset_List>
        <RADIO_ADD_OFFSET band_id="3">-1000</RADIO_ADD_OFFSET>
      </Radiometric_Offset_List>
      <Spectral_Information_List>
        <Spectral_Information bandId="0" physicalBand="B1"/>
        <Spectral_Information bandId="3" physicalBand="B4"/>
      </Spectral_Information_List>
    </Product_Image_Characteristics>
  </n1:General_Info>
</n1:Level-1C_User_Product>"#;

const TILE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<n1:Level-1C_Tile_ID xmlns:n1="https://psd-14.sentinel2.eo.esa.int/PSD/S2_PDI_Level-1C_Tile_Metadata.xsd">
  <n1:Geometric_Info>
    <Tile_Geocoding metadataLevel="Brief">
      <HORIZONTAL_CS_CODE>EPSG:32631</HORIZONTAL_CS_CODE>
      <Size resolution="10"><NROWS>6</NROWS><NCOLS>6</NCOLS></Size>
      <Size resolution="60"><NROWS>2</NROWS><NCOLS>2</NCOLS></Size>
      <Geoposition resolution="10"><ULX>499980</ULX><ULY>5700000</ULY><XDIM>10</XDIM><YDIM>-10</YDIM></Geoposition>
      <Geoposition resolution="60"><ULX>499980</ULX><ULY>5700000</ULY><XDIM>60</XDIM><YDIM>-60</YDIM></Geoposition>
    </Tile_Geocoding>
    <Tile_Angles>
      <Sun_Angles_Grid>
        <Zenith>
          <Values_List>
            <VALUES>30 31 32</VALUES>
            <VALUES>33 34 35</VALUES>
            <VALUES>36 37 38</VALUES>
          </Values_List>
        </Zenith>
      </Sun_Angles_Grid>
      <Viewing_Incidence_Angles_Grids bandId="1" detectorId="3">
        <Azimuth>
          <Values_List>
            <VALUES>NaN 100 110</VALUES>
            <VALUES>NaN 100 110</VALUES>
            <VALUES>NaN NaN NaN</VALUES>
          </Values_List>
        </Azimuth>
      </Viewing_Incidence_Angles_Grids>
    </Tile_Angles>
  </n1:Geometric_Info>
</n1:Level-1C_Tile_ID>"#;

fn build_safe(dir: &Path) -> PathBuf {
    let root = dir.join(PRODUCT_NAME);
    let granule = root.join("GRANULE").join(GRANULE_NAME);
    let img = granule.join("IMG_DATA");
    fs::create_dir_all(&img).unwrap();
    fs::write(root.join("MTD_MSIL1C.xml"), PRODUCT_XML).unwrap();
    fs::write(granule.join("MTD_TL.xml"), TILE_XML).unwrap();
    for band in ["B01", "B04", "TCI"] {
        fs::write(img.join(format!("T31UDQ_20200412T104021_{}.jp2", band)), b"").unwrap();
    }
    root
}

fn open(root: &Path, options: &ReaderOptions) -> MsiTile {
    MsiTile::open_with_resolver(root, options, Arc::new(CodeOnlyCrsResolver)).unwrap()
}

#[test]
fn product_level_attributes() {
    let tmp = tempfile::tempdir().unwrap();
    let tile = open(&build_safe(tmp.path()), &ReaderOptions::default());

    assert_eq!(tile.platform_name().unwrap(), "Sentinel-2A");
    let expected = Utc.with_ymd_and_hms(2020, 4, 12, 10, 40, 21).unwrap();
    assert_eq!(tile.start_time(), expected);
    assert_eq!(tile.end_time(), tile.start_time());
    assert_eq!(tile.available_bands(), vec!["B01", "B04"]);
    assert_eq!(tile.granule().tile_number, "31UDQ");
}

#[test]
fn band_footprints_use_native_resolution() {
    let tmp = tempfile::tempdir().unwrap();
    let tile = open(&build_safe(tmp.path()), &ReaderOptions::default());

    let red = tile.area_def("B04").unwrap();
    assert_eq!(red.shape(), (6, 6));
    assert_eq!(red.extent.as_tuple(), (499980.0, 5699940.0, 500040.0, 5700000.0));
    assert_eq!(red.description, "On-the-fly area");
    assert_eq!(red.crs.code(), "EPSG:32631");

    assert_eq!(tile.area_def("B01").unwrap().shape(), (2, 2));
    // B05 is a 20 m band and the tile has no 20 m grid
    assert!(matches!(tile.area_def("B05"), Err(Error::ResolutionNotFound(20))));
    assert!(matches!(tile.area_def("B13"), Err(Error::UnknownBand(_))));
}

#[test]
fn calibrates_decoded_pixels() {
    let tmp = tempfile::tempdir().unwrap();
    let options = ReaderOptions {
        mask_saturated: true,
        ..ReaderOptions::default()
    };
    let tile = open(&build_safe(tmp.path()), &options);

    let mut raw = Array2::<u16>::from_elem((6, 6), 3000);
    raw[[0, 0]] = 0;
    raw[[5, 5]] = 65535;
    let red = tile.calibrate_band("B04", &RawBand::U16(raw)).unwrap();

    assert_eq!(red.name, "B04");
    assert_eq!(red.attrs.units, "%");
    assert_eq!(red.attrs.band.as_deref(), Some("B04"));
    assert_eq!(red.attrs.resolution, 10);
    assert_eq!(red.attrs.platform_name, "Sentinel-2A");
    assert!(red.data[[0, 0]].is_nan());
    assert_eq!(red.data[[5, 5]], f64::INFINITY);
    assert_abs_diff_eq!(red.data[[2, 3]], 20.0, epsilon = 1e-12);

    // B01 carries no offset
    let raw = Array2::<u16>::from_elem((2, 2), 3000);
    let aerosol = tile.calibrate_band("B01", &RawBand::U16(raw)).unwrap();
    assert_abs_diff_eq!(aerosol.data[[1, 1]], 30.0, epsilon = 1e-12);
}

#[test]
fn rejects_mismatched_or_missing_bands() {
    let tmp = tempfile::tempdir().unwrap();
    let tile = open(&build_safe(tmp.path()), &ReaderOptions::default());

    let wrong = RawBand::U8(Array2::<u8>::zeros((3, 3)));
    assert!(matches!(tile.calibrate_band("B04", &wrong), Err(Error::Processing(_))));
    assert!(matches!(tile.load_band("B13"), Err(Error::UnknownBand(_))));
    // no image for B02 in this granule
    assert!(matches!(tile.load_band("B02"), Err(Error::UnknownBand(_))));
}

#[test]
fn angle_datasets() {
    let tmp = tempfile::tempdir().unwrap();
    let options = ReaderOptions {
        resolution: Some(60),
        ..ReaderOptions::default()
    };
    let tile = open(&build_safe(tmp.path()), &options);

    let sza = tile.load_angles(AngleKind::SolarZenith, None).unwrap().unwrap();
    assert_eq!(sza.name, "solar_zenith_angle");
    assert_eq!(sza.attrs.units, "degrees");
    assert_eq!(sza.attrs.band, None);
    assert_eq!(sza.data.dim(), (2, 2));
    assert_abs_diff_eq!(sza.data[[0, 0]], 30.0, epsilon = 1e-12);
    assert_abs_diff_eq!(sza.data[[1, 1]], 38.0, epsilon = 1e-12);

    let full = tile.load_angles(AngleKind::SolarZenith, Some(10)).unwrap().unwrap();
    assert_eq!(full.data.dim(), (6, 6));
    assert_abs_diff_eq!(full.data[[5, 0]], 36.0, epsilon = 1e-12);

    // gap-filled along rows, then down the empty last row
    let vaa = tile.load_angles(AngleKind::SatelliteAzimuth, None).unwrap().unwrap();
    assert!(vaa.data.iter().all(|v| v.is_finite()));
    assert_abs_diff_eq!(vaa.data[[0, 0]], 100.0, epsilon = 1e-12);
    assert_abs_diff_eq!(vaa.data[[1, 1]], 110.0, epsilon = 1e-12);

    assert!(tile.load_angles(AngleKind::SatelliteZenith, None).unwrap().is_none());
    assert!(matches!(
        tile.load_angles(AngleKind::SolarAzimuth, Some(20)),
        Err(Error::ResolutionNotFound(20))
    ));
}

#[test]
fn angles_need_a_resolution() {
    let tmp = tempfile::tempdir().unwrap();
    let tile = open(&build_safe(tmp.path()), &ReaderOptions::default());
    assert!(matches!(
        tile.load_angles(AngleKind::SolarZenith, None),
        Err(Error::InvalidArgument { arg: "resolution", .. })
    ));
}

#[test]
fn selects_granule_by_tile_id() {
    let tmp = tempfile::tempdir().unwrap();
    let root = build_safe(tmp.path());
    let options = ReaderOptions {
        tile_id: Some("T31UDQ".to_string()),
        ..ReaderOptions::default()
    };
    assert_eq!(open(&root, &options).granule().tile_number, "31UDQ");

    let options = ReaderOptions {
        tile_id: Some("32TNS".to_string()),
        ..ReaderOptions::default()
    };
    assert!(MsiTile::open_with_resolver(&root, &options, Arc::new(CodeOnlyCrsResolver)).is_err());
}

#[test]
fn saves_angles_as_json() {
    let tmp = tempfile::tempdir().unwrap();
    let tile = open(&build_safe(tmp.path()), &ReaderOptions::default());
    let sza = tile.load_angles(AngleKind::SolarZenith, Some(60)).unwrap().unwrap();

    let out = tmp.path().join("sza.json");
    save_dataset(&sza, &out, OutputFormat::JSON).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(parsed["units"], serde_json::json!("degrees"));
    assert_eq!(parsed["platform"], serde_json::json!("Sentinel-2A"));
    assert_eq!(parsed["data"][1][1], serde_json::json!(38.0));
}
