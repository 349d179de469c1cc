//! Core building blocks: radiometric calibration, angle grid reconstruction, tile
//! geocoding and reader options. These are pure in-memory primitives consumed by the
//! metadata handles in `io` and the high-level `api` module.
pub mod angles;
pub mod calibration;
pub mod geocoding;
pub mod params;
