use log::{debug, warn};

use crate::types::{EpsgCode, FeatureSet};

/// Serializes the feature set as a pretty-printed GeoJSON FeatureCollection.
///
/// Features keep their order and coordinates are written as given. Property
/// keys come out sorted, so equal inputs always give byte-identical output.
/// `epsg` is the CRS the coordinates are in; GeoJSON has no member for it, the
/// code travels in each feature's `epsg` property instead.
pub fn to_geojson(features: &FeatureSet, epsg: EpsgCode) -> String {
    match serde_json::to_string_pretty(features) {
        Ok(json) => {
            debug!("Encoded {} feature(s) as GeoJSON in {}", features.len(), epsg);
            json
        }
        Err(e) => {
            warn!("Failed to serialize GeoJSON: {e}");
            String::new()
        }
    }
}
