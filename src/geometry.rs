// 🧭 Municipal Geometry
// GeoJSON boundary polygons keyed by municipality name. Read once, never
// mutated; handed to the renderer as-is.

use crate::error::{IngestionError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::Read;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MunicipalityShape {
    pub name: String,
    /// Original GeoJSON feature, properties included
    pub feature: Value,
}

/// Axis-aligned extent in lon/lat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    fn include(&mut self, lon: f64, lat: f64) {
        self.min_lon = self.min_lon.min(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lon = self.max_lon.max(lon);
        self.max_lat = self.max_lat.max(lat);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeometryCollection {
    shapes: Vec<MunicipalityShape>,
}

impl GeometryCollection {
    /// Parse a FeatureCollection whose features carry `name_property`.
    ///
    /// Duplicate names keep the first feature.
    pub fn from_reader<R: Read>(reader: R, name_property: &str, source: &str) -> Result<Self> {
        let root: Value = serde_json::from_reader(reader)
            .map_err(|e| IngestionError::unexpected(format!("{}: invalid GeoJSON: {}", source, e)))?;
        Self::from_value(root, name_property, source)
    }

    pub fn from_value(root: Value, name_property: &str, source: &str) -> Result<Self> {
        let invalid = |detail: String| IngestionError::unexpected(format!("{}: {}", source, detail));

        if root.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err(invalid("expected a FeatureCollection".to_string()));
        }
        let features = root
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("FeatureCollection has no 'features' array".to_string()))?;

        let mut shapes: Vec<MunicipalityShape> = Vec::with_capacity(features.len());
        for (idx, feature) in features.iter().enumerate() {
            let geometry_type = feature
                .get("geometry")
                .and_then(|g| g.get("type"))
                .and_then(Value::as_str)
                .unwrap_or("");
            if geometry_type != "Polygon" && geometry_type != "MultiPolygon" {
                return Err(invalid(format!(
                    "feature {} has unsupported geometry '{}'",
                    idx, geometry_type
                )));
            }

            let name = feature
                .get("properties")
                .and_then(|p| p.get(name_property))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| invalid(format!("feature {} has no '{}' property", idx, name_property)))?;

            if shapes.iter().any(|s| s.name == name) {
                warn!(source, municipality = name, "duplicate geometry feature ignored");
                continue;
            }
            shapes.push(MunicipalityShape {
                name: name.to_string(),
                feature: feature.clone(),
            });
        }

        debug!(source, features = shapes.len(), "geometry parsed");
        Ok(GeometryCollection { shapes })
    }

    pub fn get(&self, name: &str) -> Option<&MunicipalityShape> {
        self.shapes.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.shapes.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// FeatureCollection pass-through for the renderer
    pub fn to_geojson(&self) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": self.shapes.iter().map(|s| s.feature.clone()).collect::<Vec<_>>(),
        })
    }

    /// Extent of every coordinate; `None` without features
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut bbox: Option<BoundingBox> = None;
        for shape in &self.shapes {
            if let Some(coords) = shape.feature.get("geometry").and_then(|g| g.get("coordinates")) {
                visit_positions(coords, &mut |lon: f64, lat: f64| match bbox.as_mut() {
                    Some(b) => b.include(lon, lat),
                    None => {
                        bbox = Some(BoundingBox {
                            min_lon: lon,
                            min_lat: lat,
                            max_lon: lon,
                            max_lat: lat,
                        })
                    }
                });
            }
        }
        bbox
    }
}

/// Walk nested coordinate arrays down to [lon, lat] positions
fn visit_positions(value: &Value, visit: &mut dyn FnMut(f64, f64)) {
    if let Some(items) = value.as_array() {
        match (items.first().and_then(Value::as_f64), items.get(1).and_then(Value::as_f64)) {
            (Some(lon), Some(lat)) => visit(lon, lat),
            _ => {
                for item in items {
                    visit_positions(item, visit);
                }
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    pub(crate) fn feature(name: &str, lon: f64, lat: f64) -> Value {
        json!({
            "type": "Feature",
            "properties": { "NM_MUN": name, "CD_MUN": "3200000" },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [lon, lat], [lon + 0.1, lat], [lon + 0.1, lat + 0.1], [lon, lat]
                ]]
            }
        })
    }

    pub(crate) fn collection(features: Vec<Value>) -> String {
        json!({ "type": "FeatureCollection", "features": features }).to_string()
    }

    #[test]
    fn test_parse_features_by_name() {
        let text = collection(vec![feature("Alegre", -41.5, -20.8), feature("Iúna", -41.6, -20.4)]);
        let geo = GeometryCollection::from_reader(text.as_bytes(), "NM_MUN", "map.geojson").unwrap();

        assert_eq!(geo.len(), 2);
        assert_eq!(geo.names(), vec!["Alegre", "Iúna"]);
        assert!(geo.get("Alegre").is_some());
        assert!(geo.get("alegre").is_none());
    }

    #[test]
    fn test_duplicate_name_keeps_first() {
        let text = collection(vec![feature("Alegre", -41.5, -20.8), feature("Alegre", 0.0, 0.0)]);
        let geo = GeometryCollection::from_reader(text.as_bytes(), "NM_MUN", "map.geojson").unwrap();
        assert_eq!(geo.len(), 1);
        let bbox = geo.bounding_box().unwrap();
        assert_eq!(bbox.min_lon, -41.5);
    }

    #[test]
    fn test_invalid_json_is_unexpected() {
        let err = GeometryCollection::from_reader("{not json".as_bytes(), "NM_MUN", "map.geojson")
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnexpectedIngestion);
    }

    #[test]
    fn test_wrong_root_and_geometry_rejected() {
        let err = GeometryCollection::from_reader(r#"{"type":"Feature"}"#.as_bytes(), "NM_MUN", "m")
            .unwrap_err();
        assert!(err.to_string().contains("FeatureCollection"));

        let point = json!({
            "type": "Feature",
            "properties": { "NM_MUN": "Alegre" },
            "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }
        });
        let err = GeometryCollection::from_reader(collection(vec![point]).as_bytes(), "NM_MUN", "m")
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnexpectedIngestion);
        assert!(err.to_string().contains("Point"));
    }

    #[test]
    fn test_missing_name_property_rejected() {
        let text = collection(vec![feature("Alegre", 0.0, 0.0)]);
        let err = GeometryCollection::from_reader(text.as_bytes(), "NAME", "m").unwrap_err();
        assert!(err.to_string().contains("NAME"));
    }

    #[test]
    fn test_bounding_box_and_center() {
        let text = collection(vec![feature("A", -42.0, -21.0), feature("B", -41.0, -20.0)]);
        let geo = GeometryCollection::from_reader(text.as_bytes(), "NM_MUN", "m").unwrap();
        let bbox = geo.bounding_box().unwrap();

        assert_eq!(bbox.min_lon, -42.0);
        assert_eq!(bbox.min_lat, -21.0);
        assert!((bbox.max_lon - -40.9).abs() < 1e-9);
        assert!((bbox.max_lat - -19.9).abs() < 1e-9);
        let (lon, lat) = bbox.center();
        assert!((lon - -41.45).abs() < 1e-9);
        assert!((lat - -20.45).abs() < 1e-9);

        assert!(GeometryCollection::default().bounding_box().is_none());
    }

    #[test]
    fn test_geojson_pass_through() {
        let text = collection(vec![feature("A", 0.0, 0.0)]);
        let geo = GeometryCollection::from_reader(text.as_bytes(), "NM_MUN", "m").unwrap();
        let out = geo.to_geojson();
        assert_eq!(out["type"], "FeatureCollection");
        assert_eq!(out["features"][0]["properties"]["CD_MUN"], "3200000");
    }
}
