//! Parser pour la couche de limites (GeoJSON FeatureCollection)

use geo::{BoundingRect, Coord, Geometry, Rect};
use geojson::{GeoJson, JsonObject};
use tracing::{debug, warn};

use super::decode_text;
use crate::parser::codes::AREA_ID_COLUMN;
use crate::types::{canonical_json_key, ParseOutcome};
use crate::{LandcoverError, Result};

/// Une feature de la couche de limites
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    /// Clé canonique de la propriété `id_area`
    pub id_area: Option<String>,

    pub geometry: Geometry<f64>,

    pub properties: JsonObject,

    /// Emprise de la géométrie (jamais vide)
    pub bounds: Rect<f64>,
}

/// Couche de limites d'une source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryLayer {
    pub features: Vec<BoundaryFeature>,
}

impl BoundaryLayer {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Emprise de toute la couche
    pub fn bounds(&self) -> Option<Rect<f64>> {
        merge_bounds(self.features.iter().map(|f| f.bounds))
    }
}

/// Union d'emprises
pub fn merge_bounds(rects: impl IntoIterator<Item = Rect<f64>>) -> Option<Rect<f64>> {
    rects.into_iter().reduce(|a, b| {
        Rect::new(
            Coord {
                x: a.min().x.min(b.min().x),
                y: a.min().y.min(b.min().y),
            },
            Coord {
                x: a.max().x.max(b.max().x),
                y: a.max().y.max(b.max().y),
            },
        )
    })
}

/// Convertit une feature GeoJSON ; rejette les géométries absentes, vides
/// ou de type GeometryCollection.
fn convert_feature(feature: geojson::Feature, index: usize) -> Result<BoundaryFeature> {
    let properties = feature.properties.unwrap_or_default();
    let id_area = properties.get(AREA_ID_COLUMN).and_then(canonical_json_key);
    let label = id_area
        .clone()
        .unwrap_or_else(|| format!("feature #{index}"));

    let Some(geometry) = feature.geometry else {
        return Err(LandcoverError::invalid_geometry(label, "missing geometry"));
    };

    let geometry = Geometry::<f64>::try_from(geometry)
        .map_err(|e| LandcoverError::invalid_geometry(&label, e.to_string()))?;

    if matches!(geometry, Geometry::GeometryCollection(_)) {
        return Err(LandcoverError::invalid_geometry(
            label,
            "GeometryCollection not supported",
        ));
    }

    let Some(bounds) = geometry.bounding_rect() else {
        return Err(LandcoverError::invalid_geometry(label, "empty coordinates"));
    };

    Ok(BoundaryFeature {
        id_area,
        geometry,
        properties,
        bounds,
    })
}

/// Parse une couche GeoJSON.
///
/// Les features invalides sont ignorées et signalées dans les erreurs non fatales.
///
/// # Errors
///
/// `InvalidGeoJson` si le document est illisible ou n'est pas une collection.
pub fn parse(data: &[u8], file: &str) -> Result<ParseOutcome<BoundaryLayer>> {
    let text = decode_text(data);
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| LandcoverError::InvalidGeoJson(format!("{file}: {e}")))?;

    let features = match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(LandcoverError::InvalidGeoJson(format!(
                "{file}: expected a FeatureCollection, found a bare geometry"
            )))
        }
    };

    let mut outcome = ParseOutcome::new(BoundaryLayer::default());
    for (index, feature) in features.into_iter().enumerate() {
        match convert_feature(feature, index) {
            Ok(feature) => outcome.value.features.push(feature),
            Err(e) => outcome.errors.push(e),
        }
    }

    if !outcome.errors.is_empty() {
        warn!(
            file = file,
            rejected = outcome.errors.len(),
            "Rejected invalid boundary features"
        );
    }
    debug!(file = file, features = outcome.value.len(), "Parsed boundary layer");

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYER: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"id_area": 99, "nombre": "Leticia"},
                "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [0.0, 0.0]]]}
            },
            {
                "type": "Feature",
                "properties": {"id_area": "100"},
                "geometry": {"type": "Point", "coordinates": [5.0, -3.0]}
            },
            {
                "type": "Feature",
                "properties": {"id_area": 101},
                "geometry": null
            },
            {
                "type": "Feature",
                "properties": {"id_area": 102},
                "geometry": {"type": "MultiPolygon", "coordinates": []}
            }
        ]
    }"#;

    #[test]
    fn test_parse_layer() {
        let outcome = parse(LAYER.as_bytes(), "layer.geojson").unwrap();
        let layer = outcome.value;

        assert_eq!(layer.len(), 2);
        assert_eq!(layer.features[0].id_area.as_deref(), Some("99"));
        assert_eq!(layer.features[1].id_area.as_deref(), Some("100"));
        assert!(matches!(layer.features[0].geometry, Geometry::Polygon(_)));
        assert_eq!(
            layer.features[0].properties.get("nombre").and_then(|v| v.as_str()),
            Some("Leticia")
        );
        assert_eq!(outcome.errors.len(), 2);
    }

    #[test]
    fn test_layer_bounds() {
        let layer = parse(LAYER.as_bytes(), "layer.geojson").unwrap().value;
        let bounds = layer.bounds().unwrap();

        assert_eq!(bounds.min(), Coord { x: 0.0, y: -3.0 });
        assert_eq!(bounds.max(), Coord { x: 5.0, y: 1.0 });
        assert_eq!(BoundaryLayer::default().bounds(), None);
    }

    #[test]
    fn test_invalid_json() {
        let err = parse(b"{not json", "broken.geojson").unwrap_err();
        assert!(matches!(err, LandcoverError::InvalidGeoJson(_)));
    }

    #[test]
    fn test_bare_geometry_rejected() {
        let data = br#"{"type": "Point", "coordinates": [1.0, 2.0]}"#;
        let err = parse(data, "point.geojson").unwrap_err();
        assert!(matches!(err, LandcoverError::InvalidGeoJson(_)));
    }
}
