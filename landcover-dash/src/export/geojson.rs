//! Export de la couche jointe en GeoJSON (streaming, une feature à la fois)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use landcover::parser::boundary::BoundaryFeature;
use landcover::FeatureSummary;
use serde_json::{Map, Value};

/// Exporte les features affichables avec le contenu de leur popup en propriétés
pub fn export_to_geojson(
    features: &[(&BoundaryFeature, FeatureSummary)],
    output_path: &Path,
) -> Result<()> {
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    write!(writer, r#"{{"type":"FeatureCollection","features":["#)?;

    for (i, (feature, summary)) in features.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(&mut writer, feature, summary)?;
    }

    write!(writer, "]}}")?;
    writer.flush()?;

    Ok(())
}

/// Propriétés d'une feature exportée
fn feature_properties(feature: &BoundaryFeature, summary: &FeatureSummary) -> Map<String, Value> {
    let mut properties = feature.properties.clone();

    if let Some(territory) = &summary.territory {
        properties.insert("territory".into(), Value::from(territory.as_str()));
    }
    if let Some(name) = &summary.name {
        properties.insert("name".into(), Value::from(name.as_str()));
    }
    properties.insert("total_area".into(), Value::from(summary.total_area));
    if let Some((first, last)) = summary.year_span {
        properties.insert("year_start".into(), Value::from(first));
        properties.insert("year_end".into(), Value::from(last));
    }
    for (column, value) in &summary.metadata {
        properties
            .entry(column.clone())
            .or_insert_with(|| Value::from(value.as_str()));
    }

    properties
}

/// Écrit une feature en GeoJSON
fn write_feature<W: Write>(
    writer: &mut W,
    feature: &BoundaryFeature,
    summary: &FeatureSummary,
) -> Result<()> {
    let geometry = ::geojson::Geometry::new(::geojson::Value::from(&feature.geometry));
    let output = ::geojson::Feature {
        bbox: None,
        geometry: Some(geometry),
        id: feature
            .id_area
            .as_ref()
            .map(|id| ::geojson::feature::Id::String(id.clone())),
        properties: Some(feature_properties(feature, summary)),
        foreign_members: None,
    };

    serde_json::to_writer(writer, &output).context("Failed to serialize feature")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry, Point, Rect};
    use std::io::Cursor;

    fn feature() -> BoundaryFeature {
        let point = Point::new(-70.0, -4.0);
        let mut properties = Map::new();
        properties.insert("id_area".into(), Value::from(99));
        BoundaryFeature {
            id_area: Some("99".into()),
            geometry: Geometry::Point(point),
            properties,
            bounds: Rect::new(point.0, point.0),
        }
    }

    fn summary() -> FeatureSummary {
        FeatureSummary {
            id_area: Some("99".into()),
            territory: Some("A1".into()),
            name: Some("R.I. Nukak".into()),
            metadata: vec![("departamento".into(), "Guaviare".into())],
            total_area: 12.5,
            year_span: Some((2000, 2020)),
            series: Vec::new(),
        }
    }

    #[test]
    fn test_write_feature() {
        let mut buffer = Cursor::new(Vec::new());
        write_feature(&mut buffer, &feature(), &summary()).unwrap();

        let json: Value = serde_json::from_slice(&buffer.into_inner()).unwrap();
        assert_eq!(json["type"], "Feature");
        assert_eq!(json["id"], "99");
        assert_eq!(json["geometry"]["type"], "Point");
        assert_eq!(json["properties"]["territory"], "A1");
        assert_eq!(json["properties"]["departamento"], "Guaviare");
        assert_eq!(json["properties"]["year_end"], 2020);
    }

    #[test]
    fn test_export_to_geojson() {
        let feature = feature();
        let features = vec![(&feature, summary())];

        let output_path = std::env::temp_dir()
            .join(format!("test_landcover_export_{}.geojson", std::process::id()));
        export_to_geojson(&features, &output_path).unwrap();

        let content = std::fs::read_to_string(&output_path).unwrap();
        let json: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"].as_array().map(Vec::len), Some(1));

        std::fs::remove_file(output_path).ok();
    }
}
