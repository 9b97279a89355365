//! Résolution territoire <-> feature de la couche de limites, noms d'affichage

use std::sync::OnceLock;

use regex::Regex;

use crate::parser::boundary::{BoundaryFeature, BoundaryLayer};
use crate::parser::codes::{AreaIdCollision, MappingEntry};
use crate::store::RecordStore;
use crate::types::{canonical_key, Record};
use crate::{LandcoverError, Result};

/// Abréviation appliquée aux noms de resguardos
const RESGUARDO_ABBREVIATION: &str = "R.I.";

fn resguardo_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)(?:RI-)?Resguardo Ind[ií]gena").ok())
        .as_ref()
}

/// Normalisation cosmétique des noms de territoires
pub fn normalize_display_name(name: &str) -> String {
    match resguardo_pattern() {
        Some(pattern) => pattern
            .replace_all(name, RESGUARDO_ABBREVIATION)
            .into_owned(),
        None => name.to_string(),
    }
}

/// Résolveur lié au store de la source courante
#[derive(Debug, Clone, Copy)]
pub struct TerritoryResolver<'a> {
    store: &'a RecordStore,
}

impl RecordStore {
    pub fn resolver(&self) -> TerritoryResolver<'_> {
        TerritoryResolver { store: self }
    }
}

impl<'a> TerritoryResolver<'a> {
    /// Nom d'affichage : colonne `barchart` de la correspondance, puis table
    /// des noms, puis clé brute ; toujours normalisé.
    pub fn resolve_display_name(&self, territory: &str) -> String {
        let from_mapping = self
            .store
            .config()
            .barchart
            .as_deref()
            .and_then(|column| self.store.mapping().get(territory)?.get(column))
            .filter(|name| !name.is_empty());

        let name = from_mapping
            .or_else(|| self.store.territory_names().get(territory))
            .unwrap_or(territory);

        normalize_display_name(name)
    }

    /// Entrée de correspondance d'un territoire
    pub fn mapping_entry(&self, territory: &str) -> Option<&'a MappingEntry> {
        self.store.mapping().get(territory)
    }

    /// Territoire du tableau correspondant à un id_area (première entrée
    /// dans l'ordre du fichier)
    pub fn resolve_territory_from_area_id(&self, id_area: &str) -> Option<&'a str> {
        let id_area = canonical_key(id_area);
        self.store
            .mapping()
            .entries()
            .iter()
            .find(|entry| entry.area_id() == Some(id_area.as_str()))
            .map(|entry| entry.key.as_str())
    }

    /// id_area revendiqués par plusieurs entrées de correspondance
    pub fn area_id_collisions(&self) -> &'a [AreaIdCollision] {
        self.store.mapping().collisions()
    }

    /// Comme `resolve_territory_from_area_id`, mais signale les collisions
    ///
    /// # Errors
    ///
    /// `AmbiguousAreaId` si plusieurs entrées revendiquent cet id_area.
    pub fn resolve_territory_strict(&self, id_area: &str) -> Result<Option<&'a str>> {
        let id_area = canonical_key(id_area);
        if let Some(collision) = self
            .store
            .mapping()
            .collisions()
            .iter()
            .find(|c| c.id_area == id_area)
        {
            return Err(LandcoverError::from(collision));
        }
        Ok(self.resolve_territory_from_area_id(&id_area))
    }

    /// La feature correspond à au moins une ligne valide
    pub fn has_matching_records(&self, id_area: &str) -> bool {
        self.resolve_territory_from_area_id(id_area)
            .is_some_and(|territory| self.store.contains_territory(territory))
    }

    /// Territoire associé à une feature
    pub fn feature_territory(&self, feature: &BoundaryFeature) -> Option<&'a str> {
        feature
            .id_area
            .as_deref()
            .and_then(|id| self.resolve_territory_from_area_id(id))
    }

    /// Features affichables (avec des lignes valides), dans l'ordre de la couche
    pub fn visible_features<'l>(&self, layer: &'l BoundaryLayer) -> Vec<&'l BoundaryFeature> {
        layer
            .features
            .iter()
            .filter(|f| {
                f.id_area
                    .as_deref()
                    .is_some_and(|id| self.has_matching_records(id))
            })
            .collect()
    }

    /// Toutes les lignes d'une feature, sans les filtres du tableau de bord
    pub fn feature_records(&self, feature: &BoundaryFeature) -> Vec<&'a Record> {
        let Some(territory) = self.feature_territory(feature) else {
            return Vec::new();
        };
        self.store
            .records()
            .iter()
            .filter(|r| r.territory == territory)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::codes::{parse_names, SpatialTabularMapping, TerritoryNameTable};
    use crate::types::SourceConfig;

    fn entry(key: &str, id_area: &str, name: &str) -> MappingEntry {
        MappingEntry {
            key: key.into(),
            columns: vec![
                ("id_gee".into(), key.into()),
                ("id_area".into(), id_area.into()),
                ("nombre".into(), name.into()),
            ],
        }
    }

    fn store(entries: Vec<MappingEntry>, names: TerritoryNameTable) -> RecordStore {
        RecordStore::new(
            "TEST",
            SourceConfig {
                barchart: Some("nombre".into()),
                ..Default::default()
            },
            vec![
                Record::new("A1", 3, 2000, 10.0),
                Record::new("A2", 3, 2000, 0.0),
                Record::new("7", 3, 2000, 1.0),
                Record::new("8", 3, 2000, 1.0),
            ],
            names,
            SpatialTabularMapping::from_entries(entries),
        )
    }

    #[test]
    fn test_resolve_territory_from_area_id() {
        let store = store(vec![entry("A1", "99", "Leticia")], TerritoryNameTable::default());
        let resolver = store.resolver();

        assert_eq!(resolver.resolve_territory_from_area_id("99"), Some("A1"));
        assert_eq!(resolver.resolve_territory_from_area_id("99.0"), Some("A1"));
        assert_eq!(resolver.resolve_territory_from_area_id("100"), None);
    }

    #[test]
    fn test_first_match_wins_on_collision() {
        let store = store(
            vec![entry("A1", "99", "One"), entry("A2", "99", "Two")],
            TerritoryNameTable::default(),
        );
        let resolver = store.resolver();

        assert_eq!(resolver.resolve_territory_from_area_id("99"), Some("A1"));
        assert_eq!(resolver.area_id_collisions().len(), 1);
        assert!(matches!(
            resolver.resolve_territory_strict("99"),
            Err(LandcoverError::AmbiguousAreaId { .. })
        ));
    }

    #[test]
    fn test_strict_resolution_without_collision() {
        let store = store(vec![entry("A1", "99", "One")], TerritoryNameTable::default());
        assert_eq!(store.resolver().resolve_territory_strict("99"), Ok(Some("A1")));
        assert_eq!(store.resolver().resolve_territory_strict("5"), Ok(None));
    }

    #[test]
    fn test_has_matching_records() {
        let store = store(
            vec![entry("A1", "99", "One"), entry("A2", "98", "Zero area")],
            TerritoryNameTable::default(),
        );
        let resolver = store.resolver();

        assert!(resolver.has_matching_records("99"));
        // A2 n'a que des surfaces nulles
        assert!(!resolver.has_matching_records("98"));
        assert!(!resolver.has_matching_records("404"));
    }

    #[test]
    fn test_display_name_precedence() {
        let names = parse_names("7: 7;Amazonas\n8: 8;Resguardo Indígena Nukak\n".as_bytes());
        let store = store(vec![entry("A1", "99", "RI-Resguardo Indígena Tamaquito")], names);
        let resolver = store.resolver();

        assert_eq!(resolver.resolve_display_name("A1"), "R.I. Tamaquito");
        assert_eq!(resolver.resolve_display_name("7"), "Amazonas");
        assert_eq!(resolver.resolve_display_name("8"), "R.I. Nukak");
        assert_eq!(resolver.resolve_display_name("unknown"), "unknown");
    }

    #[test]
    fn test_normalize_display_name() {
        assert_eq!(normalize_display_name("resguardo indígena Arhuaco"), "R.I. Arhuaco");
        assert_eq!(normalize_display_name("Parque Nacional"), "Parque Nacional");
    }
}
