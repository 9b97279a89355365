//! Stockage des données d'une source : lignes valides et tables de correspondance

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::parser::boundary::{self, BoundaryLayer};
use crate::parser::codes::{self, SpatialTabularMapping, TerritoryNameTable};
use crate::parser::table::{self, TableSchema};
use crate::types::{ClassId, ParseOutcome, Record, SourceConfig, Year};
use crate::Result;

/// Contenu brut d'une source, déjà récupéré par l'appelant
#[derive(Debug, Clone, Default)]
pub struct RawSource {
    pub name: String,
    pub config: SourceConfig,
    pub table: Vec<u8>,
    pub codes: Option<Vec<u8>>,
    pub boundaries: Option<Vec<u8>>,
}

/// Parse le tableau (alias de `parser::table::parse`)
pub fn load(data: &[u8], schema: &TableSchema, file: &str) -> Result<ParseOutcome<Vec<Record>>> {
    table::parse(data, schema, file)
}

/// Territoires dont la surface cumulée sur toute la série vaut 0, dans
/// l'ordre de première apparition
pub fn zero_area_territories(records: &[Record]) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for record in records {
        let total = totals.entry(record.territory.as_str()).or_insert_with(|| {
            order.push(record.territory.as_str());
            0.0
        });
        *total += record.area;
    }

    order
        .into_iter()
        .filter(|t| totals.get(t).copied().unwrap_or(0.0) <= 0.0)
        .map(str::to_string)
        .collect()
}

/// Garde uniquement les lignes des territoires de surface cumulée > 0
pub fn filter_valid_territories(records: Vec<Record>) -> Vec<Record> {
    let invalid: HashSet<String> = zero_area_territories(&records).into_iter().collect();
    if invalid.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| !invalid.contains(&r.territory))
        .collect()
}

/// Données d'une source chargée, immuables jusqu'au prochain chargement
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    source_name: String,
    config: SourceConfig,
    records: Vec<Record>,
    territory_names: TerritoryNameTable,
    mapping: SpatialTabularMapping,
    boundaries: Option<BoundaryLayer>,
    territories: HashSet<String>,
    removed_territories: Vec<String>,
}

impl RecordStore {
    /// Construit un store à partir de lignes déjà parsées
    pub fn new(
        source_name: impl Into<String>,
        config: SourceConfig,
        records: Vec<Record>,
        territory_names: TerritoryNameTable,
        mapping: SpatialTabularMapping,
    ) -> Self {
        let removed_territories = zero_area_territories(&records);
        let records = filter_valid_territories(records);
        let territories = records.iter().map(|r| r.territory.clone()).collect();

        Self {
            source_name: source_name.into(),
            config,
            records,
            territory_names,
            mapping,
            boundaries: None,
            territories,
            removed_territories,
        }
    }

    /// Parse une source complète.
    ///
    /// Seul le tableau est obligatoire : un fichier de codes ou une couche de
    /// limites illisible devient une erreur non fatale.
    ///
    /// # Errors
    ///
    /// Erreur du parser de tableau (en-tête absent ou incomplet).
    pub fn from_raw(raw: &RawSource, schema: &TableSchema) -> Result<ParseOutcome<Self>> {
        let table = load(&raw.table, schema, &raw.config.file)?;
        let mut errors = table.errors;

        let codes_file = raw.config.codes.as_deref().unwrap_or("codes");
        let (names, mapping) = match &raw.codes {
            Some(data) => {
                let names = codes::parse_names(data);
                let mapping = match &raw.config.columns {
                    Some(columns) => {
                        let outcome = codes::parse_mapping(data, columns, codes_file);
                        errors.extend(outcome.errors);
                        outcome.value
                    }
                    None => SpatialTabularMapping::default(),
                };
                (names, mapping)
            }
            None => Default::default(),
        };

        let mut store = Self::new(&raw.name, raw.config.clone(), table.value, names, mapping);

        if let Some(data) = &raw.boundaries {
            let gis_file = raw.config.gis.as_deref().unwrap_or("boundaries");
            match boundary::parse(data, gis_file) {
                Ok(outcome) => {
                    errors.extend(outcome.errors);
                    store.boundaries = Some(outcome.value);
                }
                Err(e) => {
                    warn!(source = %raw.name, error = %e, "Boundary layer unusable");
                    errors.push(e);
                }
            }
        }

        info!(
            source = %raw.name,
            records = store.records.len(),
            territories = store.territories.len(),
            removed = store.removed_territories.len(),
            mappings = store.mapping.len(),
            "Source loaded"
        );

        Ok(ParseOutcome {
            value: store,
            errors,
        })
    }

    pub fn with_boundaries(mut self, layer: BoundaryLayer) -> Self {
        self.boundaries = Some(layer);
        self
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Lignes valides (territoires de surface cumulée > 0)
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn territory_names(&self) -> &TerritoryNameTable {
        &self.territory_names
    }

    pub fn mapping(&self) -> &SpatialTabularMapping {
        &self.mapping
    }

    pub fn boundaries(&self) -> Option<&BoundaryLayer> {
        self.boundaries.as_ref()
    }

    /// Le territoire a au moins une ligne valide
    pub fn contains_territory(&self, key: &str) -> bool {
        self.territories.contains(key)
    }

    pub fn territory_count(&self) -> usize {
        self.territories.len()
    }

    /// Territoires écartés car de surface cumulée nulle
    pub fn removed_territories(&self) -> &[String] {
        &self.removed_territories
    }

    /// Territoires présents, dans l'ordre de première apparition
    pub fn territory_keys(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.territory.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// Classes présentes, triées
    pub fn class_ids(&self) -> Vec<ClassId> {
        let classes: BTreeSet<ClassId> = self.records.iter().filter_map(|r| r.class).collect();
        classes.into_iter().collect()
    }

    /// Années extrêmes observées
    pub fn year_bounds(&self) -> Option<(Year, Year)> {
        let mut years = self.records.iter().filter_map(|r| r.year);
        let first = years.next()?;
        let bounds = years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
        debug!(source = %self.source_name, min = bounds.0, max = bounds.1, "Year bounds");
        Some(bounds)
    }
}
