//! Parsers pour les fichiers de codes (séparateur `;`)
//!
//! Deux sous-formats coexistent :
//! - noms de territoires `clé: champ;champ;...;Nom` (le dernier champ non vide est le nom)
//! - correspondance spatiale-tabulaire `id_gee;id_area;col3;...` selon les colonnes du registre

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use super::{decode_text, split_fields};
use crate::types::{canonical_key, ParseOutcome};
use crate::LandcoverError;

/// Colonne portant l'identifiant de la couche de limites
pub const AREA_ID_COLUMN: &str = "id_area";

/// Colonne portant la clé du tableau (territoire)
pub const JOIN_KEY_COLUMN: &str = "id_gee";

/// Table code territoire -> nom d'affichage
#[derive(Debug, Clone, Default)]
pub struct TerritoryNameTable {
    names: HashMap<String, String>,
}

impl TerritoryNameTable {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, name: impl Into<String>) {
        self.names.insert(canonical_key(&key.into()), name.into());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Parse le format `clé: ...;Nom`.
///
/// Les lignes sans `:` ou dont la clé n'est pas numérique appartiennent à
/// l'autre sous-format et sont ignorées.
pub fn parse_names(data: &[u8]) -> TerritoryNameTable {
    let text = decode_text(data);
    let mut table = TerritoryNameTable::default();

    for line in text.lines() {
        let Some((code, rest)) = line.split_once(':') else {
            continue;
        };
        if super::parse_f64(code).is_none() {
            continue;
        }

        let name = split_fields(rest, b';')
            .into_iter()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .last();

        if let Some(name) = name {
            table.insert(code, name);
        }
    }

    debug!(names = table.len(), "Parsed territory names");
    table
}

/// Une entrée de correspondance : clé du tableau + colonnes nommées
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingEntry {
    /// Clé canonique (id_gee), égale à `Record::territory`
    pub key: String,

    /// Colonnes dans l'ordre du registre
    pub columns: Vec<(String, String)>,
}

impl MappingEntry {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Identifiant de la couche de limites, s'il est renseigné
    pub fn area_id(&self) -> Option<&str> {
        self.get(AREA_ID_COLUMN).filter(|v| !v.is_empty())
    }
}

/// Plusieurs entrées revendiquent le même id_area
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaIdCollision {
    pub id_area: String,

    /// Clés concurrentes, dans l'ordre du fichier (la première gagne)
    pub territories: Vec<String>,
}

impl From<&AreaIdCollision> for LandcoverError {
    fn from(collision: &AreaIdCollision) -> Self {
        LandcoverError::AmbiguousAreaId {
            id_area: collision.id_area.clone(),
            territories: collision.territories.clone(),
        }
    }
}

/// Correspondance spatiale-tabulaire d'une source
#[derive(Debug, Clone, Default)]
pub struct SpatialTabularMapping {
    entries: Vec<MappingEntry>,
    by_key: HashMap<String, usize>,
    collisions: Vec<AreaIdCollision>,
}

impl SpatialTabularMapping {
    /// Construit la correspondance depuis des entrées déjà normalisées
    pub fn from_entries(entries: impl IntoIterator<Item = MappingEntry>) -> Self {
        let mut mapping = Self::default();
        for entry in entries {
            mapping.upsert(entry);
        }
        mapping.detect_collisions();
        mapping
    }

    /// Entrée dont la clé de jointure vaut `key`
    pub fn get(&self, key: &str) -> Option<&MappingEntry> {
        self.by_key.get(key).map(|&i| &self.entries[i])
    }

    /// Entrées dans l'ordre du fichier
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn collisions(&self) -> &[AreaIdCollision] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insère ou remplace (à sa position d'origine) ; retourne true si la clé existait
    fn upsert(&mut self, entry: MappingEntry) -> bool {
        if let Some(&index) = self.by_key.get(&entry.key) {
            self.entries[index] = entry;
            true
        } else {
            self.by_key.insert(entry.key.clone(), self.entries.len());
            self.entries.push(entry);
            false
        }
    }

    fn detect_collisions(&mut self) {
        let mut claims: HashMap<&str, usize> = HashMap::new();
        let mut collisions: Vec<AreaIdCollision> = Vec::new();

        for entry in &self.entries {
            let Some(id_area) = entry.area_id() else {
                continue;
            };
            match claims.get(id_area) {
                None => {
                    claims.insert(id_area, collisions.len());
                    collisions.push(AreaIdCollision {
                        id_area: id_area.to_string(),
                        territories: vec![entry.key.clone()],
                    });
                }
                Some(&slot) => collisions[slot].territories.push(entry.key.clone()),
            }
        }

        collisions.retain(|c| c.territories.len() > 1);
        self.collisions = collisions;
    }
}

/// Parse le format à colonnes selon `columns` (registre de la source).
///
/// La clé est la colonne `id_gee` si elle est déclarée, sinon la première.
/// Une ligne plus courte que `columns` est ignorée ; une clé en double
/// remplace l'entrée précédente. Les id_area partagés sont signalés.
pub fn parse_mapping(
    data: &[u8],
    columns: &[String],
    file: &str,
) -> ParseOutcome<SpatialTabularMapping> {
    let text = decode_text(data);
    let key_index = columns
        .iter()
        .position(|c| c == JOIN_KEY_COLUMN)
        .unwrap_or(0);

    let mut mapping = SpatialTabularMapping::default();
    let mut errors = Vec::new();

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_number = index + 1;
        let values = split_fields(line, b';');

        if values.len() < columns.len() {
            errors.push(LandcoverError::parse_error(
                file,
                line_number,
                format!("expected {} columns, found {}", columns.len(), values.len()),
            ));
            continue;
        }

        let key = canonical_key(values[key_index]);
        if key.is_empty() {
            errors.push(LandcoverError::parse_error(file, line_number, "empty join key"));
            continue;
        }

        let entry_columns = columns
            .iter()
            .zip(&values)
            .map(|(name, value)| {
                let value = if name == AREA_ID_COLUMN || name == JOIN_KEY_COLUMN {
                    canonical_key(value)
                } else {
                    value.trim().to_string()
                };
                (name.clone(), value)
            })
            .collect();

        let replaced = mapping.upsert(MappingEntry {
            key: key.clone(),
            columns: entry_columns,
        });
        if replaced {
            errors.push(LandcoverError::parse_error(
                file,
                line_number,
                format!("duplicate join key {key}, previous entry replaced"),
            ));
        }
    }

    mapping.detect_collisions();
    for collision in &mapping.collisions {
        warn!(
            file = file,
            id_area = %collision.id_area,
            territories = ?collision.territories,
            "id_area claimed by several mapping entries, first one wins"
        );
        errors.push(collision.into());
    }
    debug!(file = file, entries = mapping.len(), "Parsed spatial-tabular mapping");

    ParseOutcome {
        value: mapping,
        errors,
    }
}
