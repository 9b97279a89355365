//! Parser pour le tableau de séries temporelles (territoire, classe, année, surface)

use tracing::{debug, warn};

use super::{clean_field, decode_text, parse_f64, parse_integral, split_fields};
use crate::types::{canonical_key, sanitize_area, ParseOutcome, Record};
use crate::{LandcoverError, Result};

/// Noms des colonnes attendues et séparateur
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub delimiter: u8,
    pub territory: String,
    pub class: String,
    pub year: String,
    pub area: String,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            delimiter: b',',
            territory: "territory".into(),
            class: "class".into(),
            year: "year".into(),
            area: "area".into(),
        }
    }
}

/// Index des colonnes utiles dans l'en-tête
struct ColumnIndex {
    territory: usize,
    class: usize,
    year: usize,
    area: usize,
}

impl ColumnIndex {
    fn resolve(header: &[&str], schema: &TableSchema, file: &str) -> Result<Self> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| clean_field(h) == name)
                .ok_or_else(|| LandcoverError::MissingColumn {
                    file: file.to_string(),
                    column: name.to_string(),
                })
        };

        Ok(Self {
            territory: find(&schema.territory)?,
            class: find(&schema.class)?,
            year: find(&schema.year)?,
            area: find(&schema.area)?,
        })
    }

    fn max(&self) -> usize {
        self.territory.max(self.class).max(self.year).max(self.area)
    }
}

/// Parse le tableau et retourne les lignes avec les erreurs non fatales.
///
/// Seules les colonnes surface, classe et année sont converties en nombres ;
/// le territoire reste une chaîne (clé canonique). Une ligne trop courte ou
/// sans territoire est ignorée.
///
/// # Errors
///
/// `EmptyInput` si le fichier n'a pas d'en-tête, `MissingColumn` si une
/// colonne du schéma est absente.
pub fn parse(data: &[u8], schema: &TableSchema, file: &str) -> Result<ParseOutcome<Vec<Record>>> {
    let text = decode_text(data);
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header_line)) = lines.next() else {
        return Err(LandcoverError::EmptyInput(file.to_string()));
    };
    let header = split_fields(header_line, schema.delimiter);
    let columns = ColumnIndex::resolve(&header, schema, file)?;

    let mut outcome = ParseOutcome::new(Vec::new());

    for (index, line) in lines {
        let line_number = index + 1;
        let fields = split_fields(line, schema.delimiter);

        if fields.len() <= columns.max() {
            outcome.errors.push(LandcoverError::parse_error(
                file,
                line_number,
                format!("expected {} fields, found {}", header.len(), fields.len()),
            ));
            continue;
        }

        let territory = canonical_key(clean_field(fields[columns.territory]));
        if territory.is_empty() {
            outcome
                .errors
                .push(LandcoverError::parse_error(file, line_number, "empty territory"));
            continue;
        }

        let area = parse_f64(clean_field(fields[columns.area]))
            .map(sanitize_area)
            .unwrap_or(0.0);
        let class = parse_integral(clean_field(fields[columns.class]), f64::from(u32::MAX))
            .map(|v| v as u32);
        let year = parse_integral(clean_field(fields[columns.year]), f64::from(u16::MAX))
            .map(|v| v as u16);

        outcome.value.push(Record {
            territory,
            class,
            year,
            area,
        });
    }

    if !outcome.errors.is_empty() {
        warn!(
            file = file,
            skipped = outcome.errors.len(),
            "Skipped malformed rows"
        );
    }
    debug!(file = file, rows = outcome.value.len(), "Parsed table");

    Ok(outcome)
}
