//! Parser pour la palette partagée des couvertures (`palette.txt`)
//!
//! Format : séparateur `;`, en-tête contenant au moins `ESP` (nom espagnol
//! avec hiérarchie) et `ID`, et optionnellement `Color number`.

use std::collections::BTreeMap;

use tracing::debug;

use super::{decode_text, parse_integral, split_fields};
use crate::hierarchy::parse_hierarchy;
use crate::types::{ClassId, CoverageInfo, ParseOutcome};
use crate::{LandcoverError, Result};

const NAME_COLUMN: &str = "ESP";
const ID_COLUMN: &str = "ID";
const COLOR_COLUMN: &str = "Color number";

/// Palette des classes, triée par identifiant
#[derive(Debug, Clone, Default)]
pub struct Palette {
    entries: BTreeMap<ClassId, CoverageInfo>,
}

impl Palette {
    pub fn get(&self, id: ClassId) -> Option<&CoverageInfo> {
        self.entries.get(&id)
    }

    /// Entrées par identifiant croissant
    pub fn iter(&self) -> impl Iterator<Item = &CoverageInfo> {
        self.entries.values()
    }

    pub fn insert(&mut self, info: CoverageInfo) {
        self.entries.insert(info.id, info);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Libellé feuille, ou `Class {id}` si la classe est inconnue
    pub fn display_name(&self, id: ClassId) -> String {
        self.get(id)
            .map(|info| info.name.clone())
            .unwrap_or_else(|| format!("Class {id}"))
    }

    pub fn color(&self, id: ClassId) -> Option<&str> {
        self.get(id).and_then(|info| info.color.as_deref())
    }
}

impl FromIterator<CoverageInfo> for Palette {
    fn from_iter<I: IntoIterator<Item = CoverageInfo>>(iter: I) -> Self {
        let mut palette = Palette::default();
        for info in iter {
            palette.insert(info);
        }
        palette
    }
}

/// Construit une entrée de palette à partir du nom complet
pub fn coverage_info(id: ClassId, full_name: &str, color: Option<&str>) -> CoverageInfo {
    let full_name = full_name.trim();
    let name = parse_hierarchy(full_name)
        .label()
        .unwrap_or(full_name)
        .to_string();

    CoverageInfo {
        id,
        name,
        full_name: full_name.to_string(),
        color: color
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
    }
}

/// Parse la palette.
///
/// # Errors
///
/// `EmptyInput` sans en-tête, `MissingColumn` si `ESP` ou `ID` manque.
pub fn parse(data: &[u8], file: &str) -> Result<ParseOutcome<Palette>> {
    let text = decode_text(data);
    let mut lines = text.lines().enumerate();

    let Some((_, header_line)) = lines.next() else {
        return Err(LandcoverError::EmptyInput(file.to_string()));
    };
    let header: Vec<&str> = split_fields(header_line, b';')
        .into_iter()
        .map(str::trim)
        .collect();

    let find = |name: &str| header.iter().position(|h| *h == name);
    let missing = |name: &str| LandcoverError::MissingColumn {
        file: file.to_string(),
        column: name.to_string(),
    };
    let name_index = find(NAME_COLUMN).ok_or_else(|| missing(NAME_COLUMN))?;
    let id_index = find(ID_COLUMN).ok_or_else(|| missing(ID_COLUMN))?;
    let color_index = find(COLOR_COLUMN);

    let mut outcome = ParseOutcome::new(Palette::default());

    for (index, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let line_number = index + 1;
        let parts = split_fields(line, b';');

        if parts.len() <= name_index.max(id_index) {
            outcome.errors.push(LandcoverError::parse_error(
                file,
                line_number,
                "missing ESP or ID field",
            ));
            continue;
        }

        let Some(id) = parse_integral(parts[id_index], f64::from(u32::MAX)) else {
            outcome.errors.push(LandcoverError::parse_error(
                file,
                line_number,
                format!("invalid class id '{}'", parts[id_index].trim()),
            ));
            continue;
        };

        let full_name = parts[name_index].trim();
        if full_name.is_empty() {
            continue;
        }

        let color = color_index.and_then(|i| parts.get(i).copied());
        outcome
            .value
            .insert(coverage_info(id as ClassId, full_name, color));
    }

    debug!(file = file, classes = outcome.value.len(), "Parsed palette");
    Ok(outcome)
}
