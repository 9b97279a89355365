//! Types de données pour le crate landcover

use serde::{Deserialize, Serialize};

use crate::LandcoverError;

/// Identifiant de classe de couverture (colonne `class`, colonne `ID` de la palette)
pub type ClassId = u32;

/// Année d'observation
pub type Year = u16;

/// Une ligne du tableau de séries temporelles
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Clé canonique du territoire (jamais convertie en nombre)
    pub territory: String,

    /// Classe de couverture, `None` si illisible
    pub class: Option<ClassId>,

    /// Année, `None` si illisible
    pub year: Option<Year>,

    /// Surface, toujours finie et >= 0
    pub area: f64,
}

impl Record {
    pub fn new(territory: impl Into<String>, class: ClassId, year: Year, area: f64) -> Self {
        Self {
            territory: canonical_key(&territory.into()),
            class: Some(class),
            year: Some(year),
            area: sanitize_area(area),
        }
    }
}

/// Entrée de la palette partagée
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageInfo {
    pub id: ClassId,

    /// Libellé feuille ("Formación forestal")
    pub name: String,

    /// Nom complet avec hiérarchie ("1.1. Formación forestal")
    pub full_name: String,

    /// Couleur (#rrggbb) si la palette en fournit une
    pub color: Option<String>,
}

/// Description d'une source dans le registre `data_sources.json`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Fichier tabulaire (séparateur `,`)
    pub file: String,

    /// Fichier de codes (séparateur `;`)
    #[serde(default)]
    pub codes: Option<String>,

    /// Noms des colonnes du fichier de codes, dans l'ordre
    #[serde(default)]
    pub columns: Option<Vec<String>>,

    /// Colonne du fichier de codes utilisée comme nom d'affichage
    #[serde(default)]
    pub barchart: Option<String>,

    /// Couche de limites (GeoJSON)
    #[serde(default)]
    pub gis: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// Résultat d'un parsing avec les erreurs non fatales rencontrées
#[derive(Debug, Clone)]
pub struct ParseOutcome<T> {
    pub value: T,

    /// Lignes ou entités ignorées, doublons, etc.
    pub errors: Vec<LandcoverError>,
}

impl<T> ParseOutcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            errors: Vec::new(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ParseOutcome<U> {
        ParseOutcome {
            value: f(self.value),
            errors: self.errors,
        }
    }
}

/// Normalise une clé de jointure en chaîne canonique.
///
/// Espaces retirés ; une écriture décimale entière (`"12.0"`, `"12.000"`)
/// devient `"12"`. Les autres valeurs sont conservées telles quelles
/// (`"007"` reste `"007"`).
pub fn canonical_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some((int_part, frac_part)) = trimmed.split_once('.') {
        let is_integral = !int_part.is_empty()
            && int_part.bytes().all(|b| b.is_ascii_digit())
            && frac_part.bytes().all(|b| b == b'0');
        if is_integral {
            return int_part.to_string();
        }
    }
    trimmed.to_string()
}

/// Clé canonique d'une valeur JSON (propriété `id_area` d'une feature)
pub fn canonical_json_key(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            let key = canonical_key(s);
            (!key.is_empty()).then_some(key)
        }
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| {
                    let in_i64_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
                    if f.fract() == 0.0 && in_i64_range {
                        format!("{}", f as i64)
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        _ => None,
    }
}

/// Surface utilisable dans une somme : NaN, infini ou négatif comptent pour 0
#[inline]
pub fn sanitize_area(area: f64) -> f64 {
    if area.is_finite() && area > 0.0 {
        area
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_key() {
        assert_eq!(canonical_key(" 12 "), "12");
        assert_eq!(canonical_key("12.0"), "12");
        assert_eq!(canonical_key("12.000"), "12");
        assert_eq!(canonical_key("12.5"), "12.5");
        assert_eq!(canonical_key("007"), "007");
        assert_eq!(canonical_key("A1"), "A1");
        assert_eq!(canonical_key(".0"), ".0");
    }

    #[test]
    fn test_canonical_json_key() {
        assert_eq!(canonical_json_key(&json!(99)), Some("99".to_string()));
        assert_eq!(canonical_json_key(&json!(99.0)), Some("99".to_string()));
        assert_eq!(canonical_json_key(&json!("99")), Some("99".to_string()));
        assert_eq!(canonical_json_key(&json!("")), None);
        assert_eq!(canonical_json_key(&json!(null)), None);
    }

    #[test]
    fn test_canonical_json_key_beyond_i64() {
        let a = canonical_json_key(&json!(1e20));
        let b = canonical_json_key(&json!(2e20));

        assert_eq!(a.as_deref(), Some("100000000000000000000"));
        assert_ne!(a, b);
        assert_eq!(canonical_json_key(&json!(-4.0e3)), Some("-4000".to_string()));
    }

    #[test]
    fn test_sanitize_area() {
        assert_eq!(sanitize_area(4.5), 4.5);
        assert_eq!(sanitize_area(-1.0), 0.0);
        assert_eq!(sanitize_area(f64::NAN), 0.0);
        assert_eq!(sanitize_area(f64::INFINITY), 0.0);
    }
}
