//! Types d'erreurs pour le crate landcover

use thiserror::Error;

/// Alias de résultat utilisant `LandcoverError`
pub type Result<T> = std::result::Result<T, LandcoverError>;

/// Erreurs pouvant survenir lors du chargement ou de la jointure des données
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LandcoverError {
    /// Ressource injoignable (fichier absent, lecture impossible)
    #[error("Failed to fetch {resource}: {reason}")]
    Fetch { resource: String, reason: String },

    /// Fichier vide ou sans ligne d'en-tête
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Colonne obligatoire absente de l'en-tête
    #[error("Missing column '{column}' in {file}")]
    MissingColumn { file: String, column: String },

    /// Ligne illisible (ignorée, le chargement continue)
    #[error("Parse error in {file} line {line}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// Document GeoJSON illisible
    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    /// Géométrie absente, vide ou d'un type non supporté
    #[error("Invalid geometry for {feature}: {reason}")]
    InvalidGeometry { feature: String, reason: String },

    /// Plusieurs entrées de correspondance partagent le même id_area
    #[error("Ambiguous id_area {id_area}: claimed by {}", .territories.join(", "))]
    AmbiguousAreaId {
        id_area: String,
        territories: Vec<String>,
    },

    /// Source de données inconnue du registre
    #[error("Unknown data source: {0}")]
    UnknownSource(String),
}

impl LandcoverError {
    /// Crée une erreur de parsing avec contexte
    pub fn parse_error(file: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Crée une erreur de lecture de ressource
    pub fn fetch(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(feature: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            feature: feature.into(),
            reason: reason.into(),
        }
    }
}
