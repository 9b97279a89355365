//! Lecture asynchrone des fichiers d'une source et de la palette

use std::path::{Path, PathBuf};

use landcover::{
    LandcoverError, Palette, ParseOutcome, RawSource, RecordStore, SourceConfig, TableSchema,
};
use tracing::{debug, warn};

use crate::config::Paths;

/// Lit un fichier entier
pub async fn fetch(path: &Path) -> landcover::Result<Vec<u8>> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| LandcoverError::fetch(path.display().to_string(), e))?;
    debug!(path = %path.display(), bytes = data.len(), "Fetched file");
    Ok(data)
}

/// Fichier facultatif : un échec de lecture devient une erreur non fatale
async fn fetch_optional(path: Option<PathBuf>) -> (Option<Vec<u8>>, Option<LandcoverError>) {
    let Some(path) = path else {
        return (None, None);
    };
    match fetch(&path).await {
        Ok(data) => (Some(data), None),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Optional file unavailable");
            (None, Some(e))
        }
    }
}

/// Contenu brut d'une source et problèmes de lecture des fichiers facultatifs
#[derive(Debug)]
pub struct FetchedSource {
    pub raw: RawSource,
    pub issues: Vec<LandcoverError>,
}

/// Lit en parallèle le tableau, les codes et la couche de limites.
///
/// # Errors
///
/// `LandcoverError::Fetch` si le tableau est illisible.
pub async fn fetch_source(
    paths: &Paths,
    name: &str,
    config: &SourceConfig,
) -> landcover::Result<FetchedSource> {
    let table_path = paths.table_path(config);
    let (table, (codes, codes_issue), (boundaries, gis_issue)) = tokio::join!(
        fetch(&table_path),
        fetch_optional(paths.codes_path(config)),
        fetch_optional(paths.gis_path(config)),
    );

    Ok(FetchedSource {
        raw: RawSource {
            name: name.to_string(),
            config: config.clone(),
            table: table?,
            codes,
            boundaries,
        },
        issues: codes_issue.into_iter().chain(gis_issue).collect(),
    })
}

/// Lit et parse une source complète
///
/// # Errors
///
/// Tableau illisible, sans en-tête ou incomplet.
pub async fn load_source(
    paths: &Paths,
    name: &str,
    config: &SourceConfig,
) -> landcover::Result<ParseOutcome<RecordStore>> {
    let fetched = fetch_source(paths, name, config).await?;
    let mut outcome = RecordStore::from_raw(&fetched.raw, &TableSchema::default())?;
    let mut errors = fetched.issues;
    errors.append(&mut outcome.errors);
    outcome.errors = errors;
    Ok(outcome)
}

/// Lit la palette ; absente ou illisible, elle est remplacée par une palette
/// vide (noms de repli `Class {id}`) et l'erreur est retournée à part.
pub async fn load_palette(path: &Path) -> ParseOutcome<Palette> {
    let file = path.display().to_string();
    let parsed = match fetch(path).await {
        Ok(data) => landcover::load_palette(&data, &file),
        Err(e) => Err(e),
    };

    match parsed {
        Ok(outcome) => {
            debug!(path = %file, entries = outcome.value.len(), "Palette loaded");
            outcome
        }
        Err(e) => {
            warn!(path = %file, error = %e, "Palette unavailable, using fallback names");
            ParseOutcome {
                value: Palette::default(),
                errors: vec![e],
            }
        }
    }
}
