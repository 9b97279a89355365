//! Configuration : registre des sources et répertoires de données

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use landcover::{LandcoverError, SourceConfig};
use serde_json::{Map, Value};

pub const DEFAULT_REGISTRY: &str = "data_sources.json";
pub const DEFAULT_DATA_DIR: &str = "process/data";
pub const DEFAULT_CODES_DIR: &str = "process/codigos";
pub const DEFAULT_GIS_DIR: &str = "process/gis";
pub const PALETTE_FILE: &str = "palette.txt";

/// Registre des sources (`data_sources.json`), dans l'ordre du fichier
#[derive(Debug, Clone, Default)]
pub struct Registry {
    sources: Vec<(String, SourceConfig)>,
}

impl Registry {
    /// Charge le registre depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read registry file: {}", path.display()))?;

        Self::from_json(&content).context(format!("Failed to parse registry: {}", path.display()))
    }

    /// Parse un objet JSON `nom -> description de source`
    pub fn from_json(json: &str) -> Result<Self> {
        let map: Map<String, Value> =
            serde_json::from_str(json).context("Registry must be a JSON object")?;

        let sources = map
            .into_iter()
            .map(|(name, value)| {
                let config: SourceConfig = serde_json::from_value(value)
                    .context(format!("Invalid source description for {}", name))?;
                Ok((name, config))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { sources })
    }

    pub fn get(&self, name: &str) -> Option<&SourceConfig> {
        self.sources
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, config)| config)
    }

    /// Source chargée par défaut : la première du registre
    pub fn default_source(&self) -> Option<(&str, &SourceConfig)> {
        self.sources
            .first()
            .map(|(name, config)| (name.as_str(), config))
    }

    /// Source demandée, ou celle par défaut
    pub fn resolve(&self, name: Option<&str>) -> Result<(&str, &SourceConfig)> {
        match name {
            Some(name) => self
                .sources
                .iter()
                .find(|(n, _)| n == name)
                .map(|(n, config)| (n.as_str(), config))
                .ok_or_else(|| LandcoverError::UnknownSource(name.to_string()).into()),
            None => self
                .default_source()
                .context("Registry does not declare any source"),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceConfig)> {
        self.sources.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Emplacements des fichiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub registry: PathBuf,
    pub data_dir: PathBuf,
    pub codes_dir: PathBuf,
    pub palette: PathBuf,
    pub gis_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::from_vars(|_| None)
    }
}

impl Paths {
    /// Charge les emplacements depuis les variables d'environnement
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let codes_dir = PathBuf::from(
            var("LANDCOVER_CODES_DIR").unwrap_or_else(|| DEFAULT_CODES_DIR.into()),
        );
        let palette = var("LANDCOVER_PALETTE")
            .map(PathBuf::from)
            .unwrap_or_else(|| codes_dir.join(PALETTE_FILE));

        Self {
            registry: var("LANDCOVER_REGISTRY")
                .unwrap_or_else(|| DEFAULT_REGISTRY.into())
                .into(),
            data_dir: var("LANDCOVER_DATA_DIR")
                .unwrap_or_else(|| DEFAULT_DATA_DIR.into())
                .into(),
            codes_dir,
            palette,
            gis_dir: var("LANDCOVER_GIS_DIR")
                .unwrap_or_else(|| DEFAULT_GIS_DIR.into())
                .into(),
        }
    }

    /// Option de ligne de commande prioritaire sur l'environnement
    pub fn apply_overrides(
        &mut self,
        registry: Option<PathBuf>,
        data_dir: Option<PathBuf>,
        codes_dir: Option<PathBuf>,
        palette: Option<PathBuf>,
        gis_dir: Option<PathBuf>,
    ) {
        if let Some(registry) = registry {
            self.registry = registry;
        }
        if let Some(data_dir) = data_dir {
            self.data_dir = data_dir;
        }
        if let Some(codes_dir) = codes_dir {
            // La palette suit le répertoire des codes sauf si elle est donnée
            if palette.is_none() && self.palette == self.codes_dir.join(PALETTE_FILE) {
                self.palette = codes_dir.join(PALETTE_FILE);
            }
            self.codes_dir = codes_dir;
        }
        if let Some(palette) = palette {
            self.palette = palette;
        }
        if let Some(gis_dir) = gis_dir {
            self.gis_dir = gis_dir;
        }
    }

    pub fn table_path(&self, config: &SourceConfig) -> PathBuf {
        self.data_dir.join(&config.file)
    }

    pub fn codes_path(&self, config: &SourceConfig) -> Option<PathBuf> {
        config.codes.as_ref().map(|f| self.codes_dir.join(f))
    }

    pub fn gis_path(&self, config: &SourceConfig) -> Option<PathBuf> {
        config.gis.as_ref().map(|f| self.gis_dir.join(f))
    }
}
