//! # landcover-dash
//!
//! Tableau de bord en terminal pour les statistiques de couverture du sol.
//!
//! ## Features
//!
//! - Registre de sources et chemins configurables (env, `.env`, options)
//! - Chargement asynchrone, chargements obsolètes ignorés
//! - Séries temporelles, classements, indicateurs et tableau filtrés
//! - Légende hiérarchique, jointure de la couche de limites, export GeoJSON
//!
//! ## Usage CLI
//!
//! ```bash
//! landcover-dash sources
//! landcover-dash summary --source MASCARA --years 2000:2020 --exclude-coverage 33
//! landcover-dash map --source RESGUARDOS --output ./resguardos.geojson
//! landcover-dash session
//! ```

pub mod cli;
pub mod config;
pub mod export;
pub mod loader;
pub mod render;
pub mod report;

pub use config::{Paths, Registry};
pub use report::{LoadReport, LoadStatus};
