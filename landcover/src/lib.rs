//! # landcover
//!
//! Cœur d'un tableau de bord de couverture des sols : jointure entre séries
//! temporelles tabulaires et couche de limites, filtres et agrégations.
//!
//! ## Features
//!
//! - Parsing des tableaux, fichiers de codes et palette avec `memchr`, `simdutf8`
//!   et repli Windows-1252 via `encoding_rs`
//! - Clés de jointure canoniques (`"12.0"` et `12` désignent le même territoire)
//! - Filtres immuables (`FilterState::reduce`) et vues filtrées empruntées
//! - Légende hiérarchique à deux niveaux depuis les noms de la palette
//! - Couche de limites GeoJSON convertie en types `geo`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use landcover::{load_source, Palette, RawSource, Session};
//!
//! let palette = landcover::load_palette(&palette_bytes, "palette.txt")?.value;
//! let mut session = Session::new(palette);
//!
//! let ticket = session.begin_load("MASCARA");
//! session.complete_load(ticket, load_source(&raw));
//!
//! if let Some(view) = session.dashboard() {
//!     println!("{} lignes, {:.1} km²", view.record_count, view.total_area);
//! }
//! ```

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod hierarchy;
pub mod parser;
pub mod resolver;
pub mod session;
pub mod store;
pub mod types;
pub mod view;

pub use error::{LandcoverError, Result};
pub use filter::{FilterAction, FilterState, FilteredView, Selection};
pub use hierarchy::{build_groups, parse_hierarchy, CoverageLevel, HierarchyGroup};
pub use parser::palette::Palette;
pub use parser::table::TableSchema;
pub use resolver::TerritoryResolver;
pub use session::{LoadOutcome, LoadTicket, Session};
pub use store::{RawSource, RecordStore};
pub use types::{ClassId, CoverageInfo, ParseOutcome, Record, SourceConfig, Year};
pub use view::{DashboardView, FeatureSummary};

/// Charge une source avec le schéma de colonnes par défaut.
///
/// # Errors
///
/// Retourne `LandcoverError` si le tableau n'a pas d'en-tête ou s'il lui
/// manque une colonne obligatoire.
pub fn load_source(raw: &RawSource) -> Result<ParseOutcome<RecordStore>> {
    RecordStore::from_raw(raw, &TableSchema::default())
}

/// Parse la palette partagée entre les sources.
///
/// # Errors
///
/// Retourne `LandcoverError::MissingColumn` si l'en-tête n'a pas de colonne
/// `ESP` ou `ID`.
pub fn load_palette(data: &[u8], file: &str) -> Result<ParseOutcome<Palette>> {
    parser::palette::parse(data, file)
}
