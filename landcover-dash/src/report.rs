//! Rapport de chargement d'une source avec graceful degradation
//!
//! Collecte les compteurs du chargement et les problèmes non fataux
//! (lignes ignorées, features rejetées, collisions d'id_area).

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use landcover::{LandcoverError, RecordStore};
use serde::Serialize;

/// Statut global du chargement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadStatus {
    /// Source chargée sans problème
    Success,
    /// Source chargée avec des problèmes non fatals
    PartialSuccess,
    /// Source non chargée
    Failed,
}

/// Niveau de sévérité d'un problème
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueLevel {
    /// Chargement abandonné
    Fatal,
    /// Ligne ou feature ignorée
    Error,
    /// Donnée conservée avec une ambiguïté, fichier facultatif absent
    Warning,
}

/// Problème rencontré pendant le chargement
#[derive(Debug, Clone, Serialize)]
pub struct LoadIssue {
    pub level: IssueLevel,
    pub message: String,
}

impl LoadIssue {
    fn from_error(error: &LandcoverError) -> Self {
        let level = match error {
            LandcoverError::AmbiguousAreaId { .. } | LandcoverError::Fetch { .. } => {
                IssueLevel::Warning
            }
            _ => IssueLevel::Error,
        };
        Self {
            level,
            message: error.to_string(),
        }
    }
}

/// Rapport complet de chargement
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub source: String,
    pub duration_secs: f64,
    pub status: LoadStatus,

    /// Lignes valides conservées
    pub records: usize,
    /// Lignes du tableau ignorées
    pub rows_skipped: usize,
    pub territories: usize,
    /// Territoires de surface cumulée nulle écartés
    pub territories_removed: usize,
    pub territory_names: usize,
    pub mapping_entries: usize,
    pub palette_entries: usize,
    pub boundary_features: usize,
    pub boundary_features_rejected: usize,
    /// Features de la couche ayant des lignes valides
    pub visible_features: usize,
    pub area_id_collisions: usize,

    pub issues: Vec<LoadIssue>,
}

impl Default for LoadReport {
    fn default() -> Self {
        Self {
            source: String::new(),
            duration_secs: 0.0,
            status: LoadStatus::Success,
            records: 0,
            rows_skipped: 0,
            territories: 0,
            territories_removed: 0,
            territory_names: 0,
            mapping_entries: 0,
            palette_entries: 0,
            boundary_features: 0,
            boundary_features_rejected: 0,
            visible_features: 0,
            area_id_collisions: 0,
            issues: Vec::new(),
        }
    }
}

impl LoadReport {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Default::default()
        }
    }

    /// Renseigne les compteurs depuis un store chargé
    pub fn record_store(&mut self, store: &RecordStore) {
        self.records = store.records().len();
        self.territories = store.territory_count();
        self.territories_removed = store.removed_territories().len();
        self.territory_names = store.territory_names().len();
        self.mapping_entries = store.mapping().len();
        self.area_id_collisions = store.mapping().collisions().len();

        if let Some(layer) = store.boundaries() {
            self.boundary_features = layer.len();
            self.visible_features = store.resolver().visible_features(layer).len();
        }
    }

    pub fn record_palette(&mut self, entries: usize) {
        self.palette_entries = entries;
    }

    /// Enregistre un problème non fatal
    pub fn record_issue(&mut self, error: &LandcoverError) {
        match error {
            LandcoverError::ParseError { .. } | LandcoverError::EmptyInput(_) => {
                self.rows_skipped += 1
            }
            LandcoverError::InvalidGeometry { .. } | LandcoverError::InvalidGeoJson(_) => {
                self.boundary_features_rejected += 1
            }
            _ => {}
        }
        self.issues.push(LoadIssue::from_error(error));
    }

    pub fn record_issues<'a>(&mut self, errors: impl IntoIterator<Item = &'a LandcoverError>) {
        for error in errors {
            self.record_issue(error);
        }
    }

    /// Enregistre l'échec du chargement
    pub fn record_failure(&mut self, error: &LandcoverError) {
        self.issues.push(LoadIssue {
            level: IssueLevel::Fatal,
            message: error.to_string(),
        });
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        let has_fatal = self.issues.iter().any(|i| i.level == IssueLevel::Fatal);
        let has_issues = !self.issues.is_empty();

        self.status = if has_fatal {
            LoadStatus::Failed
        } else if has_issues && self.records > 0 {
            LoadStatus::PartialSuccess
        } else if has_issues {
            LoadStatus::Failed
        } else {
            LoadStatus::Success
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("LOAD REPORT - {}", self.source);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Records: {} kept, {} rows skipped",
            self.records, self.rows_skipped
        );
        println!(
            "Territories: {} kept, {} removed (zero area), {} names",
            self.territories, self.territories_removed, self.territory_names
        );
        println!(
            "Mapping: {} entries, {} id_area collisions",
            self.mapping_entries, self.area_id_collisions
        );
        println!("Palette: {} entries", self.palette_entries);
        println!(
            "Boundaries: {} features, {} visible, {} rejected",
            self.boundary_features, self.visible_features, self.boundary_features_rejected
        );

        if !self.issues.is_empty() {
            println!("\n--- ISSUES ({}) ---", self.issues.len());
            for issue in self.issues.iter().take(20) {
                println!("  {:?} {}", issue.level, issue.message);
            }
            if self.issues.len() > 20 {
                println!("  ... and {} more", self.issues.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact
    pub fn summary(&self) -> String {
        format!(
            "{}: {} records, {} territories, {} issues",
            self.source,
            self.records,
            self.territories,
            self.issues.len()
        )
    }
}

/// Surface lisible : suffixes K et M, une décimale
pub fn format_area(area: f64) -> String {
    if area >= 1_000_000.0 {
        format!("{:.1}M km²", area / 1_000_000.0)
    } else if area >= 1_000.0 {
        format!("{:.1}K km²", area / 1_000.0)
    } else {
        format!("{:.1} km²", area)
    }
}

/// Variation signée
pub fn format_change(change: f64) -> String {
    let formatted = format_area(change.abs());
    if change >= 0.0 {
        format!("+{}", formatted)
    } else {
        format!("-{}", formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_report_default() {
        let report = LoadReport::default();
        assert_eq!(report.status, LoadStatus::Success);
        assert_eq!(report.records, 0);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_record_issue_counters() {
        let mut report = LoadReport::new("TEST");
        report.record_issues(&[
            LandcoverError::parse_error("a.csv", 3, "expected 4 fields"),
            LandcoverError::invalid_geometry("99", "missing geometry"),
            LandcoverError::AmbiguousAreaId {
                id_area: "5".into(),
                territories: vec!["A".into(), "B".into()],
            },
        ]);

        assert_eq!(report.rows_skipped, 1);
        assert_eq!(report.boundary_features_rejected, 1);
        assert_eq!(report.issues[2].level, IssueLevel::Warning);
    }

    #[test]
    fn test_finalize_partial_success() {
        let mut report = LoadReport::new("TEST");
        report.records = 10;
        report.record_issue(&LandcoverError::parse_error("a.csv", 3, "bad row"));
        report.finalize();

        assert_eq!(report.status, LoadStatus::PartialSuccess);
    }

    #[test]
    fn test_finalize_failed() {
        let mut report = LoadReport::new("TEST");
        report.records = 10;
        report.record_failure(&LandcoverError::fetch("a.csv", "not found"));
        report.finalize();

        assert_eq!(report.status, LoadStatus::Failed);
    }

    #[test]
    fn test_summary() {
        let mut report = LoadReport::new("MASCARA");
        report.records = 120;
        report.territories = 4;

        let summary = report.summary();
        assert!(summary.contains("MASCARA"));
        assert!(summary.contains("120 records"));
    }

    #[test]
    fn test_format_area() {
        assert_eq!(format_area(12.34), "12.3 km²");
        assert_eq!(format_area(1500.0), "1.5K km²");
        assert_eq!(format_area(2_500_000.0), "2.5M km²");
    }

    #[test]
    fn test_format_change() {
        assert_eq!(format_change(1500.0), "+1.5K km²");
        assert_eq!(format_change(-20.0), "-20.0 km²");
        assert_eq!(format_change(0.0), "+0.0 km²");
    }
}
