//! Instantané du tableau de bord : toutes les surfaces dérivées d'une même vue filtrée

use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregate::{
    self, ClassSeries, TerritoryCoverage, COVERAGE_RANKING_LIMIT, DEFAULT_METRIC_CLASSES,
    POPUP_SERIES_LIMIT, TERRITORY_RANKING_LIMIT, TIME_SERIES_LIMIT,
};
use crate::filter::{FilterState, FilteredView};
use crate::hierarchy::{build_groups, HierarchyGroup};
use crate::parser::boundary::BoundaryFeature;
use crate::parser::codes::{AREA_ID_COLUMN, JOIN_KEY_COLUMN};
use crate::parser::palette::Palette;
use crate::session::Session;
use crate::store::RecordStore;
use crate::types::{ClassId, Year};

/// Lignes affichées dans le tableau
pub const TABLE_MAX_ROWS: usize = 20;

const PLACEHOLDER_PREFIX: &str = "placeholder";

/// Série d'une classe avec son nom et sa couleur
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSeries {
    pub class: ClassId,
    pub name: String,
    pub color: Option<String>,
    pub total: f64,
    pub points: BTreeMap<Year, f64>,
}

impl NamedSeries {
    fn from_series(series: ClassSeries, palette: &Palette) -> Self {
        Self {
            class: series.class,
            name: palette.display_name(series.class),
            color: palette.color(series.class).map(str::to_string),
            total: series.total,
            points: series.points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTerritory {
    pub key: String,
    pub name: String,
    pub area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCoverage {
    pub class: ClassId,
    pub name: String,
    pub color: Option<String>,
    pub area: f64,
}

/// Indicateur : surface finale d'une classe et son évolution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlineMetric {
    pub class: ClassId,
    pub name: String,
    pub initial_year: Year,
    pub final_year: Year,
    pub final_area: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub territory: String,
    pub territory_name: String,
    pub class: Option<ClassId>,
    pub coverage_name: String,
    pub year: Option<Year>,
    pub area: f64,
}

/// Toutes les données affichées pour un état de filtres
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub source: String,
    pub filter: FilterState,
    pub record_count: usize,
    pub total_area: f64,
    pub time_series: Vec<NamedSeries>,
    pub territory_ranking: Vec<RankedTerritory>,
    pub coverage_ranking: Vec<RankedCoverage>,
    pub metrics: Vec<HeadlineMetric>,
    pub territories: TerritoryCoverage,
    pub table: Vec<TableRow>,
    pub legend: Vec<HierarchyGroup>,
}

impl DashboardView {
    pub fn build(store: &RecordStore, palette: &Palette, filter: &FilterState) -> Self {
        Self::build_with_metrics(store, palette, filter, &DEFAULT_METRIC_CLASSES)
    }

    pub fn build_with_metrics(
        store: &RecordStore,
        palette: &Palette,
        filter: &FilterState,
        metric_classes: &[ClassId],
    ) -> Self {
        let resolver = store.resolver();
        let view = filter.apply(store.records());

        let time_series = aggregate::pivot_by_class_then_year(&view, TIME_SERIES_LIMIT)
            .into_iter()
            .map(|s| NamedSeries::from_series(s, palette))
            .collect();

        let territory_ranking = aggregate::territory_ranking(&view, TERRITORY_RANKING_LIMIT)
            .into_iter()
            .map(|(key, area)| RankedTerritory {
                name: resolver.resolve_display_name(&key),
                key,
                area,
            })
            .collect();

        let coverage_ranking = aggregate::coverage_ranking(&view, COVERAGE_RANKING_LIMIT)
            .into_iter()
            .map(|(class, area)| RankedCoverage {
                class,
                name: palette.display_name(class),
                color: palette.color(class).map(str::to_string),
                area,
            })
            .collect();

        let metrics = metric_classes
            .iter()
            .filter_map(|&class| aggregate::metric_delta(&view, class))
            .map(|m| HeadlineMetric {
                class: m.class,
                name: palette.display_name(m.class),
                initial_year: m.initial_year,
                final_year: m.final_year,
                final_area: m.final_value,
                delta: m.delta,
            })
            .collect();

        let table = view
            .iter()
            .take(TABLE_MAX_ROWS)
            .map(|r| TableRow {
                territory: r.territory.clone(),
                territory_name: resolver.resolve_display_name(&r.territory),
                class: r.class,
                coverage_name: match r.class {
                    Some(class) => palette.display_name(class),
                    None => String::new(),
                },
                year: r.year,
                area: r.area,
            })
            .collect();

        Self {
            source: store.source_name().to_string(),
            filter: filter.clone(),
            record_count: view.len(),
            total_area: view.total_area(),
            time_series,
            territory_ranking,
            coverage_ranking,
            metrics,
            territories: aggregate::territory_coverage(&view, store.territory_count()),
            table,
            legend: build_groups(&store.class_ids(), palette),
        }
    }
}

/// Contenu du popup d'une feature de la carte
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSummary {
    pub id_area: Option<String>,
    pub territory: Option<String>,
    pub name: Option<String>,

    /// Colonnes descriptives de la correspondance (hors clés et placeholders)
    pub metadata: Vec<(String, String)>,

    /// Surface totale du territoire, toutes lignes confondues
    pub total_area: f64,
    pub year_span: Option<(Year, Year)>,

    /// Principales classes sur l'intervalle d'années des filtres
    pub series: Vec<NamedSeries>,
}

impl FeatureSummary {
    pub fn has_data(&self) -> bool {
        self.year_span.is_some()
    }
}

fn is_metadata_column(column: &str) -> bool {
    column != JOIN_KEY_COLUMN && column != AREA_ID_COLUMN && !column.starts_with(PLACEHOLDER_PREFIX)
}

/// Résumé d'une feature : lignes du territoire sans les filtres du tableau
/// de bord, hormis l'intervalle d'années pour la série.
pub fn feature_summary(
    store: &RecordStore,
    palette: &Palette,
    filter: &FilterState,
    feature: &BoundaryFeature,
) -> FeatureSummary {
    let resolver = store.resolver();
    let territory = resolver.feature_territory(feature);
    let rows: FilteredView<'_> = resolver.feature_records(feature).into_iter().collect();

    let metadata: Vec<(String, String)> = territory
        .and_then(|t| resolver.mapping_entry(t))
        .map(|entry| {
            entry
                .columns
                .iter()
                .filter(|(column, value)| is_metadata_column(column) && !value.trim().is_empty())
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    let in_years = filter.apply_years(&rows);
    let series = aggregate::pivot_by_class_then_year(&in_years, POPUP_SERIES_LIMIT)
        .into_iter()
        .map(|s| NamedSeries::from_series(s, palette))
        .collect();

    FeatureSummary {
        id_area: feature.id_area.clone(),
        territory: territory.map(str::to_string),
        name: territory.map(|t| resolver.resolve_display_name(t)),
        metadata,
        total_area: rows.total_area(),
        year_span: rows.year_bounds(),
        series,
    }
}

impl Session {
    /// Instantané du tableau de bord pour la source courante
    pub fn dashboard(&self) -> Option<DashboardView> {
        self.store()
            .map(|store| DashboardView::build(store, self.palette(), self.filter()))
    }

    /// Popups des features affichables de la couche de limites
    pub fn feature_summaries(&self) -> Vec<FeatureSummary> {
        let Some(store) = self.store() else {
            return Vec::new();
        };
        let Some(layer) = store.boundaries() else {
            return Vec::new();
        };
        store
            .resolver()
            .visible_features(layer)
            .into_iter()
            .map(|f| feature_summary(store, self.palette(), self.filter(), f))
            .collect()
    }
}
