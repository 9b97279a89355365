//! Agrégations sur une vue filtrée : sommes groupées, classements, séries

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use serde::Serialize;

use crate::filter::FilteredView;
use crate::types::{sanitize_area, ClassId, Record, Year};

/// Classes affichées dans le graphique temporel
pub const TIME_SERIES_LIMIT: usize = 10;

/// Territoires du classement
pub const TERRITORY_RANKING_LIMIT: usize = 15;

/// Couvertures du classement
pub const COVERAGE_RANKING_LIMIT: usize = 10;

/// Classes de la série d'un popup
pub const POPUP_SERIES_LIMIT: usize = 5;

/// Forêt, pâturage, agriculture
pub const DEFAULT_METRIC_CLASSES: [ClassId; 3] = [3, 15, 18];

/// Sommes de surface par clé, dans l'ordre de première rencontre
#[derive(Debug, Clone)]
pub struct GroupedSums<K> {
    groups: Vec<(K, f64)>,
    index: HashMap<K, usize>,
}

impl<K> Default for GroupedSums<K> {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq + Clone> GroupedSums<K> {
    /// Ajoute une surface au groupe `key`
    pub fn add(&mut self, key: K, area: f64) {
        let area = sanitize_area(area);
        match self.index.get(&key) {
            Some(&slot) => self.groups[slot].1 += area,
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push((key, area));
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<f64> {
        self.index.get(key).map(|&slot| self.groups[slot].1)
    }
}

impl<K> GroupedSums<K> {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.groups.iter().map(|(k, v)| (k, *v))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.groups.iter().map(|(_, v)| *v)
    }

    pub fn total(&self) -> f64 {
        self.values().sum()
    }

    pub fn into_vec(self) -> Vec<(K, f64)> {
        self.groups
    }
}

/// Somme des surfaces groupées par `key_fn` ; les lignes sans clé sont ignorées
pub fn group_sum<'a, K, I, F>(rows: I, key_fn: F) -> GroupedSums<K>
where
    K: Hash + Eq + Clone,
    I: IntoIterator<Item = &'a Record>,
    F: Fn(&Record) -> Option<K>,
{
    let mut sums = GroupedSums::default();
    for record in rows {
        if let Some(key) = key_fn(record) {
            sums.add(key, record.area);
        }
    }
    sums
}

pub fn by_year(record: &Record) -> Option<Year> {
    record.year
}

pub fn by_class(record: &Record) -> Option<ClassId> {
    record.class
}

pub fn by_territory(record: &Record) -> Option<String> {
    Some(record.territory.clone())
}

pub fn by_year_and_class(record: &Record) -> Option<(Year, ClassId)> {
    Some((record.year?, record.class?))
}

/// Départage des égalités dans `top_n`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// Ordre de première rencontre (tri stable)
    #[default]
    FirstEncountered,
    /// Clé croissante
    KeyAscending,
}

/// Les `n` plus grands groupes, par valeur décroissante
pub fn top_n<K: Ord + Clone>(groups: &GroupedSums<K>, n: usize, tie_break: TieBreak) -> Vec<(K, f64)> {
    let mut ranked: Vec<(K, f64)> = groups.iter().map(|(k, v)| (k.clone(), v)).collect();
    match tie_break {
        TieBreak::FirstEncountered => ranked.sort_by(|a, b| b.1.total_cmp(&a.1)),
        TieBreak::KeyAscending => ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))),
    }
    ranked.truncate(n);
    ranked
}

/// Série temporelle d'une classe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSeries {
    pub class: ClassId,

    /// Surface cumulée sur toutes les années de la vue
    pub total: f64,

    pub points: BTreeMap<Year, f64>,
}

/// Pivot classe -> année -> surface, limité aux `limit` classes de plus
/// grande surface totale. Les classes au-delà sont écartées.
pub fn pivot_by_class_then_year(view: &FilteredView<'_>, limit: usize) -> Vec<ClassSeries> {
    let totals = group_sum(view, by_class);
    let kept = top_n(&totals, limit, TieBreak::FirstEncountered);

    let mut points: HashMap<ClassId, BTreeMap<Year, f64>> =
        kept.iter().map(|(class, _)| (*class, BTreeMap::new())).collect();

    for record in view {
        let (Some(class), Some(year)) = (record.class, record.year) else {
            continue;
        };
        if let Some(series) = points.get_mut(&class) {
            *series.entry(year).or_insert(0.0) += record.area;
        }
    }

    kept.into_iter()
        .map(|(class, total)| ClassSeries {
            class,
            total,
            points: points.remove(&class).unwrap_or_default(),
        })
        .collect()
}

/// Évolution d'une classe entre la première et la dernière année de la vue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDelta {
    pub class: ClassId,
    pub initial_year: Year,
    pub final_year: Year,
    pub initial: f64,
    pub final_value: f64,
    pub delta: f64,
}

/// Delta `final - initial` pour une classe ; une classe absente d'une des
/// deux années compte pour 0. `None` si la vue ne contient aucune année.
pub fn metric_delta(view: &FilteredView<'_>, class: ClassId) -> Option<MetricDelta> {
    let (initial_year, final_year) = view.year_bounds()?;

    let area_at = |year: Year| -> f64 {
        view.iter()
            .filter(|r| r.class == Some(class) && r.year == Some(year))
            .map(|r| r.area)
            .sum()
    };

    let initial = area_at(initial_year);
    let final_value = area_at(final_year);

    Some(MetricDelta {
        class,
        initial_year,
        final_year,
        initial,
        final_value,
        delta: final_value - initial,
    })
}

/// Classement des territoires par surface totale
pub fn territory_ranking(view: &FilteredView<'_>, limit: usize) -> Vec<(String, f64)> {
    top_n(&group_sum(view, by_territory), limit, TieBreak::FirstEncountered)
}

/// Classement des couvertures par surface totale
pub fn coverage_ranking(view: &FilteredView<'_>, limit: usize) -> Vec<(ClassId, f64)> {
    top_n(&group_sum(view, by_class), limit, TieBreak::FirstEncountered)
}

/// Nombre de territoires de la vue et part sur l'ensemble des territoires
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TerritoryCoverage {
    pub count: usize,
    pub total: usize,
    pub percent: f64,
}

pub fn territory_coverage(view: &FilteredView<'_>, total_territories: usize) -> TerritoryCoverage {
    let count = view.territory_count();
    let percent = if total_territories == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total_territories as f64
    };
    TerritoryCoverage {
        count,
        total: total_territories,
        percent,
    }
}
