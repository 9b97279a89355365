//! Moteur de filtres : état immuable + réducteur d'actions
//!
//! Chaque interaction produit un nouvel état ; la vue filtrée est recalculée
//! à la demande et n'est jamais conservée.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::types::{ClassId, Record, Year};

/// Sélection d'un filtre à ensemble
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Selection<T: Ord> {
    /// Aucune restriction : tout passe
    Unrestricted,
    /// Seules les valeurs de l'ensemble passent ; un ensemble vide ne laisse rien passer
    Restricted(BTreeSet<T>),
    /// Tout passe sauf les valeurs de l'ensemble
    Excluding(BTreeSet<T>),
}

impl<T: Ord> Default for Selection<T> {
    fn default() -> Self {
        Selection::Unrestricted
    }
}

impl<T: Ord + Clone> Selection<T> {
    pub fn allows(&self, value: &T) -> bool {
        match self {
            Selection::Unrestricted => true,
            Selection::Restricted(set) => set.contains(value),
            Selection::Excluding(set) => !set.contains(value),
        }
    }

    /// Vrai si une valeur inconnue (classe absente) passe
    pub fn allows_unknown(&self) -> bool {
        !matches!(self, Selection::Restricted(_))
    }

    /// Active ou désactive une valeur
    fn toggle(&self, value: T, included: bool) -> Self {
        match (self, included) {
            (Selection::Unrestricted, true) => Selection::Unrestricted,
            (Selection::Unrestricted, false) => Selection::Excluding(BTreeSet::from([value])),
            (Selection::Excluding(set), _) => {
                let mut set = set.clone();
                if included {
                    set.remove(&value);
                } else {
                    set.insert(value);
                }
                if set.is_empty() {
                    Selection::Unrestricted
                } else {
                    Selection::Excluding(set)
                }
            }
            (Selection::Restricted(set), _) => {
                let mut set = set.clone();
                if included {
                    set.insert(value);
                } else {
                    set.remove(&value);
                }
                Selection::Restricted(set)
            }
        }
    }

    /// Tout cocher sans domaine connu revient à ne rien restreindre
    fn select_all(all: bool, domain: &BTreeSet<T>) -> Self {
        match (all, domain.is_empty()) {
            (true, true) => Selection::Unrestricted,
            (true, false) => Selection::Restricted(domain.clone()),
            (false, _) => Selection::Restricted(BTreeSet::new()),
        }
    }
}

/// Action utilisateur sur les filtres
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAction {
    SetYearRange { min: Year, max: Year },
    ToggleTerritory { key: String, included: bool },
    ToggleCoverage { class: ClassId, included: bool },
    SelectAllTerritories(bool),
    SelectAllCoverages(bool),
}

/// Valeurs présentes dans la source (domaine des filtres)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterDomain {
    pub year_min: Year,
    pub year_max: Year,
    pub territories: BTreeSet<String>,
    pub coverages: BTreeSet<ClassId>,
}

impl FilterDomain {
    pub fn from_records(records: &[Record]) -> Self {
        let mut years = records.iter().filter_map(|r| r.year);
        let (year_min, year_max) = match years.next() {
            Some(first) => years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))),
            None => (0, 0),
        };

        Self {
            year_min,
            year_max,
            territories: records.iter().map(|r| r.territory.clone()).collect(),
            coverages: records.iter().filter_map(|r| r.class).collect(),
        }
    }
}

/// État des filtres actifs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterState {
    pub year_min: Year,
    pub year_max: Year,
    pub territories: Selection<String>,
    pub coverages: Selection<ClassId>,
    #[serde(skip)]
    domain: FilterDomain,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            year_min: Year::MIN,
            year_max: Year::MAX,
            territories: Selection::Unrestricted,
            coverages: Selection::Unrestricted,
            domain: FilterDomain::default(),
        }
    }
}

impl FilterState {
    /// État initial d'une source : années extrêmes observées, toutes les
    /// valeurs présentes sélectionnées
    pub fn from_records(records: &[Record]) -> Self {
        let domain = FilterDomain::from_records(records);
        Self {
            year_min: domain.year_min,
            year_max: domain.year_max,
            territories: Selection::Restricted(domain.territories.clone()),
            coverages: Selection::Restricted(domain.coverages.clone()),
            domain,
        }
    }

    pub fn domain(&self) -> &FilterDomain {
        &self.domain
    }

    /// Applique une action et retourne le nouvel état
    pub fn reduce(&self, action: FilterAction) -> Self {
        let mut next = self.clone();
        match action {
            FilterAction::SetYearRange { min, max } => {
                next.year_min = min.min(max);
                next.year_max = min.max(max);
            }
            FilterAction::ToggleTerritory { key, included } => {
                next.territories = self.territories.toggle(key, included);
            }
            FilterAction::ToggleCoverage { class, included } => {
                next.coverages = self.coverages.toggle(class, included);
            }
            FilterAction::SelectAllTerritories(all) => {
                next.territories = Selection::select_all(all, &self.domain.territories);
            }
            FilterAction::SelectAllCoverages(all) => {
                next.coverages = Selection::select_all(all, &self.domain.coverages);
            }
        }
        next
    }

    pub fn set_year_range(&self, min: Year, max: Year) -> Self {
        self.reduce(FilterAction::SetYearRange { min, max })
    }

    pub fn toggle_territory(&self, key: impl Into<String>, included: bool) -> Self {
        self.reduce(FilterAction::ToggleTerritory {
            key: key.into(),
            included,
        })
    }

    pub fn toggle_coverage(&self, class: ClassId, included: bool) -> Self {
        self.reduce(FilterAction::ToggleCoverage { class, included })
    }

    /// Une ligne passe si son année est dans l'intervalle et si son
    /// territoire et sa classe sont sélectionnés
    pub fn matches(&self, record: &Record) -> bool {
        let in_years = record
            .year
            .is_some_and(|y| self.year_min <= y && y <= self.year_max);
        if !in_years {
            return false;
        }
        if !self.territories.allows(&record.territory) {
            return false;
        }
        match record.class {
            Some(class) => self.coverages.allows(&class),
            None => self.coverages.allows_unknown(),
        }
    }

    /// Vue filtrée, dans l'ordre d'entrée
    pub fn apply<'a, I>(&self, records: I) -> FilteredView<'a>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        FilteredView {
            rows: records.into_iter().filter(|r| self.matches(r)).collect(),
        }
    }

    /// Lignes passant le seul filtre d'années (popups de la carte)
    pub fn apply_years<'a, I>(&self, records: I) -> FilteredView<'a>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        FilteredView {
            rows: records
                .into_iter()
                .filter(|r| {
                    r.year
                        .is_some_and(|y| self.year_min <= y && y <= self.year_max)
                })
                .collect(),
        }
    }
}

/// Vue filtrée : références vers les lignes du store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredView<'a> {
    rows: Vec<&'a Record>,
}

impl<'a> FilteredView<'a> {
    pub fn rows(&self) -> &[&'a Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.rows.iter().copied()
    }

    /// Surface totale de la vue
    pub fn total_area(&self) -> f64 {
        self.iter().map(|r| r.area).sum()
    }

    /// Années extrêmes de la vue
    pub fn year_bounds(&self) -> Option<(Year, Year)> {
        let mut years = self.iter().filter_map(|r| r.year);
        let first = years.next()?;
        Some(years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
    }

    /// Nombre de territoires distincts
    pub fn territory_count(&self) -> usize {
        self.iter()
            .map(|r| r.territory.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

impl<'v, 'a> IntoIterator for &'v FilteredView<'a> {
    type Item = &'a Record;
    type IntoIter = std::iter::Copied<std::slice::Iter<'v, &'a Record>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter().copied()
    }
}

impl<'a> FromIterator<&'a Record> for FilteredView<'a> {
    fn from_iter<I: IntoIterator<Item = &'a Record>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
