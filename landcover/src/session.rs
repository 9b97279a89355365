//! Session du tableau de bord : source courante, filtres, générations de chargement

use tracing::{debug, info, warn};

use crate::filter::{FilterAction, FilterState, FilteredView};
use crate::parser::palette::Palette;
use crate::store::RecordStore;
use crate::types::ParseOutcome;
use crate::{LandcoverError, Result};

/// Jeton remis au début d'un chargement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub source: String,
}

/// Issue de `Session::complete_load`
#[derive(Debug)]
pub enum LoadOutcome {
    /// Source appliquée ; erreurs non fatales rencontrées
    Applied(Vec<LandcoverError>),
    /// Un chargement plus récent a été lancé : résultat ignoré
    Stale,
    /// Échec ; la source précédente reste en place
    Failed(LandcoverError),
}

/// État en mémoire d'une session (un seul mutateur)
#[derive(Debug, Default)]
pub struct Session {
    palette: Palette,
    store: Option<RecordStore>,
    filter: FilterState,
    generation: u64,
}

impl Session {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            ..Default::default()
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn store(&self) -> Option<&RecordStore> {
        self.store.as_ref()
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Démarre un chargement ; tout chargement en cours devient obsolète
    pub fn begin_load(&mut self, source: impl Into<String>) -> LoadTicket {
        self.generation += 1;
        let ticket = LoadTicket {
            generation: self.generation,
            source: source.into(),
        };
        debug!(source = %ticket.source, generation = ticket.generation, "Load started");
        ticket
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Termine un chargement.
    ///
    /// Le résultat n'est appliqué que si le jeton est le plus récent. En cas
    /// de succès les filtres sont réinitialisés sur la nouvelle source.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<ParseOutcome<RecordStore>>,
    ) -> LoadOutcome {
        if !self.is_current(&ticket) {
            warn!(
                source = %ticket.source,
                generation = ticket.generation,
                current = self.generation,
                "Discarding stale load"
            );
            return LoadOutcome::Stale;
        }

        match result {
            Ok(outcome) => {
                let store = outcome.value;
                self.filter = FilterState::from_records(store.records());
                info!(
                    source = %ticket.source,
                    records = store.records().len(),
                    issues = outcome.errors.len(),
                    "Source applied"
                );
                self.store = Some(store);
                LoadOutcome::Applied(outcome.errors)
            }
            Err(e) => {
                warn!(source = %ticket.source, error = %e, "Load failed, keeping previous source");
                LoadOutcome::Failed(e)
            }
        }
    }

    /// Applique une action de filtre
    pub fn dispatch(&mut self, action: FilterAction) -> &FilterState {
        self.filter = self.filter.reduce(action);
        &self.filter
    }

    /// Vue filtrée courante (vide sans source)
    pub fn view(&self) -> FilteredView<'_> {
        match &self.store {
            Some(store) => self.filter.apply(store.records()),
            None => FilteredView::default(),
        }
    }
}
