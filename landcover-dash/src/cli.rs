//! Définition et implémentation des commandes CLI
//!
//! - `sources`: liste du registre
//! - `summary`: graphiques, indicateurs et tableau pour une source filtrée
//! - `legend`: légende hiérarchique des couvertures
//! - `map`: jointure couche de limites / tableau, export GeoJSON
//! - `session`: tableau de bord interactif sur l'entrée standard

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use futures::stream::{self, StreamExt};
use landcover::view::feature_summary;
use landcover::{
    ClassId, FilterAction, FilterState, LandcoverError, LoadOutcome, LoadTicket, ParseOutcome,
    RecordStore, Session, Year,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{Paths, Registry};
use crate::loader;
use crate::render;
use crate::report::LoadReport;

#[derive(Subcommand)]
pub enum Commands {
    /// List the data sources declared in the registry
    Sources {
        /// Load every source and report its status
        #[arg(long)]
        check: bool,
    },

    /// Print charts series, metrics and table for a source
    Summary {
        /// Source name (default: first source of the registry)
        #[arg(short, long)]
        source: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Write the load report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print the hierarchical coverage legend of a source
    Legend {
        #[arg(short, long)]
        source: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Join the boundary layer with the table and print popup summaries
    Map {
        #[arg(short, long)]
        source: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long)]
        json: bool,

        /// Export the visible features as GeoJSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Interactive dashboard reading commands from stdin
    Session {
        /// Source loaded at startup (default: first source of the registry)
        #[arg(short, long)]
        source: Option<String>,

        #[arg(long)]
        json: bool,
    },
}

/// Emplacements des fichiers (prioritaires sur l'environnement)
#[derive(Args, Debug, Default)]
pub struct PathArgs {
    /// Data-source registry (défaut : env LANDCOVER_REGISTRY / data_sources.json)
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    /// Tabular files directory (défaut : env LANDCOVER_DATA_DIR / process/data)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Code files directory (défaut : env LANDCOVER_CODES_DIR / process/codigos)
    #[arg(long, global = true)]
    pub codes_dir: Option<PathBuf>,

    /// Shared palette (défaut : env LANDCOVER_PALETTE / <codes-dir>/palette.txt)
    #[arg(long, global = true)]
    pub palette: Option<PathBuf>,

    /// Boundary layers directory (défaut : env LANDCOVER_GIS_DIR / process/gis)
    #[arg(long, global = true)]
    pub gis_dir: Option<PathBuf>,
}

impl PathArgs {
    pub fn resolve(self) -> Paths {
        let mut paths = Paths::from_env();
        paths.apply_overrides(
            self.registry,
            self.data_dir,
            self.codes_dir,
            self.palette,
            self.gis_dir,
        );
        paths
    }
}

/// Filtres du tableau de bord
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Year range, e.g. 2000:2020
    #[arg(long, value_parser = parse_year_range)]
    pub years: Option<(Year, Year)>,

    /// Keep only these territories (repeatable)
    #[arg(long = "territory")]
    pub territories: Vec<String>,

    /// Exclude territories (repeatable)
    #[arg(long = "exclude-territory")]
    pub exclude_territories: Vec<String>,

    /// Keep only these coverage classes (repeatable)
    #[arg(long = "coverage")]
    pub coverages: Vec<ClassId>,

    /// Exclude coverage classes (repeatable)
    #[arg(long = "exclude-coverage")]
    pub exclude_coverages: Vec<ClassId>,
}

impl FilterArgs {
    /// Actions équivalentes aux options, dans l'ordre d'application
    pub fn actions(&self) -> Vec<FilterAction> {
        let mut actions = Vec::new();

        if let Some((min, max)) = self.years {
            actions.push(FilterAction::SetYearRange { min, max });
        }
        if !self.territories.is_empty() {
            actions.push(FilterAction::SelectAllTerritories(false));
            actions.extend(self.territories.iter().map(|key| FilterAction::ToggleTerritory {
                key: landcover::types::canonical_key(key),
                included: true,
            }));
        }
        actions.extend(
            self.exclude_territories
                .iter()
                .map(|key| FilterAction::ToggleTerritory {
                    key: landcover::types::canonical_key(key),
                    included: false,
                }),
        );
        if !self.coverages.is_empty() {
            actions.push(FilterAction::SelectAllCoverages(false));
            actions.extend(self.coverages.iter().map(|&class| FilterAction::ToggleCoverage {
                class,
                included: true,
            }));
        }
        actions.extend(
            self.exclude_coverages
                .iter()
                .map(|&class| FilterAction::ToggleCoverage {
                    class,
                    included: false,
                }),
        );

        actions
    }

    pub fn apply(&self, state: &FilterState) -> FilterState {
        self.actions()
            .into_iter()
            .fold(state.clone(), |state, action| state.reduce(action))
    }
}

/// Parse `2000:2020` ou `2000-2020` ; une seule année donne un intervalle d'un an
fn parse_year_range(s: &str) -> Result<(Year, Year), String> {
    let parse = |v: &str| {
        v.trim()
            .parse::<Year>()
            .map_err(|_| format!("Invalid year: {}", v.trim()))
    };
    match s.split_once(|c| c == ':' || c == '-') {
        Some((min, max)) => Ok((parse(min)?, parse(max)?)),
        None => {
            let year = parse(s)?;
            Ok((year, year))
        }
    }
}

/// Charge une source et construit son rapport
async fn load_with_report(
    paths: &Paths,
    palette_entries: usize,
    name: &str,
    config: &landcover::SourceConfig,
) -> (landcover::Result<ParseOutcome<RecordStore>>, LoadReport) {
    let started_at = Instant::now();
    let result = loader::load_source(paths, name, config).await;

    let mut report = LoadReport::new(name);
    report.record_palette(palette_entries);
    match &result {
        Ok(outcome) => {
            report.record_store(&outcome.value);
            report.record_issues(&outcome.errors);
        }
        Err(e) => report.record_failure(e),
    }
    let elapsed = started_at.elapsed();
    info!(source = name, duration = %format_duration(elapsed), "Load finished");
    report.set_duration(elapsed);
    report.finalize();

    (result, report)
}

/// Registre, palette et session avec la source demandée chargée
async fn open_session(paths: &Paths, source: Option<&str>) -> Result<(Session, LoadReport)> {
    let registry = Registry::load(&paths.registry)?;
    let (name, config) = registry.resolve(source)?;

    let palette = loader::load_palette(&paths.palette).await;
    let (result, mut report) = load_with_report(paths, palette.value.len(), name, config).await;
    report.record_issues(&palette.errors);
    report.finalize();

    let mut session = Session::new(palette.value);
    let ticket = session.begin_load(name);
    match session.complete_load(ticket, result) {
        LoadOutcome::Applied(_) => Ok((session, report)),
        LoadOutcome::Failed(e) => {
            report.display();
            Err(e).context(format!("Failed to load source {}", name))
        }
        LoadOutcome::Stale => bail!("Load of {} superseded", name),
    }
}

/// Chargements simultanés pour `sources --check`
const SOURCE_CHECK_CONCURRENCY: usize = 4;

/// Exécute la commande sources
pub async fn cmd_sources(paths: &Paths, check: bool) -> Result<()> {
    let registry = Registry::load(&paths.registry)?;

    let statuses: Vec<Option<String>> = if check {
        stream::iter(registry.iter())
            .map(|(name, config)| async move {
                match loader::load_source(paths, name, config).await {
                    Ok(outcome) => Some(format!(
                        "ok, {} records, {} issues",
                        outcome.value.records().len(),
                        outcome.errors.len()
                    )),
                    Err(e) => Some(format!("FAILED: {}", e)),
                }
            })
            .buffered(SOURCE_CHECK_CONCURRENCY)
            .collect()
            .await
    } else {
        vec![None; registry.len()]
    };

    println!("=== Sources ({}) ===", registry.len());
    for (i, ((name, config), status)) in registry.iter().zip(statuses).enumerate() {
        let marker = if i == 0 { " (default)" } else { "" };
        println!("{}{}", name, marker);
        println!("  table: {}", paths.table_path(config).display());
        if let Some(codes) = paths.codes_path(config) {
            println!("  codes: {}", codes.display());
        }
        if let Some(gis) = paths.gis_path(config) {
            println!("  gis:   {}", gis.display());
        }
        if let Some(description) = &config.description {
            println!("  {}", description);
        }
        if let Some(status) = status {
            println!("  status: {}", status);
        }
    }

    Ok(())
}

/// Exécute la commande summary
pub async fn cmd_summary(
    paths: &Paths,
    source: Option<&str>,
    filters: &FilterArgs,
    json: bool,
    report_path: Option<&PathBuf>,
) -> Result<()> {
    let (mut session, report) = open_session(paths, source).await?;
    if let Some(path) = report_path {
        report
            .save_to_file(path)
            .context(format!("Failed to write report: {}", path.display()))?;
    }

    for action in filters.actions() {
        session.dispatch(action);
    }
    let view = session.dashboard().context("No source loaded")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        report.display();
        render::print_dashboard(&view);
    }

    Ok(())
}

/// Exécute la commande legend
pub async fn cmd_legend(paths: &Paths, source: Option<&str>, json: bool) -> Result<()> {
    let (session, _) = open_session(paths, source).await?;
    let view = session.dashboard().context("No source loaded")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view.legend)?);
    } else {
        render::print_legend(&view.legend);
    }

    Ok(())
}

/// Exécute la commande map
pub async fn cmd_map(
    paths: &Paths,
    source: Option<&str>,
    filters: &FilterArgs,
    json: bool,
    output: Option<&PathBuf>,
) -> Result<()> {
    let (mut session, _) = open_session(paths, source).await?;
    for action in filters.actions() {
        session.dispatch(action);
    }

    let store = session.store().context("No source loaded")?;
    let Some(layer) = store.boundaries() else {
        bail!("Source {} has no boundary layer", store.source_name());
    };

    let features: Vec<_> = store
        .resolver()
        .visible_features(layer)
        .into_iter()
        .map(|f| (f, feature_summary(store, session.palette(), session.filter(), f)))
        .collect();

    info!(
        source = store.source_name(),
        layer = layer.len(),
        visible = features.len(),
        "Joined boundary layer"
    );

    if let Some(path) = output {
        crate::export::export_to_geojson(&features, path)?;
        println!("Exported {} features to {}", features.len(), path.display());
    }

    let summaries: Vec<_> = features.into_iter().map(|(_, s)| s).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        render::print_layer_bounds(layer);
        render::print_features(&summaries);
    }

    Ok(())
}

/// Commande de la session interactive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Load(String),
    Filter(FilterAction),
    Show,
    Legend,
    Map,
    Sources,
    Help,
    Quit,
}

fn parse_switch(s: &str) -> Result<bool> {
    match s {
        "on" | "true" | "yes" | "+" => Ok(true),
        "off" | "false" | "no" | "-" => Ok(false),
        _ => bail!("Expected on/off, found '{}'", s),
    }
}

/// Parse une ligne de la session interactive
pub fn parse_session_command(line: &str) -> Result<Option<SessionCommand>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let command = match words.as_slice() {
        [] => return Ok(None),
        ["load", name] => SessionCommand::Load(name.to_string()),
        ["years", range] => {
            let (min, max) = parse_year_range(range).map_err(anyhow::Error::msg)?;
            SessionCommand::Filter(FilterAction::SetYearRange { min, max })
        }
        ["years", min, max] => {
            let (min, max) = parse_year_range(&format!("{}:{}", min, max))
                .map_err(anyhow::Error::msg)?;
            SessionCommand::Filter(FilterAction::SetYearRange { min, max })
        }
        ["territory", key, switch] => SessionCommand::Filter(FilterAction::ToggleTerritory {
            key: landcover::types::canonical_key(key),
            included: parse_switch(switch)?,
        }),
        ["coverage", class, switch] => SessionCommand::Filter(FilterAction::ToggleCoverage {
            class: class
                .parse()
                .context(format!("Invalid coverage class: {}", class))?,
            included: parse_switch(switch)?,
        }),
        ["territories", switch] => {
            SessionCommand::Filter(FilterAction::SelectAllTerritories(parse_switch(switch)?))
        }
        ["coverages", switch] => {
            SessionCommand::Filter(FilterAction::SelectAllCoverages(parse_switch(switch)?))
        }
        ["show"] => SessionCommand::Show,
        ["legend"] => SessionCommand::Legend,
        ["map"] => SessionCommand::Map,
        ["sources"] => SessionCommand::Sources,
        ["help"] | ["?"] => SessionCommand::Help,
        ["quit"] | ["exit"] => SessionCommand::Quit,
        _ => bail!("Unknown command: {}", line.trim()),
    };
    Ok(Some(command))
}

const SESSION_HELP: &str = "\
Commands:
  load <source>                 load a source (a newer load discards older ones)
  years <min>:<max>             set the year range
  territory <key> on|off        toggle a territory
  coverage <class> on|off       toggle a coverage class
  territories on|off            select all / no territories
  coverages on|off              select all / no coverages
  show | legend | map | sources
  quit";

/// Résultat d'un chargement lancé en tâche de fond
struct LoadDone {
    ticket: LoadTicket,
    result: landcover::Result<ParseOutcome<RecordStore>>,
    report: LoadReport,
}

/// Lance le chargement d'une source en tâche de fond
fn spawn_load(
    session: &mut Session,
    registry: &Registry,
    paths: &Paths,
    palette_entries: usize,
    name: &str,
    tx: &mpsc::Sender<LoadDone>,
) -> Result<()> {
    let config = registry
        .get(name)
        .cloned()
        .ok_or_else(|| LandcoverError::UnknownSource(name.to_string()))?;

    let ticket = session.begin_load(name);
    let tx = tx.clone();
    let paths = paths.clone();

    tokio::spawn(async move {
        let (result, report) =
            load_with_report(&paths, palette_entries, &ticket.source, &config).await;
        if tx.send(LoadDone { ticket, result, report }).await.is_err() {
            warn!("Session closed before load completion");
        }
    });

    println!("Loading {}...", name);
    Ok(())
}

fn print_view(session: &Session, json: bool) -> Result<()> {
    match session.dashboard() {
        Some(view) if json => println!("{}", serde_json::to_string_pretty(&view)?),
        Some(view) => render::print_dashboard(&view),
        None => println!("No source loaded"),
    }
    Ok(())
}

/// Applique un chargement terminé à la session
fn complete(session: &mut Session, done: LoadDone, json: bool) -> Result<()> {
    let LoadDone {
        ticket,
        result,
        report,
    } = done;
    let source = ticket.source.clone();
    match session.complete_load(ticket, result) {
        LoadOutcome::Applied(_) => {
            println!("{}", report.summary());
            print_view(session, json)?;
        }
        LoadOutcome::Stale => println!("Discarded superseded load of {}", source),
        LoadOutcome::Failed(e) => {
            report.display();
            println!("Failed to load {}: {}", source, e);
        }
    }
    Ok(())
}

/// Exécute la commande session
pub async fn cmd_session(paths: &Paths, source: Option<&str>, json: bool) -> Result<()> {
    run_session(paths, source, json, BufReader::new(tokio::io::stdin())).await?;
    Ok(())
}

/// Boucle de la session interactive sur une entrée quelconque.
///
/// Le chargement initial est attendu avant de lire la première commande ;
/// les chargements suivants se terminent pendant la lecture. Retourne la
/// session finale.
pub async fn run_session<R>(
    paths: &Paths,
    source: Option<&str>,
    json: bool,
    input: R,
) -> Result<Session>
where
    R: AsyncBufRead + Unpin,
{
    let registry = Registry::load(&paths.registry)?;
    let palette = loader::load_palette(&paths.palette).await;
    for error in &palette.errors {
        println!("Palette: {}", error);
    }
    let palette_entries = palette.value.len();
    let mut session = Session::new(palette.value);

    let (tx, mut rx) = mpsc::channel::<LoadDone>(8);
    let (initial, _) = registry.resolve(source)?;
    spawn_load(&mut session, &registry, paths, palette_entries, initial, &tx)?;
    if let Some(done) = rx.recv().await {
        complete(&mut session, done, json)?;
    }

    let mut lines = input.lines();
    println!("{}", SESSION_HELP);

    loop {
        tokio::select! {
            Some(done) = rx.recv() => complete(&mut session, done, json)?,
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read session input")? else {
                    break;
                };
                let command = match parse_session_command(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };

                match command {
                    SessionCommand::Load(name) => {
                        if let Err(e) = spawn_load(&mut session, &registry, paths, palette_entries, &name, &tx) {
                            println!("{}", e);
                        }
                    }
                    SessionCommand::Filter(action) => {
                        session.dispatch(action);
                        print_view(&session, json)?;
                    }
                    SessionCommand::Show => print_view(&session, json)?,
                    SessionCommand::Legend => {
                        if let Some(view) = session.dashboard() {
                            render::print_legend(&view.legend);
                        }
                    }
                    SessionCommand::Map => {
                        let summaries = session.feature_summaries();
                        if json {
                            println!("{}", serde_json::to_string_pretty(&summaries)?);
                        } else {
                            render::print_features(&summaries);
                        }
                    }
                    SessionCommand::Sources => {
                        for (name, _) in registry.iter() {
                            println!("  {}", name);
                        }
                    }
                    SessionCommand::Help => println!("{}", SESSION_HELP),
                    SessionCommand::Quit => break,
                }
            }
        }
    }

    Ok(session)
}

/// Durée lisible pour les logs
pub fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landcover::{Record, Selection};

    #[test]
    fn test_parse_year_range() {
        assert_eq!(parse_year_range("2000:2020"), Ok((2000, 2020)));
        assert_eq!(parse_year_range("2000-2020"), Ok((2000, 2020)));
        assert_eq!(parse_year_range("2015"), Ok((2015, 2015)));
        assert!(parse_year_range("20x0:2020").is_err());
    }

    #[test]
    fn test_filter_args_apply() {
        let records = vec![
            Record::new("A", 3, 2000, 1.0),
            Record::new("B", 15, 2005, 1.0),
            Record::new("C", 18, 2010, 1.0),
        ];
        let initial = FilterState::from_records(&records);

        let args = FilterArgs {
            years: Some((2000, 2005)),
            territories: vec!["A".into(), "B".into()],
            exclude_coverages: vec![15],
            ..Default::default()
        };
        let state = args.apply(&initial);
        let view = state.apply(&records);

        assert_eq!(view.len(), 1);
        assert_eq!(view.rows()[0].territory, "A");
        assert!(matches!(state.territories, Selection::Restricted(ref s) if s.len() == 2));
    }

    #[test]
    fn test_filter_args_canonical_keys() {
        let args = FilterArgs {
            exclude_territories: vec!["12.0".into()],
            ..Default::default()
        };
        assert_eq!(
            args.actions(),
            vec![FilterAction::ToggleTerritory {
                key: "12".into(),
                included: false
            }]
        );
    }

    #[test]
    fn test_parse_session_command() {
        assert_eq!(
            parse_session_command("load MASCARA").unwrap(),
            Some(SessionCommand::Load("MASCARA".into()))
        );
        assert_eq!(
            parse_session_command("years 2000 2010").unwrap(),
            Some(SessionCommand::Filter(FilterAction::SetYearRange {
                min: 2000,
                max: 2010
            }))
        );
        assert_eq!(
            parse_session_command("coverage 3 off").unwrap(),
            Some(SessionCommand::Filter(FilterAction::ToggleCoverage {
                class: 3,
                included: false
            }))
        );
        assert_eq!(
            parse_session_command("territories on").unwrap(),
            Some(SessionCommand::Filter(FilterAction::SelectAllTerritories(true)))
        );
        assert_eq!(parse_session_command("   ").unwrap(), None);
        assert_eq!(parse_session_command("quit").unwrap(), Some(SessionCommand::Quit));
    }

    #[test]
    fn test_parse_session_command_errors() {
        assert!(parse_session_command("coverage x on").is_err());
        assert!(parse_session_command("territory A maybe").is_err());
        assert!(parse_session_command("dance").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
