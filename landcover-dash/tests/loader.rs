//! Tests d'intégration : lecture des fichiers d'une source depuis le disque

use std::path::PathBuf;

use landcover::{LoadOutcome, Session};
use landcover_dash::cli::{run_session, FilterArgs};
use landcover_dash::config::{Paths, Registry};
use landcover_dash::loader;
use landcover_dash::report::{LoadReport, LoadStatus};

const REGISTRY: &str = r#"{
    "TEST": {
        "file": "test.csv",
        "codes": "test.txt",
        "columns": ["id_gee", "id_area", "nombre", "placeholder1"],
        "barchart": "nombre",
        "gis": "test.geojson"
    },
    "NO_GIS": {"file": "test.csv", "gis": "missing.geojson"},
    "BROKEN": {"file": "missing.csv"}
}"#;

const TABLE: &str = "\
territory,class,year,area
T1,3,2000,10
T1,3,2010,40
T2,3,2000,0
A1,15,2000,2.5
A1,15,2010,3.5
";

const CODES: &str = "\
A1;99;RI-Resguardo Indígena Tamaquito;placeholder
T1;100;Leticia;
";

const PALETTE: &str = "\
ESP;ID;Color number
1. Bosque;1;#1f8d49
1.1. Formación forestal;3;#1f8d49
3. Agropecuaria;14;#ffefc3
3.1. Pasto;15;#edde8e
";

const GIS: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"id_area": 99},
         "geometry": {"type": "Point", "coordinates": [-70.0, -4.0]}},
        {"type": "Feature", "properties": {"id_area": 7},
         "geometry": {"type": "Point", "coordinates": [-71.0, -3.0]}}
    ]
}"#;

/// Arborescence de données temporaire propre à un test
fn fixture_dir(name: &str) -> Paths {
    let root: PathBuf =
        std::env::temp_dir().join(format!("landcover_dash_{}_{}", name, std::process::id()));
    let data_dir = root.join("data");
    let codes_dir = root.join("codigos");
    let gis_dir = root.join("gis");
    for dir in [&data_dir, &codes_dir, &gis_dir] {
        std::fs::create_dir_all(dir).unwrap();
    }

    std::fs::write(root.join("data_sources.json"), REGISTRY).unwrap();
    std::fs::write(data_dir.join("test.csv"), TABLE).unwrap();
    std::fs::write(codes_dir.join("test.txt"), CODES).unwrap();
    std::fs::write(codes_dir.join("palette.txt"), PALETTE).unwrap();
    std::fs::write(gis_dir.join("test.geojson"), GIS).unwrap();

    Paths {
        registry: root.join("data_sources.json"),
        palette: codes_dir.join("palette.txt"),
        data_dir,
        codes_dir,
        gis_dir,
    }
}

#[tokio::test]
async fn test_load_source_from_disk() {
    let paths = fixture_dir("full");
    let registry = Registry::load(&paths.registry).unwrap();
    let (name, config) = registry.resolve(None).unwrap();

    let outcome = loader::load_source(&paths, name, config).await.unwrap();
    let store = &outcome.value;

    assert_eq!(store.source_name(), "TEST");
    assert_eq!(store.records().len(), 4);
    assert_eq!(store.removed_territories(), ["T2".to_string()]);
    assert_eq!(store.boundaries().map(|l| l.len()), Some(2));

    let mut report = LoadReport::new(name);
    report.record_store(store);
    report.record_issues(&outcome.errors);
    report.finalize();

    assert_eq!(report.visible_features, 1);
    assert_eq!(report.territories_removed, 1);
    assert_eq!(report.status, LoadStatus::Success);
}

#[tokio::test]
async fn test_missing_optional_file_is_partial_success() {
    let paths = fixture_dir("no_gis");
    let registry = Registry::load(&paths.registry).unwrap();
    let (name, config) = registry.resolve(Some("NO_GIS")).unwrap();

    let outcome = loader::load_source(&paths, name, config).await.unwrap();
    assert!(outcome.value.boundaries().is_none());
    assert_eq!(outcome.errors.len(), 1);

    let mut report = LoadReport::new(name);
    report.record_store(&outcome.value);
    report.record_issues(&outcome.errors);
    report.finalize();
    assert_eq!(report.status, LoadStatus::PartialSuccess);
}

#[tokio::test]
async fn test_failed_load_keeps_current_source() {
    let paths = fixture_dir("broken");
    let registry = Registry::load(&paths.registry).unwrap();
    let palette = loader::load_palette(&paths.palette).await;
    assert!(palette.errors.is_empty());

    let mut session = Session::new(palette.value);

    let (name, config) = registry.resolve(Some("TEST")).unwrap();
    let ticket = session.begin_load(name);
    let result = loader::load_source(&paths, name, config).await;
    assert!(matches!(
        session.complete_load(ticket, result),
        LoadOutcome::Applied(_)
    ));

    let (name, config) = registry.resolve(Some("BROKEN")).unwrap();
    let ticket = session.begin_load(name);
    let result = loader::load_source(&paths, name, config).await;
    assert!(matches!(
        session.complete_load(ticket, result),
        LoadOutcome::Failed(_)
    ));

    let view = session.dashboard().unwrap();
    assert_eq!(view.source, "TEST");
    assert_eq!(view.record_count, 4);
}

#[tokio::test]
async fn test_stale_load_is_discarded() {
    let paths = fixture_dir("stale");
    let registry = Registry::load(&paths.registry).unwrap();
    let mut session = Session::default();

    let (name, config) = registry.resolve(Some("TEST")).unwrap();
    let first = session.begin_load(name);
    let second = session.begin_load("NO_GIS");

    let result = loader::load_source(&paths, name, config).await;
    assert!(matches!(
        session.complete_load(first, result),
        LoadOutcome::Stale
    ));
    assert!(session.store().is_none());

    let config = registry.get("NO_GIS").unwrap();
    let result = loader::load_source(&paths, "NO_GIS", config).await;
    assert!(matches!(
        session.complete_load(second, result),
        LoadOutcome::Applied(_)
    ));
    assert_eq!(session.store().map(|s| s.source_name()), Some("NO_GIS"));
}

#[tokio::test]
async fn test_filters_on_loaded_source() {
    let paths = fixture_dir("filters");
    let registry = Registry::load(&paths.registry).unwrap();
    let palette = loader::load_palette(&paths.palette).await;
    let mut session = Session::new(palette.value);

    let (name, config) = registry.resolve(None).unwrap();
    let ticket = session.begin_load(name);
    let result = loader::load_source(&paths, name, config).await;
    session.complete_load(ticket, result);

    let args = FilterArgs {
        years: Some((2010, 2010)),
        exclude_coverages: vec![15],
        ..Default::default()
    };
    for action in args.actions() {
        session.dispatch(action);
    }

    let view = session.dashboard().unwrap();
    assert_eq!(view.record_count, 1);
    assert_eq!(view.total_area, 40.0);
    assert_eq!(view.territory_ranking[0].name, "Leticia");
}

#[tokio::test]
async fn test_session_commands_wait_for_initial_load() {
    let paths = fixture_dir("session");
    let input = tokio::io::BufReader::new(&b"coverage 15 off\n"[..]);

    let session = run_session(&paths, None, true, input).await.unwrap();
    let view = session.dashboard().unwrap();

    assert_eq!(view.source, "TEST");
    assert!(!session.filter().coverages.allows(&15));
    assert_eq!(view.record_count, 2);
}

#[tokio::test]
async fn test_session_without_commands_keeps_initial_load() {
    let paths = fixture_dir("session_eof");
    let input = tokio::io::BufReader::new(&b""[..]);

    let session = run_session(&paths, Some("NO_GIS"), false, input).await.unwrap();
    assert_eq!(session.store().map(|s| s.source_name()), Some("NO_GIS"));
}
