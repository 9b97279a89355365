//! Tests d'intégration : chargement d'une source complète et surfaces dérivées

use landcover::aggregate::{self, by_year, group_sum, top_n, TieBreak, TERRITORY_RANKING_LIMIT};
use landcover::hierarchy::UNGROUPED_LEVEL;
use landcover::{
    load_palette, load_source, parse_hierarchy, CoverageLevel, FilterAction, FilterState,
    LandcoverError, LoadOutcome, RawSource, Record, Session, SourceConfig,
};

const TABLE: &str = "\
territory,class,year,area
T1,3,2000,10
T1,3,2010,40
T2,3,2000,0
A1,15,2000,2.5
A1,15,2010,3.5
A1,18,2010,1
12.0,3,2000,4
12,3,2010,6
";

const CODES: &str = "\
A1;99;RI-Resguardo Indígena Tamaquito;placeholder
T1;100;Leticia;
12;101;Puerto Nariño;
B9;100;Duplicate claim;
";

const PALETTE: &str = "\
ESP;ID;Color number
1. Bosque;1;#1f8d49
1.1. Formación forestal;3;#1f8d49
3. Agropecuaria;14;#ffefc3
3.1. Pasto;15;#edde8e
3.2. Agricultura;18;#e974ed
Sin clasificar;27;#ffffff
";

const GIS: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"id_area": 99},
         "geometry": {"type": "Point", "coordinates": [-70.0, -4.0]}},
        {"type": "Feature", "properties": {"id_area": "101"},
         "geometry": {"type": "Point", "coordinates": [-70.5, -3.8]}},
        {"type": "Feature", "properties": {"id_area": 500},
         "geometry": {"type": "Point", "coordinates": [-71.0, -3.0]}}
    ]
}"#;

fn raw_source() -> RawSource {
    RawSource {
        name: "TEST".into(),
        config: SourceConfig {
            file: "test.csv".into(),
            codes: Some("codes.txt".into()),
            columns: Some(vec![
                "id_gee".into(),
                "id_area".into(),
                "nombre".into(),
                "placeholder1".into(),
            ]),
            barchart: Some("nombre".into()),
            gis: Some("test.geojson".into()),
            description: None,
        },
        table: TABLE.as_bytes().to_vec(),
        codes: Some(CODES.as_bytes().to_vec()),
        boundaries: Some(GIS.as_bytes().to_vec()),
    }
}

fn loaded_session() -> Session {
    let palette = load_palette(PALETTE.as_bytes(), "palette.txt").unwrap().value;
    let mut session = Session::new(palette);
    let ticket = session.begin_load("TEST");
    let outcome = session.complete_load(ticket, load_source(&raw_source()));
    assert!(matches!(outcome, LoadOutcome::Applied(_)));
    session
}

#[test]
fn test_zero_area_territory_removed() {
    let session = loaded_session();
    let store = session.store().unwrap();

    assert!(!store.contains_territory("T2"));
    assert_eq!(store.removed_territories(), ["T2".to_string()]);
    assert!(store.records().iter().all(|r| r.territory != "T2"));
}

#[test]
fn test_scenario_metrics_and_ranking() {
    let mut session = loaded_session();
    session.dispatch(FilterAction::ToggleTerritory {
        key: "A1".into(),
        included: false,
    });
    session.dispatch(FilterAction::ToggleTerritory {
        key: "12".into(),
        included: false,
    });

    let view = session.view();
    let delta = aggregate::metric_delta(&view, 3).unwrap();
    assert_eq!(delta.delta, 30.0);

    let ranking = aggregate::territory_ranking(&view, TERRITORY_RANKING_LIMIT);
    assert_eq!(ranking, vec![("T1".to_string(), 50.0)]);
}

#[test]
fn test_canonical_keys_merge() {
    let session = loaded_session();
    let view = session.view();

    let sums = group_sum(&view, aggregate::by_territory);
    assert_eq!(sums.get(&"12".to_string()), Some(10.0));
    assert_eq!(sums.get(&"12.0".to_string()), None);
}

#[test]
fn test_join_resolution() {
    let session = loaded_session();
    let resolver = session.store().unwrap().resolver();

    assert_eq!(resolver.resolve_territory_from_area_id("99"), Some("A1"));
    assert_eq!(resolver.resolve_display_name("A1"), "R.I. Tamaquito");
    assert!(!resolver.has_matching_records("500"));

    // id_area 100 revendiqué par T1 puis B9 : la première entrée gagne
    assert_eq!(resolver.resolve_territory_from_area_id("100"), Some("T1"));
    assert!(matches!(
        resolver.resolve_territory_strict("100"),
        Err(LandcoverError::AmbiguousAreaId { .. })
    ));
}

#[test]
fn test_map_layer_and_popups() {
    let session = loaded_session();
    let store = session.store().unwrap();
    let layer = store.boundaries().unwrap();

    let visible = store.resolver().visible_features(layer);
    assert_eq!(visible.len(), 2);

    let summaries = session.feature_summaries();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].territory.as_deref(), Some("A1"));
    assert_eq!(summaries[0].total_area, 7.0);
    assert_eq!(summaries[1].name.as_deref(), Some("Puerto Nariño"));
}

#[test]
fn test_filter_idempotence() {
    let session = loaded_session();
    let store = session.store().unwrap();
    let state = session
        .filter()
        .reduce(FilterAction::SetYearRange { min: 2010, max: 2010 })
        .reduce(FilterAction::ToggleCoverage {
            class: 18,
            included: false,
        });

    let once = state.apply(store.records());
    let twice = state.apply(&once);
    assert_eq!(once, twice);
    assert!(once.iter().all(|r| r.year == Some(2010) && r.class != Some(18)));
}

#[test]
fn test_sum_conservation() {
    let session = loaded_session();
    let view = session.view();
    let by_year_total = group_sum(&view, by_year).total();

    assert!((by_year_total - view.total_area()).abs() < 1e-9);
}

#[test]
fn test_top_n_deterministic() {
    let records = vec![
        Record::new("X", 1, 2000, 5.0),
        Record::new("Y", 1, 2000, 5.0),
        Record::new("Z", 1, 2000, 5.0),
    ];
    let sums = group_sum(&records, aggregate::by_territory);
    let first = top_n(&sums, 3, TieBreak::FirstEncountered);

    for _ in 0..10 {
        assert_eq!(top_n(&sums, 3, TieBreak::FirstEncountered), first);
    }
    let keys: Vec<_> = first.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["X", "Y", "Z"]);
}

#[test]
fn test_hierarchy_parsing() {
    assert_eq!(
        parse_hierarchy("2.3. SubLabel"),
        CoverageLevel::Leaf {
            main: "2",
            sub: "3",
            label: "SubLabel"
        }
    );
    assert_eq!(
        parse_hierarchy("4. MainLabel"),
        CoverageLevel::Group {
            main: "4",
            label: "MainLabel"
        }
    );
    assert_eq!(parse_hierarchy("Unlabeled"), CoverageLevel::Ungrouped);
}

#[test]
fn test_legend_uses_full_palette_for_absent_parent() {
    let session = loaded_session();
    let view = session.dashboard().unwrap();

    // Aucune ligne de classe 14 : le nom du groupe 3 vient de la palette complète
    let group = view.legend.iter().find(|g| g.level == "3").unwrap();
    assert_eq!(group.name, "Agropecuaria");
    assert_eq!(group.sub_items.len(), 2);
    assert_ne!(view.legend.last().map(|g| g.level.as_str()), Some(UNGROUPED_LEVEL));
}

#[test]
fn test_failed_load_keeps_previous_state() {
    let mut session = loaded_session();
    let ticket = session.begin_load("BROKEN");
    let broken = RawSource {
        name: "BROKEN".into(),
        table: b"territory,year,area\nT1,2000,1\n".to_vec(),
        ..Default::default()
    };

    let outcome = session.complete_load(ticket, load_source(&broken));
    assert!(matches!(
        outcome,
        LoadOutcome::Failed(LandcoverError::MissingColumn { .. })
    ));
    assert_eq!(session.store().unwrap().source_name(), "TEST");
    assert!(!session.view().is_empty());
}

#[test]
fn test_initial_filter_state() {
    let session = loaded_session();
    let expected = FilterState::from_records(session.store().unwrap().records());

    assert_eq!(session.filter(), &expected);
    assert_eq!((expected.year_min, expected.year_max), (2000, 2010));
}
