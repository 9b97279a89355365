//! Benchmarks parsing -> filtres -> agrégations sur un tableau synthétique

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use landcover::aggregate::{self, TERRITORY_RANKING_LIMIT, TIME_SERIES_LIMIT};
use landcover::parser::table::{self, TableSchema};
use landcover::{FilterState, Palette, RecordStore, SourceConfig};

fn synthetic_table(territories: usize, classes: u32, years: u16) -> Vec<u8> {
    let mut out = String::from("territory,class,year,area\n");
    for t in 0..territories {
        for class in 1..=classes {
            for year in 0..years {
                let area = ((t * 31 + class as usize * 7 + year as usize) % 97) as f64 * 0.25;
                out.push_str(&format!("{t},{class},{},{area}\n", 1985 + year));
            }
        }
    }
    out.into_bytes()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_table");

    for territories in [100, 1000] {
        let data = synthetic_table(territories, 20, 38);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(territories), &data, |b, data| {
            b.iter(|| {
                let outcome = table::parse(black_box(data), &TableSchema::default(), "bench.csv");
                black_box(outcome.map(|o| o.value.len()).unwrap_or(0))
            })
        });
    }

    group.finish();
}

fn bench_dashboard(c: &mut Criterion) {
    let data = synthetic_table(1000, 20, 38);
    let Ok(outcome) = table::parse(&data, &TableSchema::default(), "bench.csv") else {
        eprintln!("Synthetic table failed to parse, skipping benchmark");
        return;
    };
    let store = RecordStore::new(
        "BENCH",
        SourceConfig::default(),
        outcome.value,
        Default::default(),
        Default::default(),
    );
    let palette = Palette::default();
    let filter = FilterState::from_records(store.records())
        .set_year_range(1990, 2010)
        .toggle_coverage(3, false);

    let mut group = c.benchmark_group("dashboard");
    group.throughput(Throughput::Elements(store.records().len() as u64));
    group.sample_size(20);

    group.bench_function("apply_filter", |b| {
        b.iter(|| black_box(filter.apply(store.records()).len()))
    });

    group.bench_function("aggregate", |b| {
        let view = filter.apply(store.records());
        b.iter(|| {
            let series = aggregate::pivot_by_class_then_year(black_box(&view), TIME_SERIES_LIMIT);
            let ranking = aggregate::territory_ranking(&view, TERRITORY_RANKING_LIMIT);
            black_box((series.len(), ranking.len()))
        })
    });

    group.bench_function("full_view", |b| {
        b.iter(|| black_box(landcover::DashboardView::build(&store, &palette, &filter).record_count))
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_dashboard);
criterion_main!(benches);
