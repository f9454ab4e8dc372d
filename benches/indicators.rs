//! Benchmarks for indicator computation and full analysis.

use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use twsignal::indicators::{ema, rsi, sma, smooth_kd};
use twsignal::prelude::*;

/// Generate deterministic bars
fn generate_bars(n: usize) -> Vec<Bar> {
  let start = NaiveDate::from_ymd_opt(2015, 1, 5).unwrap();
  let mut bars = Vec::with_capacity(n);
  let mut price = 100.0;

  for i in 0..n {
    let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0; // Deterministic "random"
    let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;

    let o = price;
    let c = (price + change).max(1.0);
    let h = o.max(c) + volatility * 0.5;
    let l = (o.min(c) - volatility * 0.5).max(0.5);

    bars.push(Bar::new(start + Days::new(i as u64), o, h, l, c, 10_000));
    price = c;
  }

  bars
}

fn bench_primitives(c: &mut Criterion) {
  let closes: Vec<f64> = generate_bars(1000).iter().map(|b| b.close).collect();
  let rsv: Vec<f64> = closes.iter().map(|c| c % 100.0).collect();

  c.bench_function("sma60_1000_bars", |b| b.iter(|| black_box(sma(black_box(&closes), 60))));
  c.bench_function("ema26_1000_bars", |b| b.iter(|| black_box(ema(black_box(&closes), 26))));
  c.bench_function("rsi14_1000_bars", |b| b.iter(|| black_box(rsi(black_box(&closes), 14))));
  c.bench_function("kd_1000_bars", |b| b.iter(|| black_box(smooth_kd(black_box(&rsv), 50.0))));
}

fn bench_scaling(c: &mut Criterion) {
  let mut group = c.benchmark_group("analysis_scaling");
  let engine = EngineBuilder::new().build().unwrap();
  let input = AnalysisInput::new().with_nav(120.0);

  for size in [260, 1000, 5000] {
    let bars = generate_bars(size);

    group.bench_with_input(BenchmarkId::new("analyze", size), &bars, |b, bars| {
      b.iter(|| {
        let _ = black_box(engine.analyze(black_box(bars.iter().copied()), &input));
      })
    });
  }

  group.finish();
}

fn bench_parallel_vs_sequential(c: &mut Criterion) {
  let bars = generate_bars(5000);
  let seq_engine = EngineBuilder::new().build().unwrap();
  let par_engine = EngineBuilder::new().parallel(true).build().unwrap();
  let series = seq_engine.prepare(bars).unwrap();

  let mut group = c.benchmark_group("parallel_comparison");

  group.bench_function("sequential_5000", |b| {
    b.iter(|| {
      let _ = black_box(seq_engine.compute(black_box(series.clone())));
    })
  });

  group.bench_function("parallel_5000", |b| {
    b.iter(|| {
      let _ = black_box(par_engine.compute(black_box(series.clone())));
    })
  });

  group.finish();
}

criterion_group!(benches, bench_primitives, bench_scaling, bench_parallel_vs_sequential);
criterion_main!(benches);
