// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Performance benchmarks for riffle
//!
//! Run with: cargo bench
//!
//! These benchmarks measure:
//! - Pattern compilation and duration assignment
//! - Offline clip rendering throughput
//! - Theory resolution (chords, progressions, arpeggios)
//! - Transport task-queue operations

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use riffle::clip::{render_clip, ClipParams, NoteInput};
use riffle::pattern::{assign_durations, expand_pattern, rendering_duration};
use riffle::theory::{arp, chords_by_progression};
use riffle::{Transport, PPQ};

/// Benchmark pattern compilation across nesting depths
fn bench_pattern_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_compile");

    let patterns = [
        ("flat", "xxxxxxxxxxxxxxxx"),
        ("mixed", "x-xRx_RRx-xRx_RR"),
        ("nested", "x[xx][xx[xx]]x[x[x[xx]]]"),
    ];
    for (name, pattern) in patterns.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), pattern, |b, pattern| {
            b.iter(|| expand_pattern(black_box(pattern)).unwrap())
        });
    }

    group.finish();
}

/// Benchmark duration assignment over a compiled tree
fn bench_assign_durations(c: &mut Criterion) {
    let tree = expand_pattern("x-xRx_RR[xx[xx]]x_[x_]-x").unwrap();

    c.bench_function("assign_durations", |b| {
        b.iter(|| assign_durations(black_box(&tree), black_box(0.25)))
    });
}

/// Benchmark the rendering-duration cycle calculation
fn bench_rendering_duration(c: &mut Criterion) {
    let mut group = c.benchmark_group("rendering_duration");

    let cases = [(3usize, "xxxx"), (5, "x-xRx_RR"), (7, "xxxxxxxxxxxx")];
    for (note_count, pattern) in cases.iter() {
        group.bench_with_input(
            BenchmarkId::new("cycle", format!("{}x{}", note_count, pattern.len())),
            &(*note_count, *pattern),
            |b, &(note_count, pattern)| {
                b.iter(|| {
                    rendering_duration(
                        black_box(pattern),
                        black_box(0.5),
                        black_box(note_count),
                        false,
                    )
                    .unwrap()
                })
            },
        );
    }

    group.finish();
}

/// Benchmark offline rendering of whole clips
fn bench_render_clip(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_clip");

    let simple = ClipParams {
        notes: NoteInput::Names("C4 E4 G4 B4".to_string()),
        pattern: "xxxxxxxxxxxxxxxx".to_string(),
        ..Default::default()
    };
    let chords = ClipParams {
        notes: NoteInput::Names("CM_4 FM_4 GM_4 Am_4".to_string()),
        pattern: "x_x_[xx]x_-x[x[xx]]x_".to_string(),
        subdiv: "8n".to_string(),
        ..Default::default()
    };

    group.bench_function("notes", |b| b.iter(|| render_clip(black_box(&simple)).unwrap()));
    group.bench_function("chords", |b| b.iter(|| render_clip(black_box(&chords)).unwrap()));

    group.finish();
}

/// Benchmark theory resolution paths
fn bench_theory(c: &mut Criterion) {
    let mut group = c.benchmark_group("theory");

    group.bench_function("progression", |b| {
        b.iter(|| chords_by_progression(black_box("C4 major"), black_box("I IV V ii")).unwrap())
    });

    group.bench_function("arp", |b| {
        b.iter(|| arp(black_box("CM_4 FM_4 GM_4")).unwrap())
    });

    group.finish();
}

/// Benchmark transport scheduling and advancing
fn bench_transport(c: &mut Criterion) {
    let mut group = c.benchmark_group("transport");

    for size in [100usize, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("schedule", size), size, |b, &size| {
            b.iter(|| {
                let mut transport = Transport::new(120.0);
                for i in 0..size {
                    transport.schedule_once(i as u64 * PPQ, |_, _| {});
                }
                black_box(transport.pending())
            })
        });

        group.bench_with_input(BenchmarkId::new("advance", size), size, |b, &size| {
            b.iter(|| {
                let mut transport = Transport::new(120.0);
                transport.start();
                for i in 0..size {
                    transport.schedule_once(i as u64 * PPQ, |_, _| {});
                }
                transport.advance_to(size as u64 * PPQ);
                black_box(transport.pending())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_pattern_compile,
    bench_assign_durations,
    bench_rendering_duration,
    bench_render_clip,
    bench_theory,
    bench_transport,
);

criterion_main!(benches);
