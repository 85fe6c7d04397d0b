//! Performance benchmarks for the session hot paths.
//!
//! These benchmarks measure:
//! - Path resolution on deep and wide trees
//! - Directory listing
//! - A full shell round trip through the engine

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use engine::console::{EngineSettings, SessionEngine};
use engine::fs::{FileSystem, FileType};
use engine::world::World;

/// A single chain of `depth` nested directories.
fn deep_tree(depth: usize) -> (FileSystem, String) {
    let mut fs = FileSystem::new();
    let mut cursor = fs.root();
    for i in 0..depth {
        cursor = fs.add_directory(cursor, &format!("level{i}")).unwrap();
    }
    let path = fs.path_of(cursor);
    (fs, path)
}

/// One directory holding `width` files.
fn wide_tree(width: usize) -> FileSystem {
    let mut fs = FileSystem::new();
    let root = fs.root();
    let dir = fs.add_directory(root, "data").unwrap();
    for i in 0..width {
        fs.add_file(dir, &format!("file{i:05}.txt"), "x", FileType::Text)
            .unwrap();
    }
    fs
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for depth in [10, 100, 1000] {
        let (fs, path) = deep_tree(depth);
        group.bench_with_input(BenchmarkId::new("absolute", depth), &path, |b, path| {
            b.iter(|| fs.resolve(black_box(path), fs.root()).unwrap());
        });

        let bottom = fs.resolve(&path, fs.root()).unwrap();
        let climb = vec![".."; depth].join("/");
        group.bench_with_input(BenchmarkId::new("parent_climb", depth), &climb, |b, climb| {
            b.iter(|| fs.resolve(black_box(climb), bottom).unwrap());
        });
    }

    let fs = wide_tree(10_000);
    group.bench_function("wide_case_insensitive", |b| {
        b.iter(|| fs.resolve(black_box("/DATA/FILE09999.TXT"), fs.root()).unwrap());
    });

    group.finish();
}

fn bench_listing(c: &mut Criterion) {
    let mut group = c.benchmark_group("listing");

    for width in [10, 1000] {
        let fs = wide_tree(width);
        let dir = fs.resolve("/data", fs.root()).unwrap();
        group.bench_with_input(BenchmarkId::new("list", width), &dir, |b, dir| {
            b.iter(|| fs.list(black_box(*dir)).unwrap());
        });
    }

    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let world = Arc::new(World::builtin().unwrap());
    let mut engine = SessionEngine::new(world, EngineSettings::default());
    engine.initialize().unwrap();
    for line in ["", "", "player", "pw"] {
        engine.execute(line);
    }

    c.bench_function("execute_ls", |b| {
        b.iter(|| engine.execute(black_box("ls /usr/bin")));
    });

    c.bench_function("execute_hop_round_trip", |b| {
        b.iter(|| {
            engine.execute("ssh admin@gateway");
            engine.execute("admin");
            engine.execute("exit")
        });
    });
}

criterion_group!(benches, bench_resolve, bench_listing, bench_execute);
criterion_main!(benches);
