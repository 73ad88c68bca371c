//! crates/cli/benches/startup_benchmark.rs
//!
//! Benchmarks the client-side hot paths that run before a single byte is
//! exchanged with the server: walking the destination tree, diffing it
//! against a persisted catalog, and computing the per-revision digests an
//! `UPDATE_RCS` entry ships eagerly.
//!
//! Run with: `cargo bench -p cvsync-cli`

use std::fs;
use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cvsync_checksums::Algorithm;
use cvsync_cli::{build_scan_commands, local_rcs_snapshot, scan_local_tree, Snapshot};
use cvsync_filters::RefuseList;

/// Lays out a flat tree of `count` plain files plus `count` single-revision
/// RCS files under `root`, mirroring a small collection mirror.
fn build_mirror_tree(root: &Path, count: usize) {
    for index in 0..count {
        fs::write(root.join(format!("file{index}.txt")), format!("payload {index}")).unwrap();
        let body = format!(
            "head\t1.1;\naccess;\nsymbols;\nlocks;\n\n1.1\ndate\t2024.01.01.00.00.00;\tauthor alice;\tstate Exp;\nbranches;\nnext\t;\n\ndesc\n@@\n\n1.1\nlog\n@initial@\ntext\n@body {index}@\n\n"
        );
        fs::write(root.join(format!("file{index}.c,v")), body).unwrap();
    }
}

fn bench_scan_local_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_local_tree");
    let refuse = RefuseList::empty();

    for count in [10, 100] {
        let dir = tempfile::tempdir().unwrap();
        build_mirror_tree(dir.path(), count);

        group.throughput(Throughput::Elements((count * 2) as u64));
        group.bench_with_input(BenchmarkId::new("entries", count), dir.path(), |b, root| {
            b.iter(|| black_box(scan_local_tree(black_box(root), black_box(&refuse)).unwrap()));
        });
    }

    group.finish();
}

fn bench_build_scan_commands(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_scan_commands");
    let refuse = RefuseList::empty();

    for count in [10, 100] {
        let dir = tempfile::tempdir().unwrap();
        build_mirror_tree(dir.path(), count);
        let current = scan_local_tree(dir.path(), &refuse).unwrap();
        let catalog = Snapshot::new();

        group.throughput(Throughput::Elements((count * 2) as u64));
        group.bench_with_input(BenchmarkId::new("entries", count), &current, |b, current| {
            b.iter(|| black_box(build_scan_commands(black_box(current), black_box(&catalog), &[])));
        });
    }

    group.finish();
}

/// Benchmarks the client's `UPDATE_RCS` digest side: parsing each local RCS
/// file and hashing its delta/deltatext fields, the work the scan-writer
/// thread does once per RCS `ScanCommand::Update` before shipping its
/// admin snapshot and digest lists.
fn bench_local_rcs_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_rcs_snapshot");

    for count in [10, 100] {
        let dir = tempfile::tempdir().unwrap();
        build_mirror_tree(dir.path(), count);
        let paths: Vec<_> = (0..count).map(|index| dir.path().join(format!("file{index}.c,v"))).collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("entries", count), &paths, |b, paths| {
            b.iter(|| {
                for path in paths {
                    black_box(local_rcs_snapshot(black_box(path), Algorithm::Md5).unwrap());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_scan_local_tree,
    bench_build_scan_commands,
    bench_local_rcs_snapshot,
);
criterion_main!(benches);
