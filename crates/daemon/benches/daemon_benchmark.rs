//! crates/daemon/benches/daemon_benchmark.rs
//!
//! Benchmarks for the three hot paths this crate owns end to end:
//! `cvsyncd.conf` parsing, ACL evaluation/admission, and the `UPDATE_RCS`
//! digest computation `FsLocalLookup` performs per mismatching record.
//!
//! Run with: `cargo bench -p cvsync-daemon`

use std::fs;
use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cvsync_access::{evaluate, parse, ConnectionTracker, Peer};
use cvsync_checksums::Algorithm;
use cvsync_core::{Collection, Pathname, Release};
use cvsync_daemon::{DaemonConfig, FsLocalLookup};
use cvsync_scan::LocalLookup;

fn synthetic_config(collections: usize) -> String {
    let mut out = String::from("port 7777\nmaxclients 64\numask 022\n");
    for index in 0..collections {
        out.push_str(&format!(
            "collection coll{index} {{\n    release rcs\n    prefix /srv/coll{index}\n    umask 022\n}}\n"
        ));
    }
    out
}

fn bench_config_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("config_parse");

    for count in [1, 10, 100] {
        let contents = synthetic_config(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("collections", count), &contents, |b, contents| {
            b.iter(|| black_box(DaemonConfig::parse(black_box(contents)).unwrap()));
        });
    }

    group.finish();
}

fn synthetic_acl(rules: usize) -> String {
    let mut out = String::new();
    for index in 0..rules {
        out.push_str(&format!("allow 10.{}.0.0/16\n", index % 256));
    }
    out.push_str("deny 0.0.0.0/0\n");
    out
}

fn bench_acl_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("acl_evaluate");

    for count in [1, 16, 256] {
        let text = synthetic_acl(count);
        let rules = parse(&text).unwrap();
        let peer = Peer {
            addr: "10.5.0.1".parse().unwrap(),
            hostname: None,
        };

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("rules", count), &rules, |b, rules| {
            b.iter(|| black_box(evaluate(black_box(rules), black_box(peer))));
        });
    }

    group.finish();
}

fn bench_connection_tracker(c: &mut Criterion) {
    let mut group = c.benchmark_group("connection_tracker");
    let rules = parse("allow 10.0.0.0/8\n").unwrap();
    let peer = Peer {
        addr: "10.0.0.1".parse().unwrap(),
        hostname: None,
    };

    group.bench_function("admit_release_cycle", |b| {
        b.iter(|| {
            let mut tracker = ConnectionTracker::new(Some(64));
            for _ in 0..32 {
                let decision = evaluate(&rules, peer);
                let handle = tracker.admit(decision, &rules).unwrap();
                tracker.release(handle);
            }
            black_box(tracker.global_active())
        });
    });

    group.finish();
}

/// Lays out a flat collection of `count` single-revision RCS files under
/// `root`, mirroring the shape the `UPDATE` path reconciles against.
fn build_rcs_tree(root: &Path, count: usize) {
    for index in 0..count {
        let body = format!(
            "head\t1.1;\naccess;\nsymbols;\nlocks;\n\n1.1\ndate\t2024.01.01.00.00.00;\tauthor alice;\tstate Exp;\nbranches;\nnext\t;\n\ndesc\n@@\n\n1.1\nlog\n@initial@\ntext\n@body {index}@\n\n"
        );
        fs::write(root.join(format!("file{index}.c,v")), body).unwrap();
    }
}

/// Benchmarks the server's `UPDATE_RCS` digest side: mmap-ing each RCS file
/// and hashing its delta/deltatext fields, the work `run_update_rcs` does
/// once per record before diffing against the peer's digest lists.
fn bench_rcs_digests(c: &mut Criterion) {
    let mut group = c.benchmark_group("rcs_digests");

    for count in [10, 100] {
        let dir = tempfile::tempdir().unwrap();
        build_rcs_tree(dir.path(), count);

        let prefix = Pathname::new(dir.path().as_os_str().as_encoded_bytes().to_vec()).unwrap();
        let collection = Collection::new(b"bench".to_vec(), Release::Rcs, prefix, 0o022);
        let local = FsLocalLookup::new(&collection);
        let names: Vec<Vec<u8>> = (0..count).map(|index| format!("file{index}.c,v").into_bytes()).collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("entries", count), &names, |b, names| {
            b.iter(|| {
                for name in names {
                    black_box(local.rcs_digests(black_box(name), Algorithm::Md5));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_config_parse,
    bench_acl_evaluate,
    bench_connection_tracker,
    bench_rcs_digests,
);
criterion_main!(benches);
