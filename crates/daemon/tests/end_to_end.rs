//! In-process client/server integration tests for the full scan/compare
//! dialogue, driven over real loopback TCP with `cvsync_daemon::run_session`
//! on one side and `cvsync_cli::run_session` on the other.
//!
//! Each test roots both sides in a `tempfile::TempDir` and drives exactly
//! one collection through one `cvsync` invocation, covering the seven
//! dialogue shapes in `crates/scan/src/compare.rs`'s `reconcile`: an empty
//! tree, a manifest-bootstrapped ADD, an unknown-to-the-server REMOVE, a
//! mode-only SETATTR echo, an RCS delta UPDATE_RCS merge, a refused Attic
//! subtree, and an ACL rule cap refusing a third connection before
//! negotiation even starts.

use std::fs;
use std::net::TcpListener;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::thread;

use cvsync_access::{evaluate, parse as parse_acl, ConnectionTracker, Peer, Refusal};
use cvsync_checksums::Algorithm;
use cvsync_cli::{ClientConfig, CollectionTarget};
use cvsync_compress::Codec;
use cvsync_core::attr::{CvsyncAttr, FileType};
use cvsync_core::collection::Release;
use cvsync_daemon::{DaemonConfig, DaemonError, SessionPolicy};
use cvsync_protocol::error::ErrorReason;
use cvsync_protocol::version::{negotiate_client, negotiate_server};
use cvsync_protocol::ProtocolError;
use cvsync_rcs::RcsNum;

fn daemon_config(name: &str, prefix: &std::path::Path) -> Arc<DaemonConfig> {
    let text = format!(
        "collection {name} {{\n    release rcs\n    prefix {}\n}}\n",
        prefix.display()
    );
    Arc::new(DaemonConfig::parse(&text).expect("valid single-collection config"))
}

/// Binds an ephemeral loopback port, accepts exactly one connection on a
/// background thread, and runs it through `cvsync_daemon::run_session`.
fn spawn_daemon(config: Arc<DaemonConfig>) -> (u16, thread::JoinHandle<Result<(), DaemonError>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        cvsync_daemon::run_session(
            stream,
            SessionPolicy {
                admission: Ok(()),
                hash_algorithm: Algorithm::Md5,
                compression_allowed: true,
                config: &config,
            },
        )
    });
    (port, handle)
}

fn client_config(port: u16, name: &str, destination_root: &std::path::Path) -> ClientConfig {
    let target = ClientConfig::target_for(name, Release::Rcs, 0o022, destination_root)
        .expect("non-empty collection name");
    ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        collections: vec![target],
        hash_preference: Algorithm::Md5,
        compress_preference: Codec::None,
        refuse_file: None,
    }
}

#[test]
fn s1_empty_sync_creates_empty_destination() {
    let server_root = tempfile::tempdir().unwrap();
    let config = daemon_config("pkg", server_root.path());
    let (port, server) = spawn_daemon(config);

    let client_root = tempfile::tempdir().unwrap();
    let client_cfg = client_config(port, "pkg", client_root.path());
    cvsync_cli::run_session(&client_cfg).unwrap();
    server.join().unwrap().unwrap();

    let dest = client_root.path().join("pkg");
    assert!(dest.is_dir());
    assert!(fs::read_dir(&dest).unwrap().next().is_none());
}

#[test]
fn s2_manifest_bootstrapped_entry_is_added() {
    let server_root = tempfile::tempdir().unwrap();
    fs::write(server_root.path().join("readme,v"), b"rcs body from server").unwrap();
    let config = daemon_config("pkg", server_root.path());
    let (port, server) = spawn_daemon(config);

    let client_root = tempfile::tempdir().unwrap();
    fs::write(client_root.path().join(".pkg.manifest"), b"readme,v\trcs\n").unwrap();

    let client_cfg = client_config(port, "pkg", client_root.path());
    cvsync_cli::run_session(&client_cfg).unwrap();
    server.join().unwrap().unwrap();

    let fetched = fs::read(client_root.path().join("pkg/readme,v")).unwrap();
    assert_eq!(fetched, b"rcs body from server");
}

#[test]
fn s3_entry_unknown_to_server_is_removed() {
    let server_root = tempfile::tempdir().unwrap();
    let config = daemon_config("pkg", server_root.path());
    let (port, server) = spawn_daemon(config);

    let client_root = tempfile::tempdir().unwrap();
    let dest = client_root.path().join("pkg");
    fs::create_dir_all(&dest).unwrap();
    let stale = dest.join("stale,v");
    fs::write(&stale, b"leftover").unwrap();

    let client_cfg = client_config(port, "pkg", client_root.path());
    cvsync_cli::run_session(&client_cfg).unwrap();
    server.join().unwrap().unwrap();

    assert!(!stale.exists());
}

#[test]
fn s4_mode_only_change_round_trips_through_setattr() {
    let server_root = tempfile::tempdir().unwrap();
    let config = daemon_config("pkg", server_root.path());
    let (port, server) = spawn_daemon(config);

    let client_root = tempfile::tempdir().unwrap();
    let dest = client_root.path().join("pkg");
    fs::create_dir_all(&dest).unwrap();
    let file_path = dest.join("doc,v");
    fs::write(&file_path, b"rcs body").unwrap();
    fs::set_permissions(&file_path, fs::Permissions::from_mode(0o644)).unwrap();
    let actual_mtime = fs::metadata(&file_path).unwrap().mtime();

    let mut catalog = cvsync_cli::Snapshot::new();
    catalog.insert(
        b"doc,v".to_vec(),
        (
            FileType::Rcs,
            CvsyncAttr::Rcs {
                mtime: actual_mtime,
                mode: 0o600,
            },
        ),
    );
    cvsync_cli::save_catalog(&client_root.path().join(".pkg.catalog"), &catalog).unwrap();

    let client_cfg = client_config(port, "pkg", client_root.path());
    cvsync_cli::run_session(&client_cfg).unwrap();
    server.join().unwrap().unwrap();

    let mode = fs::metadata(&file_path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o644);
}

const CLIENT_RCS: &[u8] = b"head\t1.1;\naccess;\nsymbols;\nlocks;\n\n1.1\ndate\t2024.01.01.00.00.00;\tauthor alice;\tstate Exp;\nbranches;\nnext\t;\n\ndesc\n@d@\n\n1.1\nlog\n@l1@\ntext\n@t1@\n";

const SERVER_RCS: &[u8] = b"head\t1.2;\naccess;\nsymbols;\nlocks;\n\n1.2\ndate\t2024.01.02.03.04.05;\tauthor alice;\tstate Exp;\nbranches;\nnext\t1.1;\n\n1.1\ndate\t2024.01.01.00.00.00;\tauthor alice;\tstate Exp;\nbranches;\nnext\t;\n\ndesc\n@d@\n\n1.2\nlog\n@l2@\ntext\n@t2@\n\n1.1\nlog\n@l1@\ntext\n@t1@\n";

#[test]
fn s5_rcs_delta_update_merges_the_missing_revision() {
    let server_root = tempfile::tempdir().unwrap();
    fs::write(server_root.path().join("lib.c,v"), SERVER_RCS).unwrap();
    let config = daemon_config("pkg", server_root.path());
    let (port, server) = spawn_daemon(config);

    let client_root = tempfile::tempdir().unwrap();
    let dest = client_root.path().join("pkg");
    fs::create_dir_all(&dest).unwrap();
    let file_path = dest.join("lib.c,v");
    fs::write(&file_path, CLIENT_RCS).unwrap();

    // A catalog mtime distinct from the file's real one forces a generic
    // UPDATE (rather than a no-op or SETATTR) on the first scan.
    let mut catalog = cvsync_cli::Snapshot::new();
    catalog.insert(
        b"lib.c,v".to_vec(),
        (FileType::Rcs, CvsyncAttr::Rcs { mtime: 1, mode: 0o444 }),
    );
    cvsync_cli::save_catalog(&client_root.path().join(".pkg.catalog"), &catalog).unwrap();

    let client_cfg = client_config(port, "pkg", client_root.path());
    cvsync_cli::run_session(&client_cfg).unwrap();
    server.join().unwrap().unwrap();

    let merged = fs::read(&file_path).unwrap();
    let parsed = cvsync_rcs::parse(&merged).unwrap();
    assert_eq!(parsed.delta.len(), 2);
    assert!(parsed.delta.iter().any(|r| r.num == RcsNum::parse(b"1.1").unwrap()));
    assert!(parsed.delta.iter().any(|r| r.num == RcsNum::parse(b"1.2").unwrap()));
    assert_eq!(parsed.admin.head, Some(RcsNum::parse(b"1.2").unwrap()));
}

#[test]
fn s6_refused_attic_subtree_never_enters_the_dialogue() {
    let server_root = tempfile::tempdir().unwrap();
    let config = daemon_config("pkg", server_root.path());
    let (port, server) = spawn_daemon(config);

    let client_root = tempfile::tempdir().unwrap();
    let dest = client_root.path().join("pkg");
    fs::create_dir_all(dest.join("Attic")).unwrap();
    let attic_file = dest.join("Attic/old.c,v");
    fs::write(&attic_file, b"attic body").unwrap();
    let normal_file = dest.join("keep,v");
    fs::write(&normal_file, b"keep body").unwrap();

    let refuse_path = client_root.path().join("refuse");
    fs::write(&refuse_path, "Attic/*\nAttic\n").unwrap();

    let mut client_cfg = client_config(port, "pkg", client_root.path());
    client_cfg.refuse_file = Some(refuse_path);
    cvsync_cli::run_session(&client_cfg).unwrap();
    server.join().unwrap().unwrap();

    // Never scanned, so never part of the dialogue at all.
    assert_eq!(fs::read(&attic_file).unwrap(), b"attic body");
    // Scanned, reported ADD with no server-side counterpart, removed.
    assert!(!normal_file.exists());
}

#[test]
fn s7_acl_rule_cap_refuses_a_third_connection() {
    let rules = parse_acl("allow 127.0.0.1/32,2\n").unwrap();
    let mut tracker = ConnectionTracker::new(None);
    let peer = Peer {
        addr: "127.0.0.1".parse().unwrap(),
        hostname: None,
    };

    let mut results = Vec::new();
    let mut held = Vec::new();
    for _ in 0..3 {
        let decision = evaluate(&rules, peer);
        let admission = match tracker.admit(decision, &rules) {
            Ok(handle) => {
                held.push(handle);
                Ok(())
            }
            Err(refusal) => Err(match refusal {
                Refusal::Denied => ErrorReason::Denied,
                Refusal::GlobalLimited | Refusal::RuleLimited => ErrorReason::Limited,
            }),
        };

        let (mut client_io, mut server_io) = UnixStream::pair().unwrap();
        let server = thread::spawn(move || negotiate_server(&mut server_io, admission));
        let client_result = negotiate_client(&mut client_io);
        server.join().unwrap().ok();
        results.push(client_result);
    }

    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(matches!(
        results[2],
        Err(ProtocolError::Refused(ErrorReason::Limited))
    ));
}
